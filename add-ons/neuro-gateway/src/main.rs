//! Neuro screening gateway.
//!
//! Serves `GET /` and `POST /diagnose`, or runs one diagnosis headless:
//!
//! ```text
//! neuro-gateway --diagnose <audio> [--self-report <json file>] [--history <json file>]
//! ```

mod config;
mod routes;
mod service;

use std::path::Path;
use std::sync::Arc;

use neuro_core::{AgentConfig, DiagnosisRequest, ReportHistory, SelfReport};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::GatewayConfig;
use crate::routes::{build_app, AppState};
use crate::service::DiagnosisService;

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path, e))?;
    serde_json::from_str(&content).map_err(|e| format!("invalid JSON in {}: {}", path, e))
}

fn load_agent_config(gateway: &GatewayConfig) -> Result<AgentConfig, String> {
    match &gateway.agent_config_path {
        Some(path) => AgentConfig::load_from_path(Path::new(path)).map_err(|e| e.to_string()),
        None => Ok(AgentConfig::from_env()),
    }
}

fn headless_request(args: &[String]) -> Result<DiagnosisRequest, String> {
    let audio = flag_value(args, "--diagnose")
        .filter(|a| !a.starts_with("--"))
        .ok_or("Usage: neuro-gateway --diagnose <audio> [--self-report <file>] [--history <file>]")?;
    let self_report: SelfReport = match flag_value(args, "--self-report") {
        Some(path) => read_json_file(&path)?,
        None => SelfReport::new(),
    };
    let request = DiagnosisRequest::new(audio, self_report);
    Ok(match flag_value(args, "--history") {
        Some(path) => request.with_history(read_json_file::<ReportHistory>(&path)?),
        None => request,
    })
}

/// Run one request and print the validated result.
async fn run_headless(service: &DiagnosisService, args: &[String]) -> Result<(), String> {
    let request = headless_request(args)?;
    match service.diagnose(&request).await {
        Ok(result) => {
            let pretty = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            println!("{}", pretty);
            Ok(())
        }
        Err(e) => {
            if let Some(actual) = e.actual() {
                eprintln!("Actual result: {}", actual);
            }
            Err(format!("{} ({})", e, e.kind()))
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[neuro-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let gateway = match GatewayConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "gateway config invalid");
            std::process::exit(1);
        }
    };
    let service = match load_agent_config(&gateway)
        .and_then(|agent| DiagnosisService::from_config(agent, &gateway).map_err(|e| e.to_string()))
    {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!(error = %e, "agent setup failed");
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--diagnose") {
        match run_headless(&service, &args).await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("DIAGNOSIS FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    let addr = gateway.bind_addr();
    let app = build_app(AppState {
        app_name: gateway.app_name.clone(),
        service,
    });
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, error = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, app = %gateway.app_name, "neuro-gateway listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}
