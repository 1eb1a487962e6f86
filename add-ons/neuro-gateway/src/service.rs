//! Shared providers plus a per-request orchestrator and tool registry.

use std::sync::Arc;

use neuro_core::{
    AgentConfig, ChatModel, DiagnoseError, DiagnoseResult, DiagnosisRequest, OpenAiChatModel,
    Orchestrator,
};
use neuro_skills::{PlaceholderRetriever, ToolRegistry};
use neuro_voice::{
    AudioLoader, ClassifierProvider, OpenAiTranscriber, PlaceholderClassifier,
    PlaceholderTranscriber, TranscriptionProvider, VoiceError,
};
use serde_json::Value;
use tracing::warn;

use crate::config::GatewayConfig;

/// Audio loader with the configured size cap and allowed directory.
fn audio_loader(agent: &AgentConfig) -> DiagnoseResult<AudioLoader> {
    let config_err = |e: VoiceError| DiagnoseError::Config(e.to_string());
    let mut loader = AudioLoader::new(agent.transcription_timeout()).map_err(config_err)?;
    if let Some(max) = agent.max_audio_bytes {
        loader = loader.with_max_bytes(max);
    }
    if let Some(root) = &agent.audio_root {
        loader = loader.with_allowed_root(root).map_err(config_err)?;
    }
    Ok(loader)
}

/// Long-lived clients shared by every request. Holds no per-request state.
pub struct DiagnosisService {
    agent: AgentConfig,
    model: Option<Arc<dyn ChatModel>>,
    loader: AudioLoader,
    transcriber: Arc<dyn TranscriptionProvider>,
    classifier: Arc<dyn ClassifierProvider>,
}

impl DiagnosisService {
    pub fn new(
        agent: AgentConfig,
        model: Option<Arc<dyn ChatModel>>,
        loader: AudioLoader,
        transcriber: Arc<dyn TranscriptionProvider>,
        classifier: Arc<dyn ClassifierProvider>,
    ) -> Self {
        Self {
            agent,
            model,
            loader,
            transcriber,
            classifier,
        }
    }

    /// Real chat model and transcriber when an API key is configured; without one the
    /// service still starts and `/diagnose` answers with a configuration error.
    pub fn from_config(agent: AgentConfig, gateway: &GatewayConfig) -> DiagnoseResult<Self> {
        let loader = audio_loader(&agent)?;
        let classifier: Arc<dyn ClassifierProvider> =
            Arc::new(PlaceholderClassifier::new(gateway.classifier_probabilities));

        let (model, transcriber): (Option<Arc<dyn ChatModel>>, Arc<dyn TranscriptionProvider>) =
            match agent.require_api_key() {
                Ok(key) => {
                    let transcriber = OpenAiTranscriber::new(
                        agent.api_base_url.clone(),
                        key,
                        agent.transcription_model.clone(),
                        agent.transcription_timeout(),
                    )
                    .map_err(|e| DiagnoseError::Config(e.to_string()))?;
                    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::from_config(&agent)?);
                    let transcriber: Arc<dyn TranscriptionProvider> = Arc::new(transcriber);
                    (Some(model), transcriber)
                }
                Err(e) => {
                    warn!(error = %e, "no API key; diagnosis requests will be rejected");
                    let transcriber: Arc<dyn TranscriptionProvider> =
                        Arc::new(PlaceholderTranscriber::new());
                    (None, transcriber)
                }
            };

        Ok(Self::new(agent, model, loader, transcriber, classifier))
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.model_name())
    }

    fn registry_for(&self, request: &DiagnosisRequest) -> ToolRegistry {
        let retriever = match &request.report_history {
            Some(history) => PlaceholderRetriever::with_history(history.clone()),
            None => PlaceholderRetriever::new(),
        };
        ToolRegistry::new(
            self.loader.clone(),
            Arc::clone(&self.transcriber),
            Arc::clone(&self.classifier),
            Arc::new(retriever),
        )
    }

    /// One full run: fresh orchestrator and registry, shared clients.
    pub async fn diagnose(&self, request: &DiagnosisRequest) -> DiagnoseResult<Value> {
        let model = self.model.clone().ok_or_else(|| {
            DiagnoseError::Config("no chat model: set NEURO_LLM_API_KEY or OPENAI_API_KEY".to_string())
        })?;
        let tools = Arc::new(self.registry_for(request));
        let mut orchestrator = Orchestrator::new(model, tools, &self.agent);
        orchestrator.diagnose(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loader_honours_audio_root_and_size_cap() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let inside_clip = root.path().join("call.wav");
        std::fs::write(&inside_clip, b"RIFF....WAVE").unwrap();
        let outside_clip = outside.path().join("other.wav");
        std::fs::write(&outside_clip, b"RIFF....WAVE").unwrap();

        let agent = AgentConfig {
            audio_root: Some(root.path().to_string_lossy().into_owned()),
            max_audio_bytes: Some(8),
            ..AgentConfig::default()
        };
        let loader = audio_loader(&agent).unwrap();
        let err = loader.load(&outside_clip.to_string_lossy()).await.unwrap_err();
        assert!(err.to_string().contains("outside"));
        let err = loader.load(&inside_clip.to_string_lossy()).await.unwrap_err();
        assert!(err.to_string().contains("byte limit"));

        let agent = AgentConfig {
            audio_root: Some(root.path().to_string_lossy().into_owned()),
            ..AgentConfig::default()
        };
        let clip = audio_loader(&agent).unwrap().load(&inside_clip.to_string_lossy()).await.unwrap();
        assert_eq!(clip.bytes, b"RIFF....WAVE");
    }

    #[test]
    fn missing_audio_root_is_config_error() {
        let agent = AgentConfig {
            audio_root: Some("/definitely/not/here".to_string()),
            ..AgentConfig::default()
        };
        assert_eq!(audio_loader(&agent).unwrap_err().kind(), "config_error");
    }
}
