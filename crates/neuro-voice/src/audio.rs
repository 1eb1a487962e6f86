//! Audio references: resolve a locator (local path or http(s) URL) into bytes for one call.
//!
//! A clip is owned by the tool call that loaded it and dropped when the call returns; the
//! underlying file handle or HTTP response is never held past `load`.

use crate::error::{VoiceError, VoiceResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Upload limit of the OpenAI transcription endpoint.
pub const DEFAULT_MAX_AUDIO_BYTES: u64 = 25 * 1024 * 1024;

/// Locator for a single audio resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioRef {
    Local(String),
    Remote(String),
}

impl AudioRef {
    /// Classify a locator. Blank locators are rejected.
    pub fn parse(locator: &str) -> VoiceResult<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(VoiceError::AudioRef("empty audio locator".to_string()));
        }
        let lower = locator.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(AudioRef::Remote(locator.to_string()))
        } else {
            Ok(AudioRef::Local(locator.to_string()))
        }
    }

    pub fn locator(&self) -> &str {
        match self {
            AudioRef::Local(s) | AudioRef::Remote(s) => s,
        }
    }

    /// Last path segment without query string, or `audio.wav` when there is none.
    pub fn file_name(&self) -> String {
        let path = match self {
            AudioRef::Local(p) => p.as_str(),
            AudioRef::Remote(url) => url.split(['?', '#']).next().unwrap_or(url),
        };
        path.rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("audio.wav")
            .to_string()
    }
}

/// Audio bytes plus the name and MIME type used for upload.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_for(&file_name);
        Self {
            file_name,
            mime,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// MIME type from the file extension; unknown extensions upload as octet-stream.
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" | "mpga" | "mpeg" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "webm" => "audio/webm",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Loads audio references. Cheap to clone; the HTTP client is shared.
///
/// Every resource is capped at `max_bytes`. With an allowed root set, local paths must
/// resolve (symlinks and `..` included) to a file under that directory.
#[derive(Debug, Clone)]
pub struct AudioLoader {
    client: reqwest::Client,
    max_bytes: u64,
    allowed_root: Option<PathBuf>,
}

impl AudioLoader {
    pub fn new(timeout: Duration) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Config(format!("HTTP client build failed: {}", e)))?;
        Ok(Self {
            client,
            max_bytes: DEFAULT_MAX_AUDIO_BYTES,
            allowed_root: None,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Restrict local paths to `root`, which must exist.
    pub fn with_allowed_root(mut self, root: impl AsRef<Path>) -> VoiceResult<Self> {
        let root = root.as_ref();
        let canonical = std::fs::canonicalize(root).map_err(|e| {
            VoiceError::Config(format!("audio root {} unusable: {}", root.display(), e))
        })?;
        self.allowed_root = Some(canonical);
        Ok(self)
    }

    /// Resolve and read the whole resource. Empty resources are an error.
    pub async fn load(&self, locator: &str) -> VoiceResult<AudioClip> {
        let audio_ref = AudioRef::parse(locator)?;
        let bytes = match &audio_ref {
            AudioRef::Local(path) => self.read_local(path).await?,
            AudioRef::Remote(url) => self.fetch(url).await?,
        };
        if bytes.is_empty() {
            return Err(VoiceError::AudioRef(format!(
                "audio '{}' is empty",
                audio_ref.locator()
            )));
        }
        debug!(locator = audio_ref.locator(), bytes = bytes.len(), "audio loaded");
        Ok(AudioClip::new(audio_ref.file_name(), bytes))
    }

    async fn read_local(&self, path: &str) -> VoiceResult<Vec<u8>> {
        let open_err = |e: std::io::Error| {
            VoiceError::AudioRef(format!("cannot open audio '{}': {}", path, e))
        };
        let resolved = tokio::fs::canonicalize(path).await.map_err(open_err)?;
        if let Some(root) = &self.allowed_root {
            if !resolved.starts_with(root) {
                warn!(path, root = %root.display(), "audio path outside allowed root");
                return Err(VoiceError::AudioRef(format!(
                    "audio '{}' is outside the allowed audio directory",
                    path
                )));
            }
        }
        let size = tokio::fs::metadata(&resolved).await.map_err(open_err)?.len();
        if size > self.max_bytes {
            return Err(self.too_large(path, size));
        }
        tokio::fs::read(&resolved).await.map_err(open_err)
    }

    async fn fetch(&self, url: &str) -> VoiceResult<Vec<u8>> {
        let mut res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VoiceError::Fetch(format!("GET {} failed: {}", url, e)))?;
        if !res.status().is_success() {
            return Err(VoiceError::Fetch(format!("GET {} returned {}", url, res.status())));
        }
        if let Some(declared) = res.content_length().filter(|n| *n > self.max_bytes) {
            return Err(self.too_large(url, declared));
        }
        // Content-Length may be absent or wrong; count what actually arrives.
        let mut bytes = Vec::new();
        while let Some(chunk) = res
            .chunk()
            .await
            .map_err(|e| VoiceError::Fetch(format!("reading {} failed: {}", url, e)))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() as u64 > self.max_bytes {
                return Err(self.too_large(url, bytes.len() as u64));
            }
        }
        Ok(bytes)
    }

    fn too_large(&self, locator: &str, size: u64) -> VoiceError {
        VoiceError::AudioRef(format!(
            "audio '{}' is {} bytes, over the {} byte limit",
            locator, size, self.max_bytes
        ))
    }
}
