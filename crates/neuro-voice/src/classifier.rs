//! Neuro-status classification: stroke / degenerative / normal probabilities for a clip.
//!
//! The trained model is an external capability; this module defines the seam and a
//! fixed-output placeholder for wiring and tests.

use crate::audio::AudioClip;
use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};

/// Class probabilities in `[stroke, degenerative, normal]` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeuroProbabilities {
    pub stroke: f64,
    pub degenerative: f64,
    pub normal: f64,
}

impl NeuroProbabilities {
    pub fn new(stroke: f64, degenerative: f64, normal: f64) -> Self {
        Self {
            stroke,
            degenerative,
            normal,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.stroke, self.degenerative, self.normal]
    }

    /// Reject non-finite or out-of-range values. The sum is not normalized here.
    pub fn checked(self) -> VoiceResult<Self> {
        if self
            .as_array()
            .iter()
            .all(|p| p.is_finite() && (0.0..=1.0).contains(p))
        {
            Ok(self)
        } else {
            Err(VoiceError::Classifier(format!(
                "probabilities out of range: {:?}",
                self.as_array()
            )))
        }
    }
}

impl From<[f64; 3]> for NeuroProbabilities {
    fn from(p: [f64; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

/// Backend that scores a whole clip.
#[async_trait::async_trait]
pub trait ClassifierProvider: Send + Sync {
    async fn classify(&self, clip: &AudioClip) -> VoiceResult<NeuroProbabilities>;
}

/// Returns the same probabilities for every clip.
#[derive(Debug, Clone)]
pub struct PlaceholderClassifier {
    probabilities: NeuroProbabilities,
}

impl PlaceholderClassifier {
    pub fn new(probabilities: impl Into<NeuroProbabilities>) -> Self {
        Self {
            probabilities: probabilities.into(),
        }
    }
}

impl Default for PlaceholderClassifier {
    fn default() -> Self {
        Self::new([0.1, 0.1, 0.8])
    }
}

#[async_trait::async_trait]
impl ClassifierProvider for PlaceholderClassifier {
    async fn classify(&self, clip: &AudioClip) -> VoiceResult<NeuroProbabilities> {
        if clip.is_empty() {
            return Err(VoiceError::Classifier("empty clip".to_string()));
        }
        self.probabilities.checked()
    }
}
