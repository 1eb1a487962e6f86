//! # neuro-voice - audio providers for neuro screening
//!
//! Resolves an audio reference (local path or http(s) URL) into bytes and hands them to the
//! transcription and classification backends.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  locator ──▶ AudioLoader ──▶ AudioClip               │
//! │                               │                      │
//! │              ┌────────────────┴───────────────┐      │
//! │              ▼                                ▼      │
//! │   TranscriptionProvider            ClassifierProvider│
//! │   (diarized transcript)   [stroke, degenerative, normal]
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod classifier;
pub mod error;
pub mod stt;

pub use audio::{mime_for, AudioClip, AudioLoader, AudioRef, DEFAULT_MAX_AUDIO_BYTES};
pub use classifier::{ClassifierProvider, NeuroProbabilities, PlaceholderClassifier};
pub use error::{VoiceError, VoiceResult};
pub use stt::{OpenAiTranscriber, PlaceholderTranscriber, TranscriptionProvider};
