//! Spoken-article generation
//!
//! Turns a post's Lexical rich-text document into a single WAV file:
//! extract the spoken text, split it into provider-sized chunks, synthesize
//! each chunk through the TTS client, concatenate the per-chunk WAV buffers
//! and hand the result to the storage backend.
//!
//! Chunks are synthesized strictly sequentially; if any chunk exhausts its
//! retries the whole job fails and nothing is stored.

pub mod chunker;
pub mod lexical;
pub mod pipeline;
pub mod tts;
pub mod wav;

pub use pipeline::{AudioOutcome, AudioPipeline, GeneratedAudio};
pub use tts::{HttpTtsClient, SpeechSynthesizer};

use thiserror::Error;

/// Errors from the audio generation pipeline
#[derive(Debug, Error)]
pub enum AudioError {
    /// The post has no spoken text to synthesize
    #[error("No spoken text to synthesize")]
    EmptyText,

    /// A buffer is not a PCM WAV file this pipeline can handle
    #[error("Invalid WAV data: {0}")]
    InvalidWav(String),

    /// Chunk buffers disagree on sample rate, channels or bit depth
    #[error("WAV format mismatch between chunks: {0}")]
    FormatMismatch(String),

    /// The request never produced an HTTP response (DNS, connect, timeout)
    #[error("Speech synthesis transport error: {0}")]
    Transport(String),

    /// The synthesis provider rejected the request
    #[error("Speech synthesis rejected (HTTP {status}): {message}")]
    SynthesisRejected { status: u16, message: String },

    /// All retry attempts for a chunk were exhausted
    #[error("Speech synthesis failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// The provider response could not be decoded
    #[error("Failed to decode synthesis response: {0}")]
    DecodeFailed(String),

    /// Storing the finished audio failed
    #[error("Failed to store audio: {0}")]
    StorageFailed(#[from] anyhow::Error),
}
