//! Spoken-article pipeline and lifecycle
//!
//! `generate` runs the full extract → chunk → synthesize → concatenate →
//! store pipeline for one document. `sync` wraps it with change detection:
//! the spoken text is fingerprinted and audio is only regenerated when the
//! fingerprint differs from the one stored with the post.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::chunker::chunk_text;
use super::lexical::extract_text;
use super::tts::SpeechSynthesizer;
use super::{wav, AudioError};
use crate::storage::DynMediaStorage;

/// Subdirectory generated audio lands in under the storage root
const AUDIO_SUBDIR: &str = "audio";

/// A freshly generated audio file and the fingerprint it was built from
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    /// Public URL of the stored WAV file
    pub url: String,
    /// Fingerprint of the spoken text the audio was synthesized from
    pub content_hash: String,
}

/// Result of syncing a post's audio against its current content
#[derive(Debug)]
pub enum AudioOutcome {
    /// Spoken text unchanged, existing audio still valid
    Unchanged,
    /// Audio was (re)generated
    Updated(GeneratedAudio),
    /// Content no longer has spoken text; any stored audio was purged
    Purged,
}

/// Fingerprint of the spoken text, used to detect content changes
pub fn fingerprint(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

pub struct AudioPipeline {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    storage: DynMediaStorage,
    chunk_limit: usize,
}

impl AudioPipeline {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        storage: DynMediaStorage,
        chunk_limit: usize,
    ) -> Self {
        Self {
            synthesizer,
            storage,
            chunk_limit,
        }
    }

    /// Generate a spoken WAV file for a Lexical document and store it.
    ///
    /// Chunks are synthesized strictly in order; the next chunk is only
    /// requested after the previous one resolves. Any chunk failure aborts
    /// the job and nothing is stored.
    pub async fn generate(&self, content: &Value) -> Result<GeneratedAudio, AudioError> {
        let text = extract_text(content);
        if text.is_empty() {
            return Err(AudioError::EmptyText);
        }

        let hash = fingerprint(&text);
        let chunks = chunk_text(&text, self.chunk_limit);

        let mut buffers = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            info!(
                chunk = index + 1,
                total = chunks.len(),
                chars = chunk.chars().count(),
                "synthesizing chunk"
            );
            buffers.push(self.synthesizer.synthesize(chunk).await?);
        }

        let merged = wav::concat(&buffers)?;
        let stored = self.storage.put(AUDIO_SUBDIR, "wav", &merged).await?;

        info!(url = %stored.url, bytes = merged.len(), "stored generated audio");

        Ok(GeneratedAudio {
            url: stored.url,
            content_hash: hash,
        })
    }

    /// Bring a post's audio in line with its current content.
    ///
    /// `current_hash` and `current_url` are the values stored with the post.
    /// Audio is regenerated only when the spoken-text fingerprint changed;
    /// stale files are deleted best-effort, a failed delete is logged and
    /// never blocks the post write.
    pub async fn sync(
        &self,
        content: &Value,
        current_hash: Option<&str>,
        current_url: Option<&str>,
    ) -> Result<AudioOutcome, AudioError> {
        let text = extract_text(content);

        if text.is_empty() {
            if let Some(url) = current_url {
                self.purge(url).await;
                return Ok(AudioOutcome::Purged);
            }
            return Ok(AudioOutcome::Unchanged);
        }

        let hash = fingerprint(&text);
        if current_hash == Some(hash.as_str()) && current_url.is_some() {
            return Ok(AudioOutcome::Unchanged);
        }

        let generated = self.generate(content).await?;

        if let Some(url) = current_url {
            if url != generated.url {
                self.purge(url).await;
            }
        }

        Ok(AudioOutcome::Updated(generated))
    }

    /// Delete a stored audio file, logging failures instead of propagating
    /// them.
    pub async fn purge(&self, url: &str) {
        if let Err(e) = self.storage.delete(url).await {
            warn!(url = %url, error = %e, "failed to delete stale audio file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Synthesizer that returns a fixed-format WAV per call and counts calls
    struct FakeSynthesizer {
        calls: AtomicU32,
        fail_after: Option<u32>,
    }

    impl FakeSynthesizer {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_after: None,
            }
        }

        fn failing_after(n: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_after: Some(n),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = self.fail_after {
                if call >= limit {
                    return Err(AudioError::RetriesExhausted {
                        attempts: 3,
                        source: anyhow::anyhow!("synthesis unavailable"),
                    });
                }
            }

            // One 16-bit sample per character of input
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 16000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut cursor = Cursor::new(Vec::new());
            {
                let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
                for _ in text.chars() {
                    writer.write_sample(1i16).unwrap();
                }
                writer.finalize().unwrap();
            }
            Ok(cursor.into_inner())
        }
    }

    fn doc(text: &str) -> Value {
        json!({
            "root": {
                "type": "root",
                "children": [
                    {"type": "paragraph", "children": [{"type": "text", "text": text}]}
                ]
            }
        })
    }

    fn pipeline_with(
        synth: Arc<FakeSynthesizer>,
        dir: &TempDir,
        chunk_limit: usize,
    ) -> AudioPipeline {
        let storage = LocalStorage::boxed(dir.path(), "http://localhost/uploads");
        AudioPipeline::new(synth, storage, chunk_limit)
    }

    #[tokio::test]
    async fn generates_one_call_per_chunk() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(FakeSynthesizer::new());
        let pipeline = pipeline_with(synth.clone(), &dir, 20);

        let content = doc("First sentence here. Second sentence here. Third sentence here.");
        let generated = pipeline.generate(&content).await.unwrap();

        assert!(synth.call_count() > 1);
        assert!(generated.url.starts_with("http://localhost/uploads/audio/"));
        assert!(generated.url.ends_with(".wav"));
        assert_eq!(generated.content_hash.len(), 32);
    }

    #[tokio::test]
    async fn stored_file_is_valid_concatenated_wav() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(FakeSynthesizer::new());
        let pipeline = pipeline_with(synth.clone(), &dir, 10);

        let content = doc("one two three four five six");
        let generated = pipeline.generate(&content).await.unwrap();

        let filename = generated.url.rsplit('/').next().unwrap();
        let path = dir.path().join("audio").join(filename);
        let data = std::fs::read(path).unwrap();

        let parsed = crate::audio::wav::parse_header(&data).unwrap();
        assert_eq!(parsed.format.sample_rate, 16000);
        assert_eq!(data.len(), crate::audio::wav::HEADER_SIZE + parsed.data_len);
    }

    #[tokio::test]
    async fn empty_document_is_rejected() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline_with(Arc::new(FakeSynthesizer::new()), &dir, 100);

        let content = json!({"root": {"type": "root", "children": []}});
        assert!(matches!(
            pipeline.generate(&content).await,
            Err(AudioError::EmptyText)
        ));
    }

    #[tokio::test]
    async fn chunk_failure_aborts_and_stores_nothing() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(FakeSynthesizer::failing_after(1));
        let pipeline = pipeline_with(synth.clone(), &dir, 10);

        let content = doc("one two three four five six seven eight");
        let result = pipeline.generate(&content).await;

        assert!(matches!(result, Err(AudioError::RetriesExhausted { .. })));
        // First chunk succeeded, second failed, no further calls
        assert_eq!(synth.call_count(), 2);
        assert!(!dir.path().join("audio").exists());
    }

    #[tokio::test]
    async fn sync_skips_when_fingerprint_unchanged() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(FakeSynthesizer::new());
        let pipeline = pipeline_with(synth.clone(), &dir, 100);

        let content = doc("Stable text.");
        let generated = pipeline.generate(&content).await.unwrap();
        let calls_after_generate = synth.call_count();

        let outcome = pipeline
            .sync(
                &content,
                Some(&generated.content_hash),
                Some(&generated.url),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, AudioOutcome::Unchanged));
        assert_eq!(synth.call_count(), calls_after_generate);
    }

    #[tokio::test]
    async fn sync_regenerates_and_purges_stale_audio() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(FakeSynthesizer::new());
        let pipeline = pipeline_with(synth.clone(), &dir, 100);

        let old = pipeline.generate(&doc("Old text.")).await.unwrap();
        let old_filename = old.url.rsplit('/').next().unwrap().to_string();

        let outcome = pipeline
            .sync(&doc("New text."), Some(&old.content_hash), Some(&old.url))
            .await
            .unwrap();

        let generated = match outcome {
            AudioOutcome::Updated(g) => g,
            other => panic!("expected regeneration, got {:?}", other),
        };
        assert_ne!(generated.content_hash, old.content_hash);
        assert!(!dir.path().join("audio").join(&old_filename).exists());
    }

    #[tokio::test]
    async fn sync_purges_when_content_emptied() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(FakeSynthesizer::new());
        let pipeline = pipeline_with(synth.clone(), &dir, 100);

        let old = pipeline.generate(&doc("Some text.")).await.unwrap();
        let filename = old.url.rsplit('/').next().unwrap().to_string();

        let empty = json!({"root": {"type": "root", "children": []}});
        let outcome = pipeline
            .sync(&empty, Some(&old.content_hash), Some(&old.url))
            .await
            .unwrap();

        assert!(matches!(outcome, AudioOutcome::Purged));
        assert!(!dir.path().join("audio").join(&filename).exists());
    }

    #[tokio::test]
    async fn sync_survives_failed_stale_delete() {
        let dir = TempDir::new().unwrap();
        let synth = Arc::new(FakeSynthesizer::new());
        let pipeline = pipeline_with(synth.clone(), &dir, 100);

        // A URL the storage never issued: delete fails, sync continues
        let outcome = pipeline
            .sync(
                &doc("Fresh text."),
                Some("0123456789abcdef0123456789abcdef"),
                Some("http://localhost/uploads/audio/missing.wav"),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, AudioOutcome::Updated(_)));
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        assert_eq!(fingerprint("hello"), fingerprint("hello"));
        assert_ne!(fingerprint("hello"), fingerprint("hello!"));
        assert_eq!(fingerprint("hello").len(), 32);
    }
}
