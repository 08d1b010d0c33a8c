pub mod assemblyai;

use crate::error::TranscriptionResult;
use crate::transcription::Transcript;
use async_trait::async_trait;

/// Speech-to-text backend used by the consultation upload flow
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Turn raw audio bytes into transcript text. A job is submitted once;
    /// only the status check is repeated.
    async fn transcribe(&self, audio: Vec<u8>) -> TranscriptionResult<Transcript>;

    fn name(&self) -> &'static str;
}
