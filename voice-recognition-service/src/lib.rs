//! Speech-to-text for consultation recordings.
//!
//! Audio captured during a consultation is sent to AssemblyAI in three
//! steps: the raw bytes are uploaded, a transcription job is submitted for
//! the returned URL, and the job is polled at a fixed interval until it
//! completes, errors, or the attempt budget runs out.
//!
//! ```text
//! upload ──► submit ──► poll ─┬─ queued / processing ──► sleep, poll again
//!                             ├─ completed ──────────► Transcript
//!                             ├─ error ──────────────► ProviderReportedError
//!                             └─ attempts exhausted ─► Timeout
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use voice_recognition_service::{AssemblyAiClient, AssemblyAiConfig, TranscriptionProvider};
//!
//! # async fn example(audio: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = AssemblyAiClient::new(AssemblyAiConfig::from_env()?)?;
//! let transcript = client.transcribe(audio).await?;
//! println!("Transcription: {}", transcript.text);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod providers;
pub mod transcription;

pub use config::*;
pub use error::*;
pub use providers::assemblyai::AssemblyAiClient;
pub use providers::TranscriptionProvider;
pub use transcription::{JobStatus, Transcript};
