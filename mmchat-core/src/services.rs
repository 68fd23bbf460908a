//! Collaborators the session controller delegates to
//!
//! Model invocation, transcription, image understanding and PDF ingestion
//! all live behind these traits; `mmchat-providers` supplies the hosted
//! implementations.

use crate::session::Message;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Which chain answers a text turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    Normal,
    Pdf,
}

/// Runs a conversational chain over the active history
#[async_trait]
pub trait ChainRunner: Send + Sync {
    /// Answer `input` given the prior `history`
    async fn run(&self, mode: ChainMode, history: &[Message], input: &str)
        -> crate::Result<String>;
}

/// Ingests uploaded PDF documents for the pdf chain
#[async_trait]
pub trait PdfIndexer: Send + Sync {
    /// Ingest one upload batch
    async fn ingest(&self, files: &[Vec<u8>]) -> crate::Result<()>;
}

/// Speech-to-text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> crate::Result<String>;
}

/// Answers a question about an image
#[async_trait]
pub trait ImageAnswerer: Send + Sync {
    async fn answer(&self, image: &[u8], question: &str) -> crate::Result<String>;
}

/// Source of the current time for minting session keys
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
