//! Hosted model collaborators for mmchat
//!
//! Implements the service traits of `mmchat-core` on top of
//! OpenAI-compatible endpoints: the normal and pdf conversation chains,
//! Whisper transcription, image question answering and a local PDF chunk
//! index.

pub mod base;
pub mod chain;
pub mod client;
pub mod pdf;
pub mod transcription;
pub mod vision;

pub use base::{ContentPart, Message, MessageContent, ProviderError, ProviderResult};
pub use chain::LlmChainRunner;
pub use client::ChatClient;
pub use pdf::{Chunk, PdfIndex};
pub use transcription::{TranscriptionError, TranscriptionService};
pub use vision::VisionClient;

use mmchat_core::config::Config;
use mmchat_core::Collaborators;
use std::sync::Arc;
use tracing::{info, warn};

/// Build every collaborator the controller needs from `config`
pub fn build_collaborators(config: &Config) -> ProviderResult<Collaborators> {
    let chat = &config.providers.chat;
    let vision = &config.providers.vision;
    let transcription = &config.providers.transcription;

    let index = Arc::new(PdfIndex::open(
        &config.pdf.index_path,
        config.pdf.chunk_size,
        config.pdf.chunk_overlap,
    )?);
    info!(
        "PDF index at {} holds {} chunks",
        config.pdf.index_path,
        index.len()
    );

    let chain_client = ChatClient::new(&chat.api_base, non_empty(&chat.api_key), &chat.model)
        .with_max_tokens(chat.max_tokens)
        .with_temperature(chat.temperature);
    let chain = LlmChainRunner::new(chain_client).with_pdf_index(index.clone(), config.pdf.top_k);

    let vision_client =
        ChatClient::new(&vision.api_base, non_empty(&vision.api_key), &vision.model)
            .with_max_tokens(vision.max_tokens);

    let transcriber = TranscriptionService::with_settings(
        non_empty(&transcription.api_key),
        transcription.api_url.clone(),
        transcription.model.clone(),
    );
    if !transcriber.is_configured() {
        warn!("No transcription API key configured; audio turns will fail");
    }

    Ok(Collaborators {
        chain: Arc::new(chain),
        transcriber: Arc::new(transcriber),
        images: Arc::new(VisionClient::new(vision_client)),
        pdfs: index,
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
