//! Conversational chains backed by a chat completion model

use async_trait::async_trait;
use mmchat_core::services::{ChainMode, ChainRunner};
use mmchat_core::session;
use std::sync::Arc;
use tracing::debug;

use crate::base::Message;
use crate::client::ChatClient;
use crate::pdf::PdfIndex;

const NORMAL_PROMPT: &str = "You are a helpful, concise assistant. Answer the user's latest \
message, taking the conversation so far into account.";

const PDF_PROMPT: &str = "You are a helpful assistant answering questions about documents the \
user uploaded. Base your answer on the excerpts below. If they do not contain the answer, say so \
instead of guessing.";

/// Runs the normal chain, or the pdf chain with retrieved document context
pub struct LlmChainRunner {
    client: ChatClient,
    index: Option<Arc<PdfIndex>>,
    top_k: usize,
}

impl LlmChainRunner {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            index: None,
            top_k: 3,
        }
    }

    /// Draw pdf-mode context from `index`, `top_k` chunks per question
    pub fn with_pdf_index(mut self, index: Arc<PdfIndex>, top_k: usize) -> Self {
        self.index = Some(index);
        self.top_k = top_k;
        self
    }

    fn system_prompt(&self, mode: ChainMode, input: &str) -> String {
        match mode {
            ChainMode::Normal => NORMAL_PROMPT.to_string(),
            ChainMode::Pdf => {
                let excerpts = self
                    .index
                    .as_ref()
                    .map(|index| index.retrieve(input, self.top_k))
                    .unwrap_or_default();
                debug!("Retrieved {} pdf excerpts", excerpts.len());

                let mut prompt = String::from(PDF_PROMPT);
                prompt.push_str("\n\nExcerpts:");
                if excerpts.is_empty() {
                    prompt.push_str("\n(none found)");
                }
                for (i, chunk) in excerpts.iter().enumerate() {
                    prompt.push_str(&format!("\n[{}] {}", i + 1, chunk.text));
                }
                prompt
            }
        }
    }

    /// Full message list sent for one turn
    pub fn build_messages(
        &self,
        mode: ChainMode,
        history: &[session::Message],
        input: &str,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt(mode, input)));
        messages.extend(history.iter().map(Message::from));
        messages.push(Message::user(input));
        messages
    }
}

#[async_trait]
impl ChainRunner for LlmChainRunner {
    async fn run(
        &self,
        mode: ChainMode,
        history: &[session::Message],
        input: &str,
    ) -> mmchat_core::Result<String> {
        let messages = self.build_messages(mode, history, input);
        Ok(self.client.complete(&messages).await?)
    }
}
