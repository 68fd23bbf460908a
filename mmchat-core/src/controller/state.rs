//! Per-connection UI state

use crate::services::ChainMode;
use crate::session::{Message, SessionKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Single-use trigger armed by pressing Enter in the text field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLatch {
    #[default]
    Idle,
    Armed,
}

impl InputLatch {
    pub fn arm(&mut self) {
        *self = InputLatch::Armed;
    }

    /// Consume the latch, returning whether it was armed
    pub fn take(&mut self) -> bool {
        std::mem::take(self) == InputLatch::Armed
    }

    pub fn is_armed(&self) -> bool {
        *self == InputLatch::Armed
    }
}

/// Chat mode; once a PDF is uploaded the mode never returns to normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Normal,
    PdfSticky,
}

impl ChatMode {
    /// One-way transition into pdf mode
    pub fn enable_pdf(&mut self) {
        *self = ChatMode::PdfSticky;
    }

    pub fn chain_mode(&self) -> ChainMode {
        match self {
            ChatMode::Normal => ChainMode::Normal,
            ChatMode::PdfSticky => ChainMode::Pdf,
        }
    }
}

/// SHA-256 of an upload, used to recognise contents already processed
pub type UploadDigest = [u8; 32];

pub(crate) fn digest_of<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> UploadDigest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Transient state of one browser connection, reset on reload
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Session shown as selected in the selector
    pub selected_session_key: SessionKey,
    /// Key minted for the sentinel by the last flush, consumed next cycle
    pub pending_new_session_key: Option<SessionKey>,
    /// Enter-key trigger
    pub latch: InputLatch,
    /// The "submitted question" slot
    pub pending_user_text: String,
    /// What the text field currently shows
    pub input_field: String,
    pub chat_mode: ChatMode,
    /// Active history in conversation order
    pub history: Vec<Message>,
    /// History holds appended turns that are not yet on disk
    pub dirty: bool,
    pub(crate) last_audio: Option<UploadDigest>,
    pub(crate) last_pdf_batch: Option<UploadDigest>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text field value changed
    pub fn edit(&mut self, text: impl Into<String>) {
        self.input_field = text.into();
    }

    /// Enter pressed in the text field
    pub fn press_enter(&mut self) {
        self.latch.arm();
        self.capture_input();
    }

    /// Send button clicked
    pub fn press_send(&mut self) {
        self.capture_input();
    }

    /// Move the field value into the question slot unless a question is
    /// already waiting, then clear the field
    fn capture_input(&mut self) {
        if self.pending_user_text.is_empty() {
            self.pending_user_text = std::mem::take(&mut self.input_field);
        } else {
            self.input_field.clear();
        }
    }

    /// Append one human/assistant turn
    pub(crate) fn push_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.history.push(Message::human(question));
        self.history.push(Message::assistant(answer));
        self.dirty = true;
    }

    /// Point the selector at `key` with the given history
    pub(crate) fn activate(&mut self, key: SessionKey, history: Vec<Message>) {
        self.selected_session_key = key;
        self.history = history;
        self.dirty = false;
    }
}
