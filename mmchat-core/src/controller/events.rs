//! UI events gathered into one render cycle, and what a cycle renders

use super::state::{ChatMode, UiState};
use crate::session::{Message, SessionKey, SessionRegistry};
use serde::{Deserialize, Serialize};

/// Text field and Send button interactions, applied in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum InputEvent {
    /// Field value changed
    Edit(String),
    /// Enter pressed in the field
    Enter,
    /// Send button clicked
    Send,
}

/// Everything the user did since the previous cycle
#[derive(Debug, Clone, Default)]
pub struct Cycle {
    /// Selector changed to this session
    pub select: Option<SessionKey>,
    pub input: Vec<InputEvent>,
    /// PDF chat toggle switched on
    pub enable_pdf_chat: bool,
    /// Current contents of the PDF uploader
    pub pdfs: Vec<Vec<u8>>,
    /// Current contents of the audio uploader
    pub audio: Option<Vec<u8>>,
    /// Current contents of the image uploader
    pub image: Option<Vec<u8>>,
}

impl Cycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, key: SessionKey) -> Self {
        self.select = Some(key);
        self
    }

    /// Type `text` and press Enter
    pub fn enter_text(mut self, text: impl Into<String>) -> Self {
        self.input.push(InputEvent::Edit(text.into()));
        self.input.push(InputEvent::Enter);
        self
    }

    pub fn event(mut self, event: InputEvent) -> Self {
        self.input.push(event);
        self
    }

    pub fn send(self) -> Self {
        self.event(InputEvent::Send)
    }

    pub fn with_pdfs(mut self, pdfs: Vec<Vec<u8>>) -> Self {
        self.pdfs = pdfs;
        self
    }

    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn enable_pdf_chat(mut self) -> Self {
        self.enable_pdf_chat = true;
        self
    }

    pub(crate) fn send_clicked(&self) -> bool {
        self.input.iter().any(|e| matches!(e, InputEvent::Send))
    }
}

/// What the UI shows after a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleView {
    /// Selector options, `new_session` first
    pub sessions: Vec<SessionKey>,
    pub selected: SessionKey,
    pub selected_index: usize,
    pub mode: ChatMode,
    pub input_field: String,
    /// Most recent message first
    pub messages: Vec<Message>,
}

impl CycleView {
    /// Fails when the selected session is not in `registry`, since the
    /// selector would otherwise point at the wrong entry
    pub(crate) fn render(registry: SessionRegistry, state: &UiState) -> crate::Result<Self> {
        let selected = &state.selected_session_key;
        let selected_index = registry.index_of(selected).ok_or_else(|| {
            crate::Error::NotFound(format!("session {} is not listed", selected))
        })?;
        Ok(Self {
            sessions: registry.into_keys(),
            selected: state.selected_session_key.clone(),
            selected_index,
            mode: state.chat_mode,
            input_field: state.input_field.clone(),
            messages: state.history.iter().rev().cloned().collect(),
        })
    }
}
