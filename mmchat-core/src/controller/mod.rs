//! Session controller: turns one render cycle of UI events into at most one
//! coherent update of the active history, then flushes it.
//!
//! A cycle runs its steps in a fixed order: pending-rename reconciliation,
//! selection (or a re-read of the selected file), text field events, PDF
//! ingestion, audio turn, image turn, text turn, flush.

pub mod events;
pub mod state;

pub use events::{Cycle, CycleView, InputEvent};
pub use state::{ChatMode, InputLatch, UiState};

use crate::services::{ChainRunner, Clock, ImageAnswerer, PdfIndexer, SystemClock, Transcriber};
use crate::session::{HistoryStore, SessionKey, SessionRegistry};
use crate::utils::truncate;
use state::digest_of;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// External services a controller delegates to
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainRunner>,
    pub transcriber: Arc<dyn Transcriber>,
    pub images: Arc<dyn ImageAnswerer>,
    pub pdfs: Arc<dyn PdfIndexer>,
}

/// Drives the session lifecycle for any number of [`UiState`]s
pub struct SessionController {
    store: Arc<dyn HistoryStore>,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
}

impl SessionController {
    /// Create a controller over a history store
    pub fn new(store: Arc<dyn HistoryStore>, collaborators: Collaborators) -> Self {
        Self {
            store,
            collaborators,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to mint session keys
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &dyn HistoryStore {
        self.store.as_ref()
    }

    /// `new_session` followed by the persisted sessions in storage order
    pub fn list_sessions(&self) -> crate::Result<SessionRegistry> {
        SessionRegistry::load(self.store.as_ref())
    }

    /// Make `key` the active session. Selecting a session whose file is
    /// missing or unreadable falls back to an empty `new_session`, so the
    /// unreadable file is never overwritten.
    ///
    /// Unsaved turns of the session being left get one more save attempt
    /// before they are replaced.
    pub fn select_session(&self, state: &mut UiState, key: SessionKey) -> crate::Result<()> {
        if state.dirty {
            if let Err(e) = self.flush(state) {
                warn!(
                    "Discarding {} unsaved message(s) of {}: {}",
                    state.history.len(),
                    state.selected_session_key,
                    e
                );
            }
        }

        if key.is_new() {
            info!("Selected new session");
            state.activate(SessionKey::New, Vec::new());
            return Ok(());
        }

        match self.store.load(&key) {
            Ok(history) => {
                info!("Selected session {} ({} messages)", key, history.len());
                state.activate(key, history);
                Ok(())
            }
            Err(e) => {
                error!("Failed to load session {}: {}", key, e);
                state.activate(SessionKey::New, Vec::new());
                Err(e)
            }
        }
    }

    /// Re-read the selected session from storage. A file deleted or broken
    /// since selection drops back to `new_session` rather than being
    /// written again.
    pub fn refresh_selected(&self, state: &mut UiState) -> crate::Result<()> {
        let key = state.selected_session_key.clone();
        if key.is_new() {
            return Ok(());
        }
        match self.store.load(&key) {
            Ok(history) => {
                state.history = history;
                Ok(())
            }
            Err(e) => {
                error!("Selected session {} is no longer readable: {}", key, e);
                state.activate(SessionKey::New, Vec::new());
                Err(e)
            }
        }
    }

    /// Follow the key minted by the previous cycle's flush. Returns the key
    /// switched to, if any.
    pub fn reconcile_pending_rename(&self, state: &mut UiState) -> Option<SessionKey> {
        let key = state.pending_new_session_key.take()?;
        if !state.selected_session_key.is_new() {
            debug!("Dropping pending rename to {}: selection moved on", key);
            return None;
        }
        info!("New session persisted as {}", key);
        state.selected_session_key = key.clone();
        Some(key)
    }

    /// Run the chain on `text` and append the turn. Empty text is a no-op.
    pub async fn submit_text(&self, state: &mut UiState, text: &str) -> crate::Result<bool> {
        if text.is_empty() {
            return Ok(false);
        }
        let mode = state.chat_mode.chain_mode();
        debug!("Running {:?} chain for: {}", mode, truncate(text, 80));
        let answer = self
            .collaborators
            .chain
            .run(mode, &state.history, text)
            .await?;
        state.push_turn(text, answer);
        Ok(true)
    }

    /// Ask the image collaborator about `image` and append the turn
    pub async fn submit_image(
        &self,
        state: &mut UiState,
        image: &[u8],
        question: &str,
    ) -> crate::Result<()> {
        debug!("Answering image question ({} bytes)", image.len());
        let answer = self.collaborators.images.answer(image, question).await?;
        state.push_turn(question, answer);
        Ok(())
    }

    /// Transcribe a newly arrived clip and submit it as text. A clip already
    /// processed by this connection is ignored.
    pub async fn submit_audio(&self, state: &mut UiState, audio: &[u8]) -> crate::Result<bool> {
        let digest = digest_of([audio]);
        if state.last_audio == Some(digest) {
            return Ok(false);
        }
        state.last_audio = Some(digest);

        let transcript = self.collaborators.transcriber.transcribe(audio).await?;
        debug!("Transcribed audio: {}", truncate(&transcript, 80));
        if transcript.trim().is_empty() {
            warn!("Transcription produced no text");
            return Ok(false);
        }
        self.submit_text(state, &transcript).await
    }

    /// Ingest a newly uploaded PDF batch and switch to pdf mode for good
    pub async fn ingest_pdfs(&self, state: &mut UiState, files: &[Vec<u8>]) -> crate::Result<bool> {
        if files.is_empty() {
            return Ok(false);
        }
        let digest = digest_of(files.iter().map(Vec::as_slice));
        if state.last_pdf_batch == Some(digest) {
            return Ok(false);
        }
        state.last_pdf_batch = Some(digest);
        state.chat_mode.enable_pdf();

        info!("Ingesting {} pdf file(s)", files.len());
        self.collaborators.pdfs.ingest(files).await?;
        Ok(true)
    }

    /// Persist the active history. The sentinel gets a freshly minted key,
    /// which is returned and followed on the next cycle.
    pub fn flush(&self, state: &mut UiState) -> crate::Result<Option<SessionKey>> {
        if state.history.is_empty() {
            return Ok(None);
        }

        if state.selected_session_key.is_new() {
            let key = SessionKey::mint_unique(self.clock.now(), |k| self.store.exists(k));
            self.store.save(&key, &state.history)?;
            info!("Saved new session as {}", key);
            state.pending_new_session_key = Some(key.clone());
            state.dirty = false;
            return Ok(Some(key));
        }

        self.store
            .save(&state.selected_session_key, &state.history)?;
        debug!("Saved session {}", state.selected_session_key);
        state.dirty = false;
        Ok(None)
    }

    /// Process one render cycle and return what to display
    pub async fn run_cycle(&self, state: &mut UiState, cycle: Cycle) -> crate::Result<CycleView> {
        self.reconcile_pending_rename(state);
        if state.selected_session_key.is_new() && !state.history.is_empty() {
            // unflushed sentinel turns from an aborted cycle
            state.history.clear();
            state.dirty = false;
        }

        if let Err(e) = self.apply_events(state, &cycle).await {
            if state.dirty {
                if let Err(flush_err) = self.flush(state) {
                    warn!("Flush after failed cycle also failed: {}", flush_err);
                }
            }
            return Err(e);
        }

        if state.dirty {
            self.flush(state)?;
        }

        let registry = self.list_sessions()?;
        CycleView::render(registry, state)
    }

    async fn apply_events(&self, state: &mut UiState, cycle: &Cycle) -> crate::Result<()> {
        match &cycle.select {
            Some(key) if *key != state.selected_session_key => {
                self.select_session(state, key.clone())?;
            }
            // unsaved turns stay in memory until a flush succeeds
            _ if !state.dirty => self.refresh_selected(state)?,
            _ => {}
        }

        for event in &cycle.input {
            match event {
                InputEvent::Edit(text) => state.edit(text.clone()),
                InputEvent::Enter => state.press_enter(),
                InputEvent::Send => state.press_send(),
            }
        }

        if cycle.enable_pdf_chat {
            state.chat_mode.enable_pdf();
        }
        self.ingest_pdfs(state, &cycle.pdfs).await?;

        if let Some(audio) = &cycle.audio {
            self.submit_audio(state, audio).await?;
        }

        let armed = state.latch.take();
        if armed || cycle.send_clicked() {
            let question = std::mem::take(&mut state.pending_user_text);
            if let Some(image) = &cycle.image {
                self.submit_image(state, image, &question).await?;
            }
            self.submit_text(state, &question).await?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ChainMode;
    use crate::session::{JsonDirStore, Message};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Echo;

    #[async_trait]
    impl ChainRunner for Echo {
        async fn run(
            &self,
            mode: ChainMode,
            history: &[Message],
            input: &str,
        ) -> crate::Result<String> {
            Ok(format!("{:?}:{}:{}", mode, history.len(), input))
        }
    }

    #[async_trait]
    impl Transcriber for Echo {
        async fn transcribe(&self, audio: &[u8]) -> crate::Result<String> {
            Ok(String::from_utf8_lossy(audio).into_owned())
        }
    }

    #[async_trait]
    impl ImageAnswerer for Echo {
        async fn answer(&self, image: &[u8], question: &str) -> crate::Result<String> {
            Ok(format!("{} bytes / {}", image.len(), question))
        }
    }

    #[async_trait]
    impl PdfIndexer for Echo {
        async fn ingest(&self, _files: &[Vec<u8>]) -> crate::Result<()> {
            Ok(())
        }
    }

    fn controller(dir: &std::path::Path) -> SessionController {
        let echo = Arc::new(Echo);
        SessionController::new(
            Arc::new(JsonDirStore::new(dir)),
            Collaborators {
                chain: echo.clone(),
                transcriber: echo.clone(),
                images: echo.clone(),
                pdfs: echo,
            },
        )
    }

    #[tokio::test]
    async fn test_submit_empty_text_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let controller = controller(temp_dir.path());
        let mut state = UiState::new();
        assert!(!controller.submit_text(&mut state, "").await.unwrap());
        assert!(state.history.is_empty());
        assert!(!state.dirty);
    }

    #[tokio::test]
    async fn test_image_turn_precedes_text_turn() {
        let temp_dir = TempDir::new().unwrap();
        let controller = controller(temp_dir.path());
        let mut state = UiState::new();

        let cycle = Cycle::new().enter_text("what is this?").with_image(vec![0u8; 4]);
        controller.run_cycle(&mut state, cycle).await.unwrap();

        assert_eq!(state.history.len(), 4);
        assert_eq!(state.history[1].content, "4 bytes / what is this?");
        // the text turn sees the image turn in its history
        assert_eq!(state.history[3].content, "Normal:2:what is this?");
    }

    #[tokio::test]
    async fn test_same_audio_clip_processed_once() {
        let temp_dir = TempDir::new().unwrap();
        let controller = controller(temp_dir.path());
        let mut state = UiState::new();

        assert!(controller.submit_audio(&mut state, b"hello").await.unwrap());
        assert!(!controller.submit_audio(&mut state, b"hello").await.unwrap());
        assert_eq!(state.history.len(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_ignored_after_selection_moved() {
        let temp_dir = TempDir::new().unwrap();
        let controller = controller(temp_dir.path());
        let mut state = UiState::new();
        state.selected_session_key = SessionKey::Persisted("other.json".into());
        state.pending_new_session_key = Some(SessionKey::Persisted("minted.json".into()));

        assert_eq!(controller.reconcile_pending_rename(&mut state), None);
        assert_eq!(state.selected_session_key.as_str(), "other.json");
        assert!(state.pending_new_session_key.is_none());
    }

    #[tokio::test]
    async fn test_select_corrupt_session_falls_back_to_new() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("bad.json"), "oops").unwrap();
        let controller = controller(temp_dir.path());
        let mut state = UiState::new();

        let err = controller
            .select_session(&mut state, SessionKey::Persisted("bad.json".into()))
            .unwrap_err();
        assert!(matches!(err, crate::Error::Parse { .. }));
        assert!(state.selected_session_key.is_new());
        assert!(state.history.is_empty());
        assert_eq!(std::fs::read_to_string(temp_dir.path().join("bad.json")).unwrap(), "oops");
    }
}
