use base64::{engine::general_purpose::STANDARD, Engine as _};
use mmchat_core::controller::InputEvent;
use mmchat_core::session::SessionKey;
use mmchat_core::{Cycle, CycleView};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

#[derive(Clone)]
pub struct AppState {
    pub api_tx: mpsc::Sender<ManagerCommand>,
}

pub enum ManagerCommand {
    Connect(oneshot::Sender<mmchat_core::Result<ConnectResponse>>),
    Cycle {
        connection_id: String,
        cycle: Cycle,
        reply: oneshot::Sender<mmchat_core::Result<CycleView>>,
    },
    Disconnect {
        connection_id: String,
        reply: oneshot::Sender<bool>,
    },
    ListSessions(oneshot::Sender<mmchat_core::Result<Vec<SessionKey>>>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub connection_id: String,
    pub view: CycleView,
}

/// One render cycle as sent by a browser client. Uploads are base64.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleRequest {
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub input: Vec<InputEvent>,
    #[serde(default)]
    pub enable_pdf_chat: bool,
    #[serde(default)]
    pub pdfs: Vec<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl CycleRequest {
    /// Decode uploads and the selected key into a controller cycle
    pub fn into_cycle(self) -> mmchat_core::Result<Cycle> {
        let select = self
            .select
            .map(|raw| SessionKey::parse(&raw))
            .transpose()?;
        let pdfs = self
            .pdfs
            .iter()
            .map(|data| decode("pdf", data))
            .collect::<mmchat_core::Result<Vec<_>>>()?;
        let audio = self.audio.map(|data| decode("audio", &data)).transpose()?;
        let image = self.image.map(|data| decode("image", &data)).transpose()?;

        Ok(Cycle {
            select,
            input: self.input,
            enable_pdf_chat: self.enable_pdf_chat,
            pdfs,
            audio,
            image,
        })
    }
}

fn decode(field: &str, data: &str) -> mmchat_core::Result<Vec<u8>> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| mmchat_core::Error::Validation(format!("{} is not valid base64: {}", field, e)))
}
