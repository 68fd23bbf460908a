//! HTTP front for mmchat: each browser connection is a `UiState` driven
//! through render cycles by a single manager task.

pub mod handlers;
pub mod manager;
pub mod server;
pub mod state;

pub use manager::Manager;
pub use server::{router, run_server};
pub use state::{AppState, ConnectResponse, CycleRequest, ManagerCommand};
