use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mmchat_core::{Cycle, Error, SessionController, UiState};

use crate::state::{ConnectResponse, ManagerCommand};

/// Owns the controller and every connection's UI state. Commands are
/// handled one at a time, so cycles never interleave.
pub struct Manager {
    api_rx: mpsc::Receiver<ManagerCommand>,
    controller: SessionController,
    connections: HashMap<String, UiState>,
}

impl Manager {
    pub fn new(api_rx: mpsc::Receiver<ManagerCommand>, controller: SessionController) -> Self {
        Self {
            api_rx,
            controller,
            connections: HashMap::new(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Manager loop started");

        while let Some(cmd) = self.api_rx.recv().await {
            self.handle(cmd).await;
        }

        info!("Manager channel closed, stopping loop");
        Ok(())
    }

    async fn handle(&mut self, cmd: ManagerCommand) {
        match cmd {
            ManagerCommand::Connect(reply) => {
                let connection_id = uuid::Uuid::new_v4().to_string();
                let mut state = UiState::new();
                let result = self
                    .controller
                    .run_cycle(&mut state, Cycle::new())
                    .await
                    .map(|view| ConnectResponse {
                        connection_id: connection_id.clone(),
                        view,
                    });
                if result.is_ok() {
                    info!("Connection {} opened", connection_id);
                    self.connections.insert(connection_id, state);
                }
                let _ = reply.send(result);
            }
            ManagerCommand::Cycle {
                connection_id,
                cycle,
                reply,
            } => {
                let Some(state) = self.connections.get_mut(&connection_id) else {
                    debug!("Cycle for unknown connection {}", connection_id);
                    let _ = reply.send(Err(Error::NotFound(format!(
                        "connection {}",
                        connection_id
                    ))));
                    return;
                };
                let result = self.controller.run_cycle(state, cycle).await;
                if let Err(e) = &result {
                    warn!("Cycle failed for connection {}: {}", connection_id, e);
                }
                let _ = reply.send(result);
            }
            ManagerCommand::Disconnect {
                connection_id,
                reply,
            } => {
                let removed = self.connections.remove(&connection_id).is_some();
                if removed {
                    info!("Connection {} closed", connection_id);
                }
                let _ = reply.send(removed);
            }
            ManagerCommand::ListSessions(reply) => {
                let result = self
                    .controller
                    .list_sessions()
                    .map(|registry| registry.into_keys());
                let _ = reply.send(result);
            }
        }
    }
}
