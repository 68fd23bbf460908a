//! Chat sessions and their on-disk history
//!
//! A session is either the `new_session` sentinel or a persisted
//! `<timestamp>.json` file holding the full ordered message array.

pub mod key;
pub mod message;
pub mod registry;
pub mod store;

pub use key::{SessionKey, NEW_SESSION};
pub use message::{Message, Role};
pub use registry::SessionRegistry;
pub use store::{HistoryStore, JsonDirStore};
