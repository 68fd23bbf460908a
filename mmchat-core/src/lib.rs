//! Core types and traits for mmchat
//!
//! This crate provides the chat session lifecycle (selection, the
//! `new_session` to persisted-file transition, input latching), history
//! persistence, configuration and logging used by the other mmchat crates.

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod services;
pub mod session;
pub mod utils;

pub use controller::{Collaborators, Cycle, CycleView, SessionController, UiState};
pub use error::{Error, Result};
