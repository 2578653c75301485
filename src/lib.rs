//! Cheddar: session and settings controller for an AI-assistant overlay.
//!
//! The front-end process drives a privileged host process over a typed RPC
//! boundary. It owns user settings, capture state and the visible
//! transcript; the host owns windows, capture and the AI provider.
//!
//! # Architecture
//!
//! Leaves first:
//! - **Settings**: string key-value store persisted to TOML ([`settings`])
//! - **Host bridge**: named request/response operations plus host events,
//!   in-process or over child stdio ([`host`])
//! - **Controller**: [`Cheddar`], composing settings and the bridge into the
//!   operations the UI calls
//! - **UI state machine**: [`ui::SessionView`], the transcript and capture
//!   on/off state

pub mod cheddar_dirs;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod platform;
pub mod settings;
pub mod ui;

pub use config::CheddarConfig;
pub use controller::Cheddar;
pub use error::{CheddarError, Result};
pub use host::HostBridge;
pub use settings::{LayoutMode, SettingKey, SettingsStore};
