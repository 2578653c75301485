//! Session controller: settings and host bridge composed into the operations
//! the UI calls.
//!
//! [`Cheddar`] is constructed explicitly from its two collaborators and shared
//! by reference (usually `Arc<Cheddar>`). It owns capture state and type
//! coercion of settings; everything that happens outside this process goes
//! through the [`HostBridge`].
//!
//! Failure policy:
//! - `initialize_assistant` never fails; any problem resolves to `false`.
//! - `send_text_message` propagates the host outcome unchanged.
//! - `stop_capture`, `set_status` and the host notifications sent after a
//!   settings change are best-effort and only log.
//! - History accessors fall back to empty results.

pub mod capture;
pub mod history;

use crate::error::{CheddarError, Result};
use crate::host::HostBridge;
use crate::host::contract::{EventEnvelope, HostRequest, HostResponse, MESSAGE_EVENT};
use crate::host::events::Subscription;
use crate::platform::PlatformFlags;
use crate::settings::{LayoutMode, SettingKey, SettingsStore};
use capture::{CaptureParams, CaptureState};
use history::{ConversationSession, ConversationStorage};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Capacity of the status broadcast. Slow receivers lose the oldest lines.
const STATUS_CHANNEL_CAPACITY: usize = 64;

/// The only view this front-end renders.
pub const MAIN_VIEW: &str = "main";

/// Session and settings controller.
pub struct Cheddar {
    settings: Arc<dyn SettingsStore>,
    bridge: Arc<dyn HostBridge>,
    storage: Option<Arc<dyn ConversationStorage>>,
    capture: watch::Sender<CaptureState>,
    status: broadcast::Sender<String>,
    platform: PlatformFlags,
}

impl std::fmt::Debug for Cheddar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cheddar")
            .field("capture", &*self.capture.borrow())
            .field("has_storage", &self.storage.is_some())
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl Cheddar {
    /// Build a controller over a settings store and a host bridge.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsStore>, bridge: Arc<dyn HostBridge>) -> Self {
        let (capture, _) = watch::channel(CaptureState::Inactive);
        let (status, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            settings,
            bridge,
            storage: None,
            capture,
            status,
            platform: PlatformFlags::current(),
        }
    }

    /// Wire in a conversation storage collaborator.
    #[must_use]
    pub fn with_conversation_storage(mut self, storage: Arc<dyn ConversationStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    // ----- assistant -----

    /// Arm the assistant with the stored API key and custom prompt.
    ///
    /// Resolves `false` without contacting the host when the stored key is
    /// empty after trimming. Host failures and malformed replies also
    /// resolve `false`.
    pub async fn initialize_assistant(&self, profile: &str, language: &str) -> bool {
        let api_key = self.api_key();
        if api_key.is_empty() {
            tracing::info!("assistant not configured: API key is empty");
            return false;
        }
        let request = HostRequest::InitializeGemini {
            api_key,
            custom_prompt: self.custom_prompt(),
            profile: profile.to_owned(),
            language: language.to_owned(),
        };
        match self.bridge.invoke(request).await {
            Ok(HostResponse::Initialized(initialized)) => {
                tracing::info!(profile, language, initialized, "assistant initialization finished");
                initialized
            }
            Ok(other) => {
                tracing::warn!(response = ?other, "unexpected response to initialize-gemini");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "assistant initialization failed");
                false
            }
        }
    }

    /// Forward `text` verbatim to the assistant backend.
    ///
    /// The host's result payload, or its failure, is returned unchanged.
    pub async fn send_text_message(&self, text: &str) -> Result<Value> {
        let request = HostRequest::SendTextMessage {
            text: text.to_owned(),
        };
        match self.bridge.invoke(request).await? {
            HostResponse::MessageResult(payload) => Ok(payload),
            other => Err(CheddarError::Channel(format!(
                "unexpected response to send-text-message: {other:?}"
            ))),
        }
    }

    /// Trimmed stored API key, empty when unset.
    #[must_use]
    pub fn api_key(&self) -> String {
        self.settings
            .get(SettingKey::ApiKey)
            .map(|key| key.trim().to_owned())
            .unwrap_or_default()
    }

    pub fn set_api_key(&self, api_key: &str) {
        self.settings.set(SettingKey::ApiKey, api_key.trim());
    }

    #[must_use]
    pub fn custom_prompt(&self) -> String {
        self.settings.get(SettingKey::CustomPrompt).unwrap_or_default()
    }

    pub fn set_custom_prompt(&self, prompt: &str) {
        self.settings.set(SettingKey::CustomPrompt, prompt);
    }

    // ----- capture -----

    /// Transition capture to active with the given parameters.
    ///
    /// `interval` is a string of milliseconds; `image_quality` is
    /// `low|medium|high`. Starting while already active restarts the session
    /// with the new parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CheddarError::Config`] if the parameters do not parse. The
    /// state is left unchanged in that case.
    pub async fn start_capture(&self, interval: &str, image_quality: &str) -> Result<()> {
        let params = CaptureParams::parse(interval, image_quality)?;
        let previous = self.capture.send_replace(CaptureState::Active(params));
        match previous {
            CaptureState::Active(old) if old == params => {
                tracing::debug!("capture already active with the same parameters");
            }
            CaptureState::Active(old) => {
                tracing::info!(
                    old_interval_ms = old.interval.as_millis() as u64,
                    interval_ms = params.interval.as_millis() as u64,
                    quality = %params.image_quality,
                    "capture restarted with new parameters"
                );
            }
            CaptureState::Inactive => {
                tracing::info!(
                    interval_ms = params.interval.as_millis() as u64,
                    quality = %params.image_quality,
                    "capture started"
                );
            }
        }
        Ok(())
    }

    /// Transition capture to inactive. No-op when already inactive.
    pub fn stop_capture(&self) {
        let previous = self.capture.send_replace(CaptureState::Inactive);
        if previous.is_active() {
            tracing::info!("capture stopped");
        } else {
            tracing::debug!("stop requested while capture inactive");
        }
    }

    #[must_use]
    pub fn capture_state(&self) -> CaptureState {
        *self.capture.borrow()
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.capture.borrow().is_active()
    }

    /// Receiver that observes every capture state transition.
    #[must_use]
    pub fn watch_capture(&self) -> watch::Receiver<CaptureState> {
        self.capture.subscribe()
    }

    // ----- settings -----

    /// Stored content protection flag, `true` when unset.
    ///
    /// A present value is on only if it is exactly `"true"`.
    #[must_use]
    pub fn get_content_protection(&self) -> bool {
        self.settings
            .get(SettingKey::ContentProtection)
            .is_none_or(|raw| raw == "true")
    }

    /// Persist the flag, then tell the host. Host failures are logged only.
    pub async fn set_content_protection(&self, enabled: bool) {
        self.settings.set(
            SettingKey::ContentProtection,
            if enabled { "true" } else { "false" },
        );
        self.notify_host(HostRequest::UpdateContentProtection { enabled })
            .await;
    }

    /// Stored layout mode, [`LayoutMode::Normal`] when unset or unreadable.
    #[must_use]
    pub fn get_layout_mode(&self) -> LayoutMode {
        self.settings
            .get(SettingKey::LayoutMode)
            .and_then(|raw| LayoutMode::parse(&raw))
            .unwrap_or_default()
    }

    /// Persist the layout mode, then ask the host to recompute window sizes.
    pub async fn set_layout_mode(&self, mode: LayoutMode) {
        self.settings.set(SettingKey::LayoutMode, mode.as_str());
        self.notify_host(HostRequest::UpdateSizes).await;
    }

    // ----- window -----

    /// Show or hide the overlay window. Best-effort.
    pub async fn toggle_window_visibility(&self) {
        self.notify_host(HostRequest::ToggleWindowVisibility).await;
    }

    /// Ask the host to terminate the application. Best-effort.
    pub async fn quit_application(&self) {
        self.stop_capture();
        self.notify_host(HostRequest::QuitApplication).await;
    }

    #[must_use]
    pub fn current_view(&self) -> &'static str {
        MAIN_VIEW
    }

    #[must_use]
    pub fn platform(&self) -> PlatformFlags {
        self.platform
    }

    // ----- conversation history -----

    /// Identifiers of stored conversations; empty without a storage
    /// collaborator or when it fails.
    pub async fn get_all_conversation_sessions(&self) -> Vec<String> {
        let Some(storage) = &self.storage else {
            return Vec::new();
        };
        match storage.list_sessions().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list conversation sessions");
                Vec::new()
            }
        }
    }

    /// A stored conversation; `None` without a storage collaborator, when it
    /// is missing, or when storage fails.
    pub async fn get_conversation_session(&self, id: &str) -> Option<ConversationSession> {
        let storage = self.storage.as_ref()?;
        match storage.get_session(id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, session = id, "failed to load conversation session");
                None
            }
        }
    }

    /// Initialize the storage collaborator. No-op without one.
    pub async fn init_conversation_storage(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.init().await {
            tracing::warn!(error = %e, "conversation storage init failed");
        }
    }

    // ----- status and notifications -----

    /// Broadcast a status line. Never blocks and never fails; lines are
    /// dropped when nobody is listening.
    pub fn set_status(&self, text: &str) {
        tracing::info!(target: "cheddar::status", "{text}");
        let _ = self.status.send(text.to_owned());
    }

    #[must_use]
    pub fn subscribe_status(&self) -> broadcast::Receiver<String> {
        self.status.subscribe()
    }

    /// Register for unsolicited host `message` events.
    pub fn on_host_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        self.bridge.subscribe(MESSAGE_EVENT, Arc::new(handler))
    }

    async fn notify_host(&self, request: HostRequest) {
        let operation = request.operation();
        if let Err(e) = self.bridge.invoke(request).await {
            tracing::warn!(%operation, error = %e, "host notification failed");
        }
    }
}
