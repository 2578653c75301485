//! Capture on/off state and transcript driven by user actions.

use super::transcript::{Message, Role, Transcript};
use crate::config::CaptureConfig;
use crate::controller::Cheddar;
use crate::host::contract::{EventEnvelope, HostNotification};
use crate::host::events::Subscription;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, oneshot};

pub const STARTING_CAPTURE: &str = "Starting capture…";
pub const STOPPING_CAPTURE: &str = "Stopping capture.";
pub const MESSAGE_SENT: &str = "Message sent to backend.";
pub const SEND_FAILED: &str = "Failed to send message.";

const TRANSCRIPT_CHANNEL_CAPACITY: usize = 256;

/// Capture state as the UI displays it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewState {
    #[default]
    Idle,
    Capturing,
}

/// Parameters the Start action passes to the controller, in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDefaults {
    pub interval: String,
    pub image_quality: String,
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for CaptureDefaults {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            interval: config.interval_ms.to_string(),
            image_quality: config.image_quality.as_str().to_owned(),
        }
    }
}

/// UI session state over a shared controller.
///
/// Replies to concurrent sends are appended in submission order: each send
/// waits for the send before it to append its reply first.
pub struct SessionView {
    controller: Arc<Cheddar>,
    capture_defaults: CaptureDefaults,
    transcript: Mutex<Transcript>,
    state: Mutex<ViewState>,
    updates: broadcast::Sender<Message>,
    reply_tail: Mutex<Option<oneshot::Receiver<()>>>,
    notifications: Arc<AtomicUsize>,
    host_messages: Subscription,
}

impl std::fmt::Debug for SessionView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionView")
            .field("state", &self.state())
            .field("transcript_len", &self.len())
            .finish_non_exhaustive()
    }
}

impl SessionView {
    /// Create a view and subscribe to host `message` events.
    ///
    /// The subscription lives until [`SessionView::teardown`] or drop.
    #[must_use]
    pub fn new(controller: Arc<Cheddar>) -> Self {
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notifications);
        let host_messages = controller.on_host_message(move |envelope| {
            counter.fetch_add(1, Ordering::Relaxed);
            handle_host_message(envelope);
        });
        let (updates, _) = broadcast::channel(TRANSCRIPT_CHANNEL_CAPACITY);
        Self {
            controller,
            capture_defaults: CaptureDefaults::default(),
            transcript: Mutex::new(Transcript::new()),
            state: Mutex::new(ViewState::Idle),
            updates,
            reply_tail: Mutex::new(None),
            notifications,
            host_messages,
        }
    }

    /// Override the parameters used by [`SessionView::start_capture`].
    #[must_use]
    pub fn with_capture_defaults(mut self, defaults: CaptureDefaults) -> Self {
        self.capture_defaults = defaults;
        self
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<Cheddar> {
        &self.controller
    }

    #[must_use]
    pub fn state(&self) -> ViewState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the transcript.
    #[must_use]
    pub fn transcript(&self) -> Vec<Message> {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .messages()
            .to_vec()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transcript.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every message appended from now on.
    #[must_use]
    pub fn subscribe_transcript(&self) -> broadcast::Receiver<Message> {
        self.updates.subscribe()
    }

    /// Number of host `message` events received so far.
    #[must_use]
    pub fn notifications_received(&self) -> usize {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Start action: note it in the transcript, then start capture with the
    /// configured defaults.
    pub async fn start_capture(&self) {
        self.append(Role::System, STARTING_CAPTURE);
        let CaptureDefaults {
            interval,
            image_quality,
        } = &self.capture_defaults;
        match self.controller.start_capture(interval, image_quality).await {
            Ok(()) => self.set_state(ViewState::Capturing),
            Err(e) => {
                tracing::warn!(error = %e, "capture start failed");
                self.append(Role::System, format!("Failed to start capture: {e}"));
            }
        }
    }

    /// Stop action. Always lands in [`ViewState::Idle`].
    pub fn stop_capture(&self) {
        self.append(Role::System, STOPPING_CAPTURE);
        self.controller.stop_capture();
        self.set_state(ViewState::Idle);
    }

    /// Append `text` as a user message, send it, then append the outcome.
    ///
    /// The transcript grows by one immediately and by one more once the host
    /// replies. Failures become a system message.
    pub async fn send_message(&self, text: &str) {
        let (done_tx, done_rx) = oneshot::channel();
        // The user line and the tail slot move together so that transcript
        // order and reply order agree under concurrent sends.
        let previous = {
            let mut tail = self.reply_tail.lock().unwrap_or_else(|e| e.into_inner());
            self.append(Role::User, text);
            tail.replace(done_rx)
        };

        let outcome = self.controller.send_text_message(text).await;

        // A dropped sender means the earlier send was cancelled.
        if let Some(previous) = previous {
            let _ = previous.await;
        }

        match outcome {
            Ok(_) => self.append(Role::Assistant, MESSAGE_SENT),
            Err(e) => {
                tracing::warn!(error = %e, "send-text-message failed");
                self.append(Role::System, SEND_FAILED);
            }
        }
        let _ = done_tx.send(());
    }

    /// Input box submit: trims `raw` and sends it unless empty.
    ///
    /// Returns whether anything was sent.
    pub async fn submit(&self, raw: &str) -> bool {
        let text = raw.trim();
        if text.is_empty() {
            return false;
        }
        self.send_message(text).await;
        true
    }

    /// Release the host event subscription. Safe to call more than once.
    pub fn teardown(&self) {
        self.host_messages.unsubscribe();
        tracing::debug!(event = self.host_messages.event(), "session view torn down");
    }

    fn append(&self, role: Role, text: impl Into<String>) {
        let message = self
            .transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(role, text);
        let _ = self.updates.send(message);
    }

    fn set_state(&self, state: ViewState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

fn handle_host_message(envelope: &EventEnvelope) {
    let notification = HostNotification::from_payload(&envelope.payload);
    if notification.is_navigation() {
        // Response navigation belongs to the renderer.
        tracing::trace!(?notification, "host navigation message");
    } else {
        tracing::trace!(payload = %envelope.payload, "ignoring host message");
    }
}
