//! In-process host command channel and router.
//!
//! [`command_channel`] wires a [`HostCommandClient`] (controller side) to a
//! [`HostCommandServer`] (host side) over tokio channels. The same
//! [`HostRouter`] serves the stdio host loop in [`crate::host::stdio`].

use crate::error::{CheddarError, Result};
use crate::host::contract::{
    CommandEnvelope, EventEnvelope, HostRequest, HostResponse, ResponseEnvelope,
};
use crate::host::events::{EventHandler, EventHub, Subscription};
use crate::host::{HostBridge, new_envelope_id};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Host-side implementation of the operation vocabulary.
///
/// Only the two operations with results are required; window and layout
/// actions default to accepted no-ops.
#[async_trait]
pub trait HostHandler: Send + Sync + 'static {
    async fn initialize_gemini(
        &self,
        api_key: &str,
        custom_prompt: &str,
        profile: &str,
        language: &str,
    ) -> Result<bool>;
    async fn send_text_message(&self, text: &str) -> Result<Value>;
    async fn toggle_window_visibility(&self) -> Result<()> {
        Ok(())
    }
    async fn quit_application(&self) -> Result<()> {
        Ok(())
    }
    async fn update_content_protection(&self, _enabled: bool) -> Result<()> {
        Ok(())
    }
    async fn update_sizes(&self) -> Result<()> {
        Ok(())
    }
}

/// Reference host that accepts everything and talks to no backend.
#[derive(Debug, Default)]
pub struct NoopHostHandler;

#[async_trait]
impl HostHandler for NoopHostHandler {
    async fn initialize_gemini(
        &self,
        api_key: &str,
        _custom_prompt: &str,
        _profile: &str,
        _language: &str,
    ) -> Result<bool> {
        Ok(!api_key.trim().is_empty())
    }

    async fn send_text_message(&self, text: &str) -> Result<Value> {
        Ok(serde_json::json!({"accepted": true, "chars": text.chars().count()}))
    }
}

/// Pushes unsolicited events from the host towards the controller.
#[derive(Clone)]
pub struct HostEventEmitter {
    sink: Arc<dyn Fn(EventEnvelope) + Send + Sync>,
}

impl HostEventEmitter {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(EventEnvelope) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Emitter that delivers straight into an in-process [`EventHub`].
    #[must_use]
    pub fn for_hub(hub: EventHub) -> Self {
        Self::new(move |envelope| {
            hub.dispatch(&envelope);
        })
    }

    pub fn emit(&self, event: &str, payload: Value) {
        (self.sink)(EventEnvelope::new(new_envelope_id(), event, payload));
    }
}

/// Routes command envelopes to a [`HostHandler`].
pub struct HostRouter<H: HostHandler> {
    handler: Arc<H>,
    emitter: HostEventEmitter,
}

impl<H: HostHandler> Clone for HostRouter<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            emitter: self.emitter.clone(),
        }
    }
}

impl<H: HostHandler> HostRouter<H> {
    #[must_use]
    pub fn new(handler: H, emitter: HostEventEmitter) -> Self {
        Self {
            handler: Arc::new(handler),
            emitter,
        }
    }

    #[must_use]
    pub fn emitter(&self) -> &HostEventEmitter {
        &self.emitter
    }

    /// Route a command envelope to the handler.
    ///
    /// Contract violations and handler failures become error envelopes; this
    /// never fails.
    pub async fn route(&self, envelope: &CommandEnvelope) -> ResponseEnvelope {
        let request = match HostRequest::from_envelope(envelope) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    request_id = %envelope.request_id,
                    command = %envelope.command,
                    error = %e,
                    "rejecting invalid host command"
                );
                return ResponseEnvelope::error(envelope.request_id.clone(), e.to_string());
            }
        };
        match self.dispatch(request).await {
            Ok(response) => {
                ResponseEnvelope::ok(envelope.request_id.clone(), response.into_payload())
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %envelope.request_id,
                    command = %envelope.command,
                    error = %e,
                    "host handler failed"
                );
                ResponseEnvelope::error(envelope.request_id.clone(), e.to_string())
            }
        }
    }

    async fn dispatch(&self, request: HostRequest) -> Result<HostResponse> {
        let h = &self.handler;
        match request {
            HostRequest::InitializeGemini {
                api_key,
                custom_prompt,
                profile,
                language,
            } => h
                .initialize_gemini(&api_key, &custom_prompt, &profile, &language)
                .await
                .map(HostResponse::Initialized),
            HostRequest::SendTextMessage { text } => h
                .send_text_message(&text)
                .await
                .map(HostResponse::MessageResult),
            HostRequest::ToggleWindowVisibility => {
                h.toggle_window_visibility().await.map(|()| HostResponse::Ack)
            }
            HostRequest::QuitApplication => h.quit_application().await.map(|()| HostResponse::Ack),
            HostRequest::UpdateContentProtection { enabled } => h
                .update_content_protection(enabled)
                .await
                .map(|()| HostResponse::Ack),
            HostRequest::UpdateSizes => h.update_sizes().await.map(|()| HostResponse::Ack),
        }
    }
}

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<ResponseEnvelope>,
}

/// Controller-side handle to an in-process host.
#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    events: EventHub,
}

impl HostCommandClient {
    /// Send a raw envelope and wait for the raw response.
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate()?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| CheddarError::Channel(format!("failed to send host command request: {e}")))?;

        response_rx
            .await
            .map_err(|e| CheddarError::Channel(format!("host command response dropped: {e}")))
    }
}

#[async_trait]
impl HostBridge for HostCommandClient {
    async fn invoke(&self, request: HostRequest) -> Result<HostResponse> {
        let envelope = request.clone().into_envelope(new_envelope_id());
        let response = self.send(envelope).await?;
        request.decode_response(response)
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        self.events.subscribe(event, move |envelope| handler(envelope))
    }
}

/// Host-side end of [`command_channel`].
pub struct HostCommandServer<H: HostHandler> {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    router: HostRouter<H>,
}

#[must_use]
pub fn command_channel<H: HostHandler>(
    request_capacity: usize,
    handler: H,
) -> (HostCommandClient, HostCommandServer<H>) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));
    let events = EventHub::new();
    let router = HostRouter::new(handler, HostEventEmitter::for_hub(events.clone()));

    (
        HostCommandClient { request_tx, events },
        HostCommandServer { request_rx, router },
    )
}

impl<H: HostHandler> HostCommandServer<H> {
    /// Emitter for pushing unsolicited events to the client's subscribers.
    #[must_use]
    pub fn event_emitter(&self) -> HostEventEmitter {
        self.router.emitter().clone()
    }

    /// Serve requests until every client handle is dropped.
    ///
    /// Each request is handled on its own task, so slow operations do not
    /// hold up later ones and responses may complete out of order.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let router = self.router.clone();
            tokio::spawn(async move {
                let response = router.route(&request.envelope).await;
                let _ = request.response_tx.send(response);
            });
        }
        tracing::debug!("host command channel closed; server exiting");
    }

    /// Route a single envelope without running the server loop.
    pub async fn route(&self, envelope: &CommandEnvelope) -> ResponseEnvelope {
        self.router.route(envelope).await
    }
}
