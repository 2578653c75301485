//! Newline-delimited JSON transport over a pair of byte streams.
//!
//! The controller side ([`StdioHostBridge`]) writes `CommandEnvelope` lines to
//! the host and reads `ResponseEnvelope` / `EventEnvelope` lines back,
//! correlating responses by `request_id`. The host side ([`serve_stdio`])
//! is the mirror image and backs the `cheddar-host` binary.
//!
//! On the host side stdout is exclusively reserved for the JSON protocol; all
//! diagnostic output must be routed to stderr.

use crate::error::{CheddarError, Result};
use crate::host::channel::{HostEventEmitter, HostHandler, HostRouter};
use crate::host::contract::{
    CommandEnvelope, EventEnvelope, HostRequest, HostResponse, OperationName, ResponseEnvelope,
};
use crate::host::events::{EventHandler, EventHub, Subscription};
use crate::host::{HostBridge, new_envelope_id};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

type BoxedWriter = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;

/// In-flight requests awaiting a response. `None` once the host is gone.
type PendingMap = Arc<Mutex<Option<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>>;

/// Controller-side bridge to a host speaking JSON lines.
pub struct StdioHostBridge {
    writer: Arc<tokio::sync::Mutex<BoxedWriter>>,
    pending: PendingMap,
    events: EventHub,
    reader_handle: JoinHandle<()>,
    child: Option<Child>,
}

impl StdioHostBridge {
    /// Spawn `program` as the host process and connect to its stdio.
    ///
    /// The child inherits stderr and is killed when the bridge is dropped.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CheddarError::Channel(format!("failed to spawn host '{program}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CheddarError::Channel("host process has no stdin".to_owned()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CheddarError::Channel("host process has no stdout".to_owned()))?;

        tracing::info!(program, pid = ?child.id(), "host process started");
        let mut bridge = Self::connect(stdout, stdin);
        bridge.child = Some(child);
        Ok(bridge)
    }

    /// Connect over an existing reader/writer pair.
    ///
    /// Must be called from within a tokio runtime; a reader task is spawned.
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(Some(HashMap::new())));
        let events = EventHub::new();
        let boxed: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        let reader_handle = tokio::spawn(run_response_reader(
            reader,
            Arc::clone(&pending),
            events.clone(),
        ));

        Self {
            writer: Arc::new(tokio::sync::Mutex::new(BufWriter::new(boxed))),
            pending,
            events,
            reader_handle,
            child: None,
        }
    }

    /// Whether the host side has closed its output.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(0, HashMap::len)
    }
}

/// Removes a request from the pending map when the call that registered it
/// ends, whether it completed, failed or was cancelled.
struct PendingEntry<'a> {
    pending: &'a PendingMap,
    request_id: &'a str,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        if let Some(map) = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_mut()
        {
            map.remove(self.request_id);
        }
    }
}

impl Drop for StdioHostBridge {
    fn drop(&mut self) {
        self.reader_handle.abort();
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}

#[async_trait]
impl HostBridge for StdioHostBridge {
    async fn invoke(&self, request: HostRequest) -> Result<HostResponse> {
        let request_id = new_envelope_id();
        let envelope = request.clone().into_envelope(request_id.clone());
        envelope.validate()?;
        let json = serde_json::to_string(&envelope)
            .map_err(|e| CheddarError::Channel(format!("failed to serialize command: {e}")))?;

        let (response_tx, response_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            match pending.as_mut() {
                Some(map) => {
                    map.insert(request_id.clone(), response_tx);
                }
                None => {
                    return Err(CheddarError::Channel(format!(
                        "host closed; cannot send {}",
                        envelope.command
                    )));
                }
            }
        }
        let _entry = PendingEntry {
            pending: &self.pending,
            request_id: &request_id,
        };

        {
            let mut w = self.writer.lock().await;
            write_line(&mut *w, &json).await?;
        }

        let response = response_rx.await.map_err(|_| {
            CheddarError::Channel(format!(
                "host closed before responding to {} ({request_id})",
                envelope.command
            ))
        })?;
        request.decode_response(response)
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        self.events.subscribe(event, move |envelope| handler(envelope))
    }
}

/// Read host output until EOF, resolving pending requests and dispatching
/// events. Pending requests fail once the host output closes.
async fn run_response_reader<R>(reader: R, pending: PendingMap, events: EventHub)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("host output closed (EOF)");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read from host; closing bridge");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "host sent invalid JSON; skipping");
                continue;
            }
        };

        if value.get("ok").is_some() {
            match serde_json::from_value::<ResponseEnvelope>(value) {
                Ok(response) => {
                    let waiter = pending
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .as_mut()
                        .and_then(|map| map.remove(&response.request_id));
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => tracing::warn!(
                            request_id = %response.request_id,
                            "response for unknown request; dropping"
                        ),
                    }
                }
                Err(e) => tracing::warn!(error = %e, "malformed response envelope; skipping"),
            }
        } else if value.get("event").is_some() {
            match serde_json::from_value::<EventEnvelope>(value) {
                Ok(event) => {
                    events.dispatch(&event);
                }
                Err(e) => tracing::warn!(error = %e, "malformed event envelope; skipping"),
            }
        } else {
            tracing::warn!(raw_line = %trimmed, "unrecognized host message; skipping");
        }
    }

    let dropped = pending
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take()
        .map_or(0, |map| map.len());
    if dropped > 0 {
        tracing::warn!(dropped, "host closed with requests still in flight");
    }
}

/// Run the host loop over the process's own stdin/stdout.
pub async fn run_stdio_host<H: HostHandler>(handler: H) -> Result<()> {
    serve_stdio(handler, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve command envelopes from `reader`, writing responses and events to
/// `writer`, until the input closes or `quit-application` is answered.
///
/// Requests are handled concurrently; responses are written as each
/// completes. In-flight requests are drained before returning.
pub async fn serve_stdio<H, R, W>(handler: H, reader: R, writer: W) -> Result<()>
where
    H: HostHandler,
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    serve_stdio_with(|_| handler, reader, writer).await
}

/// Like [`serve_stdio`], but builds the handler from the loop's event
/// emitter so it can push unsolicited events to the controller.
pub async fn serve_stdio_with<H, F, R, W>(make_handler: F, reader: R, writer: W) -> Result<()>
where
    H: HostHandler,
    F: FnOnce(HostEventEmitter) -> H,
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let boxed: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
    let writer = Arc::new(tokio::sync::Mutex::new(BufWriter::new(boxed)));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<EventEnvelope>();
    let emitter = HostEventEmitter::new(move |envelope| {
        let _ = event_tx.send(envelope);
    });
    let router = HostRouter::new(make_handler(emitter.clone()), emitter);

    let event_writer = Arc::clone(&writer);
    let event_handle = tokio::spawn(async move {
        while let Some(envelope) = event_rx.recv().await {
            match serde_json::to_string(&envelope) {
                Ok(json) => {
                    let mut w = event_writer.lock().await;
                    if let Err(e) = write_line(&mut *w, &json).await {
                        tracing::warn!(
                            error = %e,
                            "failed to write event envelope; stopping event forwarder"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                }
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    let mut in_flight = JoinSet::new();

    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| CheddarError::Channel(format!("failed to read command: {e}")))?;
        let Some(line) = line else {
            tracing::info!("command input closed (EOF); shutting down host loop");
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "failed to parse command envelope");
                write_envelope(&writer, &reject_unparsed(trimmed, &e)).await?;
                continue;
            }
        };

        if envelope.command == OperationName::QuitApplication {
            while in_flight.join_next().await.is_some() {}
            let response = router.route(&envelope).await;
            write_envelope(&writer, &response).await?;
            tracing::info!("quit-application received; shutting down host loop");
            break;
        }

        let router = router.clone();
        let writer = Arc::clone(&writer);
        in_flight.spawn(async move {
            let response = router.route(&envelope).await;
            if let Err(e) = write_envelope(&writer, &response).await {
                tracing::warn!(error = %e, "failed to write response envelope");
            }
        });
    }

    while in_flight.join_next().await.is_some() {}
    // Dropping the last router closes the event channel and lets the
    // forwarder drain.
    drop(router);
    let _ = event_handle.await;
    Ok(())
}

/// Error response for a line that is not a valid command envelope.
///
/// A well-formed envelope naming an unknown operation is answered under its
/// own `request_id` so the caller fails fast; anything else is answered as
/// `parse-error`.
fn reject_unparsed(raw: &str, error: &serde_json::Error) -> ResponseEnvelope {
    let value: serde_json::Value = serde_json::from_str(raw).unwrap_or_default();
    let request_id = value["request_id"].as_str().filter(|id| !id.trim().is_empty());
    let command = value["command"].as_str();
    match (request_id, command) {
        (Some(request_id), Some(command)) if OperationName::parse(command).is_none() => {
            ResponseEnvelope::error(request_id, format!("unknown operation '{command}'"))
        }
        _ => ResponseEnvelope::error(
            "parse-error",
            format!("failed to parse command envelope: {error}"),
        ),
    }
}

async fn write_envelope<T: serde::Serialize>(
    writer: &tokio::sync::Mutex<BoxedWriter>,
    envelope: &T,
) -> Result<()> {
    let json = serde_json::to_string(envelope)
        .map_err(|e| CheddarError::Channel(format!("failed to serialize envelope: {e}")))?;
    let mut w = writer.lock().await;
    write_line(&mut *w, &json).await
}

/// Write a single JSON line and flush.
async fn write_line(writer: &mut BoxedWriter, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| CheddarError::Channel(format!("failed to write to host channel: {e}")))?;
    writer.write_all(b"\n").await.map_err(|e| {
        CheddarError::Channel(format!("failed to write newline to host channel: {e}"))
    })?;
    writer
        .flush()
        .await
        .map_err(|e| CheddarError::Channel(format!("failed to flush host channel: {e}")))?;
    Ok(())
}
