use async_trait::async_trait;
use cheddar::host::HostBridge;
use cheddar::host::contract::{EventEnvelope, HostRequest, HostResponse, MESSAGE_EVENT};
use cheddar::host::events::{EventHandler, EventHub, Subscription};
use cheddar::settings::MemorySettingsStore;
use cheddar::ui::{
    CaptureDefaults, MESSAGE_SENT, Role, SEND_FAILED, STARTING_CAPTURE, STOPPING_CAPTURE,
    SessionView, ViewState,
};
use cheddar::{Cheddar, CheddarError, Result};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

type Gate = oneshot::Sender<Result<HostResponse>>;

/// Bridge whose `send-text-message` replies are released by the test.
///
/// Texts without a gate get an immediate success.
#[derive(Default)]
struct GatedBridge {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<HostResponse>>>>,
    events: EventHub,
}

impl GatedBridge {
    fn gate(&self, text: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("lock gates")
            .insert(text.to_owned(), rx);
        tx
    }

    fn emit(&self, payload: serde_json::Value) {
        self.events
            .dispatch(&EventEnvelope::new("evt-1", MESSAGE_EVENT, payload));
    }
}

#[async_trait]
impl HostBridge for GatedBridge {
    async fn invoke(&self, request: HostRequest) -> Result<HostResponse> {
        let HostRequest::SendTextMessage { text } = &request else {
            return Ok(HostResponse::Ack);
        };
        let gate = self.gates.lock().expect("lock gates").remove(text);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(CheddarError::Channel("gate dropped".to_owned()))),
            None => Ok(HostResponse::MessageResult(json!({"ok": true}))),
        }
    }

    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        self.events.subscribe(event, move |envelope| handler(envelope))
    }
}

fn make_view() -> (Arc<SessionView>, Arc<GatedBridge>) {
    let bridge = Arc::new(GatedBridge::default());
    let controller = Arc::new(Cheddar::new(
        Arc::new(MemorySettingsStore::new()),
        Arc::clone(&bridge) as Arc<dyn HostBridge>,
    ));
    (Arc::new(SessionView::new(controller)), bridge)
}

async fn wait_for_len(view: &SessionView, len: usize) {
    for _ in 0..200 {
        if view.len() >= len {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("transcript never reached {len} messages (at {})", view.len());
}

fn roles_and_texts(view: &SessionView) -> Vec<(Role, String)> {
    view.transcript()
        .into_iter()
        .map(|m| (m.role, m.text))
        .collect()
}

#[tokio::test]
async fn send_appends_user_then_assistant() {
    let (view, _bridge) = make_view();
    view.send_message("hello").await;

    assert_eq!(
        roles_and_texts(&view),
        vec![
            (Role::User, "hello".to_owned()),
            (Role::Assistant, MESSAGE_SENT.to_owned()),
        ]
    );
}

#[tokio::test]
async fn user_message_appears_before_host_replies() {
    let (view, bridge) = make_view();
    let gate = bridge.gate("hello");

    let sender = Arc::clone(&view);
    let send = tokio::spawn(async move { sender.send_message("hello").await });

    wait_for_len(&view, 1).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(view.len(), 1);
    assert_eq!(roles_and_texts(&view), vec![(Role::User, "hello".to_owned())]);

    let _ = gate.send(Ok(HostResponse::MessageResult(json!(null))));
    send.await.expect("send task");
    assert_eq!(view.len(), 2);
}

#[tokio::test]
async fn failed_send_appends_system_message() {
    let (view, bridge) = make_view();
    let gate = bridge.gate("hello");
    let _ = gate.send(Err(CheddarError::Channel("host gone".to_owned())));

    view.send_message("hello").await;

    assert_eq!(
        roles_and_texts(&view),
        vec![
            (Role::User, "hello".to_owned()),
            (Role::System, SEND_FAILED.to_owned()),
        ]
    );
}

#[tokio::test]
async fn replies_land_in_submission_order() {
    let (view, bridge) = make_view();
    let first_gate = bridge.gate("first");
    let second_gate = bridge.gate("second");

    let v1 = Arc::clone(&view);
    let first = tokio::spawn(async move { v1.send_message("first").await });
    wait_for_len(&view, 1).await;
    let v2 = Arc::clone(&view);
    let second = tokio::spawn(async move { v2.send_message("second").await });
    wait_for_len(&view, 2).await;

    // The later send resolves first but must not overtake.
    let _ = second_gate.send(Err(CheddarError::Channel("rejected".to_owned())));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(view.len(), 2);

    let _ = first_gate.send(Ok(HostResponse::MessageResult(json!(null))));
    first.await.expect("first task");
    second.await.expect("second task");

    assert_eq!(
        roles_and_texts(&view),
        vec![
            (Role::User, "first".to_owned()),
            (Role::User, "second".to_owned()),
            (Role::Assistant, MESSAGE_SENT.to_owned()),
            (Role::System, SEND_FAILED.to_owned()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_sends_reply_in_transcript_order() {
    for round in 0..50 {
        let (view, bridge) = make_view();
        let mut sends = Vec::new();
        for i in 0..8 {
            let text = format!("r{round}-m{i}");
            if i % 2 == 1 {
                let gate = bridge.gate(&text);
                let _ = gate.send(Err(CheddarError::Channel("rejected".to_owned())));
            }
            let sender = Arc::clone(&view);
            sends.push(tokio::spawn(async move { sender.send_message(&text).await }));
        }
        for send in sends {
            send.await.expect("send task");
        }

        let entries = roles_and_texts(&view);
        let users: Vec<&str> = entries
            .iter()
            .filter(|(role, _)| *role == Role::User)
            .map(|(_, text)| text.as_str())
            .collect();
        let replies: Vec<&str> = entries
            .iter()
            .filter(|(role, _)| *role != Role::User)
            .map(|(_, text)| text.as_str())
            .collect();
        assert_eq!(users.len(), 8);
        assert_eq!(replies.len(), 8);
        for (user, reply) in users.iter().zip(&replies) {
            let rejected = user
                .rsplit('m')
                .next()
                .and_then(|i| i.parse::<u32>().ok())
                .is_some_and(|i| i % 2 == 1);
            let expected = if rejected { SEND_FAILED } else { MESSAGE_SENT };
            assert_eq!(*reply, expected, "round {round}: reply for {user}");
        }
    }
}

#[tokio::test]
async fn cancelled_send_does_not_block_the_next() {
    let (view, bridge) = make_view();
    let _held_gate = bridge.gate("stuck");

    let v1 = Arc::clone(&view);
    let stuck = tokio::spawn(async move { v1.send_message("stuck").await });
    wait_for_len(&view, 1).await;

    stuck.abort();
    let _ = stuck.await;

    view.send_message("next").await;
    assert_eq!(
        view.transcript().last().map(|m| m.text.clone()).as_deref(),
        Some(MESSAGE_SENT)
    );
}

#[tokio::test]
async fn submit_trims_and_ignores_blank_input() {
    let (view, _bridge) = make_view();

    assert!(!view.submit("   ").await);
    assert!(view.is_empty());

    assert!(view.submit("  hi there \n").await);
    assert_eq!(view.transcript()[0].text, "hi there");
    assert_eq!(view.len(), 2);
}

#[tokio::test]
async fn capture_transitions_append_system_messages() {
    let (view, _bridge) = make_view();
    assert_eq!(view.state(), ViewState::Idle);

    view.start_capture().await;
    assert_eq!(view.state(), ViewState::Capturing);
    assert!(view.controller().is_capturing());

    view.stop_capture();
    assert_eq!(view.state(), ViewState::Idle);
    assert!(!view.controller().is_capturing());

    assert_eq!(
        roles_and_texts(&view),
        vec![
            (Role::System, STARTING_CAPTURE.to_owned()),
            (Role::System, STOPPING_CAPTURE.to_owned()),
        ]
    );
}

#[tokio::test]
async fn bad_capture_defaults_surface_in_transcript() {
    let bridge = Arc::new(GatedBridge::default());
    let controller = Arc::new(Cheddar::new(Arc::new(MemorySettingsStore::new()), bridge));
    let view = SessionView::new(controller).with_capture_defaults(CaptureDefaults {
        interval: "fast".to_owned(),
        image_quality: "medium".to_owned(),
    });

    view.start_capture().await;

    assert_eq!(view.state(), ViewState::Idle);
    let transcript = view.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].role, Role::System);
    assert!(transcript[1].text.starts_with("Failed to start capture"));
}

#[tokio::test]
async fn navigation_event_leaves_transcript_unchanged() {
    let (view, bridge) = make_view();
    view.send_message("hello").await;
    let before = view.transcript();

    bridge.emit(json!("navigate-next-response"));
    bridge.emit(json!({"unexpected": "shape"}));

    assert_eq!(view.notifications_received(), 2);
    assert_eq!(view.transcript(), before);
}

#[tokio::test]
async fn teardown_releases_host_subscription() {
    let (view, bridge) = make_view();
    assert_eq!(bridge.events.subscriber_count(MESSAGE_EVENT), 1);

    view.teardown();
    view.teardown();
    bridge.emit(json!("scroll-response-up"));

    assert_eq!(bridge.events.subscriber_count(MESSAGE_EVENT), 0);
    assert_eq!(view.notifications_received(), 0);
}

#[tokio::test]
async fn transcript_updates_are_broadcast() {
    let (view, _bridge) = make_view();
    let mut updates = view.subscribe_transcript();

    view.send_message("hello").await;

    let first = updates.recv().await.expect("first update");
    let second = updates.recv().await.expect("second update");
    assert_eq!(first.role, Role::User);
    assert_eq!(second.role, Role::Assistant);
}
