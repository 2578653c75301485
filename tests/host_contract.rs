use cheddar::CheddarError;
use cheddar::host::contract::{
    CommandEnvelope, ContractErrorKind, EVENT_VERSION, EventEnvelope, HostNotification,
    HostRequest, HostResponse, OperationName, ResponseEnvelope,
};
use serde_json::{Value, json};

#[test]
fn every_operation_round_trips_through_its_wire_name() {
    let all = [
        OperationName::InitializeGemini,
        OperationName::SendTextMessage,
        OperationName::ToggleWindowVisibility,
        OperationName::QuitApplication,
        OperationName::UpdateContentProtection,
        OperationName::UpdateSizes,
    ];
    for op in all {
        let json = serde_json::to_value(op).expect("serialize operation");
        assert_eq!(json, Value::from(op.as_str()));
        assert_eq!(OperationName::parse(op.as_str()), Some(op));
    }
    assert_eq!(OperationName::parse("update_sizes"), None);
}

#[test]
fn command_envelope_parses_from_host_json() {
    let raw = r#"{"v":1,"request_id":"r-1","command":"send-text-message","args":["hello"]}"#;
    let envelope: CommandEnvelope = serde_json::from_str(raw).expect("parse envelope");
    assert_eq!(envelope.command, OperationName::SendTextMessage);

    let request = HostRequest::from_envelope(&envelope).expect("typed request");
    assert_eq!(
        request,
        HostRequest::SendTextMessage {
            text: "hello".to_owned()
        }
    );
}

#[test]
fn command_envelope_without_args_defaults_to_empty() {
    let raw = r#"{"v":1,"request_id":"r-2","command":"update-sizes"}"#;
    let envelope: CommandEnvelope = serde_json::from_str(raw).expect("parse envelope");
    assert!(envelope.args.is_empty());
    assert_eq!(
        HostRequest::from_envelope(&envelope).expect("typed request"),
        HostRequest::UpdateSizes
    );
}

#[test]
fn unknown_command_is_a_parse_error() {
    let raw = r#"{"v":1,"request_id":"r-3","command":"open-devtools","args":[]}"#;
    assert!(serde_json::from_str::<CommandEnvelope>(raw).is_err());
}

#[test]
fn wrong_version_is_rejected() {
    let mut envelope = HostRequest::UpdateSizes.into_envelope("r-4");
    envelope.v = EVENT_VERSION + 1;
    let err = envelope.validate().expect_err("version mismatch");
    assert_eq!(err.kind, ContractErrorKind::UnsupportedVersion);
}

#[test]
fn blank_request_id_is_rejected() {
    let envelope = HostRequest::ToggleWindowVisibility.into_envelope("  ");
    let err = envelope.validate().expect_err("blank id");
    assert_eq!(err.kind, ContractErrorKind::InvalidEnvelope);
}

#[test]
fn initialize_envelope_carries_four_positional_strings() {
    let envelope = HostRequest::InitializeGemini {
        api_key: "key".to_owned(),
        custom_prompt: "be terse".to_owned(),
        profile: "interview".to_owned(),
        language: "en-US".to_owned(),
    }
    .into_envelope("r-5");
    let json = serde_json::to_value(&envelope).expect("serialize envelope");
    assert_eq!(json["command"], "initialize-gemini");
    assert_eq!(json["args"], json!(["key", "be terse", "interview", "en-US"]));
    assert_eq!(json["v"], EVENT_VERSION);
}

#[test]
fn initialize_decodes_boolean_payload() {
    let request = HostRequest::InitializeGemini {
        api_key: "key".to_owned(),
        custom_prompt: String::new(),
        profile: "interview".to_owned(),
        language: "en-US".to_owned(),
    };
    let decoded = request.decode_response(ResponseEnvelope::ok("r-6", json!(false)));
    assert_eq!(decoded.ok(), Some(HostResponse::Initialized(false)));
}

#[test]
fn send_result_payload_is_passed_through() {
    let request = HostRequest::SendTextMessage {
        text: "hi".to_owned(),
    };
    let payload = json!({"accepted": true, "nested": [1, 2]});
    let decoded = request.decode_response(ResponseEnvelope::ok("r-7", payload.clone()));
    assert_eq!(decoded.ok(), Some(HostResponse::MessageResult(payload)));
}

#[test]
fn rejection_without_message_still_names_operation() {
    let mut response = ResponseEnvelope::error("r-8", "x");
    response.error = None;
    match HostRequest::UpdateSizes.decode_response(response) {
        Err(CheddarError::HostRejected { operation, .. }) => {
            assert_eq!(operation, "update-sizes");
        }
        other => panic!("expected host rejection, got {other:?}"),
    }
}

#[test]
fn response_envelope_tolerates_missing_payload() {
    let raw = r#"{"v":1,"request_id":"r-9","ok":true}"#;
    let response: ResponseEnvelope = serde_json::from_str(raw).expect("parse response");
    assert_eq!(response.payload, Value::Null);
    assert_eq!(response.error, None);
}

#[test]
fn navigation_payloads_are_recognised() {
    let cases = [
        ("navigate-previous-response", HostNotification::NavigatePreviousResponse),
        ("navigate-next-response", HostNotification::NavigateNextResponse),
        ("scroll-response-up", HostNotification::ScrollResponseUp),
        ("scroll-response-down", HostNotification::ScrollResponseDown),
    ];
    for (raw, expected) in cases {
        let event = EventEnvelope::new("e-1", "message", json!(raw));
        let notification = HostNotification::from_payload(&event.payload);
        assert!(notification.is_navigation());
        assert_eq!(notification, expected);
    }
}
