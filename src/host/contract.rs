//! Versioned host command/event envelopes and the typed operation vocabulary.
//!
//! On the wire every operation is a positional argument list; [`HostRequest`]
//! and [`HostResponse`] give each operation a typed shape that is validated on
//! both sides of the bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Name of the unsolicited host notification event.
pub const MESSAGE_EVENT: &str = "message";

/// Named operations the controller may invoke on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationName {
    #[serde(rename = "initialize-gemini")]
    InitializeGemini,
    #[serde(rename = "send-text-message")]
    SendTextMessage,
    #[serde(rename = "toggle-window-visibility")]
    ToggleWindowVisibility,
    #[serde(rename = "quit-application")]
    QuitApplication,
    #[serde(rename = "update-content-protection")]
    UpdateContentProtection,
    #[serde(rename = "update-sizes")]
    UpdateSizes,
}

impl OperationName {
    /// Render operation name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitializeGemini => "initialize-gemini",
            Self::SendTextMessage => "send-text-message",
            Self::ToggleWindowVisibility => "toggle-window-visibility",
            Self::QuitApplication => "quit-application",
            Self::UpdateContentProtection => "update-content-protection",
            Self::UpdateSizes => "update-sizes",
        }
    }

    /// Parse an operation name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "initialize-gemini" => Some(Self::InitializeGemini),
            "send-text-message" => Some(Self::SendTextMessage),
            "toggle-window-visibility" => Some(Self::ToggleWindowVisibility),
            "quit-application" => Some(Self::QuitApplication),
            "update-content-protection" => Some(Self::UpdateContentProtection),
            "update-sizes" => Some(Self::UpdateSizes),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned command envelope from controller -> host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: OperationName,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(request_id: impl Into<String>, command: OperationName, args: Vec<Value>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            args,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned response envelope from host -> controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned, unsolicited event envelope from host -> controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(event_id: impl Into<String>, event: impl Into<String>, payload: Value) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Typed request for each named host operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    /// Arm the assistant. Arguments are positional:
    /// `(api_key, custom_prompt, profile, language)`.
    InitializeGemini {
        api_key: String,
        custom_prompt: String,
        profile: String,
        language: String,
    },
    SendTextMessage {
        text: String,
    },
    ToggleWindowVisibility,
    QuitApplication,
    UpdateContentProtection {
        enabled: bool,
    },
    UpdateSizes,
}

impl HostRequest {
    #[must_use]
    pub fn operation(&self) -> OperationName {
        match self {
            Self::InitializeGemini { .. } => OperationName::InitializeGemini,
            Self::SendTextMessage { .. } => OperationName::SendTextMessage,
            Self::ToggleWindowVisibility => OperationName::ToggleWindowVisibility,
            Self::QuitApplication => OperationName::QuitApplication,
            Self::UpdateContentProtection { .. } => OperationName::UpdateContentProtection,
            Self::UpdateSizes => OperationName::UpdateSizes,
        }
    }

    /// Positional wire arguments, in documented order.
    #[must_use]
    pub fn to_args(&self) -> Vec<Value> {
        match self {
            Self::InitializeGemini {
                api_key,
                custom_prompt,
                profile,
                language,
            } => vec![
                Value::from(api_key.as_str()),
                Value::from(custom_prompt.as_str()),
                Value::from(profile.as_str()),
                Value::from(language.as_str()),
            ],
            Self::SendTextMessage { text } => vec![Value::from(text.as_str())],
            Self::UpdateContentProtection { enabled } => vec![Value::Bool(*enabled)],
            Self::ToggleWindowVisibility | Self::QuitApplication | Self::UpdateSizes => Vec::new(),
        }
    }

    #[must_use]
    pub fn into_envelope(self, request_id: impl Into<String>) -> CommandEnvelope {
        CommandEnvelope::new(request_id, self.operation(), self.to_args())
    }

    /// Rebuild a typed request from a command envelope (host side).
    pub fn from_envelope(envelope: &CommandEnvelope) -> Result<Self, ContractError> {
        envelope.validate()?;
        let op = envelope.command;
        let args = &envelope.args;
        let request = match op {
            OperationName::InitializeGemini => Self::InitializeGemini {
                api_key: arg_str(args, 0, "api_key", op)?,
                custom_prompt: arg_str(args, 1, "custom_prompt", op)?,
                profile: arg_str(args, 2, "profile", op)?,
                language: arg_str(args, 3, "language", op)?,
            },
            OperationName::SendTextMessage => Self::SendTextMessage {
                text: arg_str(args, 0, "text", op)?,
            },
            OperationName::UpdateContentProtection => Self::UpdateContentProtection {
                enabled: arg_bool(args, 0, "enabled", op)?,
            },
            OperationName::ToggleWindowVisibility => Self::ToggleWindowVisibility,
            OperationName::QuitApplication => Self::QuitApplication,
            OperationName::UpdateSizes => Self::UpdateSizes,
        };
        Ok(request)
    }

    /// Interpret a response envelope by the shape this operation documents.
    ///
    /// A rejected response maps to [`crate::CheddarError::HostRejected`]; a
    /// payload of the wrong shape maps to a contract error.
    pub fn decode_response(&self, response: ResponseEnvelope) -> crate::Result<HostResponse> {
        let op = self.operation();
        if !response.ok {
            return Err(crate::CheddarError::HostRejected {
                operation: op.as_str().to_owned(),
                message: response
                    .error
                    .unwrap_or_else(|| "host returned ok=false without a message".to_owned()),
            });
        }
        match op {
            OperationName::InitializeGemini => match response.payload {
                Value::Bool(initialized) => Ok(HostResponse::Initialized(initialized)),
                other => Err(ContractError::new(
                    ContractErrorKind::MalformedResponse,
                    format!("{op} must return a boolean, got {other}"),
                )
                .into()),
            },
            OperationName::SendTextMessage => Ok(HostResponse::MessageResult(response.payload)),
            OperationName::ToggleWindowVisibility
            | OperationName::QuitApplication
            | OperationName::UpdateContentProtection
            | OperationName::UpdateSizes => Ok(HostResponse::Ack),
        }
    }
}

/// Typed result of a host operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostResponse {
    /// `initialize-gemini` result.
    Initialized(bool),
    /// Opaque backend acknowledgment for `send-text-message`.
    MessageResult(Value),
    /// Void operations.
    Ack,
}

impl HostResponse {
    /// Wire payload for this response (host side).
    #[must_use]
    pub fn into_payload(self) -> Value {
        match self {
            Self::Initialized(initialized) => Value::Bool(initialized),
            Self::MessageResult(payload) => payload,
            Self::Ack => Value::Null,
        }
    }
}

/// Payloads the host pushes on the [`MESSAGE_EVENT`] channel.
#[derive(Debug, Clone, PartialEq)]
pub enum HostNotification {
    NavigatePreviousResponse,
    NavigateNextResponse,
    ScrollResponseUp,
    ScrollResponseDown,
    /// Anything else. Never an error.
    Other(Value),
}

impl HostNotification {
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        match payload.as_str() {
            Some("navigate-previous-response") => Self::NavigatePreviousResponse,
            Some("navigate-next-response") => Self::NavigateNextResponse,
            Some("scroll-response-up") => Self::ScrollResponseUp,
            Some("scroll-response-down") => Self::ScrollResponseDown,
            _ => Self::Other(payload.clone()),
        }
    }

    /// Whether this is one of the response navigation commands.
    #[must_use]
    pub fn is_navigation(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

fn arg_str(
    args: &[Value],
    index: usize,
    name: &str,
    op: OperationName,
) -> Result<String, ContractError> {
    match args.get(index).and_then(Value::as_str) {
        Some(value) => Ok(value.to_owned()),
        None => Err(ContractError::new(
            ContractErrorKind::InvalidArguments,
            format!("{op} requires args[{index}] ({name}) as a string"),
        )),
    }
}

fn arg_bool(
    args: &[Value],
    index: usize,
    name: &str,
    op: OperationName,
) -> Result<bool, ContractError> {
    match args.get(index).and_then(Value::as_bool) {
        Some(value) => Ok(value),
        None => Err(ContractError::new(
            ContractErrorKind::InvalidArguments,
            format!("{op} requires args[{index}] ({name}) as a boolean"),
        )),
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
    InvalidArguments,
    MalformedResponse,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}
