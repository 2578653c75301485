//! UI state machine: transcript and capture on/off state over a
//! [`crate::Cheddar`] controller.
//!
//! Rendering is not handled here. A renderer reads [`SessionView::transcript`]
//! or follows [`SessionView::subscribe_transcript`].

mod session_view;
mod transcript;

pub use session_view::{
    CaptureDefaults, MESSAGE_SENT, SEND_FAILED, STARTING_CAPTURE, STOPPING_CAPTURE, SessionView,
    ViewState,
};
pub use transcript::{Message, Role, Transcript};
