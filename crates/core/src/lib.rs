//! Webcam face detection client.
//!
//! Captures frames from a local device, ships them to a remote
//! detection/recognition service and turns the replies into an overlay.
//! All state transitions live in [`session::state`]; the
//! [`session::controller::Controller`] executes their side effects.

pub mod capture;
pub mod overlay;
pub mod recognition;
pub mod session;
pub mod shared;
