//! Session state for the Alexa connection.
//!
//! This module provides:
//! - `SessionStore`: best-effort persistence of the session cookie and
//!   device-management token as whole-file JSON blobs
//! - `SessionManager`: owns the single live `AlexaClient` behind one
//!   mutation point and persists credential updates as they arrive
//!
//! The blobs are opaque to the bridge; they are handed to the client
//! verbatim and rewritten whenever the client reports fresh credentials.

pub mod manager;
pub mod store;

pub use manager::{CredentialUpdate, SessionManager};
pub use store::SessionStore;
