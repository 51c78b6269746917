//! Remote-control client for the Alexa cloud API.
//!
//! This module provides:
//! - `AlexaClient`: one authenticated HTTP session against the Alexa API
//! - `commands`: the sequence command catalog and envelope builder
//! - `Credentials`: cookie/CSRF extraction from the persisted blob
//!
//! The login flow itself is not implemented here; a cookie produced by the
//! external login helper is the only way in.

pub mod client;
pub mod commands;
pub mod credentials;
pub mod error;

pub use client::AlexaClient;
pub use credentials::Credentials;
pub use error::AlexaError;
