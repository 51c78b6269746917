//! Data models for Alexa entities.
//!
//! The bridge passes most upstream payloads through untouched; the only
//! typed model is the device record, which command dispatch needs for
//! serial/type/owner lookups.

pub mod device;

pub use device::{Device, DeviceDirectory, DevicesResponse, WakeWordsResponse};
