//! Small shared helpers.

pub mod url;
