//! HTTP request handlers.
//!
//! - [`uploads`]: multipart image upload and storage
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Result`]; errors render as a status code plus a one-line
//! plain-text message.

pub mod uploads;
