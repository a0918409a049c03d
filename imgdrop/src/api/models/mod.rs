//! API request and response data models.
//!
//! - [`uploads`]: the file part read from an upload form and the receipt returned for it

pub mod uploads;
