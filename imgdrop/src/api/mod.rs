//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Uploads** (`POST /upload`): multipart image upload, stored under the upload directory
//! - **Health** (`GET /healthz`): liveness check, registered directly in [`crate::build_router`]

pub mod handlers;
pub mod models;
