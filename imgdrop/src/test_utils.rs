//! Test utilities for HTTP-level tests.

use crate::config::{Config, UploadsConfig};
use axum_test::TestServer;
use std::path::Path;
use tempfile::TempDir;

/// Config with uploads written to `<root>/uploads` and everything else at its default
pub fn create_test_config(root: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        uploads: UploadsConfig {
            dir: root.join("uploads"),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn create_test_server_with_config(config: Config) -> TestServer {
    crate::Application::new(config).into_test_server()
}

/// Test server backed by a fresh temporary directory.
///
/// The directory is removed when the returned [`TempDir`] is dropped, so keep it alive for the
/// duration of the test.
pub fn create_test_server() -> (TestServer, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let server = create_test_server_with_config(create_test_config(dir.path()));
    (server, dir)
}
