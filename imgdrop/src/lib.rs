//! # imgdrop: image upload service
//!
//! `imgdrop` exposes a single HTTP endpoint that accepts a `multipart/form-data` upload, checks
//! that the uploaded bytes really are an image, and writes them to a local directory.
//!
//! ## Request Flow
//!
//! A `POST /upload` request is handled by [`api::handlers::uploads::upload_file`]:
//!
//! 1. The multipart body is parsed, capped at `uploads.max_form_size` bytes (10 MiB by default).
//! 2. The part named `myFile` is located and read fully into memory.
//! 3. The bytes are classified by [`sniff::detect_content_type`]; anything that does not sniff
//!    as `image/*` is refused with `415 Unsupported Media Type`.
//! 4. The content is written to `uploads/<filename>` through [`storage::UploadStorage`],
//!    replacing any file of the same name.
//! 5. A short plain-text receipt is returned.
//!
//! There is no state shared between requests beyond the immutable [`AppState`]; concurrency is
//! whatever the tokio runtime and hyper provide.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use imgdrop::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = imgdrop::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     imgdrop::telemetry::init_telemetry(config.log_format)?;
//!
//!     Application::new(config)
//!         .serve(async {
//!             tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!         })
//!         .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod errors;
pub mod sniff;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use storage::UploadStorage;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .storage(UploadStorage::new(&config.uploads))
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub storage: UploadStorage,
}

/// Build the application router.
///
/// Routes:
/// - `POST {uploads.route}`: image upload, with the body capped at `uploads.max_form_size`
/// - `GET /healthz`: liveness check
///
/// Every request is wrapped in a tracing span.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    let upload_route = state.config.uploads.route.clone();
    let body_limit = state.config.uploads.max_form_size;

    Router::new()
        .route(&upload_route, post(api::handlers::uploads::upload_file))
        // Only applies to routes added above
        .layer(DefaultBodyLimit::max(body_limit))
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct owning the router and configuration.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the shared state and the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> Self {
        debug!("Starting imgdrop with configuration: {:#?}", config);

        let state = AppState::builder()
            .storage(UploadStorage::new(&config.uploads))
            .config(config.clone())
            .build();
        let router = build_router(state);

        Self { router, config }
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            upload_route = %self.config.uploads.route,
            upload_dir = %self.config.uploads.dir.display(),
            "imgdrop listening on http://{}",
            bind_addr
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Server stopped");
        Ok(())
    }
}
