//! Application configuration management.
//!
//! Configuration is loaded from an optional YAML file with environment variable overrides. The
//! configuration file path defaults to `config.yaml` but can be specified via `-f` flag or
//! `IMGDROP_CONFIG` environment variable. A missing file is not an error: every field has a
//! default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **Defaults** - see the `Default` implementations below
//! 2. **YAML config file** - default: `config.yaml`
//! 3. **Environment variables** - variables prefixed with `IMGDROP_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `IMGDROP_UPLOADS__DIR=/srv/images` sets the `uploads.dir` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use imgdrop::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! IMGDROP_PORT=9000
//! IMGDROP_LOG_FORMAT=json
//! IMGDROP_UPLOADS__MAX_FORM_SIZE=5242880
//! IMGDROP_UPLOADS__SANITIZE_FILENAMES=false
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::Error;

/// Default cap on the size of a multipart request body (10 MiB)
pub const DEFAULT_MAX_FORM_SIZE: usize = 10 << 20;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "IMGDROP_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Output format for log lines
    pub log_format: LogFormat,
    /// Upload endpoint and storage settings
    pub uploads: UploadsConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Upload endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    /// Directory uploads are written to, relative to the working directory unless absolute
    pub dir: PathBuf,
    /// Path the upload handler is mounted at
    pub route: String,
    /// Name of the multipart part carrying the file
    pub field_name: String,
    /// Maximum accepted request body size in bytes, multipart framing included
    pub max_form_size: usize,
    /// Refuse filenames that could escape the upload directory.
    ///
    /// When disabled the client-supplied filename is joined onto `dir` unmodified. No basename
    /// is taken, so `a/b.png` lands in a nested `a/` directory and `../x.png` escapes `dir`.
    pub sanitize_filenames: bool,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            route: "/upload".to_string(),
            field_name: "myFile".to_string(),
            max_form_size: DEFAULT_MAX_FORM_SIZE,
            sanitize_filenames: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_format: LogFormat::default(),
            uploads: UploadsConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.uploads.max_form_size == 0 {
            return Err(Error::Internal {
                operation: "Config validation: uploads.max_form_size must be greater than zero".to_string(),
            });
        }

        if !self.uploads.route.starts_with('/') {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: uploads.route must start with '/', got '{}'",
                    self.uploads.route
                ),
            });
        }

        if self.uploads.field_name.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: uploads.field_name cannot be empty".to_string(),
            });
        }

        if self.uploads.dir.as_os_str().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: uploads.dir cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // IMGDROP_CONFIG names the file itself and is not a config key
            .merge(Env::prefixed("IMGDROP_").ignore(&["config"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
