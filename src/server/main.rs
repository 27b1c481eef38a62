//! Segmentation HTTP server entry point

use super::{serve, ServerConfig, DEFAULT_MAX_BODY_BYTES};
use crate::{
    cli::PipelineArgs,
    processor::SegmentationPipeline,
    tracing_config::{init_cli_tracing, TracingFormat},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

/// Subject cutout HTTP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgcutout-server")]
pub struct ServerCli {
    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Allowed CORS origin, repeatable ("*" allows any origin)
    #[arg(long = "cors-origin", value_name = "ORIGIN", default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Always answer 200 and report failures in the JSON body
    #[arg(long)]
    pub legacy_status: bool,

    /// Emit JSON log lines
    #[cfg(feature = "tracing-json")]
    #[arg(long)]
    pub json_logs: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

impl ServerCli {
    /// Server settings from the flags
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            max_body_bytes: self.max_body_bytes,
            legacy_status: self.legacy_status,
        }
    }

    fn tracing_format(&self) -> TracingFormat {
        #[cfg(feature = "tracing-json")]
        {
            if self.json_logs {
                return TracingFormat::Json;
            }
        }
        TracingFormat::Compact
    }
}

pub async fn main() -> Result<()> {
    let cli = ServerCli::parse();

    init_cli_tracing(
        cli.pipeline.verbose,
        cli.pipeline.log_filter.as_deref(),
        cli.tracing_format(),
    )
    .context("Failed to initialize tracing")?;

    let config = cli.pipeline.to_config()?;
    let pipeline = Arc::new(
        SegmentationPipeline::new(config).context("Failed to create segmentation pipeline")?,
    );
    info!(scorer = pipeline.scorer_name(), "Pipeline ready");

    serve(cli.server_config(), pipeline)
        .await
        .context("Server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_server_config() {
        let cli = ServerCli::try_parse_from(["bgcutout-server"]).unwrap();
        assert_eq!(cli.server_config(), ServerConfig::default());
    }

    #[test]
    fn test_flags() {
        let cli = ServerCli::try_parse_from([
            "bgcutout-server",
            "--host",
            "0.0.0.0",
            "-p",
            "9090",
            "--cors-origin",
            "https://a.example",
            "--cors-origin",
            "https://b.example",
            "--max-body-bytes",
            "1024",
            "--legacy-status",
            "--luminance-threshold",
            "128",
        ])
        .unwrap();

        let config = cli.server_config();
        assert_eq!(config.port, 9090);
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.max_body_bytes, 1024);
        assert!(config.legacy_status);
        assert_eq!(cli.pipeline.to_config().unwrap().luminance_threshold, 128);
    }
}
