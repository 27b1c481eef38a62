//! bgcutout CLI
//!
//! Writes transparent cutouts and masks for image files and directories.

#[cfg(feature = "cli")]
use bgcutout::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
