//! bgcutout HTTP server
//!
//! Serves `POST /segment` and `GET /health`.

#[cfg(feature = "server")]
use bgcutout::server;

#[cfg(feature = "server")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::main().await
}

#[cfg(not(feature = "server"))]
fn main() {
    panic!("Server feature not enabled. Please rebuild with --features server");
}
