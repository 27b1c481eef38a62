//! Wire types shared by the CLI JSON output and the HTTP server

pub mod response;

pub use response::{ErrorResponse, SegmentationResponse};
