//! Services separating image I/O and output encoding from pipeline logic

pub mod format;
pub mod io;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
