//! Batch luminance analysis and contrast stretching for 8-bit images
//!
//! [`stretch`] holds the numeric core. The other modules wire it to image
//! files, reports, adjustment sessions, the console and HTTP.

pub mod analysis;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod prompt;
pub mod report;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod stretch;
