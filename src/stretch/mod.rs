//! Luminance-based contrast stretching
//!
//! Histogram accumulation, percentile limit derivation and lookup-table
//! remapping. Everything in here is pure and infallible; decoding and file
//! handling live in [`crate::codec`].

pub mod histogram;
pub mod limits;
pub mod luminance;
pub mod lut;

pub use histogram::{Histogram, BUCKETS};
pub use limits::{ContrastLimits, Cutoff, CutoffPair};
pub use luminance::LuminanceMode;
pub use lut::LookupTable;
