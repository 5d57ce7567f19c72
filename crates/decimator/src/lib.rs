//! Feed Decimation
//!
//! Collapses raw feeds into one averaged feed per station per time bucket.
//! Everything here is a pure function of its inputs.

mod bucket;
mod window;

pub use bucket::decimate;
pub use window::{nearest_tick, Window, WindowError, DEFAULT_WINDOW_MS};
