//! Schema module - Configuration, fitness and candidate types for rotation search.

mod config;
mod fitness;
mod individual;
mod progress;

pub use config::*;
pub use fitness::*;
pub use individual::*;
pub use progress::*;
