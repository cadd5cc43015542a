//! Compute module - Evolutionary search over action sequences.

pub mod evolution;
