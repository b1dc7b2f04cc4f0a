//! Adapter implementations of the dealing ports.

pub mod memory;
