//! Background Tasks Module
//!
//! # Tasks
//! - Cleanup: sweeps expired values out of the in-process store

mod cleanup;

pub use cleanup::spawn_cleanup_task;
