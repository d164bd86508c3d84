//! `shape-psm` library crate.
//!
//! The binary (`shape`) is a thin wrapper around this library so that:
//!
//! - the matching engine is testable without spawning processes
//! - a partition can be enriched from any caller (`psm::enrich_partition`)
//! - I/O and orchestration stay out of the numerical code

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod psm;
pub mod report;
