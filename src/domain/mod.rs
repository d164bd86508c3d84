//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the row store that carries populations (`Table`, `Value`)
//! - the per-partition matching configuration (`MatchConfig`)
//! - intermediate and output types (`Shortlists`, `MatchedPair`, `MatchDiagnostics`)

pub mod table;
pub mod types;

pub use table::*;
pub use types::*;
