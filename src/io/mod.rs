//! Input/output helpers.
//!
//! - CSV ingest (`ingest`)
//! - enriched CSV, error log and run report exports (`export`)
//! - matching settings file (`settings`)

pub mod export;
pub mod ingest;
pub mod settings;

pub use export::*;
pub use ingest::*;
pub use settings::*;
