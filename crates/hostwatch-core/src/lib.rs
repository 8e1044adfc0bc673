//! hostwatch-core - shared library for the hostwatch agent.
//!
//! Provides:
//! - `collector` - capability traits, `/proc` counter sources, battery sources
//!   and the snapshot assembler
//! - `rates` - differential rate engine (counter readings to per-second rates)
//! - `storage` - persisted record models and the JSON-lines sink

pub mod collector;
pub mod rates;
pub mod storage;
