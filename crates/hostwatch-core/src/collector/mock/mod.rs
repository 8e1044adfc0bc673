//! In-memory implementations of the capability traits, plus fixtures.
//!
//! Every mock shares its state between clones, so a test keeps one handle
//! to mutate the fake host while the collector owns another.

mod clock;
mod commands;
mod filesystem;
mod power;
mod scenarios;

pub use clock::MockClock;
pub use commands::MockCommands;
pub use filesystem::{MockFs, proc_io_content};
pub use power::MockPowerStatus;
pub use scenarios::{BATTERY_REPORT_HTML, TYPICAL_DISKSTATS};
