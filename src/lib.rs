//! GrantScope progress core library.
//!
//! This library tracks the progress of long-running advisor analysis jobs
//! and holds their finished reports: the stage catalogue and message
//! classifier, the per-report progress store, the report store, and the
//! [`hub::ProgressHub`] that hands both to producers and readers. The
//! command line interface and terminal views used by the bundled binary
//! live here too.

pub mod cli;
pub mod hub;
pub mod output_mode;
pub mod progress;
pub mod report;
pub mod runner;
pub mod stage;
pub mod status;

pub use hub::ProgressHub;
