//! # SecureShred - Multi-pass File Shredding Library
//!
//! SecureShred destroys file contents by overwriting them with a sequence of
//! deterministic and random patterns, flushing each pass to storage, renaming
//! the file to a random name and finally removing it. Directories can be
//! shredded recursively.
//!
//! ## Features
//!
//! - **Pass plans**: DoD-style `zeros, ones, random` or an alternating-bit scheme
//! - **Durable passes**: every pass is flushed and `fsync`ed before the next
//! - **Partial-failure tolerant**: one bad file never stops the run
//! - **Verification**: optional read-back of deterministic passes
//! - **Cancellation**: honoured only at pass boundaries
//!
//! ## Quick Start
//!
//! ```no_run
//! use secureshred::{config::Config, walker::TreeWalker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = Config { passes: 3, recursive: true, ..Config::default() };
//!     let mut walker = TreeWalker::new(&cfg)?;
//!
//!     let report = walker.run(&["./old-secrets"]).await;
//!     println!("{:?}", report.summarize());
//!     Ok(())
//! }
//! ```
//!
//! ## Limitations
//!
//! Only the logical extent of a file is overwritten through the OS file API.
//! Copy-on-write and log-structured filesystems, journaling and SSD wear
//! levelling can all keep older copies of the data out of reach.

pub mod config;
pub mod error;
pub mod pattern;
pub mod report;
pub mod shredder;
pub mod walker;

// Re-export common types for convenience
pub use error::{FailureReason, ShredError};
pub use pattern::{Pass, PassPlan, PassScheme, RandomSource};
pub use report::{ExitStatus, FinalState, ShredOutcome, ShredReport, Summary};
pub use walker::{run, TreeWalker};
