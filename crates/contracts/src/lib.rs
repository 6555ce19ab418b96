//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the log shipper:
//! the batch context value, the sink and publisher capabilities, the error
//! taxonomy and the configuration model.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Batch Model
//! - A batch is one captured snapshot of buffered text published as a unit
//! - Every batch walks `Created -> Started -> Appended* -> Ended`
//! - A keep-open context re-enters `Started` from `Ended`

mod config;
mod context;
mod error;
mod publisher;
mod sink;

pub use config::*;
pub use context::*;
pub use error::*;
pub use publisher::*;
pub use sink::*;
