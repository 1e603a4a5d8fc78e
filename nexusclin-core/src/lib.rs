//! NexusClin Core - Data Types
//!
//! Pure data structures with no I/O. All other crates depend on this.
//! This crate contains only types and pure helpers - no business logic
//! that talks to the network or the filesystem.

pub mod capability;
pub mod competencia;
pub mod error;
pub mod schedule;
pub mod session;
pub mod types;

pub use capability::Feature;
pub use competencia::Competencia;
pub use error::CoreError;
pub use session::{has_role, Role, Session};
pub use types::*;
