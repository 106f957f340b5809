//! Operation log of uploads, collection changes and archive moves.
//!
//! Producers emit through a cloneable [`AuditHandle`]; a single
//! [`AuditWriter`] task drains the channel into an [`AuditStore`].

mod events;
mod handle;
mod memory;
mod store;
mod writer;

pub use events::*;
pub use handle::*;
pub use memory::*;
pub use store::*;
pub use writer::*;
