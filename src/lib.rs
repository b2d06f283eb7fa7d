//! Workspace placeholder crate.
//!
//! Re-exports the individual workspace crates so a host application (the
//! desktop shell) can depend on `printvault-workspace` without wiring each
//! crate individually.

pub use core_designs;
pub use core_sync;
pub use provider_makerworld;
