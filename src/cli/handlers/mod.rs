//! Command handlers for CLI operations
//!
//! This module contains handlers for different CLI commands,
//! separating command execution logic from parsing and validation.

pub mod check;
pub mod entry;
pub mod flush;
pub mod maintain;
pub mod run;

pub use check::CheckCommandHandler;
pub use entry::EntryCommandHandler;
pub use flush::FlushCommandHandler;
pub use maintain::MaintainCommandHandler;
pub use run::RunCommandHandler;
