//! In-memory backends for every store contract.
//!
//! Cheap to clone (state is shared behind `Arc`), safe for concurrent use,
//! and used both by `prestasi serve` and by the test suites.

mod content;
mod directory;
mod reference;

pub use content::MemoryContentStore;
pub use directory::MemoryDirectory;
pub use reference::{MemoryReferenceStore, MemorySnapshot};
