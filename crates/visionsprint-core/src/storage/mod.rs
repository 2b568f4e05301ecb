//! Storage backends implementing [`crate::HackathonStore`].

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;
