//! Persistence layer — user and message records.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{MessageStore, StoredMessage, User, UserStore};
