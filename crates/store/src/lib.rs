//! Token store implementations for the ML Studio client.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileTokenStore;
pub use in_memory::InMemoryTokenStore;
