pub mod client;
pub mod error;
pub mod memory;
pub mod rest;
pub mod sqlite;

pub use client::TradeStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;
