//! Database schema and queries
//!
//! Repositories are free functions over a `SqlitePool`, grouped per table.

pub mod init;
pub mod playlists;
pub mod seed;
pub mod songs;

pub use init::{create_schema, init_database, init_memory_database};
pub use seed::seed_demo_library;
pub use songs::SongRecord;
