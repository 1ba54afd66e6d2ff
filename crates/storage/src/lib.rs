// Storage layer for the Podplane control plane
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// Two stores live here, both dispatched through StorageBackend:
// - the append-only event log (sole system of record)
// - the compute summary projection (denormalized read model)

pub mod backend;
pub mod memory;
pub mod models;
pub mod repositories;

pub use backend::StorageBackend;
pub use memory::InMemoryDatabase;
pub use repositories::Database;
