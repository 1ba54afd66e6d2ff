// Podplane control plane library
// Decision: Shared library for the server binary and for API tests

// HTTP API routes and types
pub mod api;

// In-memory Pod Directory adapter (dev mode and tests)
pub mod directory;

// Compute lifecycle service
pub mod service;

pub use directory::MemoryPodDirectory;
pub use service::ComputeLifecycle;
