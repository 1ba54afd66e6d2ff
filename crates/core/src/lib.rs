// Podplane core domain types
// Decision: This crate has NO dependency on storage or HTTP - purely domain abstractions

pub mod compute;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod preset;
pub mod telemetry;

pub use compute::{ComputeState, ComputeStatus, ComputeSummary};
pub use config::{ControlPlaneConfig, GatewayConfig};
pub use directory::{DirectoryError, PodDirectory, PodInfo, PodResources, PodSpec};
pub use error::{ComputeError, Result};
pub use events::{
    ComputeCreateFailed, ComputeCreated, ComputeEvent, ComputeStarted, ComputeTerminated,
    EventRecord,
};
pub use preset::{PresetError, PresetInfo, PresetManager, StaticPresetManager};
