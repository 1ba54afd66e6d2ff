// Preset templates for compute pods
//
// Presets are owned by an external Preset Manager; the trait is the boundary.
// StaticPresetManager is the in-process implementation used by default: a
// fixed catalog, immutable once referenced.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::directory::PodResources;

/// Named pod template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub preset_id: String,
    pub image: String,
    pub resources: PodResources,
    pub ports: Vec<u16>,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("unknown preset: {0}")]
    Unknown(String),
}

#[async_trait]
pub trait PresetManager: Send + Sync {
    async fn resolve(&self, preset_id: &str) -> Result<PresetInfo, PresetError>;
}

/// In-process preset catalog.
pub struct StaticPresetManager {
    presets: HashMap<String, PresetInfo>,
}

/// Preset used when a create command names none.
pub const DEFAULT_PRESET_ID: &str = "base";

impl StaticPresetManager {
    pub fn new(presets: Vec<PresetInfo>) -> Self {
        Self {
            presets: presets
                .into_iter()
                .map(|p| (p.preset_id.clone(), p))
                .collect(),
        }
    }
}

impl Default for StaticPresetManager {
    fn default() -> Self {
        Self::new(vec![PresetInfo {
            preset_id: DEFAULT_PRESET_ID.to_string(),
            image: "ghcr.io/podplane/runtime:latest".to_string(),
            resources: PodResources {
                cpu: "500m".to_string(),
                memory: "512Mi".to_string(),
            },
            ports: vec![8080],
            env: HashMap::new(),
        }])
    }
}

#[async_trait]
impl PresetManager for StaticPresetManager {
    async fn resolve(&self, preset_id: &str) -> Result<PresetInfo, PresetError> {
        self.presets
            .get(preset_id)
            .cloned()
            .ok_or_else(|| PresetError::Unknown(preset_id.to_string()))
    }
}
