use crate::physics::math::Scalar;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub physics: PhysicsConfig,
    pub constraints: ConstraintConfig,
    pub run: RunConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct PhysicsConfig {
    pub timestep: Scalar,
    pub temperature: Scalar,
    pub molecule_count: usize,
    pub bond_length: Scalar,
    pub lattice_spacing: Scalar,
    pub initial_seed: Option<u64>,
    pub integrator: IntegratorConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            timestep: 0.002,
            temperature: 1.0,
            molecule_count: 64,
            bond_length: 1.0,
            lattice_spacing: 2.2,
            initial_seed: None,
            integrator: IntegratorConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct IntegratorConfig {
    pub integrator_type: String,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            integrator_type: "velocity_verlet".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ConstraintConfig {
    pub tolerance: Scalar,
    pub max_sweeps: usize,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_sweeps: 200,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RunConfig {
    pub steps: u64,
    pub log_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: 1000,
            log_interval: 100,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a file, falling back to defaults if the file doesn't exist
    pub fn load_or_default(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config file {path}: {e}. Using defaults.");
                    Self::default()
                }
            },
            Err(_) => {
                info!("Config file {path} not found. Using defaults.");
                Self::default()
            }
        }
    }

    /// Load from the user-level config file when one exists, else defaults.
    pub fn load_from_user_config() -> Self {
        match Self::user_config_path() {
            Some(path) if path.exists() => Self::load_or_default(&path.to_string_lossy()),
            _ => Self::default(),
        }
    }

    /// Platform config location, e.g. `~/.config/moldrift/config.toml`.
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "moldrift")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
