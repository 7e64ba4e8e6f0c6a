//! # motewatch Configuration
//!
//! Layered configuration for the observer, the attack schedule and the
//! traffic simulator.
//!
//! Hierarchy, later layers win:
//! 1. Built-in defaults
//! 2. A YAML file (`config/motewatch.yaml` unless a path is given)
//! 3. `MOTEWATCH_*` environment variables, `__` separating nested keys
//!    (`MOTEWATCH_SIMULATOR__SEED=7`)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

mod attack;
mod core;
mod error;
mod network;
mod output;
mod run;
mod simulator;
mod telemetry;
mod validation;

pub use attack::{AttackConfig, FaultProgramConfig, FaultStepConfig};
pub use core::{CoreConfig, EventBusConfig};
pub use error::ConfigError;
pub use network::NetworkConfig;
pub use output::OutputConfig;
pub use run::RunConfig;
pub use simulator::SimulatorConfig;
pub use telemetry::TelemetryConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/motewatch.yaml";
const ENV_PREFIX: &str = "MOTEWATCH_";

#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
#[serde(default)]
#[validate(schema(function = "validate_targets"))]
pub struct MotewatchConfig {
    #[validate(nested)]
    pub network: NetworkConfig,

    #[validate(nested)]
    pub attacks: Vec<AttackConfig>,

    #[validate(nested)]
    pub output: OutputConfig,

    #[validate(nested)]
    pub run: RunConfig,

    #[validate(nested)]
    pub core: CoreConfig,

    #[validate(nested)]
    pub simulator: SimulatorConfig,

    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl MotewatchConfig {
    /// Loads defaults, `config/motewatch.yaml` when present, then the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Self::defaults();
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        } else {
            eprintln!("{DEFAULT_CONFIG_PATH} not found, using default configuration");
        }
        Self::finish(figment)
    }

    /// Like [`MotewatchConfig::load`] but the file must exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }
        Self::finish(Self::defaults().merge(Yaml::file(path)))
    }

    /// Parses a YAML document on top of the defaults, without the
    /// environment layer.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = Self::defaults().merge(Yaml::string(yaml)).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(MotewatchConfig::default()))
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

fn validate_targets(config: &MotewatchConfig) -> Result<(), ValidationError> {
    let node_count = config.network.node_count;
    if config
        .attacks
        .iter()
        .any(|attack| attack.target as usize >= node_count)
    {
        return Err(validation::invalid(
            "target_out_of_range",
            "attack target must be below network.node_count",
        ));
    }
    Ok(())
}
