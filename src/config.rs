//! Run configuration
//!
//! A run is read from TOML, with `EMTRACKS__` environment variables layered on
//! top and defaults filling whatever neither provides.

use crate::error::ConfigError;
use crate::physics::bounds::Bounds;
use crate::physics::events::{TerminationPolicy, ZEvents};
use crate::physics::fields::FieldModel;
use crate::physics::solver::SolverOptions;
use crate::physics::species::ParticleModel;
use crate::reconstruction::ReconstructionOptions;
use crate::trajectory::InitialConditions;
use bevy::log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variables overriding configuration values,
/// e.g. `EMTRACKS__SOLVER__ATOL=1e-9`
pub const ENV_PREFIX: &str = "EMTRACKS";

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub particle: ParticleConfig,
    pub initial: InitialConditions,
    pub bounds: Option<Bounds>,
    pub z_events: Option<ZEvents>,
    pub solver: SolverOptions,
    pub fields: FieldConfig,
    pub reconstruction: ReconstructionConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ParticleConfig {
    /// Signed PDG species number; negative selects the antiparticle
    pub species_id: i32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self { species_id: 11 }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    pub magnetic: FieldModel,
    pub electric: FieldModel,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            magnetic: FieldModel::default_magnetic(),
            electric: FieldModel::Zero,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ReconstructionConfig {
    #[serde(flatten)]
    pub options: ReconstructionOptions,
    /// Field assumed by the reconstruction; the tracking field when absent
    pub magnetic: Option<FieldModel>,
}

impl ReconstructionConfig {
    pub fn magnetic_or<'a>(&'a self, tracking: &'a FieldModel) -> &'a FieldModel {
        self.magnetic.as_ref().unwrap_or(tracking)
    }
}

impl RunConfig {
    /// Load configuration from a file, falling back to defaults if the file doesn't exist
    pub fn load_or_default(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config file {}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("Config file {} not found. Using defaults.", path);
                Self::default()
            }
        }
    }

    /// Defaults, then the TOML file at `path` if given, then
    /// `EMTRACKS__*` environment variables
    pub fn load_layered(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// `<user config dir>/emtracks/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "emtracks")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Layered load from the user configuration file, falling back to
    /// defaults on any error
    pub fn load_from_user_config() -> Self {
        let path = Self::user_config_path();
        match Self::load_layered(path.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load user configuration: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every section that can be rejected before integrating
    pub fn validate(&self) -> Result<(), ConfigError> {
        ParticleModel::from_species_id(self.particle.species_id)?;
        self.initial.validate()?;
        self.termination_policy()?;
        if let Some(events) = &self.z_events {
            events.validate()?;
        }
        self.solver.validate()?;
        self.reconstruction.options.validate()
    }

    pub fn particle_model(&self) -> Result<ParticleModel, ConfigError> {
        ParticleModel::from_species_id(self.particle.species_id)
    }

    pub fn termination_policy(&self) -> Result<TerminationPolicy, ConfigError> {
        TerminationPolicy::from_bounds(self.bounds.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::math::Vector;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.particle.species_id, 11);
        assert_eq!(config.solver.atol, 1e-10);
        assert_eq!(config.reconstruction.options.step, 100);
        assert_eq!(config.fields.magnetic, FieldModel::default_magnetic());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RunConfig = toml::from_str(
            r#"
            [particle]
            species_id = -13

            [initial]
            p0 = 250.0

            [bounds]
            xmin = -1.0
            xmax = 1.0
            ymin = -1.0
            ymax = 1.0
            zmin = 0.0
            zmax = 5.0

            [z_events]
            planes = [1.0, 2.0]

            [fields.magnetic]
            kind = "axial_gradient"
            bz0 = 1.0
            gradient = -0.05
            z_ref = 0.0

            [reconstruction]
            step = 50
            stride = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.particle.species_id, -13);
        assert_eq!(config.initial.p0, 250.0);
        assert_eq!(config.initial.n_t, InitialConditions::default().n_t);
        assert_eq!(config.z_events.as_ref().map(|e| e.rtol), Some(1e-2));
        assert_eq!(config.reconstruction.options.step, 50);
        assert_eq!(config.reconstruction.options.stride, 5);
        assert!(matches!(config.fields.magnetic, FieldModel::AxialGradient { .. }));
        assert_eq!(config.fields.electric, FieldModel::Zero);
        assert!(matches!(
            config.termination_policy(),
            Ok(TerminationPolicy::ExitBox(_))
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = RunConfig::default();
        config.z_events = Some(ZEvents::new(vec![0.5]));
        config.reconstruction.magnetic = Some(FieldModel::Scaled {
            factor: 1.01,
            field: Box::new(FieldModel::default_magnetic()),
        });

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RunConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validation_rejects_bad_sections() {
        let mut config = RunConfig::default();
        config.particle.species_id = 42;
        assert_eq!(config.validate(), Err(ConfigError::UnknownSpecies(42)));

        let mut config = RunConfig::default();
        config.reconstruction.options.stride = 500;
        assert!(matches!(config.validate(), Err(ConfigError::StrideExceedsStep { .. })));

        let mut config = RunConfig::default();
        config.bounds = Some(Bounds {
            xmin: 1.0,
            xmax: -1.0,
            ymin: -1.0,
            ymax: 1.0,
            zmin: -1.0,
            zmax: 1.0,
        });
        assert!(matches!(config.validate(), Err(ConfigError::MalformedBounds(_))));
    }

    #[test]
    fn test_reconstruction_field_falls_back_to_tracking_field() {
        let config = RunConfig::default();
        let tracking = FieldModel::uniform(Vector::new(0.0, 0.0, 2.0));
        assert_eq!(config.reconstruction.magnetic_or(&tracking), &tracking);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = RunConfig::load_or_default("/nonexistent/emtracks.toml");
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("emtracks-config-{}.toml", std::process::id()));
        let path_str = path.to_string_lossy().to_string();

        let mut config = RunConfig::default();
        config.initial.tf = 5e-9;
        config.save(&path_str).unwrap();

        assert_eq!(RunConfig::load_or_default(&path_str), config);
        let layered = RunConfig::load_layered(Some(&path)).unwrap();
        assert_eq!(layered.initial.tf, 5e-9);

        std::fs::remove_file(&path).unwrap();
    }
}
