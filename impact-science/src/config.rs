//! Tunables for impact detection and goal generation.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::constants::{
    ASTEROID_OBSERVATION_RANGE_M, CANDIDATE_WEIGHT_STEP, LATITUDE_TIERS_DEG,
    MIN_IMPACT_SPEED_MPS, MIN_SEISMIC_RESIDUAL_SCORE, REFERENCE_IMPACTOR_MASS_KG,
    SIGHT_ANGLE_LIMIT_DEG,
};
use crate::goal::Prestige;

/// How spectral goals express their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpectralMode {
    /// Impact in a named region drawn from the biome difficulty table.
    #[default]
    Biome,
    /// Impact at or beyond a per-tier absolute latitude.
    Latitude,
}

/// Region names per difficulty tier for one body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BiomeTiers {
    #[serde(default)]
    pub trivial: Vec<String>,
    #[serde(default)]
    pub significant: Vec<String>,
    #[serde(default)]
    pub exceptional: Vec<String>,
}

impl BiomeTiers {
    #[must_use]
    pub fn for_prestige(&self, prestige: Prestige) -> &[String] {
        match prestige {
            Prestige::Trivial => &self.trivial,
            Prestige::Significant => &self.significant,
            Prestige::Exceptional => &self.exceptional,
        }
    }
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("sight angle must be within (0, 180] degrees (got {0})")]
    SightAngle(f64),
    #[error("latitude tiers must be non-decreasing within [0, 90] (got {0:?})")]
    LatitudeTiers([f64; 3]),
}

/// Complete impact science configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactConfig {
    /// Mass of the reference impactor that defines a full-score crash.
    #[serde(default = "ImpactConfig::default_reference_mass")]
    pub reference_mass_kg: f64,
    /// Collisions slower than this (surface-relative) are ignored.
    #[serde(default = "ImpactConfig::default_min_impact_speed")]
    pub min_impact_speed_mps: f64,
    #[serde(default = "ImpactConfig::default_asteroid_range")]
    pub asteroid_range_m: f64,
    #[serde(default = "ImpactConfig::default_sight_angle")]
    pub sight_angle_deg: f64,
    #[serde(default = "ImpactConfig::default_latitude_tiers")]
    pub latitude_tiers_deg: [f64; 3],
    #[serde(default)]
    pub spectral_mode: SpectralMode,
    /// Region difficulty table keyed by body name.
    #[serde(default)]
    pub biome_difficulty: HashMap<String, BiomeTiers>,
    #[serde(default = "ImpactConfig::default_weight_step")]
    pub candidate_weight_step: f64,
    /// Floor applied to a seismic score after banked science is deducted.
    #[serde(default = "ImpactConfig::default_min_seismic_residual")]
    pub min_seismic_residual: f64,
}

impl ImpactConfig {
    const fn default_reference_mass() -> f64 {
        REFERENCE_IMPACTOR_MASS_KG
    }

    const fn default_min_impact_speed() -> f64 {
        MIN_IMPACT_SPEED_MPS
    }

    const fn default_asteroid_range() -> f64 {
        ASTEROID_OBSERVATION_RANGE_M
    }

    const fn default_sight_angle() -> f64 {
        SIGHT_ANGLE_LIMIT_DEG
    }

    const fn default_latitude_tiers() -> [f64; 3] {
        LATITUDE_TIERS_DEG
    }

    const fn default_weight_step() -> f64 {
        CANDIDATE_WEIGHT_STEP
    }

    const fn default_min_seismic_residual() -> f64 {
        MIN_SEISMIC_RESIDUAL_SCORE
    }

    #[must_use]
    pub fn default_config() -> Self {
        Self {
            reference_mass_kg: Self::default_reference_mass(),
            min_impact_speed_mps: Self::default_min_impact_speed(),
            asteroid_range_m: Self::default_asteroid_range(),
            sight_angle_deg: Self::default_sight_angle(),
            latitude_tiers_deg: Self::default_latitude_tiers(),
            spectral_mode: SpectralMode::default(),
            biome_difficulty: HashMap::new(),
            candidate_weight_step: Self::default_weight_step(),
            min_seismic_residual: Self::default_min_seismic_residual(),
        }
    }

    /// Load configuration from a JSON string; absent fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Latitude threshold for a tier.
    #[must_use]
    pub const fn latitude_for(&self, prestige: Prestige) -> f64 {
        self.latitude_tiers_deg[prestige.stars() as usize - 1]
    }

    #[must_use]
    pub fn biomes_for(&self, body: &str, prestige: Prestige) -> &[String] {
        self.biome_difficulty
            .get(body)
            .map(|tiers| tiers.for_prestige(prestige))
            .unwrap_or_default()
    }

    /// Check numeric invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positives = [
            ("reference_mass_kg", self.reference_mass_kg),
            ("asteroid_range_m", self.asteroid_range_m),
            ("candidate_weight_step", self.candidate_weight_step),
        ];
        for (field, value) in positives {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if !(self.min_impact_speed_mps >= 0.0) {
            return Err(ConfigError::NotPositive {
                field: "min_impact_speed_mps",
                value: self.min_impact_speed_mps,
            });
        }
        if !(self.sight_angle_deg > 0.0 && self.sight_angle_deg <= 180.0) {
            return Err(ConfigError::SightAngle(self.sight_angle_deg));
        }
        let tiers = self.latitude_tiers_deg;
        let in_range = tiers.iter().all(|lat| (0.0..=90.0).contains(lat));
        if !in_range || tiers[0] > tiers[1] || tiers[1] > tiers[2] {
            return Err(ConfigError::LatitudeTiers(tiers));
        }
        Ok(())
    }
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
