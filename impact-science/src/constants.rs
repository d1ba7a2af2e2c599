//! Centralized physical and tuning constants for impact science.
//!
//! Values that a host may want to tune live in [`crate::config::ImpactConfig`];
//! the constants here are the defaults those tunables fall back to plus the
//! identifiers shared with the host's science definitions.

// Experiment identifiers -------------------------------------------------------
pub const SEISMIC_EXPERIMENT: &str = "ImpactSeismometer";
pub const SPECTRAL_EXPERIMENT: &str = "ImpactSpectrometer";
pub const ASTEROID_EXPERIMENT: &str = "AsteroidSpectometry";

/// Name the host reports for a collision with terrain.
pub const SURFACE_COLLISION_TARGET: &str = "the surface";

/// Biome name used for seismic subjects, which are not biome specific.
pub const SURFACE_BIOME: &str = "surface";

// Physics -----------------------------------------------------------------------
/// Mass of the reference impactor used to normalise energy across bodies.
pub const REFERENCE_IMPACTOR_MASS_KG: f64 = 15_000.0;
pub const MIN_IMPACT_SPEED_MPS: f64 = 50.0;
pub const ASTEROID_OBSERVATION_RANGE_M: f64 = 5.0e5;
pub const SIGHT_ANGLE_LIMIT_DEG: f64 = 90.0;

// Scoring -------------------------------------------------------------------------
pub const MIN_SEISMIC_RESIDUAL_SCORE: f64 = 0.01;
pub const DEFAULT_TRANSMIT_VALUE: f32 = 1.0;
pub const DEFAULT_LAB_BOOST: f32 = 0.0;

// Goal generation ------------------------------------------------------------------
pub const CANDIDATE_WEIGHT_STEP: f64 = 1.0;
pub const LATITUDE_TIERS_DEG: [f64; 3] = [0.0, 50.0, 75.0];
/// Alternative latitude ladder for hosts that prefer polar-circle tiers.
pub const POLAR_LATITUDE_TIERS_DEG: [f64; 3] = [0.0, 66.0, 85.0];

// Persistence --------------------------------------------------------------------
pub const RECORD_VERSION: u32 = 1;

// Energy formatting ------------------------------------------------------------------
pub(crate) const ENERGY_SUFFIXES: [&str; 6] = ["J", "kJ", "MJ", "GJ", "TJ", "PJ"];
