//! Celestial bodies, minor bodies and surface regions
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::SURFACE_BIOME;

pub(crate) fn origin() -> Vector3<f64> {
    Vector3::zeros()
}

const fn default_reached() -> bool {
    true
}

/// Latitude band mapped to a named surface region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeBand {
    pub name: String,
    /// Inclusive lower bound in signed degrees.
    pub min_lat: f64,
    /// Exclusive upper bound in signed degrees.
    pub max_lat: f64,
    /// Optional longitude window; an empty window covers the whole band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitudes: Option<(f64, f64)>,
}

impl BiomeBand {
    #[must_use]
    pub fn new(name: impl Into<String>, min_lat: f64, max_lat: f64) -> Self {
        Self {
            name: name.into(),
            min_lat,
            max_lat,
            longitudes: None,
        }
    }

    #[must_use]
    pub fn with_longitudes(mut self, from: f64, to: f64) -> Self {
        self.longitudes = Some((from, to));
        self
    }

    fn contains(&self, latitude: f64, longitude: f64) -> bool {
        let in_lat = latitude >= self.min_lat && latitude < self.max_lat;
        let in_lon = self
            .longitudes
            .is_none_or(|(from, to)| longitude >= from && longitude < to);
        in_lat && in_lon
    }
}

/// A large gravitating body that impacts and goals can target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialBody {
    pub name: String,
    /// Standard gravitational parameter (m^3/s^2).
    pub grav_parameter: f64,
    /// Mean radius (m).
    pub radius: f64,
    #[serde(default)]
    pub atmosphere: bool,
    /// Whether the player has reached the body, making it eligible for goals.
    #[serde(default = "default_reached")]
    pub reached: bool,
    /// Centre of the body in the host's world frame.
    #[serde(default = "origin")]
    pub position: Vector3<f64>,
    #[serde(default)]
    pub biomes: Vec<BiomeBand>,
}

impl CelestialBody {
    #[must_use]
    pub fn new(name: impl Into<String>, grav_parameter: f64, radius: f64) -> Self {
        Self {
            name: name.into(),
            grav_parameter,
            radius,
            atmosphere: false,
            reached: true,
            position: Vector3::zeros(),
            biomes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_atmosphere(mut self, atmosphere: bool) -> Self {
        self.atmosphere = atmosphere;
        self
    }

    #[must_use]
    pub const fn with_reached(mut self, reached: bool) -> Self {
        self.reached = reached;
        self
    }

    #[must_use]
    pub fn with_biomes(mut self, biomes: Vec<BiomeBand>) -> Self {
        self.biomes = biomes;
        self
    }

    /// Bodies eligible for impact goals: reached, airless and with a
    /// positive mass and radius.
    #[must_use]
    pub const fn is_goal_eligible(&self) -> bool {
        self.reached && !self.atmosphere && self.grav_parameter > 0.0 && self.radius > 0.0
    }

    /// Region name at the given surface coordinate; bodies without a biome map
    /// report a single `surface` region.
    #[must_use]
    pub fn biome_at(&self, latitude: f64, longitude: f64) -> &str {
        self.biomes
            .iter()
            .find(|band| band.contains(latitude, longitude))
            .map_or(SURFACE_BIOME, |band| band.name.as_str())
    }
}

/// A small tracked object (asteroid class) identified by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinorBody {
    pub name: String,
    /// Body whose sphere of influence currently holds the object.
    pub reference_body: String,
    #[serde(default = "origin")]
    pub position: Vector3<f64>,
}

impl MinorBody {
    #[must_use]
    pub fn new(name: impl Into<String>, reference_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference_body: reference_body.into(),
            position: Vector3::zeros(),
        }
    }
}
