//! Craft snapshots delivered by the host
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::body::origin;
use crate::instrument::{Instrument, InstrumentKind};
use crate::observation::Observation;

/// Flight situation of a craft relative to its reference body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Situation {
    Landed,
    Splashed,
    PreLaunch,
    Flying,
    SubOrbital,
    #[default]
    Orbiting,
    Escaping,
}

/// A vehicle that may carry instruments or act as an impactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Craft {
    pub id: u32,
    pub name: String,
    /// Name of the body whose sphere of influence holds the craft.
    pub reference_body: String,
    #[serde(default)]
    pub situation: Situation,
    /// Centre of mass in the host's world frame.
    #[serde(default = "origin")]
    pub position: Vector3<f64>,
    #[serde(default = "origin")]
    pub surface_velocity: Vector3<f64>,
    #[serde(default)]
    pub mass_kg: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
}

impl Craft {
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, reference_body: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            reference_body: reference_body.into(),
            situation: Situation::default(),
            position: Vector3::zeros(),
            surface_velocity: Vector3::zeros(),
            mass_kg: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            instruments: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_situation(mut self, situation: Situation) -> Self {
        self.situation = situation;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Vector3<f64>) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn with_motion(mut self, surface_velocity: Vector3<f64>, mass_kg: f64) -> Self {
        self.surface_velocity = surface_velocity;
        self.mass_kg = mass_kg;
        self
    }

    #[must_use]
    pub const fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    #[must_use]
    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.instruments.push(instrument);
        self
    }

    #[must_use]
    pub fn surface_speed(&self) -> f64 {
        self.surface_velocity.norm()
    }

    #[must_use]
    pub const fn is_landed(&self) -> bool {
        matches!(self.situation, Situation::Landed)
    }

    #[must_use]
    pub const fn is_orbiting(&self) -> bool {
        matches!(self.situation, Situation::Orbiting)
    }

    /// First instrument of the requested kind, in part order.
    pub fn first_instrument_mut(&mut self, kind: InstrumentKind) -> Option<&mut Instrument> {
        self.instruments
            .iter_mut()
            .find(|instrument| instrument.kind == kind)
    }

    #[must_use]
    pub fn has_instrument(&self, kind: InstrumentKind) -> bool {
        self.instruments
            .iter()
            .any(|instrument| instrument.kind == kind)
    }

    /// Every observation stored aboard, in part order.
    pub fn stored_observations(&self) -> impl Iterator<Item = &Observation> {
        self.instruments.iter().filter_map(Instrument::stored)
    }
}
