//! Observation records produced by impacts.
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LAB_BOOST, DEFAULT_TRANSMIT_VALUE};

/// Which instrument reading an observation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    /// Landed seismometer reading; carries the impact energy.
    Seismic,
    /// Orbital spectrometer reading of the impact plume; carries the region.
    Spectral,
    /// Spectrometer reading of an impact on a tracked minor body.
    Asteroid,
}

impl ObservationKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Seismic => "seismic",
            Self::Spectral => "spectral",
            Self::Asteroid => "asteroid",
        }
    }

    /// Infer a goal's kind from which optional fields are populated. Used
    /// only for records written before the kind was persisted explicitly.
    #[must_use]
    pub fn infer(minor_body: Option<&str>, region: Option<&str>, latitude: f64) -> Self {
        if minor_body.is_some() {
            Self::Asteroid
        } else if region.is_some() || latitude != 0.0 {
            Self::Spectral
        } else {
            Self::Seismic
        }
    }

    /// Infer a stored reading's kind. Seismic readings also carry the impact
    /// latitude, so a positive energy decides before the latitude does.
    #[must_use]
    pub fn infer_reading(
        minor_body: Option<&str>,
        energy: f64,
        region: Option<&str>,
        latitude: f64,
    ) -> Self {
        if minor_body.is_none() && energy > 0.0 {
            Self::Seismic
        } else {
            Self::infer(minor_body, region, latitude)
        }
    }
}

/// Immutable record of a single reading derived from a collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationKind,
    /// Body the reading was taken at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Kinetic energy of the impact in joules (seismic only).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub energy_joules: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Signed latitude of the impact point in degrees.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub latitude_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_body_id: Option<String>,
    pub score_amount: f32,
    #[serde(default = "default_transmit_value")]
    pub transmit_value: f32,
    #[serde(default)]
    pub lab_boost: f32,
    pub subject_id: String,
    #[serde(default)]
    pub label: String,
    /// Flight id of the instrument that recorded the reading.
    #[serde(default)]
    pub instrument_id: u32,
    #[serde(default)]
    pub triggered: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

const fn default_transmit_value() -> f32 {
    DEFAULT_TRANSMIT_VALUE
}

impl Observation {
    fn base(kind: ObservationKind, body: Option<String>, score_amount: f32, subject_id: String) -> Self {
        Self {
            kind,
            body,
            energy_joules: 0.0,
            region: None,
            latitude_deg: 0.0,
            minor_body_id: None,
            score_amount,
            transmit_value: DEFAULT_TRANSMIT_VALUE,
            lab_boost: DEFAULT_LAB_BOOST,
            subject_id,
            label: String::new(),
            instrument_id: 0,
            triggered: false,
        }
    }

    /// Seismometer reading of an impact carrying `energy_joules`.
    #[must_use]
    pub fn seismic(
        body: impl Into<String>,
        energy_joules: f64,
        latitude_deg: f64,
        score_amount: f32,
        subject_id: impl Into<String>,
    ) -> Self {
        let mut observation = Self::base(
            ObservationKind::Seismic,
            Some(body.into()),
            score_amount,
            subject_id.into(),
        );
        observation.energy_joules = energy_joules;
        observation.latitude_deg = latitude_deg;
        observation
    }

    /// Spectrometer reading of an impact in `region`.
    #[must_use]
    pub fn spectral(
        body: impl Into<String>,
        region: impl Into<String>,
        latitude_deg: f64,
        score_amount: f32,
        subject_id: impl Into<String>,
    ) -> Self {
        let mut observation = Self::base(
            ObservationKind::Spectral,
            Some(body.into()),
            score_amount,
            subject_id.into(),
        );
        observation.region = Some(region.into());
        observation.latitude_deg = latitude_deg;
        observation
    }

    /// Spectrometer reading of an impact on the minor body `minor_body_id`.
    #[must_use]
    pub fn asteroid(
        body: Option<String>,
        minor_body_id: impl Into<String>,
        score_amount: f32,
        subject_id: impl Into<String>,
    ) -> Self {
        let mut observation = Self::base(
            ObservationKind::Asteroid,
            body,
            score_amount,
            subject_id.into(),
        );
        observation.minor_body_id = Some(minor_body_id.into());
        observation
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub const fn with_instrument(mut self, instrument_id: u32) -> Self {
        self.instrument_id = instrument_id;
        self
    }

    /// Whether the populated fields agree with `kind`: seismic readings carry
    /// energy and no region or minor body, spectral readings carry a region
    /// and no energy, asteroid readings carry a minor body.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self.kind {
            ObservationKind::Seismic => {
                self.energy_joules > 0.0 && self.region.is_none() && self.minor_body_id.is_none()
            }
            ObservationKind::Spectral => {
                self.region.is_some() && self.energy_joules == 0.0 && self.minor_body_id.is_none()
            }
            ObservationKind::Asteroid => self.minor_body_id.is_some(),
        }
    }

    #[must_use]
    pub fn body_name(&self) -> Option<&str> {
        self.body.as_deref()
    }
}
