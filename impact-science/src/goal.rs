//! Goals and the observation predicate that completes them.
//!
//! A goal is a tagged record: `expected_kind` selects which of the optional
//! fields are meaningful, and a single matching function dispatches on it.

use serde::{Deserialize, Serialize};

use crate::observation::{Observation, ObservationKind};
use crate::score::format_energy;

/// Difficulty tier of an offered goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Prestige {
    #[default]
    Trivial,
    Significant,
    Exceptional,
}

impl Prestige {
    pub const ALL: [Self; 3] = [Self::Trivial, Self::Significant, Self::Exceptional];

    /// Star rating, 1 through 3.
    #[must_use]
    pub const fn stars(self) -> u8 {
        match self {
            Self::Trivial => 1,
            Self::Significant => 2,
            Self::Exceptional => 3,
        }
    }

    /// Score window `[(stars-1)/3, stars/3)` as fractions of the science cap.
    #[must_use]
    pub fn score_band(self) -> (f64, f64) {
        let stars = f64::from(self.stars());
        ((stars - 1.0) / 3.0, stars / 3.0)
    }
}

/// The objective chosen for an offer. Immutable once selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub expected_kind: ObservationKind,
    /// Body to impact; absent only for minor-body goals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_body: Option<String>,
    /// Minimum impact energy in joules (seismic goals).
    #[serde(default)]
    pub energy_threshold: f64,
    /// Required region (spectral goals in biome mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Minimum absolute latitude (spectral goals in latitude mode; 0 disables).
    #[serde(default)]
    pub latitude_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_body_id: Option<String>,
}

impl Goal {
    #[must_use]
    pub fn seismic(body: impl Into<String>, energy_threshold: f64) -> Self {
        Self {
            expected_kind: ObservationKind::Seismic,
            target_body: Some(body.into()),
            energy_threshold,
            region: None,
            latitude_threshold: 0.0,
            minor_body_id: None,
        }
    }

    #[must_use]
    pub fn spectral_region(body: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            expected_kind: ObservationKind::Spectral,
            target_body: Some(body.into()),
            energy_threshold: 0.0,
            region: Some(region.into()),
            latitude_threshold: 0.0,
            minor_body_id: None,
        }
    }

    #[must_use]
    pub fn spectral_latitude(body: impl Into<String>, latitude_threshold: f64) -> Self {
        Self {
            expected_kind: ObservationKind::Spectral,
            target_body: Some(body.into()),
            energy_threshold: 0.0,
            region: None,
            latitude_threshold,
            minor_body_id: None,
        }
    }

    #[must_use]
    pub fn asteroid(minor_body_id: impl Into<String>) -> Self {
        Self {
            expected_kind: ObservationKind::Asteroid,
            target_body: None,
            energy_threshold: 0.0,
            region: None,
            latitude_threshold: 0.0,
            minor_body_id: Some(minor_body_id.into()),
        }
    }

    fn body_matches(&self, observation: &Observation) -> bool {
        self.target_body.is_some() && self.target_body.as_deref() == observation.body_name()
    }

    /// Whether `observation` satisfies this goal.
    #[must_use]
    pub fn is_satisfied_by(&self, observation: &Observation) -> bool {
        if observation.kind != self.expected_kind {
            return false;
        }
        match self.expected_kind {
            ObservationKind::Seismic => {
                observation.energy_joules >= self.energy_threshold
                    && self.body_matches(observation)
            }
            ObservationKind::Spectral => {
                self.body_matches(observation)
                    && self.region.as_ref().map_or_else(
                        || self.latitude_threshold <= observation.latitude_deg.abs(),
                        |region| observation.region.as_ref() == Some(region),
                    )
            }
            ObservationKind::Asteroid => {
                self.minor_body_id.is_some() && observation.minor_body_id == self.minor_body_id
            }
        }
    }

    /// Whether the goal points at `body` (minor-body goals never do).
    #[must_use]
    pub fn targets_body(&self, body: &str) -> bool {
        self.target_body.as_deref() == Some(body)
    }

    /// The object the goal is about: the minor body for asteroid goals,
    /// otherwise the target body.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self.expected_kind {
            ObservationKind::Asteroid => self.minor_body_id.as_deref(),
            ObservationKind::Seismic | ObservationKind::Spectral => self.target_body.as_deref(),
        }
    }

    /// Stable identity used to de-duplicate offers.
    #[must_use]
    pub fn hash_key(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.expected_kind.label(),
            self.target_body.as_deref().unwrap_or_default(),
            self.energy_threshold,
            self.region.as_deref().unwrap_or_default(),
            self.minor_body_id.as_deref().unwrap_or_default()
        )
    }

    /// Plain-language title; hosts may substitute localized text.
    #[must_use]
    pub fn title(&self) -> String {
        let body = self.target_body.as_deref().unwrap_or("unknown body");
        match self.expected_kind {
            ObservationKind::Seismic => format!(
                "Record an impact of {} on {body} with a seismometer",
                format_energy(self.energy_threshold)
            ),
            ObservationKind::Spectral => self.region.as_ref().map_or_else(
                || {
                    format!(
                        "Record an impact beyond {:.0} degrees latitude on {body} with a spectrometer",
                        self.latitude_threshold
                    )
                },
                |region| format!("Record an impact in the {region} of {body} with a spectrometer"),
            ),
            ObservationKind::Asteroid => format!(
                "Record an impact on {} with a spectrometer",
                self.minor_body_id.as_deref().unwrap_or("an asteroid")
            ),
        }
    }
}

/// A generated option with its cumulative sampling weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCandidate {
    /// Cumulative weight: strictly increasing along the candidate list.
    pub weight: f64,
    pub goal: Goal,
}
