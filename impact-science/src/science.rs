//! Experiment and subject definitions supplied by the host.
//!
//! A subject is one (experiment, situation, body, region) combination that
//! science can be earned against. The host owns the definitions and how much
//! science has already been banked; this crate only reads them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Where an instrument was when it took a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperimentSituation {
    SrfLanded,
    InSpaceLow,
}

impl ExperimentSituation {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::SrfLanded => "SrfLanded",
            Self::InSpaceLow => "InSpaceLow",
        }
    }
}

/// Static definition of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    /// Maximum science a single subject of this experiment can yield.
    pub science_cap: f64,
    /// Multiplier from score to stored data amount.
    #[serde(default = "Experiment::default_data_scale")]
    pub data_scale: f64,
}

impl Experiment {
    const fn default_data_scale() -> f64 {
        1.0
    }

    #[must_use]
    pub fn new(id: impl Into<String>, science_cap: f64) -> Self {
        Self {
            id: id.into(),
            science_cap,
            data_scale: Self::default_data_scale(),
        }
    }
}

/// One scoreable combination of experiment, situation, body and region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScienceSubject {
    pub id: String,
    pub science_cap: f64,
    /// Science already banked against this subject.
    #[serde(default)]
    pub science: f64,
    /// Body multiplier applied by the host to raw science.
    #[serde(default = "ScienceSubject::default_subject_value")]
    pub subject_value: f64,
    #[serde(default = "ScienceSubject::default_data_scale")]
    pub data_scale: f64,
}

impl ScienceSubject {
    const fn default_subject_value() -> f64 {
        1.0
    }

    const fn default_data_scale() -> f64 {
        1.0
    }

    /// Canonical id: `experiment@BodySituationRegion`.
    #[must_use]
    pub fn compose_id(
        experiment: &str,
        situation: ExperimentSituation,
        body: &str,
        region: &str,
    ) -> String {
        format!("{experiment}@{body}{}{region}", situation.key())
    }
}

/// Missing host definitions. Fatal for the current generation attempt only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScienceError {
    #[error("experiment `{0}` is not defined")]
    UnknownExperiment(String),
    #[error("no subject for experiment `{experiment}` at `{target}`")]
    UnknownSubject { experiment: String, target: String },
}

/// Host collaborator that resolves experiments and subjects.
pub trait ScienceLibrary {
    /// Look up an experiment definition.
    ///
    /// # Errors
    ///
    /// Returns [`ScienceError::UnknownExperiment`] when the host has not
    /// loaded the experiment.
    fn experiment(&self, id: &str) -> Result<Experiment, ScienceError>;

    /// Resolve the subject for an experiment at a body/region (or, for minor
    /// bodies, at the object named by `target`).
    ///
    /// # Errors
    ///
    /// Returns a [`ScienceError`] when the experiment is not defined.
    fn subject(
        &self,
        experiment: &str,
        situation: ExperimentSituation,
        target: &str,
        region: &str,
    ) -> Result<ScienceSubject, ScienceError>;
}

/// In-memory science definitions with per-subject banked science.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectCatalog {
    #[serde(default)]
    pub experiments: HashMap<String, Experiment>,
    /// Body multipliers keyed by body name; missing bodies use 1.0.
    #[serde(default)]
    pub body_values: HashMap<String, f64>,
    /// Science already banked keyed by subject id.
    #[serde(default)]
    pub banked: HashMap<String, f64>,
}

impl SubjectCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the three impact experiments at their stock caps.
    #[must_use]
    pub fn with_impact_experiments() -> Self {
        use crate::constants::{ASTEROID_EXPERIMENT, SEISMIC_EXPERIMENT, SPECTRAL_EXPERIMENT};
        let mut catalog = Self::new();
        catalog.insert_experiment(Experiment::new(SEISMIC_EXPERIMENT, 15.0));
        catalog.insert_experiment(Experiment::new(SPECTRAL_EXPERIMENT, 10.0));
        catalog.insert_experiment(Experiment::new(ASTEROID_EXPERIMENT, 12.0));
        catalog
    }

    pub fn insert_experiment(&mut self, experiment: Experiment) {
        self.experiments.insert(experiment.id.clone(), experiment);
    }

    pub fn set_body_value(&mut self, body: impl Into<String>, value: f64) {
        self.body_values.insert(body.into(), value);
    }

    /// Record science earned against a subject.
    pub fn bank(&mut self, subject_id: &str, science: f64) {
        *self.banked.entry(subject_id.to_string()).or_insert(0.0) += science;
    }

    /// Load a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ScienceLibrary for SubjectCatalog {
    fn experiment(&self, id: &str) -> Result<Experiment, ScienceError> {
        self.experiments
            .get(id)
            .cloned()
            .ok_or_else(|| ScienceError::UnknownExperiment(id.to_string()))
    }

    fn subject(
        &self,
        experiment: &str,
        situation: ExperimentSituation,
        target: &str,
        region: &str,
    ) -> Result<ScienceSubject, ScienceError> {
        let definition = self.experiment(experiment)?;
        let id = ScienceSubject::compose_id(experiment, situation, target, region);
        let subject_value = self.body_values.get(target).copied().unwrap_or(1.0);
        Ok(ScienceSubject {
            science: self.banked.get(&id).copied().unwrap_or(0.0),
            id,
            science_cap: definition.science_cap * subject_value,
            subject_value,
            data_scale: definition.data_scale,
        })
    }
}
