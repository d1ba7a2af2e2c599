//! Versioned records for offers, goals and stored observations.
//!
//! Encoding is plain serde. Decoding works field by field from a
//! `serde_json::Value`: a missing or malformed field is logged and left at
//! its default, and only an envelope that is not an object is rejected.
//! Records without an explicit kind go through a separate legacy step that
//! infers it from the populated fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::rc::Rc;
use thiserror::Error;

use crate::bus::ImpactBus;
use crate::constants::{DEFAULT_LAB_BOOST, DEFAULT_TRANSMIT_VALUE, RECORD_VERSION};
use crate::criteria::CriterionState;
use crate::goal::{Goal, Prestige};
use crate::numbers::{clamp_f64_to_f32, f64_to_u32_exact};
use crate::observation::{Observation, ObservationKind};
use crate::offer::{GoalOffer, OfferId, OfferStatus};

/// A record envelope that cannot be decoded at all.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{record} record must be a JSON object")]
    NotAnObject { record: &'static str },
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

type Object = Map<String, Value>;

fn as_object<'a>(value: &'a Value, record: &'static str) -> Result<&'a Object, RecordError> {
    value.as_object().ok_or(RecordError::NotAnObject { record })
}

fn read_f64(object: &Object, field: &str) -> f64 {
    match object.get(field) {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or_else(|_| {
            log::warn!("field `{field}` is not a number ({text}); using 0");
            0.0
        }),
        Some(other) => {
            log::warn!("field `{field}` has unexpected value {other}; using 0");
            0.0
        }
    }
}

fn read_string(object: &Object, field: &str) -> Option<String> {
    match object.get(field)? {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => {
            log::warn!("field `{field}` is not a string ({other}); ignoring it");
            None
        }
    }
}

fn read_bool(object: &Object, field: &str) -> bool {
    match object.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
        Some(other) => {
            log::warn!("field `{field}` is not a boolean ({other}); using false");
            false
        }
    }
}

fn read_u64(object: &Object, field: &str) -> Option<u64> {
    match object.get(field)? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Absent ⇒ `Ok(None)`; present but unreadable ⇒ `Err(())` after a warning.
fn read_enum<T: DeserializeOwned>(object: &Object, field: &str) -> Result<Option<T>, ()> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|err| {
            log::warn!("field `{field}` is unreadable ({err})");
        }),
    }
}

fn entries<'a>(object: &'a Object, field: &str) -> &'a [Value] {
    object
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Integral u32 field; hosts that write ids as floats (`3.0`) are accepted.
fn read_u32(object: &Object, field: &str) -> Option<u32> {
    match object.get(field)? {
        Value::Number(number) => number
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .or_else(|| number.as_f64().and_then(f64_to_u32_exact)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn read_version(object: &Object) -> u32 {
    read_u32(object, "version").unwrap_or(0)
}

/// Resolve a kind, falling back to inference only when the canonical field
/// is absent or unreadable.
fn resolve_kind(object: &Object, field: &str, inferred: ObservationKind) -> ObservationKind {
    match read_enum(object, field) {
        Ok(Some(kind)) => kind,
        Ok(None) => {
            let kind = inferred;
            log::debug!("legacy record without `{field}`; inferred {}", kind.label());
            kind
        }
        Err(()) => {
            let kind = inferred;
            log::warn!("unreadable `{field}`; inferred {} from populated fields", kind.label());
            kind
        }
    }
}

/// Persisted form of a [`Goal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub kind: ObservationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_body: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub energy_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub latitude_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_body_id: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

impl From<&Goal> for GoalRecord {
    fn from(goal: &Goal) -> Self {
        Self {
            kind: goal.expected_kind,
            target_body: goal.target_body.clone(),
            energy_threshold: goal.energy_threshold,
            region: goal.region.clone(),
            latitude_threshold: goal.latitude_threshold,
            minor_body_id: goal.minor_body_id.clone(),
        }
    }
}

impl From<GoalRecord> for Goal {
    fn from(record: GoalRecord) -> Self {
        Self {
            expected_kind: record.kind,
            target_body: record.target_body,
            energy_threshold: record.energy_threshold,
            region: record.region,
            latitude_threshold: record.latitude_threshold,
            minor_body_id: record.minor_body_id,
        }
    }
}

impl GoalRecord {
    /// Best-effort decode. Version 0 records may use the legacy
    /// `BodyName` / `Energy` / `Biome` keys.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotAnObject`] when `value` is not an object.
    pub fn decode(value: &Value) -> Result<Self, RecordError> {
        Self::decode_within(value, 0)
    }

    /// Decode a goal nested in an envelope written at `envelope_version`.
    /// A `version` on the goal itself takes precedence.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotAnObject`] when `value` is not an object.
    pub fn decode_within(value: &Value, envelope_version: u32) -> Result<Self, RecordError> {
        let object = as_object(value, "goal")?;
        let version = read_u32(object, "version").unwrap_or(envelope_version);
        let legacy = version == 0;
        let pick = |current: &str, old: &str| {
            if legacy && !object.contains_key(current) {
                old.to_string()
            } else {
                current.to_string()
            }
        };

        let target_body = read_string(object, &pick("target_body", "BodyName"));
        let energy_threshold = read_f64(object, &pick("energy_threshold", "Energy"));
        let region = read_string(object, &pick("region", "Biome"));
        let latitude_threshold = read_f64(object, "latitude_threshold");
        let minor_body_id = read_string(object, "minor_body_id");
        let inferred = ObservationKind::infer(
            minor_body_id.as_deref(),
            region.as_deref(),
            latitude_threshold,
        );
        let kind = resolve_kind(object, "kind", inferred);
        Ok(Self {
            kind,
            target_body,
            energy_threshold,
            region,
            latitude_threshold,
            minor_body_id,
        })
    }
}

/// Persisted form of one goal offer and its criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub version: u32,
    pub id: u64,
    pub goal: GoalRecord,
    pub prestige: Prestige,
    pub status: OfferStatus,
    pub impact_complete: bool,
    pub recovery_complete: bool,
}

impl OfferRecord {
    #[must_use]
    pub fn from_offer(id: OfferId, offer: &GoalOffer) -> Self {
        Self {
            version: RECORD_VERSION,
            id: id.0,
            goal: GoalRecord::from(offer.goal()),
            prestige: offer.prestige(),
            status: offer.status(),
            impact_complete: offer.impact().is_complete(),
            recovery_complete: offer.recovery().is_complete(),
        }
    }

    /// Best-effort decode; see the module docs.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotAnObject`] when the envelope or its goal is
    /// not an object.
    pub fn decode(value: &Value) -> Result<Self, RecordError> {
        let object = as_object(value, "offer")?;
        let version = read_version(object);
        let goal = match object.get("goal") {
            Some(goal) => GoalRecord::decode_within(goal, version)?,
            // Version 0 offers stored the goal fields inline.
            None => GoalRecord::decode_within(value, version)?,
        };
        Ok(Self {
            version,
            id: read_u64(object, "id").unwrap_or_default(),
            goal,
            prestige: read_enum(object, "prestige").ok().flatten().unwrap_or_default(),
            status: read_enum(object, "status").ok().flatten().unwrap_or_default(),
            impact_complete: read_bool(object, "impact_complete"),
            recovery_complete: read_bool(object, "recovery_complete"),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be parsed as JSON.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(json)?;
        Self::decode(&value)
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized.
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild the live offer, re-subscribing any pending criteria.
    #[must_use]
    pub fn restore(self, bus: &Rc<ImpactBus>) -> (OfferId, GoalOffer) {
        let state = |complete| {
            if complete {
                CriterionState::Complete
            } else {
                CriterionState::Pending
            }
        };
        let offer = GoalOffer::restore(
            self.goal.into(),
            self.prestige,
            self.status,
            [state(self.impact_complete), state(self.recovery_complete)],
            bus,
        );
        (OfferId(self.id), offer)
    }
}

/// Best-effort decode of a stored observation; records without `kind` have
/// it inferred.
///
/// # Errors
///
/// Returns [`RecordError::NotAnObject`] when `value` is not an object.
pub fn decode_observation(value: &Value) -> Result<Observation, RecordError> {
    let object = as_object(value, "observation")?;
    let region = read_string(object, "region");
    let latitude_deg = read_f64(object, "latitude_deg");
    let minor_body_id = read_string(object, "minor_body_id");
    let energy_joules = read_f64(object, "energy_joules");
    let inferred = ObservationKind::infer_reading(
        minor_body_id.as_deref(),
        energy_joules,
        region.as_deref(),
        latitude_deg,
    );
    let kind = resolve_kind(object, "kind", inferred);
    let transmit_value = if object.contains_key("transmit_value") {
        clamp_f64_to_f32(read_f64(object, "transmit_value"))
    } else {
        DEFAULT_TRANSMIT_VALUE
    };
    let lab_boost = if object.contains_key("lab_boost") {
        clamp_f64_to_f32(read_f64(object, "lab_boost"))
    } else {
        DEFAULT_LAB_BOOST
    };
    Ok(Observation {
        kind,
        body: read_string(object, "body"),
        energy_joules,
        region,
        latitude_deg,
        minor_body_id,
        score_amount: clamp_f64_to_f32(read_f64(object, "score_amount")),
        transmit_value,
        lab_boost,
        subject_id: read_string(object, "subject_id").unwrap_or_default(),
        label: read_string(object, "label").unwrap_or_default(),
        instrument_id: read_u32(object, "instrument_id").unwrap_or_default(),
        triggered: read_bool(object, "triggered"),
    })
}

/// Stored result of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResultRecord {
    pub craft_id: u32,
    pub instrument_id: u32,
    pub observation: Observation,
}

/// Everything a session persists between loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub version: u32,
    pub seed: u64,
    /// Draws already taken from the goal stream.
    #[serde(default)]
    pub goal_draws: u64,
    /// Draws already taken from the region stream.
    #[serde(default)]
    pub region_draws: u64,
    #[serde(default)]
    pub offers: Vec<OfferRecord>,
    #[serde(default)]
    pub stored_results: Vec<StoredResultRecord>,
}

impl SessionRecord {
    /// Best-effort decode. Entries that are not objects are skipped with a
    /// warning; everything else is recovered field by field.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotAnObject`] when `value` is not an object.
    pub fn decode(value: &Value) -> Result<Self, RecordError> {
        let object = as_object(value, "session")?;
        let offers = entries(object, "offers")
            .iter()
            .filter_map(|entry| {
                OfferRecord::decode(entry)
                    .inspect_err(|err| log::warn!("skipping offer: {err}"))
                    .ok()
            })
            .collect();
        let stored_results = entries(object, "stored_results")
            .iter()
            .filter_map(|entry| {
                let result = as_object(entry, "stored result").and_then(|fields| {
                    let observation = fields
                        .get("observation")
                        .map_or(Ok(None), |obs| decode_observation(obs).map(Some))?;
                    Ok((fields, observation))
                });
                match result {
                    Ok((fields, Some(observation))) => Some(StoredResultRecord {
                        craft_id: read_u32(fields, "craft_id").unwrap_or_default(),
                        instrument_id: read_u32(fields, "instrument_id").unwrap_or_default(),
                        observation,
                    }),
                    Ok((_, None)) => {
                        log::warn!("skipping stored result without an observation");
                        None
                    }
                    Err(err) => {
                        log::warn!("skipping stored result: {err}");
                        None
                    }
                }
            })
            .collect();

        Ok(Self {
            version: read_version(object),
            seed: read_u64(object, "seed").unwrap_or_default(),
            goal_draws: read_u64(object, "goal_draws").unwrap_or_default(),
            region_draws: read_u64(object, "region_draws").unwrap_or_default(),
            offers,
            stored_results,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized.
    pub fn to_value(&self) -> Result<Value, RecordError> {
        Ok(serde_json::to_value(self)?)
    }
}
