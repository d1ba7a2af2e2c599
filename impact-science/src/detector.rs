//! Impact detection: from a reported collision to published observations.
//!
//! For each collision the detector works out which craft around the impacted
//! body could have observed it, scores a reading for the first suitable
//! instrument on each, publishes the reading, and offers it to that
//! instrument's best-result store.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::body::{CelestialBody, origin};
use crate::bus::ImpactBus;
use crate::config::ImpactConfig;
use crate::constants::{
    ASTEROID_EXPERIMENT, SEISMIC_EXPERIMENT, SPECTRAL_EXPERIMENT, SURFACE_BIOME,
    SURFACE_COLLISION_TARGET,
};
use crate::craft::Craft;
use crate::instrument::InstrumentKind;
use crate::numbers::clamp_f64_to_f32;
use crate::observation::Observation;
use crate::science::{ExperimentSituation, ScienceError, ScienceLibrary};
use crate::score::{energy_to_score, format_energy, kinetic_energy, reference_energy_for_mass};
use crate::world::World;

/// A collision reported by the host, already reduced to the values the
/// detector needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    /// Craft id of the impactor; it never observes its own impact.
    pub impactor: u32,
    pub reference_body: String,
    /// Impact point in the host's world frame.
    #[serde(default = "origin")]
    pub position: Vector3<f64>,
    #[serde(default = "origin")]
    pub surface_velocity: Vector3<f64>,
    pub mass_kg: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Tracked minor body struck, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_body: Option<String>,
}

impl Collision {
    /// Collision described by the impacting craft's final state.
    #[must_use]
    pub fn from_craft(craft: &Craft, minor_body: Option<String>) -> Self {
        Self {
            impactor: craft.id,
            reference_body: craft.reference_body.clone(),
            position: craft.position,
            surface_velocity: craft.surface_velocity,
            mass_kg: craft.mass_kg,
            latitude: craft.latitude,
            longitude: craft.longitude,
            minor_body,
        }
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.surface_velocity.norm()
    }

    #[must_use]
    pub fn energy(&self) -> f64 {
        kinetic_energy(self.mass_kg, self.speed())
    }
}

/// Why a collision produced no readings at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    TooSlow,
    UnknownBody,
    /// Impacts on bodies with an atmosphere are not scored unless a minor
    /// body is involved.
    Atmosphere,
    /// The struck object is neither the surface nor a tracked minor body.
    UntrackedTarget,
}

/// One reading produced for one observing craft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverOutcome {
    pub craft_id: u32,
    pub instrument_id: u32,
    pub observation: Observation,
    /// Whether the reading replaced the instrument's stored result.
    pub stored: bool,
}

/// Everything the detector did for one collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub body: String,
    pub energy_joules: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<IgnoreReason>,
    #[serde(default)]
    pub outcomes: Vec<ObserverOutcome>,
    /// Readings skipped because the host has not defined the experiment.
    #[serde(skip)]
    pub missing_definitions: Vec<ScienceError>,
}

impl ImpactReport {
    fn new(body: &str, energy_joules: f64) -> Self {
        Self {
            body: body.to_string(),
            energy_joules,
            ignored: None,
            outcomes: Vec::new(),
            missing_definitions: Vec::new(),
        }
    }

    fn ignored(body: &str, energy_joules: f64, reason: IgnoreReason) -> Self {
        let mut report = Self::new(body, energy_joules);
        report.ignored = Some(reason);
        report
    }

    #[must_use]
    pub const fn observation_count(&self) -> usize {
        self.outcomes.len()
    }
}

/// Whether an orbiting observer can see the impact point over the horizon.
///
/// The angle is measured at the impact point between the outward surface
/// normal (body centre to impact) and the line of sight (impact to observer).
#[must_use]
pub fn has_line_of_sight(
    body_centre: &Vector3<f64>,
    impact: &Vector3<f64>,
    observer: &Vector3<f64>,
    limit_deg: f64,
) -> bool {
    let crash = impact - body_centre;
    let sight = (observer - body_centre) - crash;
    let angle = crash.angle(&sight).to_degrees();
    log::debug!("sight angle {angle:.1} degrees over {:.0} m", sight.norm());
    angle < limit_deg
}

/// Converts collisions into observations and publishes them.
#[derive(Debug, Clone)]
pub struct ImpactDetector {
    bus: Rc<ImpactBus>,
    config: ImpactConfig,
}

impl ImpactDetector {
    #[must_use]
    pub const fn new(bus: Rc<ImpactBus>, config: ImpactConfig) -> Self {
        Self { bus, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ImpactConfig {
        &self.config
    }

    /// Host hook for a craft hitting terrain.
    pub fn on_crash<L: ScienceLibrary + ?Sized>(
        &self,
        impactor: &Craft,
        world: &mut World,
        library: &L,
    ) -> ImpactReport {
        self.detect(&Collision::from_craft(impactor, None), world, library)
    }

    /// Host hook for a craft colliding with `other`: either the surface or a
    /// tracked minor body, by name.
    pub fn on_collide<L: ScienceLibrary + ?Sized>(
        &self,
        impactor: &Craft,
        other: &str,
        world: &mut World,
        library: &L,
    ) -> ImpactReport {
        let minor_body = world.minor_body(other).map(|minor| minor.name.clone());
        if minor_body.is_none() && other != SURFACE_COLLISION_TARGET {
            log::debug!("collision with untracked object `{other}` ignored");
            return ImpactReport::ignored(
                &impactor.reference_body,
                kinetic_energy(impactor.mass_kg, impactor.surface_speed()),
                IgnoreReason::UntrackedTarget,
            );
        }
        self.detect(&Collision::from_craft(impactor, minor_body), world, library)
    }

    /// Evaluate every craft around the impacted body and publish readings.
    pub fn detect<L: ScienceLibrary + ?Sized>(
        &self,
        collision: &Collision,
        world: &mut World,
        library: &L,
    ) -> ImpactReport {
        let energy = collision.energy();
        let body_name = collision.reference_body.as_str();
        if collision.speed() < self.config.min_impact_speed_mps {
            return ImpactReport::ignored(body_name, energy, IgnoreReason::TooSlow);
        }

        let World { bodies, craft, .. } = world;
        let Some(body) = bodies.iter().find(|body| body.name == body_name) else {
            log::warn!("impact on unknown body `{body_name}` ignored");
            return ImpactReport::ignored(body_name, energy, IgnoreReason::UnknownBody);
        };
        if body.atmosphere && collision.minor_body.is_none() {
            return ImpactReport::ignored(body_name, energy, IgnoreReason::Atmosphere);
        }

        log::info!(
            "impact of {} on {body_name} at {:.1} m/s",
            format_energy(energy),
            collision.speed()
        );

        let mut report = ImpactReport::new(body_name, energy);
        let observers = craft
            .iter_mut()
            .filter(|observer| observer.reference_body == body.name && observer.id != collision.impactor);
        for observer in observers {
            let result = match collision.minor_body.as_deref() {
                None if observer.is_landed() => self.observe_landed(body, collision, observer, library),
                None if observer.is_orbiting() => self.observe_orbit(body, collision, observer, library),
                Some(minor) if observer.is_orbiting() => {
                    self.observe_minor_body(body, minor, collision, observer, library)
                }
                _ => Ok(None),
            };
            match result {
                Ok(Some(outcome)) => report.outcomes.push(outcome),
                Ok(None) => {}
                Err(err) => {
                    log::warn!("craft {} reading skipped: {err}", observer.id);
                    report.missing_definitions.push(err);
                }
            }
        }
        report
    }

    fn observe_landed<L: ScienceLibrary + ?Sized>(
        &self,
        body: &CelestialBody,
        collision: &Collision,
        observer: &mut Craft,
        library: &L,
    ) -> Result<Option<ObserverOutcome>, ScienceError> {
        if !observer.has_instrument(InstrumentKind::Seismometer) {
            return Ok(None);
        }
        let energy = collision.energy();
        let subject = library.subject(
            SEISMIC_EXPERIMENT,
            ExperimentSituation::SrfLanded,
            &body.name,
            SURFACE_BIOME,
        )?;
        let reference = reference_energy_for_mass(
            self.config.reference_mass_kg,
            body.grav_parameter,
            body.radius,
        );
        let science = energy_to_score(energy, subject.science_cap, reference);
        let residual = (science - subject.science).max(self.config.min_seismic_residual);
        let amount = residual / subject.subject_value * subject.data_scale;
        log::debug!("seismic score {science:.3} residual {residual:.3} on {}", body.name);

        let observation = Observation::seismic(
            &body.name,
            energy,
            collision.latitude,
            clamp_f64_to_f32(amount),
            subject.id,
        )
        .with_label(format!("Impact of {} on {}", format_energy(energy), body.name));
        self.bus.publish_impact(&observation);
        self.bus.publish_science(&observation);
        Ok(self.store(observer, InstrumentKind::Seismometer, observation))
    }

    fn observe_orbit<L: ScienceLibrary + ?Sized>(
        &self,
        body: &CelestialBody,
        collision: &Collision,
        observer: &mut Craft,
        library: &L,
    ) -> Result<Option<ObserverOutcome>, ScienceError> {
        if !has_line_of_sight(
            &body.position,
            &collision.position,
            &observer.position,
            self.config.sight_angle_deg,
        ) {
            return Ok(None);
        }
        if !observer.has_instrument(InstrumentKind::Spectrometer) {
            return Ok(None);
        }
        let region = body.biome_at(collision.latitude, collision.longitude);
        let subject = library.subject(
            SPECTRAL_EXPERIMENT,
            ExperimentSituation::InSpaceLow,
            &body.name,
            region,
        )?;
        let residual = (subject.science_cap - subject.science).max(0.0);
        let amount = residual / subject.subject_value * subject.data_scale;
        log::debug!(
            "impact in {region} at {:.2},{:.2} visible from craft {}",
            collision.latitude,
            collision.longitude,
            observer.id
        );

        let observation = Observation::spectral(
            &body.name,
            region,
            collision.latitude,
            clamp_f64_to_f32(amount),
            subject.id,
        )
        .with_label(format!("Impact at {region} on {}", body.name));
        self.bus.publish_impact(&observation);
        Ok(self.store(observer, InstrumentKind::Spectrometer, observation))
    }

    fn observe_minor_body<L: ScienceLibrary + ?Sized>(
        &self,
        body: &CelestialBody,
        minor: &str,
        collision: &Collision,
        observer: &mut Craft,
        library: &L,
    ) -> Result<Option<ObserverOutcome>, ScienceError> {
        let distance = (observer.position - collision.position).norm();
        if distance >= self.config.asteroid_range_m {
            log::debug!("craft {} is {distance:.0} m from {minor}; out of range", observer.id);
            return Ok(None);
        }
        if !observer.has_instrument(InstrumentKind::Spectrometer) {
            return Ok(None);
        }
        let subject = library.subject(
            ASTEROID_EXPERIMENT,
            ExperimentSituation::InSpaceLow,
            minor,
            "",
        )?;
        let amount = subject.science_cap / subject.subject_value * subject.data_scale;

        let observation = Observation::asteroid(
            Some(body.name.clone()),
            minor,
            clamp_f64_to_f32(amount),
            subject.id,
        )
        .with_label(format!("Impact at {minor} on {}", body.name));
        self.bus.publish_impact(&observation);
        Ok(self.store(observer, InstrumentKind::Spectrometer, observation))
    }

    /// Offer the reading to the first instrument of `kind` aboard `observer`.
    fn store(
        &self,
        observer: &mut Craft,
        kind: InstrumentKind,
        observation: Observation,
    ) -> Option<ObserverOutcome> {
        let craft_id = observer.id;
        let instrument = observer.first_instrument_mut(kind)?;
        let observation = observation.with_instrument(instrument.id);
        let stored = instrument.offer(observation.clone());
        Some(ObserverOutcome {
            craft_id,
            instrument_id: instrument.id,
            observation,
            stored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BiomeBand, MinorBody};
    use crate::craft::Situation;
    use crate::instrument::Instrument;
    use crate::science::SubjectCatalog;
    use std::cell::RefCell;

    const RADIUS: f64 = 2.0e5;

    fn mun() -> CelestialBody {
        CelestialBody::new("Mun", 6.5e10, RADIUS).with_biomes(vec![
            BiomeBand::new("Poles", 60.0, 91.0),
            BiomeBand::new("Highlands", -60.0, 60.0),
        ])
    }

    fn impactor(speed: f64) -> Craft {
        Craft::new(99, "Impactor", "Mun")
            .with_position(Vector3::new(RADIUS, 0.0, 0.0))
            .with_motion(Vector3::new(-speed, 0.0, 0.0), 1_000.0)
            .with_coordinates(10.0, 0.0)
    }

    fn lander() -> Craft {
        Craft::new(1, "Lander", "Mun")
            .with_situation(Situation::Landed)
            .with_instrument(Instrument::seismometer(11))
            .with_instrument(Instrument::seismometer(12))
    }

    fn orbiter(position: Vector3<f64>) -> Craft {
        Craft::new(2, "Orbiter", "Mun")
            .with_position(position)
            .with_instrument(Instrument::spectrometer(21))
    }

    fn detector() -> (Rc<ImpactBus>, ImpactDetector) {
        let bus = ImpactBus::shared();
        let detector = ImpactDetector::new(Rc::clone(&bus), ImpactConfig::default_config());
        (bus, detector)
    }

    fn record(bus: &ImpactBus) -> (Rc<RefCell<Vec<Observation>>>, Rc<RefCell<Vec<Observation>>>) {
        let impacts = Rc::new(RefCell::new(Vec::new()));
        let science = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&impacts);
        bus.impacts()
            .subscribe(move |obs: &Observation| sink.borrow_mut().push(obs.clone()));
        let sink = Rc::clone(&science);
        bus.science()
            .subscribe(move |obs: &Observation| sink.borrow_mut().push(obs.clone()));
        (impacts, science)
    }

    #[test]
    fn landed_seismometer_records_and_publishes_on_both_channels() {
        let (bus, detector) = detector();
        let (impacts, science) = record(&bus);
        let mut world = World::new().with_body(mun()).with_craft(lander());
        let catalog = SubjectCatalog::with_impact_experiments();

        let report = detector.on_crash(&impactor(600.0), &mut world, &catalog);
        assert_eq!(report.ignored, None);
        assert_eq!(report.observation_count(), 1);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.instrument_id, 11, "first matching instrument only");
        assert!(outcome.stored);
        assert!((outcome.observation.energy_joules - 1.8e8).abs() < 1e-3);
        assert!(outcome.observation.is_consistent());
        assert_eq!(impacts.borrow().len(), 1);
        assert_eq!(science.borrow().len(), 1);

        let lander = world.craft(1).unwrap();
        assert!(lander.instruments[0].stored().is_some());
        assert!(lander.instruments[1].stored().is_none());
    }

    #[test]
    fn weaker_second_impact_does_not_replace_stored_seismic_result() {
        let (_bus, detector) = detector();
        let mut world = World::new().with_body(mun()).with_craft(lander());
        let catalog = SubjectCatalog::with_impact_experiments();

        detector.on_crash(&impactor(600.0), &mut world, &catalog);
        let report = detector.on_crash(&impactor(300.0), &mut world, &catalog);
        assert!(!report.outcomes[0].stored);
        let stored = world.craft(1).unwrap().instruments[0].stored().unwrap();
        assert!((stored.energy_joules - 1.8e8).abs() < 1e-3);
    }

    #[test]
    fn slow_and_atmospheric_impacts_are_ignored() {
        let (bus, detector) = detector();
        let (impacts, _) = record(&bus);
        let catalog = SubjectCatalog::with_impact_experiments();
        let mut world = World::new().with_body(mun()).with_craft(lander());
        let report = detector.on_crash(&impactor(49.0), &mut world, &catalog);
        assert_eq!(report.ignored, Some(IgnoreReason::TooSlow));

        let mut airy = World::new()
            .with_body(mun().with_atmosphere(true))
            .with_craft(lander());
        let report = detector.on_crash(&impactor(600.0), &mut airy, &catalog);
        assert_eq!(report.ignored, Some(IgnoreReason::Atmosphere));
        assert!(impacts.borrow().is_empty());
    }

    #[test]
    fn orbiter_needs_line_of_sight() {
        let (bus, detector) = detector();
        let (impacts, science) = record(&bus);
        let catalog = SubjectCatalog::with_impact_experiments();

        let overhead = Vector3::new(RADIUS + 5.0e4, 1.0e4, 0.0);
        let mut world = World::new().with_body(mun()).with_craft(orbiter(overhead));
        let report = detector.on_crash(&impactor(600.0), &mut world, &catalog);
        assert_eq!(report.observation_count(), 1);
        let observation = &report.outcomes[0].observation;
        assert_eq!(observation.region.as_deref(), Some("Highlands"));
        assert!((observation.score_amount - 10.0).abs() < f32::EPSILON);
        assert_eq!(impacts.borrow().len(), 1);
        assert!(science.borrow().is_empty());

        let far_side = Vector3::new(-(RADIUS + 5.0e4), 0.0, 0.0);
        let mut hidden = World::new().with_body(mun()).with_craft(orbiter(far_side));
        let report = detector.on_crash(&impactor(600.0), &mut hidden, &catalog);
        assert_eq!(report.observation_count(), 0);
    }

    #[test]
    fn spectral_score_is_discounted_by_banked_science() {
        let (_bus, detector) = detector();
        let mut catalog = SubjectCatalog::with_impact_experiments();
        catalog.bank("ImpactSpectrometer@MunInSpaceLowHighlands", 4.0);
        let overhead = Vector3::new(RADIUS + 5.0e4, 0.0, 0.0);
        let mut world = World::new().with_body(mun()).with_craft(orbiter(overhead));
        let report = detector.on_crash(&impactor(600.0), &mut world, &catalog);
        assert!((report.outcomes[0].observation.score_amount - 6.0).abs() < 1e-5);
    }

    #[test]
    fn minor_body_impacts_bypass_atmosphere_and_require_range() {
        let (_bus, detector) = detector();
        let catalog = SubjectCatalog::with_impact_experiments();
        let kerbin = CelestialBody::new("Kerbin", 3.5e12, 6.0e5).with_atmosphere(true);
        let rock = Craft::new(99, "Impactor", "Kerbin")
            .with_position(Vector3::new(1.0e7, 0.0, 0.0))
            .with_motion(Vector3::new(100.0, 0.0, 0.0), 500.0);
        let near = Craft::new(2, "Watcher", "Kerbin")
            .with_position(Vector3::new(1.0e7, 4.0e5, 0.0))
            .with_instrument(Instrument::spectrometer(21));
        let far = Craft::new(3, "Distant", "Kerbin")
            .with_position(Vector3::new(1.0e7, 6.0e5, 0.0))
            .with_instrument(Instrument::spectrometer(31));
        let mut world = World::new()
            .with_body(kerbin)
            .with_minor_body(MinorBody::new("HSJ-227", "Kerbin"))
            .with_craft(near)
            .with_craft(far);

        let report = detector.on_collide(&rock, "HSJ-227", &mut world, &catalog);
        assert_eq!(report.ignored, None);
        assert_eq!(report.observation_count(), 1);
        assert_eq!(report.outcomes[0].craft_id, 2);
        assert_eq!(
            report.outcomes[0].observation.minor_body_id.as_deref(),
            Some("HSJ-227")
        );

        let report = detector.on_collide(&rock, "Debris", &mut world, &catalog);
        assert_eq!(report.ignored, Some(IgnoreReason::UntrackedTarget));
    }

    #[test]
    fn missing_instruments_and_definitions_are_not_errors() {
        let (_bus, detector) = detector();
        let bare = Craft::new(5, "Bare", "Mun").with_situation(Situation::Landed);
        let mut world = World::new().with_body(mun()).with_craft(bare).with_craft(lander());
        let report = detector.on_crash(&impactor(600.0), &mut world, &SubjectCatalog::new());
        assert_eq!(report.observation_count(), 0);
        assert_eq!(report.missing_definitions.len(), 1);
    }

    #[test]
    fn line_of_sight_geometry() {
        let centre = Vector3::zeros();
        let impact = Vector3::new(1.0, 0.0, 0.0);
        assert!(has_line_of_sight(&centre, &impact, &Vector3::new(2.0, 0.5, 0.0), 90.0));
        assert!(!has_line_of_sight(&centre, &impact, &Vector3::new(0.0, 2.0, 0.0), 90.0));
        assert!(!has_line_of_sight(&centre, &impact, &Vector3::new(-2.0, 0.0, 0.0), 90.0));
    }
}
