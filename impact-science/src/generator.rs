//! Weighted random goal generation.
//!
//! Generation enumerates every feasible target for the requested goal type,
//! gives each survivor a strictly increasing cumulative weight, and samples
//! one with a ceiling search over those weights. An empty candidate list is
//! a normal outcome, reported as `Ok(None)`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, ImpactConfig, SpectralMode};
use crate::constants::{
    ASTEROID_EXPERIMENT, SEISMIC_EXPERIMENT, SPECTRAL_EXPERIMENT, SURFACE_BIOME,
};
use crate::goal::{Goal, GoalCandidate, Prestige};
use crate::observation::ObservationKind;
use crate::offer::OfferStatus;
use crate::rng::RngBundle;
use crate::science::{ExperimentSituation, ScienceError, ScienceLibrary};
use crate::score::{reference_energy_for_mass, score_to_energy};
use crate::trace::{GoalDecisionTrace, WeightedCandidate};
use crate::world::World;

/// Fatal precondition failures for one generation attempt.
#[derive(Debug, Error, PartialEq)]
pub enum GoalError {
    #[error("science definitions unavailable: {0}")]
    Science(#[from] ScienceError),
    #[error("invalid impact configuration: {0}")]
    Config(#[from] ConfigError),
}

/// A goal currently known to the registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExistingGoal<'a> {
    pub prestige: Prestige,
    pub status: OfferStatus,
    pub goal: &'a Goal,
}

/// Goal registry query needed by the generator.
pub trait GoalRegistry {
    /// Current (offered or active) goals of `kind`.
    fn current_goals(&self, kind: ObservationKind) -> Vec<ExistingGoal<'_>>;
}

/// A selected goal with the telemetry of the draw that picked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedGoal {
    pub goal: Goal,
    pub prestige: Prestige,
    pub trace: GoalDecisionTrace,
}

/// Index of the first candidate whose cumulative weight is at least `roll`.
///
/// Rolls past the final weight select the last candidate. Returns `None` only
/// for an empty list.
#[must_use]
pub fn pick_weighted(candidates: &[GoalCandidate], roll: f64) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let index = candidates.partition_point(|candidate| candidate.weight < roll);
    Some(index.min(candidates.len() - 1))
}

/// Builds candidate lists and samples goals from them.
#[derive(Debug, Clone)]
pub struct GoalGenerator {
    config: ImpactConfig,
}

impl GoalGenerator {
    /// # Errors
    ///
    /// Returns [`GoalError::Config`] when the configuration fails validation.
    pub fn new(config: ImpactConfig) -> Result<Self, GoalError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &ImpactConfig {
        &self.config
    }

    /// Enumerate weighted candidates for `kind` at `prestige`.
    ///
    /// # Errors
    ///
    /// Returns [`GoalError::Science`] when the host has not defined the
    /// experiment or subject a candidate depends on.
    pub fn candidates<L, G>(
        &self,
        kind: ObservationKind,
        prestige: Prestige,
        world: &World,
        library: &L,
        registry: &G,
        rng: &RngBundle,
    ) -> Result<Vec<GoalCandidate>, GoalError>
    where
        L: ScienceLibrary + ?Sized,
        G: GoalRegistry + ?Sized,
    {
        let existing = registry.current_goals(kind);
        let tier_offered = existing
            .iter()
            .any(|other| other.prestige == prestige && other.status == OfferStatus::Offered);
        let is_taken = |target: &str| {
            tier_offered || existing.iter().any(|other| other.goal.target() == Some(target))
        };

        let mut goals = Vec::new();
        match kind {
            ObservationKind::Seismic => {
                library.experiment(SEISMIC_EXPERIMENT)?;
                for body in world.goal_bodies() {
                    if is_taken(&body.name) {
                        log::debug!("seismic candidate {} skipped: already targeted", body.name);
                        continue;
                    }
                    let subject = library.subject(
                        SEISMIC_EXPERIMENT,
                        ExperimentSituation::SrfLanded,
                        &body.name,
                        SURFACE_BIOME,
                    )?;
                    let (low, high) = prestige.score_band();
                    let fraction = rng.goals().gen_range(low..high);
                    let score = fraction * subject.science_cap;
                    let reference = reference_energy_for_mass(
                        self.config.reference_mass_kg,
                        body.grav_parameter,
                        body.radius,
                    );
                    let energy = score_to_energy(score, subject.science_cap, reference);
                    log::debug!(
                        "seismic candidate {}: score {score:.2}/{:.2} needs {energy:.3e} J",
                        body.name,
                        subject.science_cap
                    );
                    goals.push(Goal::seismic(&body.name, energy));
                }
            }
            ObservationKind::Spectral => {
                library.experiment(SPECTRAL_EXPERIMENT)?;
                for body in world.goal_bodies() {
                    if is_taken(&body.name) {
                        log::debug!("spectral candidate {} skipped: already targeted", body.name);
                        continue;
                    }
                    match self.config.spectral_mode {
                        SpectralMode::Biome => {
                            let biomes = self.config.biomes_for(&body.name, prestige);
                            if biomes.is_empty() {
                                log::debug!("no {prestige:?} biomes listed for {}", body.name);
                                continue;
                            }
                            let region = &biomes[rng.regions().gen_range(0..biomes.len())];
                            goals.push(Goal::spectral_region(&body.name, region));
                        }
                        SpectralMode::Latitude => {
                            let latitude = self.config.latitude_for(prestige);
                            goals.push(Goal::spectral_latitude(&body.name, latitude));
                        }
                    }
                }
            }
            ObservationKind::Asteroid => {
                library.experiment(ASTEROID_EXPERIMENT)?;
                for minor in &world.minor_bodies {
                    if is_taken(&minor.name) {
                        log::debug!("asteroid candidate {} skipped: already targeted", minor.name);
                        continue;
                    }
                    goals.push(Goal::asteroid(&minor.name));
                }
            }
        }

        let step = self.config.candidate_weight_step;
        let mut weight = 0.0;
        Ok(goals
            .into_iter()
            .map(|goal| {
                weight += step;
                GoalCandidate { weight, goal }
            })
            .collect())
    }

    /// Generate one goal of `kind` at `prestige`, or `Ok(None)` when nothing
    /// is available right now.
    ///
    /// # Errors
    ///
    /// Propagates [`GoalError`] from candidate enumeration.
    pub fn generate<L, G>(
        &self,
        kind: ObservationKind,
        prestige: Prestige,
        world: &World,
        library: &L,
        registry: &G,
        rng: &RngBundle,
    ) -> Result<Option<GeneratedGoal>, GoalError>
    where
        L: ScienceLibrary + ?Sized,
        G: GoalRegistry + ?Sized,
    {
        let candidates = self.candidates(kind, prestige, world, library, registry, rng)?;
        let Some(last) = candidates.last() else {
            log::info!("no {} goal available at {prestige:?}", kind.label());
            return Ok(None);
        };
        let total_weight = last.weight;
        let roll = rng.goals().gen_range(0.0..total_weight);
        let Some(index) = pick_weighted(&candidates, roll) else {
            return Ok(None);
        };

        let mut previous = 0.0;
        let traced = candidates
            .iter()
            .map(|candidate| {
                let increment = candidate.weight - previous;
                previous = candidate.weight;
                WeightedCandidate {
                    id: candidate.goal.hash_key(),
                    increment,
                    cumulative_weight: candidate.weight,
                }
            })
            .collect();
        let goal = candidates[index].goal.clone();
        let trace = GoalDecisionTrace {
            pool_id: format!("impact.goals.{}", kind.label()),
            roll,
            total_weight,
            candidates: traced,
            chosen_id: goal.hash_key(),
        };
        log::info!(
            "offered {} goal: {} ({} of {} candidates)",
            kind.label(),
            goal.title(),
            index + 1,
            candidates.len()
        );
        Ok(Some(GeneratedGoal {
            goal,
            prestige,
            trace,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{CelestialBody, MinorBody};
    use crate::config::BiomeTiers;
    use crate::science::SubjectCatalog;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    struct Registry(Vec<(Prestige, OfferStatus, Goal)>);

    impl GoalRegistry for Registry {
        fn current_goals(&self, kind: ObservationKind) -> Vec<ExistingGoal<'_>> {
            self.0
                .iter()
                .filter(|(_, _, goal)| goal.expected_kind == kind)
                .map(|(prestige, status, goal)| ExistingGoal {
                    prestige: *prestige,
                    status: *status,
                    goal,
                })
                .collect()
        }
    }

    fn candidate(weight: f64) -> GoalCandidate {
        GoalCandidate {
            weight,
            goal: Goal::seismic("Mun", weight),
        }
    }

    fn world() -> World {
        World::new()
            .with_body(CelestialBody::new("Kerbin", 3.5e12, 6.0e5).with_atmosphere(true))
            .with_body(CelestialBody::new("Mun", 6.5e10, 2.0e5))
            .with_body(CelestialBody::new("Minmus", 1.77e9, 6.0e4))
            .with_body(CelestialBody::new("Eeloo", 7.4e10, 2.1e5).with_reached(false))
            .with_minor_body(MinorBody::new("HSJ-227", "Kerbin"))
    }

    #[test]
    fn ceiling_search_boundaries() {
        let candidates = [candidate(1.0), candidate(2.0), candidate(3.0)];
        assert_eq!(pick_weighted(&candidates, 0.0), Some(0));
        assert_eq!(pick_weighted(&candidates, 1.0), Some(0));
        assert_eq!(pick_weighted(&candidates, 1.5), Some(1));
        assert_eq!(pick_weighted(&candidates, 3.0), Some(2));
        assert_eq!(pick_weighted(&candidates, 7.0), Some(2));
        assert_eq!(pick_weighted(&[], 0.5), None);
    }

    #[test]
    fn selection_is_proportional_to_weight_deltas() {
        let candidates = [candidate(1.0), candidate(3.0), candidate(6.0)];
        let mut rng = SmallRng::seed_from_u64(0x00C0_FFEE);
        let mut counts = [0_u32; 3];
        let draws = 60_000;
        for _ in 0..draws {
            let roll = rng.gen_range(0.0..6.0);
            counts[pick_weighted(&candidates, roll).unwrap()] += 1;
        }
        let expected = [1.0 / 6.0, 2.0 / 6.0, 3.0 / 6.0];
        for (count, share) in counts.iter().zip(expected) {
            let observed = f64::from(*count) / f64::from(draws);
            assert!((observed - share).abs() < 0.02, "{observed} vs {share}");
        }
    }

    #[test]
    fn seismic_candidates_cover_airless_reached_bodies_in_band() {
        let generator = GoalGenerator::new(ImpactConfig::default_config()).unwrap();
        let catalog = SubjectCatalog::with_impact_experiments();
        let rng = RngBundle::from_user_seed(1337);
        let candidates = generator
            .candidates(
                ObservationKind::Seismic,
                Prestige::Exceptional,
                &world(),
                &catalog,
                &Registry(Vec::new()),
                &rng,
            )
            .unwrap();
        let bodies: Vec<_> = candidates
            .iter()
            .map(|c| c.goal.target_body.as_deref().unwrap())
            .collect();
        assert_eq!(bodies, ["Mun", "Minmus"]);
        assert!(candidates.windows(2).all(|pair| pair[0].weight < pair[1].weight));

        let reference = 15_000.0 * 6.5e10 / 2.0e5;
        let threshold = candidates[0].goal.energy_threshold;
        assert!(threshold >= reference * 4.0 / 9.0 - 1.0);
        assert!(threshold < reference);
    }

    #[test]
    fn targeted_bodies_and_offered_tiers_are_skipped() {
        let generator = GoalGenerator::new(ImpactConfig::default_config()).unwrap();
        let catalog = SubjectCatalog::with_impact_experiments();
        let rng = RngBundle::from_user_seed(7);

        let active_on_mun = Registry(vec![(
            Prestige::Trivial,
            OfferStatus::Active,
            Goal::seismic("Mun", 1.0),
        )]);
        let candidates = generator
            .candidates(
                ObservationKind::Seismic,
                Prestige::Significant,
                &world(),
                &catalog,
                &active_on_mun,
                &rng,
            )
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].goal.target_body.as_deref(), Some("Minmus"));

        let offered_tier = Registry(vec![(
            Prestige::Significant,
            OfferStatus::Offered,
            Goal::seismic("Mun", 1.0),
        )]);
        let generated = generator
            .generate(
                ObservationKind::Seismic,
                Prestige::Significant,
                &world(),
                &catalog,
                &offered_tier,
                &rng,
            )
            .unwrap();
        assert!(generated.is_none());
    }

    #[test]
    fn spectral_modes_pick_region_or_latitude() {
        let catalog = SubjectCatalog::with_impact_experiments();
        let rng = RngBundle::from_user_seed(11);
        let mut config = ImpactConfig::default_config();
        config.biome_difficulty.insert(
            "Mun".into(),
            BiomeTiers {
                significant: vec!["Highlands".into(), "Midlands".into()],
                ..BiomeTiers::default()
            },
        );
        let generator = GoalGenerator::new(config.clone()).unwrap();
        let picked = generator
            .generate(
                ObservationKind::Spectral,
                Prestige::Significant,
                &world(),
                &catalog,
                &Registry(Vec::new()),
                &rng,
            )
            .unwrap()
            .unwrap();
        assert_eq!(picked.goal.target_body.as_deref(), Some("Mun"));
        let region = picked.goal.region.unwrap();
        assert!(region == "Highlands" || region == "Midlands");
        assert_eq!(picked.trace.candidates.len(), 1);

        config.spectral_mode = SpectralMode::Latitude;
        let generator = GoalGenerator::new(config).unwrap();
        let candidates = generator
            .candidates(
                ObservationKind::Spectral,
                Prestige::Exceptional,
                &world(),
                &catalog,
                &Registry(Vec::new()),
                &rng,
            )
            .unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates
            .iter()
            .all(|c| (c.goal.latitude_threshold - 75.0).abs() < f64::EPSILON && c.goal.region.is_none()));
    }

    #[test]
    fn asteroid_goals_target_tracked_minor_bodies() {
        let generator = GoalGenerator::new(ImpactConfig::default_config()).unwrap();
        let catalog = SubjectCatalog::with_impact_experiments();
        let rng = RngBundle::from_user_seed(3);
        let picked = generator
            .generate(
                ObservationKind::Asteroid,
                Prestige::Trivial,
                &world(),
                &catalog,
                &Registry(Vec::new()),
                &rng,
            )
            .unwrap()
            .unwrap();
        assert_eq!(picked.goal.minor_body_id.as_deref(), Some("HSJ-227"));
        assert_eq!(picked.goal.target_body, None);
        assert_eq!(picked.trace.pool_id, "impact.goals.asteroid");
    }

    #[test]
    fn missing_experiment_is_a_goal_error() {
        let generator = GoalGenerator::new(ImpactConfig::default_config()).unwrap();
        let err = generator
            .generate(
                ObservationKind::Seismic,
                Prestige::Trivial,
                &world(),
                &SubjectCatalog::new(),
                &Registry(Vec::new()),
                &RngBundle::from_user_seed(1),
            )
            .unwrap_err();
        assert_eq!(
            err,
            GoalError::Science(ScienceError::UnknownExperiment(SEISMIC_EXPERIMENT.into()))
        );
    }

    #[test]
    fn identical_seeds_generate_identical_goals() {
        let generator = GoalGenerator::new(ImpactConfig::default_config()).unwrap();
        let catalog = SubjectCatalog::with_impact_experiments();
        let draw = |seed| {
            generator
                .generate(
                    ObservationKind::Seismic,
                    Prestige::Significant,
                    &world(),
                    &catalog,
                    &Registry(Vec::new()),
                    &RngBundle::from_user_seed(seed),
                )
                .unwrap()
                .unwrap()
        };
        assert_eq!(draw(42), draw(42));
    }
}
