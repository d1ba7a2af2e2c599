//! Seeded campaigns driven through the public session API.
//!
//! Every campaign builds a small Vall system, runs one storyline against a
//! fresh session and fails with a readable message on the first broken
//! expectation.

use anyhow::{Context, Result, ensure};
use impact_science::numbers::usize_to_f64;
use impact_science::{
    BiomeBand, CelestialBody, Craft, Goal, GoalCandidate, ImpactConfig, ImpactSession, Instrument,
    MinorBody, ObservationKind, OfferId, OfferStatus, Prestige, SessionRecord, Situation,
    SpectralMode, SubjectCatalog, World, body_reference_energy, pick_weighted,
};
use nalgebra::Vector3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const VALL_MU: f64 = 3.5e12;
const VALL_RADIUS: f64 = 6.0e5;
const LANDER_ID: u32 = 1;
const ORBITER_ID: u32 = 2;
const SEISMOMETER_ID: u32 = 100;
const SPECTROMETER_ID: u32 = 200;
const MINOR_BODY: &str = "HSJ-227";

const DISTRIBUTION_DRAWS: usize = 3_000;
const DISTRIBUTION_TOLERANCE: f64 = 0.04;

fn vall() -> CelestialBody {
    CelestialBody::new("Vall", VALL_MU, VALL_RADIUS).with_biomes(vec![
        BiomeBand::new("Poles", 70.0, 91.0),
        BiomeBand::new("Highlands", 0.0, 70.0),
        BiomeBand::new("Midlands", -70.0, 0.0),
        BiomeBand::new("Poles", -91.0, -70.0),
    ])
}

fn escape_speed() -> f64 {
    (2.0 * VALL_MU / VALL_RADIUS).sqrt()
}

fn impactor(id: u32, speed: f64, latitude: f64) -> Craft {
    Craft::new(id, "Impactor", "Vall")
        .with_situation(Situation::SubOrbital)
        .with_position(Vector3::new(VALL_RADIUS, 0.0, 0.0))
        .with_motion(Vector3::new(-speed, 0.0, 0.0), 15_000.0)
        .with_coordinates(latitude, 10.0)
}

fn lander() -> Craft {
    Craft::new(LANDER_ID, "Seismic Station", "Vall")
        .with_situation(Situation::Landed)
        .with_instrument(Instrument::seismometer(SEISMOMETER_ID))
}

fn orbiter() -> Craft {
    Craft::new(ORBITER_ID, "Spectral Relay", "Vall")
        .with_position(Vector3::new(VALL_RADIUS + 8.0e4, 2.0e4, 0.0))
        .with_instrument(Instrument::spectrometer(SPECTROMETER_ID))
}

fn vall_system() -> World {
    World::new()
        .with_body(vall())
        .with_minor_body(MinorBody::new(MINOR_BODY, "Vall"))
        .with_craft(lander())
        .with_craft(orbiter())
}

fn session(seed: u64, config: ImpactConfig) -> Result<ImpactSession<SubjectCatalog>> {
    ImpactSession::new(
        seed,
        vall_system(),
        SubjectCatalog::with_impact_experiments(),
        config,
    )
    .context("building session")
}

fn offer_and_accept(
    session: &mut ImpactSession<SubjectCatalog>,
    kind: ObservationKind,
    prestige: Prestige,
) -> Result<OfferId> {
    let id = session
        .offer_goal(kind, prestige)?
        .with_context(|| format!("no {} goal available", kind.label()))?;
    ensure!(session.accept(id), "offer {id} could not be accepted");
    Ok(id)
}

fn status_of(session: &ImpactSession<SubjectCatalog>, id: OfferId) -> Result<OfferStatus> {
    session
        .goals()
        .get(id)
        .map(|offer| offer.status())
        .with_context(|| format!("offer {id} disappeared"))
}

fn goal_of(session: &ImpactSession<SubjectCatalog>, id: OfferId) -> Result<Goal> {
    session
        .goals()
        .get(id)
        .map(|offer| offer.goal().clone())
        .with_context(|| format!("offer {id} disappeared"))
}

/// The traced roll must fall inside the chosen candidate's weight window.
fn check_trace(session: &ImpactSession<SubjectCatalog>, id: OfferId) -> Result<()> {
    let trace = session
        .goals()
        .get(id)
        .and_then(|offer| offer.trace())
        .with_context(|| format!("offer {id} carries no decision trace"))?;
    let chosen = trace
        .chosen_index()
        .and_then(|index| trace.candidates.get(index))
        .with_context(|| format!("{} is not among the traced candidates", trace.chosen_id))?;
    let floor = chosen.cumulative_weight - chosen.increment;
    let slack = trace.total_weight * 1e-12;
    ensure!(
        trace.roll >= floor - slack && trace.roll <= chosen.cumulative_weight,
        "roll {} outside ({floor}, {}]",
        trace.roll,
        chosen.cumulative_weight
    );
    Ok(())
}

/// Offer, accept and persist a goal; the same seed must offer the same goal.
pub fn smoke(seed: u64) -> Result<()> {
    let mut first = session(seed, ImpactConfig::default_config())?;
    let id = offer_and_accept(&mut first, ObservationKind::Seismic, Prestige::Trivial)?;
    let goal = goal_of(&first, id)?;
    check_trace(&first, id)?;

    let mut twin = session(seed, ImpactConfig::default_config())?;
    let twin_id = offer_and_accept(&mut twin, ObservationKind::Seismic, Prestige::Trivial)?;
    ensure!(
        goal_of(&twin, twin_id)? == goal,
        "seed {seed} offered two different goals"
    );

    let value = first.to_record().to_value()?;
    let record = SessionRecord::decode(&value)?;
    let restored = ImpactSession::from_record(
        record,
        vall_system(),
        SubjectCatalog::with_impact_experiments(),
        ImpactConfig::default_config(),
    )?;
    ensure!(goal_of(&restored, id)? == goal, "restored goal differs");
    ensure!(
        status_of(&restored, id)? == OfferStatus::Active,
        "restored offer is not active"
    );
    ensure!(
        restored.bus().impacts().len() == 1,
        "restored offer did not resubscribe"
    );
    Ok(())
}

/// A half-escape crash stays below an exceptional threshold; a crash at
/// escape speed carries the reference energy and completes the goal.
pub fn seismic(seed: u64) -> Result<()> {
    let mut session = session(seed, ImpactConfig::default_config())?;
    let id = offer_and_accept(&mut session, ObservationKind::Seismic, Prestige::Exceptional)?;

    let reference = body_reference_energy(&vall());
    let threshold = goal_of(&session, id)?.energy_threshold;
    ensure!(
        threshold < reference,
        "threshold {threshold} is not below the reference energy {reference}"
    );

    session
        .world_mut()
        .upsert_craft(impactor(10, escape_speed() * 0.5, 5.0));
    session.report_crash(10).context("first impactor missing")?;
    ensure!(
        session.poll_offers().is_empty(),
        "a quarter of the reference energy completed an exceptional goal"
    );

    session
        .world_mut()
        .upsert_craft(impactor(11, escape_speed(), 5.0));
    let report = session.report_crash(11).context("second impactor missing")?;
    let stored = report
        .outcomes
        .iter()
        .any(|outcome| outcome.craft_id == LANDER_ID && outcome.stored);
    ensure!(stored, "stronger crash did not replace the stored reading");
    ensure!(
        session.poll_offers() == vec![id],
        "escape-speed crash did not complete the goal"
    );
    Ok(())
}

/// An orbital reading far enough from the equator meets a latitude goal once
/// it has been transmitted.
pub fn spectral(seed: u64) -> Result<()> {
    let mut config = ImpactConfig::default_config();
    config.spectral_mode = SpectralMode::Latitude;
    let required = config.latitude_for(Prestige::Significant);
    let mut session = session(seed, config)?;
    let id = offer_and_accept(&mut session, ObservationKind::Spectral, Prestige::Significant)?;

    session
        .world_mut()
        .upsert_craft(impactor(10, 800.0, required + 12.0));
    let report = session.report_crash(10).context("impactor missing")?;
    ensure!(
        report.outcomes.iter().any(|outcome| outcome.craft_id == ORBITER_ID),
        "orbiter did not see the impact"
    );
    let impact_done = session
        .goals()
        .get(id)
        .is_some_and(|offer| offer.impact().is_complete());
    ensure!(impact_done, "impact criterion still pending");
    ensure!(
        session.poll_offers().is_empty(),
        "goal completed before transmission"
    );

    session
        .transmit(ORBITER_ID, SPECTROMETER_ID)
        .context("spectrometer held no reading")?;
    ensure!(
        session.poll_offers() == vec![id],
        "transmitted reading did not complete the goal"
    );
    Ok(())
}

/// One asteroid goal completes through an observed collision; a second one
/// is cancelled exactly once when the asteroid is destroyed.
pub fn asteroid(seed: u64) -> Result<()> {
    let mut session = session(seed, ImpactConfig::default_config())?;
    let id = offer_and_accept(&mut session, ObservationKind::Asteroid, Prestige::Trivial)?;

    let mut rock = impactor(10, 120.0, 0.0);
    rock.position = Vector3::new(VALL_RADIUS + 1.0e5, 0.0, 0.0);
    session.world_mut().upsert_craft(rock);
    let report = session
        .report_collision(10, MINOR_BODY)
        .context("impactor missing")?;
    ensure!(
        report.observation_count() == 1,
        "asteroid impact went unobserved"
    );
    session
        .transmit(ORBITER_ID, SPECTROMETER_ID)
        .context("spectrometer held no reading")?;
    ensure!(
        session.poll_offers() == vec![id],
        "asteroid goal did not complete"
    );

    let mut doomed = self::session(seed, ImpactConfig::default_config())?;
    let doomed_id = offer_and_accept(&mut doomed, ObservationKind::Asteroid, Prestige::Trivial)?;
    ensure!(
        doomed.destroy_minor_body(MINOR_BODY) == vec![doomed_id],
        "destruction did not cancel the goal"
    );
    ensure!(
        doomed.destroy_minor_body(MINOR_BODY).is_empty(),
        "goal was cancelled twice"
    );
    ensure!(
        status_of(&doomed, doomed_id)? == OfferStatus::Cancelled,
        "cancelled goal reports another status"
    );
    Ok(())
}

/// Draws over cumulative weights 1, 4, 10 land on each candidate in
/// proportion to its increment.
pub fn distribution(seed: u64) -> Result<()> {
    let increments = [1.0, 3.0, 6.0];
    let mut running = 0.0;
    let candidates: Vec<GoalCandidate> = increments
        .iter()
        .enumerate()
        .map(|(index, increment)| {
            running += increment;
            GoalCandidate {
                weight: running,
                goal: Goal::seismic(format!("Body{index}"), 1.0),
            }
        })
        .collect();
    let total = running;

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut hits = [0_usize; 3];
    for _ in 0..DISTRIBUTION_DRAWS {
        let roll = rng.gen_range(0.0..total);
        let index = pick_weighted(&candidates, roll).context("empty candidate list")?;
        hits[index] += 1;
    }

    for (index, increment) in increments.iter().enumerate() {
        let observed = usize_to_f64(hits[index]) / usize_to_f64(DISTRIBUTION_DRAWS);
        let expected = increment / total;
        ensure!(
            (observed - expected).abs() < DISTRIBUTION_TOLERANCE,
            "candidate {index}: observed {observed:.3}, expected {expected:.3}"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaigns_pass_for_reference_seeds() {
        for seed in [1337, 42, 7] {
            smoke(seed).unwrap();
            seismic(seed).unwrap();
            spectral(seed).unwrap();
            asteroid(seed).unwrap();
            distribution(seed).unwrap();
        }
    }
}
