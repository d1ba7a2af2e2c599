//! Session facade tying the bus, detector, generator and goal book together.
use std::rc::Rc;

use crate::bus::ImpactBus;
use crate::config::ImpactConfig;
use crate::constants::RECORD_VERSION;
use crate::detector::{Collision, ImpactDetector, ImpactReport};
use crate::generator::{GoalError, GoalGenerator};
use crate::goal::Prestige;
use crate::observation::{Observation, ObservationKind};
use crate::offer::{GoalBook, GoalOffer, OfferId};
use crate::persist::{OfferRecord, SessionRecord, StoredResultRecord};
use crate::rng::RngBundle;
use crate::science::ScienceLibrary;
use crate::world::World;

/// One running campaign: the shared bus, every service wired to it, and the
/// state they act on.
#[derive(Debug)]
pub struct ImpactSession<L> {
    seed: u64,
    bus: Rc<ImpactBus>,
    detector: ImpactDetector,
    generator: GoalGenerator,
    goals: GoalBook,
    world: World,
    library: L,
    rng: RngBundle,
}

impl<L: ScienceLibrary> ImpactSession<L> {
    /// # Errors
    ///
    /// Returns [`GoalError::Config`] when `config` fails validation.
    pub fn new(seed: u64, world: World, library: L, config: ImpactConfig) -> Result<Self, GoalError> {
        let bus = ImpactBus::shared();
        let generator = GoalGenerator::new(config.clone())?;
        Ok(Self {
            seed,
            detector: ImpactDetector::new(Rc::clone(&bus), config),
            bus,
            generator,
            goals: GoalBook::new(),
            world,
            library,
            rng: RngBundle::from_user_seed(seed),
        })
    }

    /// Rebuild a session from a persisted record. Offers are re-created with
    /// their criteria; stored results are returned to instruments that still
    /// exist in `world`. Random streams resume after the recorded draws.
    ///
    /// # Errors
    ///
    /// Returns [`GoalError::Config`] when `config` fails validation.
    pub fn from_record(
        record: SessionRecord,
        world: World,
        library: L,
        config: ImpactConfig,
    ) -> Result<Self, GoalError> {
        let mut session = Self::new(record.seed, world, library, config)?;
        session.rng = RngBundle::resume(record.seed, record.goal_draws, record.region_draws);
        for offer in record.offers {
            if let Some(minor) = offer.goal.minor_body_id.as_deref()
                && session.world.minor_body(minor).is_none()
            {
                log::warn!("restored goal targets untracked minor body {minor}");
            }
            let (id, offer) = offer.restore(&session.bus);
            session.goals.insert_with_id(id, offer);
        }
        for stored in record.stored_results {
            let instrument = session
                .world
                .craft_mut(stored.craft_id)
                .and_then(|craft| {
                    craft
                        .instruments
                        .iter_mut()
                        .find(|instrument| instrument.id == stored.instrument_id)
                });
            match instrument {
                Some(instrument) => instrument.stored = Some(stored.observation),
                None => log::warn!(
                    "no instrument {} on craft {} for stored result",
                    stored.instrument_id,
                    stored.craft_id
                ),
            }
        }
        Ok(session)
    }

    /// Snapshot offers and stored instrument results.
    #[must_use]
    pub fn to_record(&self) -> SessionRecord {
        let offers = self
            .goals
            .iter()
            .map(|(id, offer)| OfferRecord::from_offer(id, offer))
            .collect();
        let stored_results = self
            .world
            .craft
            .iter()
            .flat_map(|craft| {
                craft.instruments.iter().filter_map(move |instrument| {
                    instrument.stored().map(|observation| StoredResultRecord {
                        craft_id: craft.id,
                        instrument_id: instrument.id,
                        observation: observation.clone(),
                    })
                })
            })
            .collect();
        SessionRecord {
            version: RECORD_VERSION,
            seed: self.seed,
            goal_draws: self.rng.goals().draws(),
            region_draws: self.rng.regions().draws(),
            offers,
            stored_results,
        }
    }

    /// Generate and register a goal of `kind` at `prestige`. `Ok(None)` means
    /// nothing is available right now.
    ///
    /// # Errors
    ///
    /// Propagates [`GoalError`] for missing science definitions.
    pub fn offer_goal(
        &mut self,
        kind: ObservationKind,
        prestige: Prestige,
    ) -> Result<Option<OfferId>, GoalError> {
        let Some(generated) = self.generator.generate(
            kind,
            prestige,
            &self.world,
            &self.library,
            &self.goals,
            &self.rng,
        )?
        else {
            return Ok(None);
        };
        let offer = GoalOffer::new(generated.goal, generated.prestige, &self.bus)
            .with_trace(generated.trace);
        Ok(self.goals.insert(offer))
    }

    pub fn accept(&mut self, id: OfferId) -> bool {
        self.goals.get_mut(id).is_some_and(GoalOffer::accept)
    }

    /// The craft `craft_id` crashed into terrain and is destroyed.
    pub fn report_crash(&mut self, craft_id: u32) -> Option<ImpactReport> {
        let impactor = self.world.remove_craft(craft_id)?;
        Some(self.detector.on_crash(&impactor, &mut self.world, &self.library))
    }

    /// The craft `craft_id` collided with `other` and is destroyed.
    pub fn report_collision(&mut self, craft_id: u32, other: &str) -> Option<ImpactReport> {
        let impactor = self.world.remove_craft(craft_id)?;
        Some(
            self.detector
                .on_collide(&impactor, other, &mut self.world, &self.library),
        )
    }

    /// Run detection for a collision the host has already described.
    pub fn report(&mut self, collision: &Collision) -> ImpactReport {
        self.detector.detect(collision, &mut self.world, &self.library)
    }

    /// The craft was recovered: every stored observation aboard reaches the
    /// science channel and the craft leaves the world.
    pub fn recover_craft(&mut self, craft_id: u32) -> Vec<Observation> {
        let Some(craft) = self.world.remove_craft(craft_id) else {
            return Vec::new();
        };
        let recovered: Vec<Observation> = craft.stored_observations().cloned().collect();
        for observation in &recovered {
            self.bus.publish_science(observation);
        }
        log::info!("recovered {} with {} observations", craft.name, recovered.len());
        recovered
    }

    /// Transmit the stored result of one instrument.
    pub fn transmit(&mut self, craft_id: u32, instrument_id: u32) -> Option<Observation> {
        let craft = self.world.craft_mut(craft_id)?;
        let instrument = craft
            .instruments
            .iter_mut()
            .find(|instrument| instrument.id == instrument_id)?;
        instrument.transmit(&self.bus)
    }

    /// Stop tracking a minor body and cancel every goal that targets it.
    pub fn destroy_minor_body(&mut self, name: &str) -> Vec<OfferId> {
        if self.world.remove_minor_body(name).is_none() {
            log::debug!("destroyed minor body {name} was not tracked");
        }
        self.goals.destroy_minor_body(name)
    }

    /// Promote satisfied active offers; returns the ones completed now.
    pub fn poll_offers(&mut self) -> Vec<OfferId> {
        self.goals.poll()
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn bus(&self) -> &Rc<ImpactBus> {
        &self.bus
    }

    #[must_use]
    pub const fn config(&self) -> &ImpactConfig {
        self.generator.config()
    }

    #[must_use]
    pub const fn goals(&self) -> &GoalBook {
        &self.goals
    }

    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    pub const fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub const fn library(&self) -> &L {
        &self.library
    }

    pub const fn library_mut(&mut self) -> &mut L {
        &mut self.library
    }

    #[must_use]
    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }
}
