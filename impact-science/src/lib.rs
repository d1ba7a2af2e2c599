//! Impact Science Core
//!
//! Platform-agnostic impact science logic: turning reported collisions into
//! scored observations, offering weighted random impact goals, and tracking
//! their completion. The crate holds no global state and performs no I/O;
//! the host supplies the world snapshot, science definitions and storage.

pub mod body;
pub mod bus;
pub mod config;
pub mod constants;
pub mod craft;
pub mod criteria;
pub mod detector;
pub mod generator;
pub mod goal;
pub mod instrument;
pub mod numbers;
pub mod observation;
pub mod offer;
pub mod persist;
pub mod rng;
pub mod science;
pub mod score;
pub mod session;
pub mod trace;
pub mod world;

// Re-export commonly used types
pub use body::{BiomeBand, CelestialBody, MinorBody};
pub use bus::{Channel, ChannelKind, ImpactBus, SubscriptionId};
pub use config::{BiomeTiers, ConfigError, ImpactConfig, SpectralMode};
pub use craft::{Craft, Situation};
pub use criteria::{Criterion, CriterionRole, CriterionState};
pub use detector::{
    Collision, IgnoreReason, ImpactDetector, ImpactReport, ObserverOutcome, has_line_of_sight,
};
pub use generator::{
    ExistingGoal, GeneratedGoal, GoalError, GoalGenerator, GoalRegistry, pick_weighted,
};
pub use goal::{Goal, GoalCandidate, Prestige};
pub use instrument::{Instrument, InstrumentKind};
pub use observation::{Observation, ObservationKind};
pub use offer::{GoalBook, GoalOffer, OfferId, OfferStatus};
pub use persist::{
    GoalRecord, OfferRecord, RecordError, SessionRecord, StoredResultRecord, decode_observation,
};
pub use rng::RngBundle;
pub use science::{
    Experiment, ExperimentSituation, ScienceError, ScienceLibrary, ScienceSubject, SubjectCatalog,
};
pub use score::{
    body_reference_energy, energy_to_score, format_energy, kinetic_energy, reference_energy,
    score_to_energy,
};
pub use session::ImpactSession;
pub use trace::{GoalDecisionTrace, WeightedCandidate};
pub use world::World;

/// Trait for abstracting record persistence.
/// Host-specific implementations should provide this
pub trait RecordStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a record under `key`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be saved.
    fn save_record(&self, key: &str, record: &serde_json::Value) -> Result<(), Self::Error>;

    /// Load the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load_record(&self, key: &str) -> Result<Option<serde_json::Value>, Self::Error>;

    /// Delete the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be deleted.
    fn delete_record(&self, key: &str) -> Result<(), Self::Error>;
}

/// Builds sessions and moves them in and out of a record store.
pub struct ImpactEngine<L, S>
where
    L: ScienceLibrary + Clone,
    S: RecordStore,
{
    library: L,
    store: S,
    config: ImpactConfig,
}

impl<L, S> ImpactEngine<L, S>
where
    L: ScienceLibrary + Clone,
    S: RecordStore,
{
    /// Create an engine with the default configuration.
    pub fn new(library: L, store: S) -> Self {
        Self::with_config(library, store, ImpactConfig::default_config())
    }

    pub const fn with_config(library: L, store: S, config: ImpactConfig) -> Self {
        Self {
            library,
            store,
            config,
        }
    }

    pub const fn config(&self) -> &ImpactConfig {
        &self.config
    }

    /// Start a new session over `world` with the given seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn create_session(&self, seed: u64, world: World) -> Result<ImpactSession<L>, GoalError> {
        ImpactSession::new(seed, world, self.library.clone(), self.config.clone())
    }

    /// Persist a session's offers and stored results.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or saved.
    pub fn save_session(&self, slot: &str, session: &ImpactSession<L>) -> Result<(), anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let record = session.to_record().to_value()?;
        self.store.save_record(slot, &record).map_err(Into::into)
    }

    /// Restore a session saved under `slot` against the current `world`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record envelope is unusable.
    pub fn load_session(
        &self,
        slot: &str,
        world: World,
    ) -> Result<Option<ImpactSession<L>>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let Some(value) = self.store.load_record(slot).map_err(Into::into)? else {
            return Ok(None);
        };
        let record = SessionRecord::decode(&value)?;
        let session =
            ImpactSession::from_record(record, world, self.library.clone(), self.config.clone())?;
        Ok(Some(session))
    }

    /// Delete the session saved under `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be deleted.
    pub fn delete_session(&self, slot: &str) -> Result<(), S::Error> {
        self.store.delete_record(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStore {
        records: Rc<RefCell<HashMap<String, serde_json::Value>>>,
    }

    impl RecordStore for MemoryStore {
        type Error = Infallible;

        fn save_record(&self, key: &str, record: &serde_json::Value) -> Result<(), Self::Error> {
            self.records
                .borrow_mut()
                .insert(key.to_string(), record.clone());
            Ok(())
        }

        fn load_record(&self, key: &str) -> Result<Option<serde_json::Value>, Self::Error> {
            Ok(self.records.borrow().get(key).cloned())
        }

        fn delete_record(&self, key: &str) -> Result<(), Self::Error> {
            self.records.borrow_mut().remove(key);
            Ok(())
        }
    }

    fn world() -> World {
        World::new()
            .with_body(CelestialBody::new("Mun", 6.5e10, 2.0e5))
            .with_body(CelestialBody::new("Minmus", 1.77e9, 6.0e4))
    }

    #[test]
    fn engine_saves_and_restores_sessions() {
        let store = MemoryStore::default();
        let engine = ImpactEngine::new(SubjectCatalog::with_impact_experiments(), store.clone());
        let mut session = engine.create_session(0xABCD, world()).unwrap();
        let id = session
            .offer_goal(ObservationKind::Seismic, Prestige::Significant)
            .unwrap()
            .expect("an airless body is available");
        session.accept(id);
        engine.save_session("slot-one", &session).unwrap();
        let saved_goal = session.goals().get(id).unwrap().goal().clone();
        drop(session);

        let loaded = engine
            .load_session("slot-one", world())
            .unwrap()
            .expect("save exists");
        let offer = loaded.goals().get(id).unwrap();
        assert_eq!(offer.goal(), &saved_goal);
        assert_eq!(offer.status(), OfferStatus::Active);
        assert_eq!(loaded.bus().impacts().len(), 1);
        assert!(engine.load_session("missing-slot", world()).unwrap().is_none());

        engine.delete_session("slot-one").unwrap();
        assert!(store.records.borrow().is_empty());
    }

    #[test]
    fn corrupt_envelope_is_an_error() {
        let store = MemoryStore::default();
        store
            .records
            .borrow_mut()
            .insert("slot".into(), serde_json::json!("not a session"));
        let engine = ImpactEngine::new(SubjectCatalog::with_impact_experiments(), store);
        assert!(engine.load_session("slot", world()).is_err());
    }
}
