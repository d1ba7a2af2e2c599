//! Goal offers and the in-memory goal registry.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::bus::ImpactBus;
use crate::criteria::{Criterion, CriterionRole, CriterionState};
use crate::generator::{ExistingGoal, GoalRegistry};
use crate::goal::{Goal, Prestige};
use crate::observation::ObservationKind;
use crate::trace::GoalDecisionTrace;

/// Lifecycle of an offered goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Shown to the player, not yet accepted.
    #[default]
    Offered,
    Active,
    Completed,
    Cancelled,
}

impl OfferStatus {
    /// Offered and active goals count against generation.
    #[must_use]
    pub const fn is_current(self) -> bool {
        matches!(self, Self::Offered | Self::Active)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A goal together with its prestige, status, and two criteria.
#[derive(Debug)]
pub struct GoalOffer {
    goal: Rc<Goal>,
    prestige: Prestige,
    status: OfferStatus,
    impact: Criterion,
    recovery: Criterion,
    trace: Option<GoalDecisionTrace>,
}

impl GoalOffer {
    /// Offer `goal`, subscribing both criteria.
    #[must_use]
    pub fn new(goal: Goal, prestige: Prestige, bus: &Rc<ImpactBus>) -> Self {
        Self::restore(
            goal,
            prestige,
            OfferStatus::Offered,
            [CriterionState::Pending; 2],
            bus,
        )
    }

    /// Re-create an offer from persisted state. Finished offers and complete
    /// criteria hold no subscriptions.
    #[must_use]
    pub fn restore(
        goal: Goal,
        prestige: Prestige,
        status: OfferStatus,
        [impact_state, recovery_state]: [CriterionState; 2],
        bus: &Rc<ImpactBus>,
    ) -> Self {
        let goal = Rc::new(goal);
        let offer = Self {
            impact: Criterion::restore(CriterionRole::Impact, Rc::clone(&goal), bus, impact_state),
            recovery: Criterion::restore(
                CriterionRole::Recovery,
                Rc::clone(&goal),
                bus,
                recovery_state,
            ),
            goal,
            prestige,
            status,
            trace: None,
        };
        if status.is_terminal() {
            offer.release();
        }
        offer
    }

    #[must_use]
    pub fn with_trace(mut self, trace: GoalDecisionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    #[must_use]
    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    #[must_use]
    pub const fn prestige(&self) -> Prestige {
        self.prestige
    }

    #[must_use]
    pub const fn status(&self) -> OfferStatus {
        self.status
    }

    #[must_use]
    pub const fn impact(&self) -> &Criterion {
        &self.impact
    }

    #[must_use]
    pub const fn recovery(&self) -> &Criterion {
        &self.recovery
    }

    #[must_use]
    pub const fn trace(&self) -> Option<&GoalDecisionTrace> {
        self.trace.as_ref()
    }

    /// Both criteria complete.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.impact.is_complete() && self.recovery.is_complete()
    }

    /// Offered → Active. Returns `false` from any other status.
    pub fn accept(&mut self) -> bool {
        if self.status != OfferStatus::Offered {
            return false;
        }
        self.status = OfferStatus::Active;
        log::info!("goal accepted: {}", self.title());
        true
    }

    /// Move an active offer to Completed once both criteria are complete.
    pub fn poll(&mut self) -> OfferStatus {
        if self.status == OfferStatus::Active && self.is_satisfied() {
            self.status = OfferStatus::Completed;
            log::info!("goal completed: {}", self.title());
        }
        self.status
    }

    /// Cancel this offer because the minor body `name` no longer exists.
    /// Returns `true` only the first time it applies.
    pub fn cancel_for_minor_body(&mut self, name: &str) -> bool {
        if self.status.is_terminal()
            || self.goal.expected_kind != ObservationKind::Asteroid
            || self.goal.minor_body_id.as_deref() != Some(name)
        {
            return false;
        }
        self.status = OfferStatus::Cancelled;
        self.release();
        log::info!("goal cancelled: {name} was destroyed");
        true
    }

    fn release(&self) {
        self.impact.unregister();
        self.recovery.unregister();
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.goal.title()
    }

    #[must_use]
    pub fn hash_key(&self) -> String {
        self.goal.hash_key()
    }
}

/// Registry key for an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferId(pub u64);

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer-{}", self.0)
    }
}

/// In-memory registry of goal offers.
#[derive(Debug, Default)]
pub struct GoalBook {
    offers: BTreeMap<OfferId, GoalOffer>,
    next_id: u64,
}

impl GoalBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an offer. Returns `None` when a current offer already has the
    /// same hash key.
    pub fn insert(&mut self, offer: GoalOffer) -> Option<OfferId> {
        let key = offer.hash_key();
        if self
            .offers
            .values()
            .any(|existing| existing.status().is_current() && existing.hash_key() == key)
        {
            log::debug!("duplicate offer {key} rejected");
            return None;
        }
        let id = OfferId(self.next_id);
        self.next_id += 1;
        self.offers.insert(id, offer);
        Some(id)
    }

    /// Insert under a known id, replacing anything stored there.
    pub fn insert_with_id(&mut self, id: OfferId, offer: GoalOffer) {
        self.next_id = self.next_id.max(id.0 + 1);
        self.offers.insert(id, offer);
    }

    #[must_use]
    pub fn get(&self, id: OfferId) -> Option<&GoalOffer> {
        self.offers.get(&id)
    }

    pub fn get_mut(&mut self, id: OfferId) -> Option<&mut GoalOffer> {
        self.offers.get_mut(&id)
    }

    pub fn remove(&mut self, id: OfferId) -> Option<GoalOffer> {
        self.offers.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OfferId, &GoalOffer)> {
        self.offers.iter().map(|(id, offer)| (*id, offer))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Poll every offer; returns the ids that completed during this call.
    pub fn poll(&mut self) -> Vec<OfferId> {
        self.offers
            .iter_mut()
            .filter_map(|(id, offer)| {
                let before = offer.status();
                (offer.poll() == OfferStatus::Completed && before != OfferStatus::Completed)
                    .then_some(*id)
            })
            .collect()
    }

    /// Cancel every offer targeting the destroyed minor body.
    pub fn destroy_minor_body(&mut self, name: &str) -> Vec<OfferId> {
        self.offers
            .iter_mut()
            .filter_map(|(id, offer)| offer.cancel_for_minor_body(name).then_some(*id))
            .collect()
    }
}

impl GoalRegistry for GoalBook {
    fn current_goals(&self, kind: ObservationKind) -> Vec<ExistingGoal<'_>> {
        self.offers
            .values()
            .filter(|offer| offer.status().is_current() && offer.goal().expected_kind == kind)
            .map(|offer| ExistingGoal {
                prestige: offer.prestige(),
                status: offer.status(),
                goal: offer.goal(),
            })
            .collect()
    }
}
