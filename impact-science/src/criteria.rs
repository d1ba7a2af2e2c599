//! Completion criteria attached to an offered goal.
//!
//! Every goal carries two criteria: the impact criterion listens on the
//! impact channel, the recovery criterion on the science channel. Each one
//! subscribes when created, evaluates observations against the shared goal,
//! and unsubscribes itself on the first match. Completion is one-way.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bus::{ChannelKind, ImpactBus, SubscriptionId};
use crate::goal::Goal;
use crate::observation::{Observation, ObservationKind};
use crate::score::format_energy;

/// Which half of a goal a criterion tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionRole {
    /// An instrument recorded the impact.
    Impact,
    /// The recorded data reached the space centre.
    Recovery,
}

impl CriterionRole {
    #[must_use]
    pub const fn channel(self) -> ChannelKind {
        match self {
            Self::Impact => ChannelKind::Impact,
            Self::Recovery => ChannelKind::Science,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CriterionState {
    #[default]
    Pending,
    Complete,
}

/// One subscription-backed completion check over a shared goal.
pub struct Criterion {
    role: CriterionRole,
    goal: Rc<Goal>,
    state: Rc<Cell<CriterionState>>,
    subscription: Rc<Cell<Option<SubscriptionId>>>,
    bus: Weak<ImpactBus>,
}

impl Criterion {
    /// Create a pending criterion subscribed to its channel.
    #[must_use]
    pub fn new(role: CriterionRole, goal: Rc<Goal>, bus: &Rc<ImpactBus>) -> Self {
        Self::restore(role, goal, bus, CriterionState::Pending)
    }

    /// Re-create a criterion from persisted state. A criterion restored as
    /// complete never subscribes.
    #[must_use]
    pub fn restore(
        role: CriterionRole,
        goal: Rc<Goal>,
        bus: &Rc<ImpactBus>,
        state: CriterionState,
    ) -> Self {
        let criterion = Self {
            role,
            goal,
            state: Rc::new(Cell::new(state)),
            subscription: Rc::new(Cell::new(None)),
            bus: Rc::downgrade(bus),
        };
        if state == CriterionState::Pending {
            criterion.register(bus);
        }
        criterion
    }

    fn register(&self, bus: &Rc<ImpactBus>) {
        let role = self.role;
        let goal = Rc::clone(&self.goal);
        let state = Rc::clone(&self.state);
        let subscription = Rc::clone(&self.subscription);
        let weak_bus = Rc::downgrade(bus);
        let id = bus
            .channel(role.channel())
            .subscribe(move |observation: &Observation| {
                if state.get() == CriterionState::Complete || !goal.is_satisfied_by(observation) {
                    return;
                }
                state.set(CriterionState::Complete);
                log::info!("{role:?} criterion complete for {}", goal.hash_key());
                if let (Some(id), Some(bus)) = (subscription.take(), weak_bus.upgrade()) {
                    bus.channel(role.channel()).unsubscribe(id);
                }
            });
        self.subscription.set(Some(id));
    }

    #[must_use]
    pub const fn role(&self) -> CriterionRole {
        self.role
    }

    #[must_use]
    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    #[must_use]
    pub fn state(&self) -> CriterionState {
        self.state.get()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state() == CriterionState::Complete
    }

    /// Whether the criterion still holds a live subscription.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.get().is_some()
    }

    /// Drop the subscription without completing. Safe to call repeatedly.
    pub fn unregister(&self) {
        if let (Some(id), Some(bus)) = (self.subscription.take(), self.bus.upgrade()) {
            bus.channel(self.role.channel()).unsubscribe(id);
        }
    }

    #[must_use]
    pub fn title(&self) -> String {
        match self.role {
            CriterionRole::Recovery => String::from("Recover science data"),
            CriterionRole::Impact => {
                let body = self.goal.target_body.as_deref().unwrap_or("unknown body");
                match (self.goal.expected_kind, self.goal.region.as_deref()) {
                    (ObservationKind::Seismic, _) => {
                        format!("Crash into {body} with {}", format_energy(self.goal.energy_threshold))
                    }
                    (ObservationKind::Spectral, Some(region)) => {
                        format!("Crash into {region} on {body}")
                    }
                    (ObservationKind::Spectral, None) => format!(
                        "Crash into {body} beyond {:.0} degrees latitude",
                        self.goal.latitude_threshold
                    ),
                    (ObservationKind::Asteroid, _) => format!(
                        "Crash into {}",
                        self.goal.minor_body_id.as_deref().unwrap_or("the asteroid")
                    ),
                }
            }
        }
    }
}

impl Drop for Criterion {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl fmt::Debug for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criterion")
            .field("role", &self.role)
            .field("goal", &self.goal.hash_key())
            .field("state", &self.state.get())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
