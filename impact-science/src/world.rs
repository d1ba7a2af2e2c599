//! Snapshot of the simulated system the host hands to the detector.
use serde::{Deserialize, Serialize};

use crate::body::{CelestialBody, MinorBody};
use crate::craft::Craft;

/// Bodies, tracked minor bodies and craft known to the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    #[serde(default)]
    pub bodies: Vec<CelestialBody>,
    #[serde(default)]
    pub minor_bodies: Vec<MinorBody>,
    #[serde(default)]
    pub craft: Vec<Craft>,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_body(mut self, body: CelestialBody) -> Self {
        self.bodies.push(body);
        self
    }

    #[must_use]
    pub fn with_minor_body(mut self, minor: MinorBody) -> Self {
        self.minor_bodies.push(minor);
        self
    }

    #[must_use]
    pub fn with_craft(mut self, craft: Craft) -> Self {
        self.craft.push(craft);
        self
    }

    #[must_use]
    pub fn body(&self, name: &str) -> Option<&CelestialBody> {
        self.bodies.iter().find(|body| body.name == name)
    }

    #[must_use]
    pub fn minor_body(&self, name: &str) -> Option<&MinorBody> {
        self.minor_bodies.iter().find(|minor| minor.name == name)
    }

    /// Stop tracking a minor body, returning it if it was tracked.
    pub fn remove_minor_body(&mut self, name: &str) -> Option<MinorBody> {
        let index = self.minor_bodies.iter().position(|minor| minor.name == name)?;
        Some(self.minor_bodies.remove(index))
    }

    #[must_use]
    pub fn craft(&self, id: u32) -> Option<&Craft> {
        self.craft.iter().find(|craft| craft.id == id)
    }

    pub fn craft_mut(&mut self, id: u32) -> Option<&mut Craft> {
        self.craft.iter_mut().find(|craft| craft.id == id)
    }

    /// Insert or replace a craft by id.
    pub fn upsert_craft(&mut self, craft: Craft) {
        if let Some(existing) = self.craft_mut(craft.id) {
            *existing = craft;
        } else {
            self.craft.push(craft);
        }
    }

    /// Remove a craft (destroyed or recovered), returning it if present.
    pub fn remove_craft(&mut self, id: u32) -> Option<Craft> {
        let index = self.craft.iter().position(|craft| craft.id == id)?;
        Some(self.craft.remove(index))
    }

    /// Bodies eligible for goals, in declaration order.
    pub fn goal_bodies(&self) -> impl Iterator<Item = &CelestialBody> {
        self.bodies.iter().filter(|body| body.is_goal_eligible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_and_removal() {
        let mut world = World::new()
            .with_body(CelestialBody::new("Mun", 6.5e10, 2.0e5))
            .with_body(CelestialBody::new("Kerbin", 3.5e12, 6.0e5).with_atmosphere(true))
            .with_minor_body(MinorBody::new("HSJ-227", "Kerbin"))
            .with_craft(Craft::new(1, "Probe", "Mun"));

        assert!(world.body("Mun").is_some());
        assert_eq!(world.goal_bodies().count(), 1);
        assert!(world.remove_minor_body("HSJ-227").is_some());
        assert!(world.remove_minor_body("HSJ-227").is_none());

        world.upsert_craft(Craft::new(1, "Probe Mk2", "Mun"));
        assert_eq!(world.craft.len(), 1);
        assert_eq!(world.craft(1).map(|c| c.name.as_str()), Some("Probe Mk2"));
        assert!(world.remove_craft(1).is_some());
        assert!(world.craft(1).is_none());
    }
}
