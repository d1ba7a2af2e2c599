//! Impact instruments and their best-result storage
use serde::{Deserialize, Serialize};

use crate::bus::ImpactBus;
use crate::observation::Observation;

/// Sensor type carried by a craft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Seismometer,
    Spectrometer,
}

impl InstrumentKind {
    /// Whether a new observation should displace the stored one.
    #[must_use]
    pub fn should_replace(self, stored: &Observation, candidate: &Observation) -> bool {
        match self {
            Self::Seismometer => seismic_replaces(stored, candidate),
            Self::Spectrometer => spectral_replaces(stored, candidate),
        }
    }
}

/// Seismometer rule: the candidate must beat the stored reading on both
/// score and energy. Ties or one-sided improvements are discarded.
#[must_use]
pub fn seismic_replaces(stored: &Observation, candidate: &Observation) -> bool {
    candidate.score_amount > stored.score_amount && candidate.energy_joules > stored.energy_joules
}

/// Spectrometer rule: the candidate must strictly beat the stored score.
#[must_use]
pub fn spectral_replaces(stored: &Observation, candidate: &Observation) -> bool {
    candidate.score_amount > stored.score_amount
}

/// An instrument holding at most one stored observation: the best so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Flight id of the part carrying the instrument.
    pub id: u32,
    pub kind: InstrumentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored: Option<Observation>,
}

impl Instrument {
    #[must_use]
    pub const fn new(id: u32, kind: InstrumentKind) -> Self {
        Self {
            id,
            kind,
            stored: None,
        }
    }

    #[must_use]
    pub const fn seismometer(id: u32) -> Self {
        Self::new(id, InstrumentKind::Seismometer)
    }

    #[must_use]
    pub const fn spectrometer(id: u32) -> Self {
        Self::new(id, InstrumentKind::Spectrometer)
    }

    /// Offer a fresh observation. Returns `true` when it became the stored
    /// result under this instrument's replacement rule.
    pub fn offer(&mut self, candidate: Observation) -> bool {
        let accept = self
            .stored
            .as_ref()
            .is_none_or(|stored| self.kind.should_replace(stored, &candidate));
        if accept {
            log::debug!(
                "instrument {} stores {} reading (score {:.2})",
                self.id,
                candidate.kind.label(),
                candidate.score_amount
            );
            self.stored = Some(candidate);
        } else {
            log::debug!(
                "instrument {} discards {} reading: better data already stored",
                self.id,
                candidate.kind.label()
            );
        }
        accept
    }

    #[must_use]
    pub const fn stored(&self) -> Option<&Observation> {
        self.stored.as_ref()
    }

    #[must_use]
    pub const fn science_count(&self) -> usize {
        if self.stored.is_some() { 1 } else { 0 }
    }

    /// Discard the stored observation.
    pub fn dump(&mut self) -> Option<Observation> {
        self.stored.take()
    }

    /// Acknowledge the stored observation without changing it.
    #[must_use]
    pub const fn keep(&self) -> Option<&Observation> {
        self.stored.as_ref()
    }

    /// Send the stored observation home: publish it on the science channel and
    /// clear it. Returns `None` when nothing was stored.
    pub fn transmit(&mut self, bus: &ImpactBus) -> Option<Observation> {
        let observation = self.stored.take()?;
        log::info!(
            "instrument {} transmitted {} reading {}",
            self.id,
            observation.kind.label(),
            observation.subject_id
        );
        bus.publish_science(&observation);
        Some(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn seismic(score: f32, energy: f64) -> Observation {
        Observation::seismic("Mun", energy, 0.0, score, "seis@Mun")
    }

    fn spectral(score: f32) -> Observation {
        Observation::spectral("Mun", "Highlands", 0.0, score, "spec@Mun")
    }

    #[test]
    fn empty_instrument_accepts_anything() {
        let mut instrument = Instrument::seismometer(1);
        assert!(instrument.offer(seismic(0.5, 10.0)));
        assert_eq!(instrument.science_count(), 1);
    }

    #[test]
    fn seismometer_requires_both_score_and_energy_to_improve() {
        let mut instrument = Instrument::seismometer(1);
        instrument.offer(seismic(5.0, 1.0e9));

        assert!(!instrument.offer(seismic(6.0, 5.0e8)), "higher score, lower energy");
        assert!(!instrument.offer(seismic(4.0, 2.0e9)), "lower score, higher energy");
        assert!(!instrument.offer(seismic(5.0, 2.0e9)), "tied score");
        assert!((instrument.stored().unwrap().energy_joules - 1.0e9).abs() < f64::EPSILON);

        assert!(instrument.offer(seismic(6.0, 2.0e9)));
        assert!((instrument.stored().unwrap().energy_joules - 2.0e9).abs() < f64::EPSILON);
    }

    #[test]
    fn spectrometer_requires_strictly_better_score() {
        let mut instrument = Instrument::spectrometer(2);
        instrument.offer(spectral(3.0));
        assert!(!instrument.offer(spectral(3.0)));
        assert!(!instrument.offer(spectral(2.0)));
        assert!(instrument.offer(spectral(3.5)));
    }

    #[test]
    fn transmit_publishes_and_clears() {
        let bus = ImpactBus::new();
        let received = Rc::new(Cell::new(0));
        let counter = Rc::clone(&received);
        bus.science()
            .subscribe(move |_| counter.set(counter.get() + 1));

        let mut instrument = Instrument::spectrometer(3);
        assert!(instrument.transmit(&bus).is_none());
        instrument.offer(spectral(1.0));
        assert!(instrument.keep().is_some());
        assert!(instrument.transmit(&bus).is_some());
        assert_eq!(received.get(), 1);
        assert_eq!(instrument.science_count(), 0);
    }

    #[test]
    fn dump_discards_the_stored_result() {
        let mut instrument = Instrument::seismometer(4);
        instrument.offer(seismic(1.0, 1.0));
        assert!(instrument.dump().is_some());
        assert!(instrument.stored().is_none());
    }
}
