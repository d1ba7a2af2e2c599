use anyhow::Result;

use crate::logic::campaign;

/// A campaign run once per seed; an `Err` describes the first failed
/// expectation.
pub type CampaignFn = fn(u64) -> Result<()>;

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: String,
    pub description: &'static str,
    pub run: CampaignFn,
}

impl TestScenario {
    #[must_use]
    pub fn campaign(
        key: &'static str,
        name: impl Into<String>,
        description: &'static str,
        run: CampaignFn,
    ) -> Self {
        Self {
            key,
            name: name.into(),
            description,
            run,
        }
    }
}

pub fn all_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::campaign(
            "smoke",
            "Smoke",
            "Offer, accept and persist a goal",
            campaign::smoke,
        ),
        TestScenario::campaign(
            "seismic",
            "Seismic Campaign",
            "Exceptional seismic goal completed by an escape-speed crash",
            campaign::seismic,
        ),
        TestScenario::campaign(
            "spectral",
            "Spectral Campaign",
            "Latitude goal completed by an orbital reading and transmission",
            campaign::spectral,
        ),
        TestScenario::campaign(
            "asteroid",
            "Asteroid Campaign",
            "Asteroid goal completed, then a second one cancelled by destruction",
            campaign::asteroid,
        ),
        TestScenario::campaign(
            "distribution",
            "Weighted Distribution",
            "Goal sampling follows candidate weights",
            campaign::distribution,
        ),
    ]
}

pub fn scenario_keys() -> Vec<&'static str> {
    all_scenarios().iter().map(|scenario| scenario.key).collect()
}

pub fn get_scenario(key: &str) -> Option<TestScenario> {
    all_scenarios()
        .into_iter()
        .find(|scenario| scenario.key.eq_ignore_ascii_case(key))
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    all_scenarios()
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(get_scenario("Seismic").map(|s| s.key), Some("seismic"));
        assert!(get_scenario("vehicle-system").is_none());
    }

    #[test]
    fn catalog_keys_are_unique() {
        let mut keys = scenario_keys();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(list_scenarios().len(), total);
    }
}
