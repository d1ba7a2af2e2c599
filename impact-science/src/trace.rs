//! Explainability telemetry for weighted goal selection.
use serde::{Deserialize, Serialize};

/// Record of one weighted draw over a goal candidate pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDecisionTrace {
    /// Identifier for the candidate pool (e.g., `impact.goals.seismic`).
    pub pool_id: String,
    /// Uniform draw in `[0, total_weight)` used for the ceiling search.
    pub roll: f64,
    pub total_weight: f64,
    /// Candidates in enumeration order.
    pub candidates: Vec<WeightedCandidate>,
    pub chosen_id: String,
}

/// Candidate weight telemetry captured during selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCandidate {
    pub id: String,
    /// Weight this candidate added to the running sum.
    pub increment: f64,
    pub cumulative_weight: f64,
}

impl GoalDecisionTrace {
    /// Index of the chosen candidate within `candidates`.
    #[must_use]
    pub fn chosen_index(&self) -> Option<usize> {
        self.candidates
            .iter()
            .position(|candidate| candidate.id == self.chosen_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_trace_roundtrips() {
        let trace = GoalDecisionTrace {
            pool_id: String::from("impact.goals.seismic"),
            roll: 1.25,
            total_weight: 2.0,
            candidates: vec![
                WeightedCandidate {
                    id: String::from("seismicMun"),
                    increment: 1.0,
                    cumulative_weight: 1.0,
                },
                WeightedCandidate {
                    id: String::from("seismicMinmus"),
                    increment: 1.0,
                    cumulative_weight: 2.0,
                },
            ],
            chosen_id: String::from("seismicMinmus"),
        };
        let json = serde_json::to_string(&trace).expect("serialize");
        let restored: GoalDecisionTrace = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, trace);
        assert_eq!(restored.chosen_index(), Some(1));
    }
}
