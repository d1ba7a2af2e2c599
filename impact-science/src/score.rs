//! Conversion between impact kinetic energy and normalised science score.
//!
//! Score is defined as the square root of the impact energy relative to a
//! body-specific reference crash, capped at the subject's science cap. The
//! reference crash is a fixed-mass impactor arriving at escape velocity, so a
//! given fraction of the cap represents the same relative difficulty on every
//! body regardless of its gravity.

use crate::body::CelestialBody;
use crate::constants::{ENERGY_SUFFIXES, REFERENCE_IMPACTOR_MASS_KG};

/// Kinetic energy (J) of the reference impactor at escape velocity:
/// `m * mu / r`, which equals `0.5 * m * v_esc^2`.
#[must_use]
pub fn reference_energy(grav_parameter: f64, radius: f64) -> f64 {
    reference_energy_for_mass(REFERENCE_IMPACTOR_MASS_KG, grav_parameter, radius)
}

/// Reference energy for an explicitly configured impactor mass.
#[must_use]
pub fn reference_energy_for_mass(mass_kg: f64, grav_parameter: f64, radius: f64) -> f64 {
    if radius.is_nan() || radius <= 0.0 {
        return 0.0;
    }
    mass_kg * grav_parameter / radius
}

/// Reference energy for a body using the default 15 tonne impactor.
#[must_use]
pub fn body_reference_energy(body: &CelestialBody) -> f64 {
    reference_energy(body.grav_parameter, body.radius)
}

/// Energy needed to earn `score` out of `science_cap`. Not clamped: a target
/// above the cap demands more energy than the reference crash. A subject
/// without a positive cap needs no energy.
#[must_use]
pub fn score_to_energy(score: f64, science_cap: f64, reference_energy: f64) -> f64 {
    if science_cap.is_nan() || science_cap <= 0.0 {
        return 0.0;
    }
    let relative = score / science_cap;
    relative * relative * reference_energy
}

/// Score earned by an impact of `energy` joules, clamped to `[0, science_cap]`.
/// A degenerate reference energy earns nothing.
#[must_use]
pub fn energy_to_score(energy: f64, science_cap: f64, reference_energy: f64) -> f64 {
    if reference_energy.is_nan() || reference_energy <= 0.0 {
        return 0.0;
    }
    let relative = (energy.max(0.0) / reference_energy).sqrt().min(1.0);
    relative * science_cap
}

/// Kinetic energy of a moving mass.
#[must_use]
pub fn kinetic_energy(mass_kg: f64, speed_mps: f64) -> f64 {
    0.5 * mass_kg * speed_mps * speed_mps
}

/// Render an energy with three significant figures and an SI suffix
/// (`J` through `PJ`).
#[must_use]
pub fn format_energy(joules: f64) -> String {
    let mut figures = joules;
    let mut suffix = 0;
    while figures >= 1000.0 && suffix < ENERGY_SUFFIXES.len() - 1 {
        figures /= 1000.0;
        suffix += 1;
    }
    let label = ENERGY_SUFFIXES[suffix];
    if figures >= 100.0 {
        format!("{figures:.0}{label}")
    } else if figures >= 10.0 {
        format!("{figures:.1}{label}")
    } else {
        format!("{figures:.2}{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: f64 = 15.0;

    #[test]
    fn reference_energy_matches_worked_example() {
        let reference = reference_energy(3.5e12, 6.0e5);
        assert!((reference - 8.75e10).abs() < 1.0);
    }

    #[test]
    fn cap_boundary_is_an_exact_inverse() {
        let reference = 8.75e10;
        assert!((score_to_energy(CAP, CAP, reference) - reference).abs() < 1e-3);
        assert!((energy_to_score(reference, CAP, reference) - CAP).abs() < 1e-12);
    }

    #[test]
    fn energy_to_score_is_clamped_and_monotone() {
        let reference = 1.0e9;
        let mut previous = 0.0;
        for step in 0..=40 {
            let energy = f64::from(step) * 1.0e8;
            let score = energy_to_score(energy, CAP, reference);
            assert!((0.0..=CAP).contains(&score));
            assert!(score >= previous);
            previous = score;
        }
        assert!((energy_to_score(1.0e12, CAP, reference) - CAP).abs() < f64::EPSILON);
        assert!(energy_to_score(-5.0, CAP, reference).abs() < f64::EPSILON);
    }

    #[test]
    fn round_trip_holds_below_the_cap_and_saturates_above() {
        let reference = 2.0e9;
        for energy in [0.0, 1.0, 3.3e5, 1.0e8, 1.999e9, 2.0e9] {
            let back = score_to_energy(energy_to_score(energy, CAP, reference), CAP, reference);
            assert!((back - energy).abs() <= energy.max(1.0) * 1e-9, "{energy} -> {back}");
        }
        let saturated = score_to_energy(energy_to_score(8.0e9, CAP, reference), CAP, reference);
        assert!((saturated - reference).abs() < 1e-3);
    }

    #[test]
    fn score_to_energy_is_not_clamped() {
        let reference = 1.0e6;
        assert!((score_to_energy(2.0 * CAP, CAP, reference) - 4.0e6).abs() < 1e-6);
    }

    #[test]
    fn degenerate_inputs_score_zero_instead_of_nan() {
        assert!(reference_energy(3.5e12, 0.0).abs() < f64::EPSILON);
        assert!(energy_to_score(1.0e9, CAP, 0.0).abs() < f64::EPSILON);
        assert!(energy_to_score(1.0e9, CAP, f64::NAN).abs() < f64::EPSILON);
        assert!(score_to_energy(5.0, 0.0, 1.0e9).abs() < f64::EPSILON);
        assert!(energy_to_score(0.0, 0.0, 1.0e9).abs() < f64::EPSILON);
    }

    #[test]
    fn energy_format_uses_three_significant_figures() {
        assert_eq!(format_energy(5.0), "5.00J");
        assert_eq!(format_energy(12_345.0), "12.3kJ");
        assert_eq!(format_energy(987_654.0), "988kJ");
        assert_eq!(format_energy(8.75e10), "87.5GJ");
        assert_eq!(format_energy(3.0e18), "3000PJ");
    }
}
