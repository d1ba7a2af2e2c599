use std::collections::HashSet;

use thiserror::Error;

pub const DEFAULT_SEED: u64 = 1337;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("unrecognized seed token: {0}")]
    Unrecognized(String),
    #[error("seed range {start}..={end} is empty")]
    EmptyRange { start: u64, end: u64 },
}

/// Resolve CLI seed tokens into a de-duplicated seed list.
///
/// Supports literal integers (negative values use their magnitude) and
/// inclusive ranges written `start..end`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>, SeedError> {
    let mut seeds = Vec::new();
    let mut seen = HashSet::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        for seed in parse_token(token)? {
            if seen.insert(seed) {
                seeds.push(seed);
            }
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

fn parse_token(token: &str) -> Result<Vec<u64>, SeedError> {
    if let Some((start, end)) = token.split_once("..") {
        let start = parse_single(start)?;
        let end = parse_single(end)?;
        if start > end {
            return Err(SeedError::EmptyRange { start, end });
        }
        return Ok((start..=end).collect());
    }
    Ok(vec![parse_single(token)?])
}

fn parse_single(token: &str) -> Result<u64, SeedError> {
    let token = token.trim();
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    token
        .parse::<i64>()
        .map(i64::unsigned_abs)
        .map_err(|_| SeedError::Unrecognized(token.to_string()))
}
