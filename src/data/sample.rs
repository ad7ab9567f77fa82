//! Synthetic per-region growth histories for offline runs and demos.
//!
//! Each region follows an exponential with its own initial level and doubling
//! time, where the doubling time drifts (positive drift = slowing growth).
//! Daily increments carry log-normal noise; a few days are unreported and a few
//! carry a downward revision so the normalizer has something to do.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Metric, MetricCounts, RawRecord, RegionCode, date_to_int};
use crate::error::AppError;
use crate::io::ingest::IngestedRecords;

/// Log-noise std dev on daily increments.
const INCREMENT_SIGMA: f64 = 0.15;
const MISSING_PROB: f64 = 0.03;
const REVISION_PROB: f64 = 0.03;
const HOSPITALIZED_SHARE: f64 = 0.15;
const DEATH_SHARE: f64 = 0.03;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub regions: usize,
    pub days: usize,
    pub seed: u64,
    pub start: NaiveDate,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            regions: 8,
            days: 40,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap_or_default(),
        }
    }
}

pub fn generate_sample(config: &SampleConfig) -> Result<IngestedRecords, AppError> {
    if config.regions == 0 {
        return Err(AppError::new(2, "Sample region count must be > 0."));
    }
    if config.days == 0 {
        return Err(AppError::new(2, "Sample day count must be > 0."));
    }
    if day_offset(config.start, config.days - 1).is_none() {
        return Err(AppError::new(2, "Sample date range overflows the calendar."));
    }

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut out = IngestedRecords::default();
    for idx in 0..config.regions {
        let region = RegionCode::new(format!("R{:02}", idx + 1));
        let mut rng = StdRng::seed_from_u64(sample_seed(config, &region));
        let records = region_history(&mut rng, &normal, &region, config)?;
        out.rows_read += records.len();
        out.records.insert(region, records);
    }
    Ok(out)
}

fn region_history(
    rng: &mut StdRng,
    normal: &Normal<f64>,
    region: &RegionCode,
    config: &SampleConfig,
) -> Result<Vec<RawRecord>, AppError> {
    let initial: f64 = rng.gen_range(20.0..200.0);
    let doubling: f64 = rng.gen_range(2.0..6.0);
    // Per-day change in doubling time; mostly slowing, sometimes speeding up.
    let drift: f64 = rng.gen_range(-0.02..0.08);

    let mut records = Vec::with_capacity(config.days);
    let mut level = initial;
    let mut reported: f64 = initial.round();

    for t in 0..config.days {
        let date = day_offset(config.start, t)
            .ok_or_else(|| AppError::new(2, "Sample date range overflows the calendar."))?;

        if t > 0 {
            let d_t = (doubling + drift * t as f64).max(0.5);
            let next = level * (1.0 / d_t).exp2();
            let noisy = (next - level) * (INCREMENT_SIGMA * normal.sample(rng)).exp();
            level = next;
            reported += noisy.round().max(0.0);
        }

        let roll: f64 = rng.r#gen();
        let positive = if t > 0 && roll < MISSING_PROB {
            None
        } else if t > 0 && roll < MISSING_PROB + REVISION_PROB {
            // Downward revision below the running total.
            Some((reported * 0.97).round() as i64)
        } else {
            Some(reported as i64)
        };

        let metrics = MetricCounts::default()
            .with(Metric::Positive, positive)
            .with(Metric::Hospitalized, positive.map(|p| (p as f64 * HOSPITALIZED_SHARE).round() as i64))
            .with(Metric::Death, positive.map(|p| (p as f64 * DEATH_SHARE).round() as i64));
        records.push(RawRecord::new(date_to_int(date), region.clone(), metrics));
    }

    Ok(records)
}

fn day_offset(start: NaiveDate, days: usize) -> Option<NaiveDate> {
    let offset = Duration::try_days(i64::try_from(days).ok()?)?;
    start.checked_add_signed(offset)
}

fn sample_seed(config: &SampleConfig, region: &RegionCode) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.days.hash(&mut hasher);
    config.start.hash(&mut hasher);
    region.hash(&mut hasher);
    hasher.finish()
}
