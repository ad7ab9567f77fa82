//! Normalizer: raw records -> clean `Series`.
//!
//! Steps, applied in one chronological pass:
//!
//! 1. drop records whose date is not a real calendar day (`MalformedRecord`)
//! 2. fail fast if dates are not strictly ascending (`UnsortedInput`)
//! 3. carry the previous total forward when a value is absent
//! 4. clamp downward revisions to the running total (`enforce_monotonic`)
//! 5. derive the daily increase from the previous record
//! 6. drop records with no new signal (`drop_non_positive_increments`) and
//!    assign dense time indices to the survivors
//!
//! Time gaps from dropped days are not preserved: `time_index` counts
//! qualifying observations, not calendar days.

use chrono::NaiveDate;
use log::{debug, warn};

use crate::domain::{
    Metric, NormalizePolicy, NormalizeReport, Observation, RawRecord, RegionCode, Series,
};
use crate::error::AnalysisError;

/// Normalizer output: the cleaned series plus what was done to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    pub series: Series,
    pub report: NormalizeReport,
}

/// Normalize ascending raw records of one region into a `Series` for `metric`.
///
/// Records belonging to another region are dropped as malformed.
pub fn normalize(
    records: &[RawRecord],
    region: &RegionCode,
    metric: Metric,
    policy: NormalizePolicy,
) -> Result<NormalizedSeries, AnalysisError> {
    let mut report = NormalizeReport {
        records_in: records.len(),
        ..NormalizeReport::default()
    };
    let mut observations: Vec<Observation> = Vec::with_capacity(records.len());

    let mut previous_date: Option<NaiveDate> = None;
    let mut running: Option<f64> = None;

    for (index, record) in records.iter().enumerate() {
        let Some(date) = record.calendar_date() else {
            debug!("{region}/{}: dropping record with invalid date {}", metric.field_name(), record.date);
            report.malformed.push(AnalysisError::MalformedRecord {
                date: record.date,
                reason: "not a calendar date".to_string(),
            });
            continue;
        };
        if record.region != *region {
            report.malformed.push(AnalysisError::MalformedRecord {
                date: record.date,
                reason: format!("belongs to region {}", record.region),
            });
            continue;
        }

        if let Some(previous) = previous_date {
            if date <= previous {
                warn!("{region}/{}: record {index} ({date}) is not after {previous}", metric.field_name());
                return Err(AnalysisError::UnsortedInput {
                    index,
                    previous,
                    date,
                });
            }
        }
        previous_date = Some(date);

        let cumulative = match (record.metrics.get(metric), running) {
            (None, None) => {
                report.leading_unreported += 1;
                continue;
            }
            (None, Some(prev)) => {
                report.missing_filled += 1;
                prev
            }
            (Some(raw), None) => (raw as f64).max(0.0),
            (Some(raw), Some(prev)) => {
                let raw = (raw as f64).max(0.0);
                if policy.enforce_monotonic && raw < prev {
                    report.revisions_clamped += 1;
                    prev
                } else {
                    raw
                }
            }
        };

        let daily_increase = running.map(|prev| cumulative - prev);
        running = Some(cumulative);

        if policy.drop_non_positive_increments && !daily_increase.is_some_and(|d| d > 0.0) {
            report.flat_days_dropped += 1;
            continue;
        }

        observations.push(Observation {
            time_index: observations.len(),
            date,
            cumulative_value: cumulative,
            daily_increase,
        });
    }

    debug!(
        "{region}/{}: {} records -> {} observations ({} malformed, {} clamped, {} dropped)",
        metric.field_name(),
        report.records_in,
        observations.len(),
        report.malformed.len(),
        report.revisions_clamped,
        report.flat_days_dropped
    );

    Ok(NormalizedSeries {
        series: Series::from_parts(region.clone(), metric, observations),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetricCounts;

    fn region() -> RegionCode {
        RegionCode::new("NY")
    }

    fn records(values: &[Option<i64>]) -> Vec<RawRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| RawRecord::single(20200301 + i as u32, region(), Metric::Positive, v))
            .collect()
    }

    fn run(values: &[Option<i64>], policy: NormalizePolicy) -> NormalizedSeries {
        normalize(&records(values), &region(), Metric::Positive, policy).unwrap()
    }

    fn cumulative(series: &Series) -> Vec<f64> {
        series.observations().iter().map(|o| o.cumulative_value).collect()
    }

    #[test]
    fn downward_revisions_are_clamped_and_flat_days_dropped() {
        let out = run(
            &[Some(10), Some(20), Some(15), Some(30), Some(30), Some(45)],
            NormalizePolicy::default(),
        );
        // 10 (unobservable), 20 (+10), 15->20 (+0, dropped), 30 (+10), 30 (+0), 45 (+15)
        assert_eq!(cumulative(&out.series), vec![20.0, 30.0, 45.0]);
        assert_eq!(out.report.revisions_clamped, 1);
        assert_eq!(out.report.flat_days_dropped, 3);

        let idx: Vec<usize> = out.series.observations().iter().map(|o| o.time_index).collect();
        assert_eq!(idx, vec![0, 1, 2]);
        let inc: Vec<Option<f64>> = out.series.observations().iter().map(|o| o.daily_increase).collect();
        assert_eq!(inc, vec![Some(10.0), Some(10.0), Some(15.0)]);
    }

    #[test]
    fn series_is_monotonic_and_increments_are_consistent() {
        let out = run(
            &[Some(5), Some(3), Some(9), None, Some(2), Some(12), Some(40), Some(39), Some(41)],
            NormalizePolicy::default(),
        );
        let obs = out.series.observations();
        for w in obs.windows(2) {
            assert!(w[1].cumulative_value >= w[0].cumulative_value);
            assert!(w[1].date > w[0].date);
            assert_eq!(w[1].daily_increase, Some(w[1].cumulative_value - w[0].cumulative_value));
        }
    }

    #[test]
    fn missing_values_carry_forward_instead_of_resetting() {
        let out = run(
            &[Some(10), None, Some(12), None, None, Some(20)],
            NormalizePolicy {
                enforce_monotonic: true,
                drop_non_positive_increments: false,
            },
        );
        assert_eq!(cumulative(&out.series), vec![10.0, 10.0, 12.0, 12.0, 12.0, 20.0]);
        assert_eq!(out.report.missing_filled, 3);
        assert_eq!(out.series.observations()[0].daily_increase, None);
    }

    #[test]
    fn leading_unreported_records_are_skipped() {
        let out = run(&[None, None, Some(3), Some(7)], NormalizePolicy::default());
        assert_eq!(out.report.leading_unreported, 2);
        assert_eq!(cumulative(&out.series), vec![7.0]);
    }

    #[test]
    fn reset_to_raw_policy_keeps_revisions() {
        let out = run(
            &[Some(10), Some(20), Some(15), Some(30)],
            NormalizePolicy {
                enforce_monotonic: false,
                drop_non_positive_increments: false,
            },
        );
        assert_eq!(cumulative(&out.series), vec![10.0, 20.0, 15.0, 30.0]);
        assert_eq!(out.series.observations()[2].daily_increase, Some(-5.0));
        assert_eq!(out.report.revisions_clamped, 0);
    }

    #[test]
    fn first_value_is_clamped_to_zero() {
        let out = run(
            &[Some(-4), Some(2)],
            NormalizePolicy {
                enforce_monotonic: true,
                drop_non_positive_increments: false,
            },
        );
        assert_eq!(cumulative(&out.series), vec![0.0, 2.0]);
    }

    #[test]
    fn unsorted_input_fails_fast() {
        let mut recs = records(&[Some(1), Some(2), Some(3)]);
        recs.swap(1, 2);
        let err = normalize(&recs, &region(), Metric::Positive, NormalizePolicy::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsortedInput { index: 2, .. }));
    }

    #[test]
    fn duplicate_dates_are_unsorted() {
        let mut recs = records(&[Some(1), Some(2)]);
        recs[1].date = recs[0].date;
        let err = normalize(&recs, &region(), Metric::Positive, NormalizePolicy::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsortedInput { .. }));
    }

    #[test]
    fn malformed_records_are_dropped_and_processing_continues() {
        let mut recs = records(&[Some(1), Some(2), Some(4), Some(8)]);
        recs[2].date = 20200231;
        recs.push(RawRecord::new(20200310, RegionCode::new("CA"), MetricCounts::default()));
        let out = normalize(&recs, &region(), Metric::Positive, NormalizePolicy::default()).unwrap();
        assert_eq!(out.report.malformed.len(), 2);
        assert_eq!(cumulative(&out.series), vec![2.0, 8.0]);
    }

    #[test]
    fn metrics_are_selected_explicitly() {
        let recs: Vec<RawRecord> = (0..4)
            .map(|i| {
                let counts = MetricCounts {
                    positive: Some(100 * (i + 1)),
                    hospitalized: None,
                    death: Some(i),
                };
                RawRecord::new(20200401 + i as u32, region(), counts)
            })
            .collect();
        let deaths = normalize(&recs, &region(), Metric::Death, NormalizePolicy::default()).unwrap();
        assert_eq!(cumulative(&deaths.series), vec![1.0, 2.0, 3.0]);
        let hosp = normalize(&recs, &region(), Metric::Hospitalized, NormalizePolicy::default()).unwrap();
        assert!(hosp.series.is_empty());
        assert_eq!(hosp.report.leading_unreported, 4);
    }

    #[test]
    fn renormalizing_a_series_is_idempotent() {
        let first = run(
            &[Some(3), Some(5), Some(4), None, Some(9), Some(9), Some(20), Some(18), Some(33)],
            NormalizePolicy::default(),
        );
        let again = normalize(
            &first.series.to_raw_records(),
            &region(),
            Metric::Positive,
            NormalizePolicy::default(),
        )
        .unwrap();
        assert_eq!(again.series, first.series);
    }

    #[test]
    fn short_series_is_not_analyzable() {
        let four = run(&[Some(1), Some(2), Some(3), Some(4), Some(5)], NormalizePolicy::default());
        assert_eq!(four.series.len(), 4);
        assert!(!four.series.is_analyzable());
        let five = run(&[Some(1), Some(2), Some(3), Some(4), Some(5), Some(6)], NormalizePolicy::default());
        assert!(five.series.is_analyzable());
    }
}
