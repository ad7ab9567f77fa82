//! Shared "analysis pipeline" logic used by every command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! raw records -> normalize -> fit -> project -> trend, per region
//!
//! Regions are independent: each one is analyzed on the rayon pool and the
//! results are collected in region order. A run is stamped with a fetch epoch
//! so a periodic refresh can keep only the newest complete snapshot.

use log::{debug, info};
use rayon::prelude::*;

use crate::data::DataSource;
use crate::domain::{
    AnalysisConfig, FitTarget, Metric, NormalizeReport, RawRecord, RegionAnalysis, RegionCode,
    TrendVerdict,
};
use crate::error::AppError;
use crate::fit::{compare_trend, fit_exponential};
use crate::io::ingest::RowError;
use crate::normalize::normalize;
use crate::project::project_thresholds;

/// All computed outputs of a single run over one raw-data snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSnapshot {
    pub epoch: u64,
    pub metric: Metric,
    pub target: FitTarget,
    pub regions: Vec<RegionAnalysis>,
    pub row_errors: Vec<RowError>,
}

impl AnalysisSnapshot {
    pub fn region(&self, code: &RegionCode) -> Option<&RegionAnalysis> {
        self.regions.iter().find(|r| &r.region == code)
    }

    /// Number of regions with a usable doubling time.
    pub fn fitted_count(&self) -> usize {
        self.regions.iter().filter(|r| r.doubling_time().is_some()).count()
    }

    /// Latest observation date across regions.
    pub fn as_of(&self) -> Option<chrono::NaiveDate> {
        self.regions
            .iter()
            .filter_map(|r| r.series.as_ref().and_then(|s| s.last()).map(|o| o.date))
            .max()
    }
}

/// Analyze one region's ascending raw records.
pub fn analyze_region(region: &RegionCode, records: &[RawRecord], config: &AnalysisConfig) -> RegionAnalysis {
    let normalized = match normalize(records, region, config.metric, config.policy) {
        Ok(n) => n,
        Err(err) => {
            return RegionAnalysis {
                region: region.clone(),
                metric: config.metric,
                series: None,
                report: NormalizeReport {
                    records_in: records.len(),
                    ..NormalizeReport::default()
                },
                regression: Err(err.clone()),
                projections: project_thresholds(&Err(err.clone()), &config.thresholds),
                trend: TrendVerdict::Indeterminate { reason: err },
            };
        }
    };

    let series = normalized.series;
    let regression = fit_exponential(&series, config.target);
    let projections = project_thresholds(&regression, &config.thresholds);
    let trend = compare_trend(&series, config.target, config.trend_lookback);

    debug!(
        "{region}: {} observations, trend {}",
        series.len(),
        trend.label()
    );

    RegionAnalysis {
        region: region.clone(),
        metric: config.metric,
        series: Some(series),
        report: normalized.report,
        regression,
        projections,
        trend,
    }
}

/// Pull records for every (selected) region from `source` and analyze them.
///
/// `regions` restricts the run; an empty slice means every region the source
/// knows about.
pub fn run_analysis(
    source: &dyn DataSource,
    config: &AnalysisConfig,
    regions: &[RegionCode],
    epoch: u64,
) -> Result<AnalysisSnapshot, AppError> {
    let available = source.regions()?;
    let selected: Vec<RegionCode> = if regions.is_empty() {
        available
    } else {
        for code in regions {
            if !available.contains(code) {
                return Err(AppError::new(2, format!("Unknown region '{code}'.")));
            }
        }
        regions.to_vec()
    };

    if selected.is_empty() {
        return Err(AppError::new(3, "Data source returned no regions."));
    }

    // Fetch sequentially (the source need not be thread-safe), analyze in parallel.
    let inputs = selected
        .into_iter()
        .map(|region| source.records(&region).map(|records| (region, records)))
        .collect::<Result<Vec<_>, AppError>>()?;

    let mut analyses: Vec<RegionAnalysis> = inputs
        .par_iter()
        .map(|(region, records)| analyze_region(region, records, config))
        .collect();
    analyses.sort_by(|a, b| a.region.cmp(&b.region));

    let snapshot = AnalysisSnapshot {
        epoch,
        metric: config.metric,
        target: config.target,
        regions: analyses,
        row_errors: source.row_errors(),
    };
    info!(
        "epoch {epoch}: analyzed {} regions ({} with a doubling time)",
        snapshot.regions.len(),
        snapshot.fitted_count()
    );
    Ok(snapshot)
}

/// Holds the newest complete snapshot (last write wins, keyed by epoch).
#[derive(Debug, Default)]
pub struct AnalysisBoard {
    latest: Option<AnalysisSnapshot>,
}

impl AnalysisBoard {
    /// Accept `snapshot` only if it is newer than the current one.
    ///
    /// Snapshots replace each other whole; results from two epochs are never
    /// merged. Returns whether the snapshot was accepted.
    pub fn publish(&mut self, snapshot: AnalysisSnapshot) -> bool {
        if let Some(current) = &self.latest {
            if snapshot.epoch <= current.epoch {
                debug!(
                    "discarding stale snapshot epoch {} (current {})",
                    snapshot.epoch, current.epoch
                );
                return false;
            }
        }
        self.latest = Some(snapshot);
        true
    }

    pub fn latest(&self) -> Option<&AnalysisSnapshot> {
        self.latest.as_ref()
    }

    pub fn epoch(&self) -> Option<u64> {
        self.latest.as_ref().map(|s| s.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemorySource;
    use crate::error::AnalysisError;
    use crate::io::ingest::IngestedRecords;

    fn records(region: &str, values: &[i64]) -> Vec<RawRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| RawRecord::single(20200301 + i as u32, RegionCode::new(region), Metric::Positive, Some(v)))
            .collect()
    }

    fn source() -> InMemorySource {
        let mut ingested = IngestedRecords::default();
        let growing: Vec<i64> = (0..14).map(|t| 10 * (1_i64 << t)).collect();
        ingested.records.insert(RegionCode::new("NY"), records("NY", &growing));
        ingested.records.insert(RegionCode::new("WY"), records("WY", &[1, 2, 3]));
        InMemorySource::new(ingested)
    }

    #[test]
    fn analyze_region_runs_every_stage() {
        let recs = records("NY", &[10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120, 10240, 20480]);
        let config = AnalysisConfig::default();
        let a = analyze_region(&RegionCode::new("NY"), &recs, &config);

        let series = a.series.as_ref().unwrap();
        assert_eq!(series.len(), 11);
        let fit = a.regression.as_ref().unwrap();
        assert!((fit.doubling_time.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(a.projections.len(), 3);
        assert!(a.projections.iter().all(|p| p.outcome.is_ok()));
        // Constant doubling: current and past agree up to rounding.
        assert!(a.trend.growth_change().unwrap().abs() < 1e-9);
    }

    #[test]
    fn unsorted_records_surface_as_typed_outcomes() {
        let mut recs = records("NY", &[1, 2, 4, 8, 16, 32]);
        recs.reverse();
        let a = analyze_region(&RegionCode::new("NY"), &recs, &AnalysisConfig::default());
        assert!(a.series.is_none());
        assert!(matches!(a.regression, Err(AnalysisError::UnsortedInput { .. })));
        assert!(matches!(a.trend, TrendVerdict::Indeterminate { .. }));
        assert!(a.projections.iter().all(|p| p.outcome.is_err()));
    }

    #[test]
    fn run_analysis_covers_all_regions_in_order() {
        let snapshot = run_analysis(&source(), &AnalysisConfig::default(), &[], 7).unwrap();
        assert_eq!(snapshot.epoch, 7);
        let codes: Vec<&str> = snapshot.regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(codes, vec!["NY", "WY"]);
        assert_eq!(snapshot.fitted_count(), 1);
        assert!(matches!(
            snapshot.region(&RegionCode::new("WY")).unwrap().regression,
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn run_analysis_rejects_unknown_regions() {
        let err = run_analysis(&source(), &AnalysisConfig::default(), &[RegionCode::new("ZZ")], 1).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn board_keeps_the_newest_epoch() {
        let newer = run_analysis(&source(), &AnalysisConfig::default(), &[], 2).unwrap();
        let older = run_analysis(&source(), &AnalysisConfig::default(), &[RegionCode::new("WY")], 1).unwrap();

        let mut board = AnalysisBoard::default();
        assert!(board.publish(newer));
        assert!(!board.publish(older));
        assert_eq!(board.epoch(), Some(2));
        assert_eq!(board.latest().unwrap().regions.len(), 2);
    }
}
