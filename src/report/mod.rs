//! Reporting utilities: rankings and formatted terminal output.

pub mod format;

pub use format::*;

use std::cmp::Ordering;

use crate::domain::RegionAnalysis;

/// Order regions by current doubling time, fastest spread first.
///
/// Regions without a usable doubling time follow, in region order.
pub fn rank_by_doubling_time(analyses: &[RegionAnalysis]) -> Vec<&RegionAnalysis> {
    let mut ranked: Vec<&RegionAnalysis> = analyses.iter().collect();
    ranked.sort_by(|a, b| match (a.doubling_time(), b.doubling_time()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.region.cmp(&b.region)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.region.cmp(&b.region),
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::analyze_region;
    use crate::domain::{AnalysisConfig, Metric, RawRecord, RegionCode};

    fn analysis(code: &str, values: &[i64]) -> RegionAnalysis {
        let region = RegionCode::new(code);
        let records: Vec<RawRecord> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| RawRecord::single(20200301 + i as u32, region.clone(), Metric::Positive, Some(v)))
            .collect();
        analyze_region(&region, &records, &AnalysisConfig::default())
    }

    #[test]
    fn ranks_fastest_first_and_unfitted_last() {
        let fast: Vec<i64> = (0..10).map(|t| 10 << t).collect();
        let slow: Vec<i64> = (0..10).map(|t| (100.0 * 2f64.powf(t as f64 / 4.0)).round() as i64).collect();
        let analyses = vec![
            analysis("AA", &[1, 2, 3]),
            analysis("BB", &slow),
            analysis("CC", &fast),
        ];

        let ranked: Vec<&str> = rank_by_doubling_time(&analyses)
            .iter()
            .map(|a| a.region.as_str())
            .collect();
        assert_eq!(ranked, vec!["CC", "BB", "AA"]);
    }
}
