use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::{Metric, RawRecord, RegionCode};
use crate::error::AppError;
use crate::io::ingest::{IngestedRecords, RowError, read_daily_json, read_wide_csv};

/// Anything that can hand out ascending raw records per region.
pub trait DataSource {
    /// Region codes available from this source, sorted.
    fn regions(&self) -> Result<Vec<RegionCode>, AppError>;

    /// Raw records for one region, ascending by date.
    fn records(&self, region: &RegionCode) -> Result<Vec<RawRecord>, AppError>;

    /// Row-level problems seen while loading, if any.
    fn row_errors(&self) -> Vec<RowError> {
        Vec::new()
    }
}

/// A fully loaded source (file ingest, remote fetch, or synthetic data).
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    ingested: IngestedRecords,
}

impl InMemorySource {
    pub fn new(ingested: IngestedRecords) -> Self {
        Self { ingested }
    }

    /// Load a per-day JSON file.
    pub fn from_json_file(path: &Path, default_region: &RegionCode) -> Result<Self, AppError> {
        let file = open(path)?;
        Ok(Self::new(read_daily_json(BufReader::new(file), default_region)?))
    }

    /// Load a wide CSV file holding `metric`.
    pub fn from_csv_file(path: &Path, metric: Metric) -> Result<Self, AppError> {
        let file = open(path)?;
        Ok(Self::new(read_wide_csv(BufReader::new(file), metric)?))
    }

    pub fn ingested(&self) -> &IngestedRecords {
        &self.ingested
    }
}

impl DataSource for InMemorySource {
    fn regions(&self) -> Result<Vec<RegionCode>, AppError> {
        Ok(self.ingested.regions())
    }

    fn records(&self, region: &RegionCode) -> Result<Vec<RawRecord>, AppError> {
        self.ingested
            .records
            .get(region)
            .cloned()
            .ok_or_else(|| AppError::new(2, format!("Unknown region '{region}'.")))
    }

    fn row_errors(&self) -> Vec<RowError> {
        self.ingested.row_errors.clone()
    }
}

fn open(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(|e| AppError::new(4, format!("Failed to open '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_file_round_trips_through_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"date": 20200302, "state": "ny", "positive": 20}},
                {{"date": 20200301, "state": "ny", "positive": 10}},
                {{"date": 20200301, "positive": 99}}]"#
        )
        .unwrap();

        let source = InMemorySource::from_json_file(file.path(), &RegionCode::new("US")).unwrap();
        assert_eq!(
            source.regions().unwrap(),
            vec![RegionCode::new("NY"), RegionCode::new("US")]
        );
        let ny = source.records(&RegionCode::new("NY")).unwrap();
        assert_eq!(ny.iter().map(|r| r.date).collect::<Vec<_>>(), vec![20200301, 20200302]);
        assert!(source.row_errors().is_empty());
    }

    #[test]
    fn unknown_region_and_missing_file_are_errors() {
        let source = InMemorySource::default();
        assert_eq!(source.records(&RegionCode::new("NY")).unwrap_err().exit_code(), 2);

        let missing = Path::new("/definitely/not/here.json");
        let err = InMemorySource::from_json_file(missing, &RegionCode::new("US")).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
