//! Raw record ingest.
//!
//! This module turns the two supported upstream shapes into `RawRecord`s,
//! grouped per region and sorted ascending by date:
//!
//! - **per-day JSON**: an array of objects with an integer `date` (`YYYYMMDD`),
//!   an optional `state` region code, and per-metric integers or `null`
//! - **wide CSV**: one row per region, one column per date, one metric per file
//!
//! Design goals:
//! - **Row-level validation** (drop bad records, but report what happened)
//! - **Deterministic behavior** (regions in sorted order, stable date sort)
//! - **Separation of concerns**: no analysis logic here

use std::collections::BTreeMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::StringRecord;
use serde_json::{Map, Value};

use crate::domain::{Metric, MetricCounts, RawRecord, RegionCode, date_to_int, parse_date_int};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line (CSV) or array position (JSON).
    pub line: usize,
    pub region: Option<RegionCode>,
    pub message: String,
}

/// Ingest output: per-region ascending records + row errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestedRecords {
    pub records: BTreeMap<RegionCode, Vec<RawRecord>>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedRecords {
    pub fn regions(&self) -> Vec<RegionCode> {
        self.records.keys().cloned().collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Merge another ingest into this one (e.g. state feed + national feed).
    pub fn merge(&mut self, other: IngestedRecords) {
        for (region, records) in other.records {
            self.records.entry(region).or_default().extend(records);
        }
        self.row_errors.extend(other.row_errors);
        self.rows_read += other.rows_read;
        self.sort_records();
    }

    fn sort_records(&mut self) {
        for records in self.records.values_mut() {
            records.sort_by_key(|r| r.date);
        }
    }
}

/// Parse a per-day JSON array.
///
/// Rows without a `state` field are assigned to `default_region`.
pub fn parse_daily_json(body: &str, default_region: &RegionCode) -> Result<IngestedRecords, AppError> {
    let rows: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| AppError::new(2, format!("Invalid daily JSON (expected an array of objects): {e}")))?;

    let mut out = IngestedRecords {
        rows_read: rows.len(),
        ..IngestedRecords::default()
    };

    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 1;
        match parse_json_row(row, default_region) {
            Ok(record) => out
                .records
                .entry(record.region.clone())
                .or_default()
                .push(record),
            Err((region, message)) => out.row_errors.push(RowError {
                line,
                region,
                message,
            }),
        }
    }

    out.sort_records();
    Ok(out)
}

/// Read a per-day JSON array from any reader.
pub fn read_daily_json<R: Read>(mut reader: R, default_region: &RegionCode) -> Result<IngestedRecords, AppError> {
    let mut body = String::new();
    reader
        .read_to_string(&mut body)
        .map_err(|e| AppError::new(4, format!("Failed to read daily JSON: {e}")))?;
    parse_daily_json(&body, default_region)
}

fn parse_json_row(row: &Value, default_region: &RegionCode) -> Result<RawRecord, (Option<RegionCode>, String)> {
    let obj = row
        .as_object()
        .ok_or_else(|| (None, "Row is not a JSON object.".to_string()))?;

    let region = match obj.get("state") {
        None | Some(Value::Null) => default_region.clone(),
        Some(Value::String(s)) if !s.trim().is_empty() => RegionCode::new(s),
        Some(other) => return Err((None, format!("Invalid state code {other}."))),
    };

    let date = parse_json_date(obj.get("date")).map_err(|e| (Some(region.clone()), e))?;

    let mut metrics = MetricCounts::default();
    for metric in Metric::ALL {
        let value = parse_json_count(obj, metric).map_err(|e| (Some(region.clone()), e))?;
        metrics = metrics.with(metric, value);
    }

    Ok(RawRecord::new(date, region, metrics))
}

fn parse_json_date(value: Option<&Value>) -> Result<u32, String> {
    let raw = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    raw.and_then(|v| u32::try_from(v).ok())
        .filter(|&v| parse_date_int(v).is_some())
        .ok_or_else(|| format!("Invalid date {}.", value.unwrap_or(&Value::Null)))
}

fn parse_json_count(obj: &Map<String, Value>, metric: Metric) -> Result<Option<i64>, String> {
    match obj.get(metric.field_name()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.round() as i64))
            .map(Some)
            .ok_or_else(|| format!("Non-numeric {} count {n}.", metric.field_name())),
        Some(other) => Err(format!("Non-numeric {} count {other}.", metric.field_name())),
    }
}

/// Parse a wide CSV time series (one row per region, one column per date).
///
/// The region column is the first header named `region`, `state`, `code` or
/// `country/region` (case-insensitive), else column 0. Every header that parses
/// as a date is a date column; other columns are ignored. Rows naming the same
/// region are summed per date (subdivisions rolled up to a country).
pub fn read_wide_csv<R: Read>(reader: R, metric: Metric) -> Result<IngestedRecords, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let region_col = find_region_column(&headers);
    let date_cols: Vec<(usize, u32)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != region_col)
        .filter_map(|(idx, name)| parse_header_date(name).map(|d| (idx, date_to_int(d))))
        .collect();

    if date_cols.is_empty() {
        return Err(AppError::new(2, "Wide CSV has no date columns."));
    }

    let mut totals: BTreeMap<RegionCode, BTreeMap<u32, Option<i64>>> = BTreeMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header line, 1-based numbering.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    region: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let Some(region) = record
            .get(region_col)
            .filter(|s| !s.is_empty())
            .map(RegionCode::new)
        else {
            row_errors.push(RowError {
                line,
                region: None,
                message: "Missing region code.".to_string(),
            });
            continue;
        };

        let per_date = totals.entry(region.clone()).or_default();
        for &(col, date) in &date_cols {
            let value = match parse_cell(record.get(col)) {
                Ok(v) => v,
                Err(e) => {
                    row_errors.push(RowError {
                        line,
                        region: Some(region.clone()),
                        message: format!("{date}: {e}"),
                    });
                    continue;
                }
            };
            let slot = per_date.entry(date).or_insert(None);
            *slot = match (*slot, value) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            };
        }
    }

    let records = totals
        .into_iter()
        .map(|(region, per_date)| {
            let records = per_date
                .into_iter()
                .map(|(date, value)| RawRecord::single(date, region.clone(), metric, value))
                .collect();
            (region, records)
        })
        .collect();

    Ok(IngestedRecords {
        records,
        row_errors,
        rows_read,
    })
}

fn find_region_column(headers: &StringRecord) -> usize {
    const NAMES: [&str; 4] = ["region", "state", "code", "country/region"];
    headers
        .iter()
        .position(|h| NAMES.contains(&normalize_header_name(h).as_str()))
        .unwrap_or(0)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_header_date(name: &str) -> Option<NaiveDate> {
    let name = normalize_header_name(name);
    if name.len() == 8 && name.bytes().all(|b| b.is_ascii_digit()) {
        return name.parse::<u32>().ok().and_then(parse_date_int);
    }
    // `%m/%d/%y` before `%m/%d/%Y` so that `3/25/20` is not read as year 20.
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];
    FMTS.iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&name, fmt).ok())
}

fn parse_cell(cell: Option<&str>) -> Result<Option<i64>, String> {
    let Some(s) = cell.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v.round() as i64)),
        _ => Err(format!("Non-numeric count '{s}'.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_json_groups_by_state_and_sorts_ascending() {
        let body = r#"[
            {"date": 20200303, "state": "NY", "positive": 30, "hospitalized": null, "death": 1},
            {"date": 20200302, "state": "NY", "positive": 20, "death": 0},
            {"date": 20200302, "state": "ca", "positive": 5},
            {"date": 20200301, "state": "NY", "positive": 10}
        ]"#;
        let out = parse_daily_json(body, &RegionCode::new("US")).unwrap();
        assert_eq!(out.rows_read, 4);
        assert!(out.row_errors.is_empty());
        assert_eq!(out.regions(), vec![RegionCode::new("CA"), RegionCode::new("NY")]);

        let ny = &out.records[&RegionCode::new("NY")];
        let dates: Vec<u32> = ny.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![20200301, 20200302, 20200303]);
        assert_eq!(ny[2].metrics.death, Some(1));
        assert_eq!(ny[2].metrics.hospitalized, None);
    }

    #[test]
    fn daily_json_without_state_uses_default_region() {
        let body = r#"[{"date": 20200301, "positive": 100}]"#;
        let out = parse_daily_json(body, &RegionCode::new("us")).unwrap();
        assert_eq!(out.regions(), vec![RegionCode::new("US")]);
    }

    #[test]
    fn malformed_json_rows_are_dropped_and_reported() {
        let body = r#"[
            {"date": 20200301, "state": "NY", "positive": 10},
            {"date": "not a date", "state": "NY", "positive": 11},
            {"date": 20200231, "state": "NY", "positive": 12},
            {"date": 20200302, "state": "NY", "positive": "lots"},
            {"date": 20200303, "state": "NY", "positive": 13.0},
            42
        ]"#;
        let out = parse_daily_json(body, &RegionCode::new("US")).unwrap();
        assert_eq!(out.row_errors.len(), 4);
        assert_eq!(out.row_errors[0].line, 2);
        assert_eq!(out.record_count(), 2);
        assert_eq!(out.records[&RegionCode::new("NY")][1].metrics.positive, Some(13));
    }

    #[test]
    fn invalid_json_document_is_an_error() {
        let err = parse_daily_json("{\"date\": 1}", &RegionCode::new("US")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn wide_csv_reads_date_columns_and_rolls_up_regions() {
        let csv = "\u{feff}Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20\n\
                   ,Italy,41.9,12.6,10,20,40\n\
                   Hubei,China,30.9,112.2,100,150,\n\
                   Beijing,China,40.2,116.4,5,6,7\n";
        let out = read_wide_csv(csv.as_bytes(), Metric::Death).unwrap();
        assert_eq!(out.rows_read, 3);
        assert!(out.row_errors.is_empty());

        let china = &out.records[&RegionCode::new("CHINA")];
        let values: Vec<Option<i64>> = china.iter().map(|r| r.metrics.death).collect();
        assert_eq!(values, vec![Some(105), Some(156), Some(7)]);
        assert_eq!(china[0].date, 20200301);

        let italy = &out.records[&RegionCode::new("ITALY")];
        assert_eq!(italy[2].metrics.death, Some(40));
    }

    #[test]
    fn wide_csv_reports_non_numeric_cells() {
        let csv = "region,2020-03-01,2020-03-02\nNY,1,n/a\n,3,4\n";
        let out = read_wide_csv(csv.as_bytes(), Metric::Positive).unwrap();
        assert_eq!(out.row_errors.len(), 2);
        assert_eq!(out.records[&RegionCode::new("NY")].len(), 1);
    }

    #[test]
    fn wide_csv_without_dates_is_an_error() {
        let err = read_wide_csv("region,name\nNY,New York\n".as_bytes(), Metric::Positive).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn header_dates_accept_common_formats() {
        let d = NaiveDate::from_ymd_opt(2020, 3, 25);
        assert_eq!(parse_header_date("3/25/20"), d);
        assert_eq!(parse_header_date("03/25/2020"), d);
        assert_eq!(parse_header_date("2020-03-25"), d);
        assert_eq!(parse_header_date("20200325"), d);
        assert_eq!(parse_header_date("Lat"), None);
    }
}
