use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AtlasError, Result};
use crate::normalize::{normalize, variant_keys};
use crate::region::RegionCode;
use crate::series::TimeSeries;

/// One parsed cell of the weekly matrix.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Cell::Empty;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(raw.to_string()),
        }
    }

    /// Numeric value; text and empty cells count as 0.
    pub fn value(&self) -> f64 {
        match self {
            Cell::Number(v) => *v,
            _ => 0.0,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Cell::Number(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

/// Wide weekly table: one time-label column plus one `"<CODE>|<county>"`
/// column per county. Rows are in ascending time order.
#[derive(Clone, Debug, Default)]
pub struct WideMatrix {
    time_column: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl WideMatrix {
    pub fn new(time_column: &str, columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { time_column: time_column.to_string(), columns, rows }
    }

    pub fn empty(time_column: &str) -> Self {
        Self::new(time_column, Vec::new(), Vec::new())
    }

    /// Reads CSV with a header row. Blank lines are skipped; short rows are
    /// tolerated and read as empty cells.
    pub fn from_reader<R: Read>(reader: R, time_column: &str) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = csv.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if !columns.iter().any(|c| c == time_column) {
            return Err(AtlasError::MissingTimeColumn(time_column.to_string()));
        }

        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(Cell::parse).collect());
        }

        Ok(Self::new(time_column, columns, rows))
    }

    pub fn from_path<P: AsRef<Path>>(path: P, time_column: &str) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, time_column)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    fn column_values(&self, col: usize) -> Vec<f64> {
        (0..self.rows.len())
            .map(|row| self.cell(row, col).map_or(0.0, Cell::value))
            .collect()
    }
}

/// Two distinct headers in one region whose names normalize to the same
/// key. The later header wins the lookup slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCollision {
    pub region: RegionCode,
    pub key: String,
    pub kept: String,
    pub replaced: String,
}

/// Read-only index over a [`WideMatrix`]: the shared label axis, a summed
/// series per region, and normalized county name -> column lookup.
#[derive(Debug)]
pub struct MatrixIndex {
    matrix: WideMatrix,
    labels: Arc<[String]>,
    region_series: BTreeMap<RegionCode, TimeSeries>,
    lookup: BTreeMap<RegionCode, BTreeMap<String, usize>>,
    collisions: Vec<KeyCollision>,
}

impl MatrixIndex {
    pub fn build(matrix: WideMatrix) -> Self {
        let time_col = matrix.columns.iter().position(|c| c == &matrix.time_column);
        let labels: Arc<[String]> = (0..matrix.rows.len())
            .map(|row| {
                time_col
                    .and_then(|col| matrix.cell(row, col))
                    .map(Cell::label)
                    .unwrap_or_default()
            })
            .collect();

        let mut region_columns: BTreeMap<RegionCode, Vec<usize>> = BTreeMap::new();
        let mut lookup: BTreeMap<RegionCode, BTreeMap<String, usize>> = BTreeMap::new();
        let mut collisions = Vec::new();

        for (col, header) in matrix.columns.iter().enumerate() {
            if Some(col) == time_col {
                continue;
            }
            let Some((code, county)) = header.split_once('|') else {
                debug!(header = %header, "skipping matrix column without region prefix");
                continue;
            };
            let Some(region) = RegionCode::parse(code) else {
                debug!(header = %header, "skipping matrix column with unknown region");
                continue;
            };
            region_columns.entry(region).or_default().push(col);

            let keys = lookup.entry(region).or_default();
            for key in variant_keys(county.trim()) {
                if let Some(prev) = keys.insert(key.clone(), col) {
                    if prev != col {
                        collisions.push(KeyCollision {
                            region,
                            key,
                            kept: header.clone(),
                            replaced: matrix.columns[prev].clone(),
                        });
                    }
                }
            }
        }

        let region_series = region_columns
            .iter()
            .map(|(region, cols)| {
                let values: Vec<f64> = (0..matrix.rows.len())
                    .map(|row| {
                        cols.iter()
                            .map(|col| matrix.cell(row, *col).map_or(0.0, Cell::value))
                            .sum::<f64>()
                    })
                    .collect();
                (*region, TimeSeries::new(Arc::clone(&labels), values))
            })
            .collect();

        info!(
            weeks = labels.len(),
            regions = region_columns.len(),
            collisions = collisions.len(),
            "indexed weekly matrix"
        );

        Self { matrix, labels, region_series, lookup, collisions }
    }

    pub fn labels(&self) -> &Arc<[String]> {
        &self.labels
    }

    pub fn region_series(&self, region: RegionCode) -> Option<&TimeSeries> {
        self.region_series.get(&region)
    }

    pub fn all_region_series(&self) -> &BTreeMap<RegionCode, TimeSeries> {
        &self.region_series
    }

    pub fn lookup(&self) -> &BTreeMap<RegionCode, BTreeMap<String, usize>> {
        &self.lookup
    }

    /// Header of the column `key` (already normalized) resolves to.
    pub fn column_for(&self, region: RegionCode, key: &str) -> Option<&str> {
        let col = *self.lookup.get(&region)?.get(key)?;
        self.matrix.columns.get(col).map(String::as_str)
    }

    /// Materializes the raw county column for a normalized key. O(rows).
    pub fn county_series(&self, region: RegionCode, key: &str) -> Option<TimeSeries> {
        let col = *self.lookup.get(&region)?.get(key)?;
        Some(TimeSeries::new(Arc::clone(&self.labels), self.matrix.column_values(col)))
    }

    /// Convenience for callers holding a free-text name.
    pub fn county_series_by_name(&self, region: RegionCode, name: &str) -> Option<TimeSeries> {
        self.county_series(region, &normalize(name))
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ca() -> RegionCode {
        RegionCode::parse("CA").unwrap()
    }

    fn sample_csv() -> &'static str {
        "week_start,CA|Los Angeles,CA|Orange,TX|Harris County,ZZ|Nowhere,junk\n\
         2020-01-01,5,3,7,100,1\n\
         2020-01-08,,2,x,100,1\n\
         \n\
         2020-01-15,1,1,1,100,1\n"
    }

    #[test]
    fn region_series_sums_county_columns() {
        let columns = vec!["week_start".into(), "CA|Los Angeles".into(), "CA|Orange".into()];
        let rows = vec![vec![
            Cell::Text("2020-01-01".into()),
            Cell::Number(5.0),
            Cell::Number(3.0),
        ]];
        let index = MatrixIndex::build(WideMatrix::new("week_start", columns, rows));
        let series = index.region_series(ca()).unwrap();
        assert_eq!(series.values(), &[8.0]);
        assert_eq!(series.labels(), &["2020-01-01".to_string()]);
    }

    #[test]
    fn reads_csv_and_skips_unknown_columns() {
        let matrix = WideMatrix::from_reader(sample_csv().as_bytes(), "week_start").unwrap();
        assert_eq!(matrix.row_count(), 3);
        let index = MatrixIndex::build(matrix);

        assert_eq!(index.region_series(ca()).unwrap().values(), &[8.0, 2.0, 2.0]);
        let tx = RegionCode::parse("TX").unwrap();
        assert_eq!(index.region_series(tx).unwrap().values(), &[7.0, 0.0, 1.0]);
        assert_eq!(index.all_region_series().len(), 2);
        assert!(RegionCode::parse("ZZ").is_none());
        for series in index.all_region_series().values() {
            assert_eq!(series.len(), 3);
        }
    }

    #[test]
    fn lookup_registers_name_variants() {
        let matrix = WideMatrix::from_reader(sample_csv().as_bytes(), "week_start").unwrap();
        let index = MatrixIndex::build(matrix);
        let tx = RegionCode::parse("TX").unwrap();
        assert_eq!(index.column_for(tx, "harris"), Some("TX|Harris County"));
        assert_eq!(index.column_for(ca(), "losangeles"), Some("CA|Los Angeles"));
        assert_eq!(
            index.county_series_by_name(ca(), "Orange County").unwrap().values(),
            &[3.0, 2.0, 1.0]
        );
        assert!(index.county_series_by_name(ca(), "Alameda").is_none());
    }

    #[test]
    fn missing_time_column_is_rejected() {
        let err = WideMatrix::from_reader("date,CA|Orange\n2020,1\n".as_bytes(), "week_start");
        assert!(matches!(err, Err(AtlasError::MissingTimeColumn(_))));
    }

    #[test]
    fn colliding_headers_are_reported_last_write_wins() {
        let matrix = WideMatrix::from_reader(
            "week_start,MO|St. Louis,MO|St. Louis city\n2020-01-01,4,9\n".as_bytes(),
            "week_start",
        )
        .unwrap();
        let index = MatrixIndex::build(matrix);
        let mo = RegionCode::parse("MO").unwrap();
        assert_eq!(index.column_for(mo, "saintlouis"), Some("MO|St. Louis city"));
        assert_eq!(index.collisions().len(), 1);
        let c = &index.collisions()[0];
        assert_eq!(c.key, "saintlouis");
        assert_eq!(c.replaced, "MO|St. Louis");
        assert_eq!(c.kept, "MO|St. Louis city");
    }

    #[test]
    fn indexing_is_deterministic() {
        let a = MatrixIndex::build(
            WideMatrix::from_reader(sample_csv().as_bytes(), "week_start").unwrap(),
        );
        let b = MatrixIndex::build(
            WideMatrix::from_reader(sample_csv().as_bytes(), "week_start").unwrap(),
        );
        assert_eq!(a.all_region_series(), b.all_region_series());
        assert_eq!(a.lookup(), b.lookup());
    }

    #[test]
    fn empty_matrix_indexes_to_nothing() {
        let index = MatrixIndex::build(WideMatrix::empty("week_start"));
        assert!(index.all_region_series().is_empty());
        assert!(index.lookup().is_empty());
        assert!(index.labels().is_empty());
    }
}
