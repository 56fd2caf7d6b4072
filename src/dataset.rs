use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const TARGET_COLUMN: &str = "StressLevel";
pub const GROUP_COLUMN: &str = "AcademicPerf";

/// Non-target columns, in the order the models were trained on.
pub const FEATURE_COLUMNS: [&str; 4] = ["SleepQuality", "AcademicPerf", "StudyLoad", "Extracurricular"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset {0} not found")]
    NotFound(PathBuf),
    #[error("failed to read dataset {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV")]
    Csv(#[from] csv::Error),
    #[error("row {row}, column {column}: {raw:?} is not numeric")]
    NonNumeric {
        row: usize,
        column: String,
        raw: String,
    },
    #[error("dataset has no rows")]
    Empty,
    #[error("dataset has no {0} column")]
    MissingColumn(String),
    #[error("feature columns {found:?} do not match {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl DatasetError {
    pub fn kind(&self) -> &'static str {
        match self {
            DatasetError::NotFound(_) => "not_found",
            DatasetError::Io { .. } => "io",
            DatasetError::Csv(_) | DatasetError::NonNumeric { .. } | DatasetError::Empty => "malformed",
            DatasetError::MissingColumn(_) | DatasetError::SchemaMismatch { .. } => "schema_mismatch",
        }
    }
}

/// Column-oriented numeric table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                DatasetError::NotFound(path.to_path_buf())
            } else {
                DatasetError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_reader(file)
    }

    /// Blank cells load as NaN and are skipped by the statistics below.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut values = vec![Vec::new(); columns.len()];

        for (index, record) in reader.records().enumerate() {
            let record = record?;
            for (slot, raw) in record.iter().enumerate() {
                let value = if raw.is_empty() {
                    f64::NAN
                } else {
                    raw.parse::<f64>().map_err(|_| DatasetError::NonNumeric {
                        row: index + 1,
                        column: columns[slot].clone(),
                        raw: raw.to_string(),
                    })?
                };
                values[slot].push(value);
            }
        }

        if values.first().map_or(true, Vec::is_empty) {
            return Err(DatasetError::Empty);
        }

        Ok(Self { columns, values })
    }

    pub fn column(&self, name: &str) -> Result<&[f64], DatasetError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|index| self.values[index].as_slice())
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    /// Checks the target, grouping and feature columns the dashboard relies on.
    pub fn validate(&self) -> Result<(), DatasetError> {
        self.column(TARGET_COLUMN)?;
        self.column(GROUP_COLUMN)?;

        let found: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.as_str() != TARGET_COLUMN)
            .cloned()
            .collect();
        if found.iter().map(String::as_str).ne(FEATURE_COLUMNS.iter().copied()) {
            return Err(DatasetError::SchemaMismatch {
                expected: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
                found,
            });
        }
        Ok(())
    }

    pub fn feature_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| *c != TARGET_COLUMN)
            .collect()
    }

    pub fn correlation_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.columns.len();
        let mut matrix = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            for j in i..n {
                let r = pearson(&self.values[i], &self.values[j]);
                matrix[i][j] = r;
                matrix[j][i] = r;
            }
        }
        matrix
    }

    pub fn grouped_box_stats(&self, value: &str, by: &str) -> Result<Vec<BoxStats>, DatasetError> {
        let values = self.column(value)?;
        let keys = self.column(by)?;

        let mut groups: BTreeMap<i64, (f64, Vec<f64>)> = BTreeMap::new();
        for (key, value) in keys.iter().zip(values).filter(|(key, _)| !key.is_nan()) {
            let entry = groups.entry(ordered_key(*key)).or_insert((*key, Vec::new()));
            entry.1.push(*value);
        }

        Ok(groups
            .into_values()
            .filter_map(|(key, samples)| BoxStats::from_samples(key, samples))
            .collect())
    }
}

/// Maps an f64 onto an i64 with the same total ordering.
fn ordered_key(value: f64) -> i64 {
    let bits = value.to_bits() as i64;
    if bits < 0 {
        bits ^ i64::MAX
    } else {
        bits
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Equal-width bins over the observed range; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Histogram {
            edges: (0..=bins).map(|i| i as f64 / bins as f64).collect(),
            counts: vec![0; bins],
        };
    }

    let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }

    let width = (max - min) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
    edges[bins] = max;
    let mut counts = vec![0; bins];
    for value in finite {
        let bin = (((value - min) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    Histogram { edges, counts }
}

/// Correlation over the rows where both values are present.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub group: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_samples(group: f64, mut samples: Vec<f64>) -> Option<Self> {
        samples.retain(|v| v.is_finite());
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = quantile(&samples, 0.25);
        let median = quantile(&samples, 0.5);
        let q3 = quantile(&samples, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;

        let lower_whisker = samples
            .iter()
            .copied()
            .find(|v| *v >= low_fence)
            .unwrap_or(q1);
        let upper_whisker = samples
            .iter()
            .rev()
            .copied()
            .find(|v| *v <= high_fence)
            .unwrap_or(q3);
        let outliers = samples
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(Self {
            group,
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Linear interpolation between closest ranks; `sorted` must be ascending.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
SleepQuality,AcademicPerf,StudyLoad,Extracurricular,StressLevel
1,2,5,1,5
2,2,4,2,4
3,3,3,3,3
4,4,2,4,2
5,4,1,5,1
";

    fn sample() -> Dataset {
        Dataset::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn loads_numeric_columns() {
        let dataset = sample();
        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.column("StressLevel").unwrap(), &[5.0, 4.0, 3.0, 2.0, 1.0]);
        dataset.validate().unwrap();
        assert_eq!(dataset.feature_columns(), FEATURE_COLUMNS.to_vec());
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = std::env::temp_dir().join(format!("{}.csv", uuid::Uuid::new_v4()));
        let err = Dataset::load(&path).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn missing_stress_column_is_schema_error() {
        let csv = "SleepQuality,AcademicPerf,StudyLoad,Extracurricular\n1,2,3,4\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        let err = dataset.validate().unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "StressLevel"));
        assert_eq!(err.kind(), "schema_mismatch");
    }

    #[test]
    fn reordered_features_are_schema_mismatch() {
        let csv = "StudyLoad,SleepQuality,AcademicPerf,Extracurricular,StressLevel\n1,2,3,4,5\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(dataset.validate(), Err(DatasetError::SchemaMismatch { .. })));
    }

    #[test]
    fn text_cell_is_rejected() {
        let csv = "SleepQuality,StressLevel\n1,high\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::NonNumeric { row: 1, .. }));
    }

    #[test]
    fn blank_cell_loads_as_missing() {
        let csv = "\
SleepQuality,AcademicPerf,StudyLoad,Extracurricular,StressLevel
1,2,5,1,5
2,,4,2,4
3,3,3,3,3
4,4,2,4,2
";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 4);
        assert!(dataset.column(GROUP_COLUMN).unwrap()[1].is_nan());
        dataset.validate().unwrap();

        let matrix = dataset.correlation_matrix();
        assert!(matrix.iter().flatten().all(|r| r.is_finite()));
        // StudyLoad and StressLevel stay perfectly correlated.
        assert!((matrix[2][4] - 1.0).abs() < 1e-9);

        let groups = dataset.grouped_box_stats(TARGET_COLUMN, GROUP_COLUMN).unwrap();
        let keys: Vec<f64> = groups.iter().map(|g| g.group).collect();
        assert_eq!(keys, vec![2.0, 3.0, 4.0]);
        assert_eq!(histogram(dataset.column(GROUP_COLUMN).unwrap(), 5).counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn correlation_skips_incomplete_pairs() {
        let xs = [1.0, 2.0, f64::NAN, 4.0, 5.0];
        let ys = [2.0, 4.0, 100.0, 8.0, f64::NAN];
        assert!((pearson(&xs, &ys) - 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, f64::NAN], &[f64::NAN, 2.0]).is_nan());
    }

    #[test]
    fn header_only_file_is_empty() {
        let csv = "SleepQuality,StressLevel\n";
        assert!(matches!(Dataset::from_reader(csv.as_bytes()), Err(DatasetError::Empty)));
    }

    #[test]
    fn histogram_spreads_over_five_bins() {
        let hist = histogram(&[1.0, 2.0, 3.0, 4.0, 5.0, 5.0], 5);
        assert_eq!(hist.counts, vec![1, 1, 1, 1, 2]);
        assert_eq!(hist.edges.first(), Some(&1.0));
        assert_eq!(hist.edges.last(), Some(&5.0));
    }

    #[test]
    fn histogram_widens_constant_column() {
        let hist = histogram(&[3.0, 3.0], 5);
        assert_eq!(hist.counts.iter().sum::<usize>(), 2);
        assert_eq!(hist.edges[0], 2.5);
        assert_eq!(hist.edges[5], 3.5);
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let matrix = sample().correlation_matrix();
        for i in 0..matrix.len() {
            assert!((matrix[i][i] - 1.0).abs() < 1e-9);
            for j in 0..matrix.len() {
                assert_eq!(matrix[i][j].to_bits(), matrix[j][i].to_bits());
            }
        }
        // StudyLoad and StressLevel move together exactly.
        assert!((matrix[2][4] - 1.0).abs() < 1e-9);
        assert!((matrix[0][4] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_column_has_undefined_correlation() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert_eq!(quantile(&sorted, 0.75), 3.25);
    }

    #[test]
    fn box_stats_flag_outliers() {
        let stats = BoxStats::from_samples(1.0, vec![1.0, 2.0, 2.0, 3.0, 2.0, 20.0]).unwrap();
        assert_eq!(stats.outliers, vec![20.0]);
        assert_eq!(stats.upper_whisker, 3.0);
        assert_eq!(stats.lower_whisker, 1.0);
    }

    #[test]
    fn groups_stress_by_academic_performance() {
        let groups = sample().grouped_box_stats(TARGET_COLUMN, GROUP_COLUMN).unwrap();
        let keys: Vec<f64> = groups.iter().map(|g| g.group).collect();
        assert_eq!(keys, vec![2.0, 3.0, 4.0]);
        assert_eq!(groups[0].median, 4.5);
        assert_eq!(groups[2].median, 1.5);
    }
}
