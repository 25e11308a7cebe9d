//! The producer side: directory scanning and measurement-file readers.
//!
//! Kept separate from the engine so aggregation logic can be tested without
//! a filesystem. Readers are generic over `Read`; scans return decoded,
//! sorted artifact lists. A run either completes or fails fast on the first
//! decode or I/O error, with the offending name attached.

use Sample;
use SweepConfig;
use csv;
use decode::Decoded;
use errors::*;
use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Tolerance when matching the secondary index against a sweep filter.
const FILTER_EPS: f64 = 1e-9;

/// Scans `dir` for artifacts of the sweep, in sorted name order. Sorting
/// places each group's `0.0` sentinel before its dependents, which is the
/// ordering the sentinel-first sweeps rely on. Entries whose secondary
/// index misses the sweep's filter are dropped.
pub fn scan(dir: &Path, config: &SweepConfig) -> Result<Vec<(PathBuf, Decoded)>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)
        .chain_err(|| format!("failed to read directory '{}'", dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let mut out = Vec::new();
    for name in names {
        let decoded = config.convention.decode(&name)?;
        if !matches_filter(&decoded, config.filter) {
            trace!("'{}' filtered out (index {:?})", name, decoded.index);
            continue;
        }
        out.push((dir.join(&name), decoded));
    }
    Ok(out)
}

/// Scans the engine-comparison layout: one subdirectory per run, named
/// `{vol}_{cam}_{thresh}`, each holding a single CSV log. The `img`
/// directory holds renders, not runs, and is skipped.
pub fn scan_runs(dir: &Path, config: &SweepConfig) -> Result<Vec<(PathBuf, Decoded)>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)
        .chain_err(|| format!("failed to read directory '{}'", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "img" {
            continue;
        }
        names.push(name);
    }
    names.sort();

    let mut out = Vec::new();
    for name in names {
        let decoded = config.convention.decode(&name)?;
        out.push((find_csv(&dir.join(&name))?, decoded));
    }
    Ok(out)
}

fn find_csv(dir: &Path) -> Result<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |e| e == "csv") {
            files.push(path);
        }
    }
    files.sort();
    files
        .into_iter()
        .next()
        .ok_or_else(|| Error::from(format!("no CSV log in '{}'", dir.display())))
}

fn matches_filter(decoded: &Decoded, filter: Option<f64>) -> bool {
    match filter {
        None => true,
        Some(want) => match decoded.index {
            Some(index) => (index - want).abs() < FILTER_EPS,
            None => false,
        },
    }
}

/// Reads an FPS counter file: one integer per line, no header. The run's
/// measurement is its mean frame rate.
pub fn read_counters<R: Read>(reader: R, source: &str) -> Result<f64> {
    let reader = BufReader::new(reader);
    let mut sum = 0.0;
    let mut count = 0usize;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: i64 = line.parse()
            .map_err(|_| ErrorKind::Corrupt(source.to_string()))?;
        sum += value as f64;
        count += 1;
    }
    if count == 0 {
        bail!(ErrorKind::Corrupt(source.to_string()));
    }
    Ok(sum / count as f64)
}

/// Reads an engine run log: CSV with a header row and at least three
/// columns, the third being the per-frame FPS. Returns the frame series.
pub fn read_run_series<R: Read>(reader: R, source: &str) -> Result<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut series = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = record
            .get(2)
            .ok_or_else(|| Error::from(ErrorKind::Corrupt(source.to_string())))?;
        let value: f64 = field
            .parse()
            .map_err(|_| ErrorKind::Corrupt(source.to_string()))?;
        series.push(value);
    }
    if series.is_empty() {
        bail!(ErrorKind::Corrupt(source.to_string()));
    }
    Ok(series)
}

/// Decoded FPS artifacts as scalar samples: one file, one sample (the
/// run's mean frame rate).
pub fn fps_samples(dir: &Path, config: &SweepConfig) -> Result<Vec<Sample<f64>>> {
    scan(dir, config)?
        .into_iter()
        .map(|(path, decoded)| {
            let file = File::open(&path)
                .chain_err(|| format!("failed to open '{}'", path.display()))?;
            let mean = read_counters(file, &file_name(&path))?;
            Ok(Sample {
                param: decoded.param,
                group: decoded.group,
                value: mean,
                source: file_name(&path),
            })
        })
        .collect()
}

/// Decoded rendered-frame artifacts as image-path samples for similarity
/// scoring.
pub fn image_samples(dir: &Path, config: &SweepConfig) -> Result<Vec<Sample<PathBuf>>> {
    Ok(scan(dir, config)?
        .into_iter()
        .map(|(path, decoded)| Sample {
            param: decoded.param,
            group: decoded.group,
            source: file_name(&path),
            value: path,
        })
        .collect())
}

/// Decoded engine-comparison runs as per-frame series samples.
pub fn run_samples(dir: &Path, config: &SweepConfig) -> Result<Vec<Sample<Vec<f64>>>> {
    scan_runs(dir, config)?
        .into_iter()
        .map(|(path, decoded)| {
            let file = File::open(&path)
                .chain_err(|| format!("failed to open '{}'", path.display()))?;
            let series = read_run_series(file, &file_name(&path))?;
            Ok(Sample {
                param: decoded.param,
                group: decoded.group,
                value: series,
                source: file_name(&path),
            })
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_mean() {
        let mean = read_counters("30\n32\n31\n".as_bytes(), "t").unwrap();
        assert!((mean - 31.0).abs() < 1e-12);
    }

    #[test]
    fn counters_skip_blank_lines() {
        let mean = read_counters("30\n\n32\n".as_bytes(), "t").unwrap();
        assert!((mean - 31.0).abs() < 1e-12);
    }

    #[test]
    fn empty_counter_file_is_corrupt() {
        let err = read_counters("".as_bytes(), "0.1_3_4.txt").unwrap_err();
        match *err.kind() {
            ErrorKind::Corrupt(ref f) => assert_eq!(f, "0.1_3_4.txt"),
            ref k => panic!("unexpected kind: {:?}", k),
        }
    }

    #[test]
    fn non_numeric_counter_is_corrupt() {
        assert!(read_counters("30\nforty\n".as_bytes(), "t").is_err());
    }

    #[test]
    fn run_series_takes_third_column() {
        let csv = "frame,time,fps\n1,0.016,60\n2,0.017,58.5\n";
        let series = read_run_series(csv.as_bytes(), "t").unwrap();
        assert_eq!(series, vec![60.0, 58.5]);
    }

    #[test]
    fn run_series_missing_column_is_corrupt() {
        let csv = "frame,time\n1,0.016\n";
        assert!(read_run_series(csv.as_bytes(), "t").is_err());
    }

    #[test]
    fn filter_matches_on_secondary_index() {
        let with = Decoded { param: 2.0, group: "1".to_string(), index: Some(0.1) };
        let without = Decoded { param: 2.0, group: "1".to_string(), index: None };
        assert!(matches_filter(&with, None));
        assert!(matches_filter(&with, Some(0.1)));
        assert!(!matches_filter(&with, Some(0.2)));
        assert!(!matches_filter(&without, Some(0.1)));
    }
}
