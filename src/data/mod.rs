use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub const YEAR_COLUMN: &str = "year";
pub const MONTH_COLUMN: &str = "month";
pub const TOPIC_PREFIX: &str = "topic_";

/// One observation: topic counts for a single (year, month).
///
/// `counts[i]` belongs to column `topic_i`. An absent or unparseable cell
/// is stored as `None`.
#[derive(Debug, Clone)]
pub struct Row {
    pub year: i32,
    pub month: u32,
    pub year_month: String,
    pub counts: Vec<Option<u64>>,
}

/// The immutable observation table, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub rows: Vec<Row>,
    pub topic_keys: Vec<String>,
    pub min_year: i32,
    pub max_year: i32,
    pub manifest: DatasetManifest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: u64,
    pub kept_rows: u64,
    pub dropped_rows: u64,
    pub bad_rows: u64,
    pub min_year: i32,
    pub max_year: i32,
    pub columns: Vec<String>,
    pub topic_count: usize,
    pub warnings: Vec<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub rows: u64,
    pub kept: u64,
    pub dropped: u64,
    pub bad_rows: u64,
    pub warnings: Vec<String>,
}

impl Dataset {
    /// Column index for a topic key, if the key names a loaded column.
    pub fn topic_index(&self, key: &str) -> Option<usize> {
        key.strip_prefix(TOPIC_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n < self.topic_keys.len())
    }

    /// Rows whose year falls inside the inclusive range.
    pub fn rows_in_range(&self, year_range: (i32, i32)) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|r| r.year >= year_range.0 && r.year <= year_range.1)
            .collect()
    }

    pub fn year_bounds(&self) -> (i32, i32) {
        (self.min_year, self.max_year)
    }
}

/// Display label for the first day of (year, month), formatted `YYYY-MM`.
/// `None` when the month is out of range.
pub fn year_month_label(year: i32, month: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.format("%Y-%m").to_string())
}

/// Parse the observation table and build its manifest.
///
/// Rows with `year < min_year` are dropped. Rows with an unparseable year,
/// month, or an invalid calendar month are counted as bad and skipped with
/// a warning. A file that yields zero usable rows is an error: the process
/// cannot start without data.
pub fn load_dataset(path: &Path, min_year: i32) -> Result<Dataset> {
    let (rows, topic_keys, columns, mut report) = parse_rows(path, min_year)?;

    if rows.is_empty() {
        bail!(
            "dataset {} has no usable rows with year >= {}",
            path.display(),
            min_year
        );
    }

    let data_min_year = rows.iter().map(|r| r.year).min().unwrap_or(min_year);
    let data_max_year = rows.iter().map(|r| r.year).max().unwrap_or(min_year);

    let hash =
        file_sha256(path).with_context(|| format!("hashing dataset {}", path.display()))?;

    let manifest = DatasetManifest {
        path: path.display().to_string(),
        hash_sha256: hash,
        row_count: report.rows,
        kept_rows: report.kept,
        dropped_rows: report.dropped,
        bad_rows: report.bad_rows,
        min_year: data_min_year,
        max_year: data_max_year,
        columns,
        topic_count: topic_keys.len(),
        warnings: std::mem::take(&mut report.warnings),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    Ok(Dataset {
        rows,
        topic_keys,
        min_year: data_min_year,
        max_year: data_max_year,
        manifest,
    })
}

type ParsedTable = (Vec<Row>, Vec<String>, Vec<String>, DataQualityReport);

fn parse_rows(path: &Path, min_year: i32) -> Result<ParsedTable> {
    let file =
        File::open(path).with_context(|| format!("opening dataset {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let mut header: Vec<String> = Vec::new();
    for line in lines.by_ref() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        header = trimmed.split(',').map(|s| s.trim().to_string()).collect();
        break;
    }
    if header.is_empty() {
        bail!("dataset {} has no header line", path.display());
    }
    // topic_positions[i] is the header position of column topic_i
    let (year_idx, month_idx, topic_positions) = index_columns(&header)?;

    let mut rows: Vec<Row> = Vec::new();
    let mut row_count = 0u64;
    let mut kept = 0u64;
    let mut dropped = 0u64;
    let mut bad_rows = 0u64;
    let mut warnings: Vec<String> = Vec::new();

    for line in lines {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        row_count += 1;
        let cells: Vec<&str> = trimmed.split(',').collect();
        if cells.len() != header.len() {
            bad_rows += 1;
            warnings.push(format!(
                "bad_row: expected {} cells, got {}",
                header.len(),
                cells.len()
            ));
            continue;
        }

        let year = match cells[year_idx].trim().parse::<i32>() {
            Ok(y) => y,
            Err(err) => {
                bad_rows += 1;
                warnings.push(format!("bad_row: year: {}", err));
                continue;
            }
        };
        let month = match cells[month_idx].trim().parse::<u32>() {
            Ok(m) => m,
            Err(err) => {
                bad_rows += 1;
                warnings.push(format!("bad_row: month: {}", err));
                continue;
            }
        };
        let year_month = match year_month_label(year, month) {
            Some(label) => label,
            None => {
                bad_rows += 1;
                warnings.push(format!("bad_row: invalid month {} in year {}", month, year));
                continue;
            }
        };

        if year < min_year {
            dropped += 1;
            continue;
        }

        let mut counts = Vec::with_capacity(topic_positions.len());
        for (topic, pos) in topic_positions.iter().enumerate() {
            match parse_count(cells[*pos]) {
                Ok(value) => counts.push(value),
                Err(err) => {
                    warnings.push(format!("bad_cell: {}{}: {}", TOPIC_PREFIX, topic, err));
                    counts.push(None);
                }
            }
        }

        kept += 1;
        rows.push(Row {
            year,
            month,
            year_month,
            counts,
        });
    }

    let topic_keys = (0..topic_positions.len())
        .map(|i| format!("{}{}", TOPIC_PREFIX, i))
        .collect();

    let report = DataQualityReport {
        rows: row_count,
        kept,
        dropped,
        bad_rows,
        warnings,
    };

    Ok((rows, topic_keys, header, report))
}

/// Locate the `year` and `month` columns and the contiguous `topic_0..topic_N`
/// run. A missing required column, a gap in the topic numbering, or topic
/// columns interleaved with other columns are all fatal.
fn index_columns(header: &[String]) -> Result<(usize, usize, Vec<usize>)> {
    let year_idx = header
        .iter()
        .position(|c| c == YEAR_COLUMN)
        .with_context(|| format!("dataset header has no '{}' column", YEAR_COLUMN))?;
    let month_idx = header
        .iter()
        .position(|c| c == MONTH_COLUMN)
        .with_context(|| format!("dataset header has no '{}' column", MONTH_COLUMN))?;

    let mut numbered: Vec<(usize, usize)> = Vec::new();
    for (pos, name) in header.iter().enumerate() {
        if let Some(suffix) = name.strip_prefix(TOPIC_PREFIX) {
            let n = suffix
                .parse::<usize>()
                .with_context(|| format!("bad topic column name '{}'", name))?;
            numbered.push((n, pos));
        }
    }
    if numbered.is_empty() {
        bail!("dataset header has no {}* columns", TOPIC_PREFIX);
    }

    numbered.sort_by_key(|(n, _)| *n);
    let mut positions = Vec::with_capacity(numbered.len());
    for (expect, (n, pos)) in numbered.iter().enumerate() {
        if *n != expect {
            bail!(
                "topic columns are not contiguous: expected {}{}, found {}{}",
                TOPIC_PREFIX,
                expect,
                TOPIC_PREFIX,
                n
            );
        }
        if expect > 0 && *pos != positions[expect - 1] + 1 {
            bail!(
                "topic columns are not a contiguous run: {}{} is out of place",
                TOPIC_PREFIX,
                n
            );
        }
        positions.push(*pos);
    }

    Ok((year_idx, month_idx, positions))
}

fn parse_count(cell: &str) -> Result<Option<u64>, String> {
    let t = cell.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(v) = t.parse::<u64>() {
        return Ok(Some(v));
    }
    // pre-aggregated exports sometimes carry integral floats like "5.0"
    match t.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.is_finite() => Ok(Some(v.round() as u64)),
        _ => Err(format!("bad count '{}'", t)),
    }
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
