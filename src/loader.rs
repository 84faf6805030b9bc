// Case archive loading: turns raw CAP-style JSON into normalized CaseRecords.
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One archived decision, normalized from the raw JSON shape.
#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub case_key: String,
    pub name: String,
    pub name_abbreviation: String,
    pub decision_date: String,
    pub opinions: Vec<Opinion>,
    /// Raw citation entries, already resolved from their prioritized
    /// locations (top-level `cites_to`, else `casebody.data.cites_to`).
    pub cites_to: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct Opinion {
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SkippedCase {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadStats {
    pub files_read: usize,
    pub cases_loaded: usize,
    pub cases_skipped: usize,
}

/// First non-empty array among a list of candidate paths into the record.
/// The archive is inconsistent about where lists live, so every caller
/// goes through this instead of chaining `get()` directly.
fn lookup_array<'a>(record: &'a Value, paths: &[&[&str]]) -> &'a [Value] {
    for path in paths {
        let mut node = record;
        let mut found = true;
        for key in *path {
            match node.get(key) {
                Some(next) => node = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found {
            if let Some(arr) = node.as_array() {
                if !arr.is_empty() {
                    return arr;
                }
            }
        }
    }
    &[]
}

fn case_key(record: &Value) -> Option<String> {
    match record.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Normalize one raw case value. Returns None when the record lacks the
/// fields the pipeline cannot work without.
pub fn normalize_case(record: &Value) -> Option<CaseRecord> {
    let case_key = case_key(record)?;

    let opinions = lookup_array(
        record,
        &[
            &["casebody", "opinions"][..],
            &["casebody", "data", "opinions"][..],
        ],
    )
    .iter()
    .map(|op| Opinion {
        kind: op
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        text: op
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
    .collect();

    let cites_to = lookup_array(
        record,
        &[&["cites_to"][..], &["casebody", "data", "cites_to"][..]],
    )
    .to_vec();

    Some(CaseRecord {
        case_key,
        name: str_field(record, "name"),
        name_abbreviation: str_field(record, "name_abbreviation"),
        decision_date: str_field(record, "decision_date"),
        opinions,
        cites_to,
    })
}

/// Load every case under `input` (a .json/.jsonl file or a directory of
/// them). Unparseable records are logged to `skip_log` and skipped; only an
/// unreadable input path is fatal.
pub fn load_cases(
    input: &Path,
    skip_log: &Path,
) -> Result<(Vec<CaseRecord>, LoadStats), Box<dyn std::error::Error>> {
    println!("\n📂 Loading case archive from {}...", input.display());

    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in std::fs::read_dir(input)? {
            let path = entry?.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("json") | Some("jsonl") => files.push(path),
                _ => {}
            }
        }
        files.sort();
    } else {
        files.push(input.to_path_buf());
    }

    if let Some(parent) = skip_log.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut skip_writer = BufWriter::new(File::create(skip_log)?);

    let mut cases = Vec::new();
    let mut stats = LoadStats::default();

    for path in &files {
        stats.files_read += 1;
        let source = path.display().to_string();
        if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
            let reader = BufReader::new(File::open(path)?);
            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&line) {
                    Ok(value) => ingest_value(
                        &value,
                        &format!("{}:{}", source, line_no + 1),
                        &mut cases,
                        &mut stats,
                        &mut skip_writer,
                    ),
                    Err(e) => skip(
                        &format!("{}:{}", source, line_no + 1),
                        &format!("invalid json: {}", e),
                        &mut stats,
                        &mut skip_writer,
                    ),
                }
            }
        } else {
            match serde_json::from_reader::<_, Value>(BufReader::new(File::open(path)?)) {
                Ok(Value::Array(values)) => {
                    for value in &values {
                        ingest_value(value, &source, &mut cases, &mut stats, &mut skip_writer);
                    }
                }
                Ok(value) => ingest_value(&value, &source, &mut cases, &mut stats, &mut skip_writer),
                Err(e) => skip(
                    &source,
                    &format!("invalid json: {}", e),
                    &mut stats,
                    &mut skip_writer,
                ),
            }
        }
    }

    skip_writer.flush()?;

    println!("  ✓ Files read: {}", stats.files_read);
    println!("  ✓ Cases loaded: {}", stats.cases_loaded);
    if stats.cases_skipped > 0 {
        println!(
            "  ⚠ Cases skipped: {} (see {})",
            stats.cases_skipped,
            skip_log.display()
        );
    }

    Ok((cases, stats))
}

fn ingest_value(
    value: &Value,
    source: &str,
    cases: &mut Vec<CaseRecord>,
    stats: &mut LoadStats,
    skip_writer: &mut BufWriter<File>,
) {
    match normalize_case(value) {
        Some(case) => {
            cases.push(case);
            stats.cases_loaded += 1;
        }
        None => skip(source, "missing case id", stats, skip_writer),
    }
}

fn skip(source: &str, reason: &str, stats: &mut LoadStats, skip_writer: &mut BufWriter<File>) {
    stats.cases_skipped += 1;
    let record = SkippedCase {
        source: source.to_string(),
        reason: reason.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&record) {
        let _ = writeln!(skip_writer, "{}", json);
    }
}
