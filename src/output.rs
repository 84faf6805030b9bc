// Artifact writers. Every table is written to a temp file first and moved
// into place, so a partially written run never clobbers a finished artifact.
use crate::corpus::DocumentMapping;
use crate::metrics::PairMetric;
use crate::pairs::Pair;
use std::fs;
use std::path::{Path, PathBuf};

type BoxError = Box<dyn std::error::Error>;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn atomic_csv<F>(path: &Path, write: F) -> Result<(), BoxError>
where
    F: FnOnce(&mut csv::Writer<fs::File>) -> Result<(), BoxError>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    let mut writer = csv::Writer::from_path(&tmp)?;
    write(&mut writer)?;
    writer.flush()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn write_majority_lengths(path: &Path, lengths: &[(String, usize)]) -> Result<(), BoxError> {
    atomic_csv(path, |w| {
        w.write_record(["case_key", "majority_length"])?;
        for (case_key, length) in lengths {
            let length = length.to_string();
            w.write_record([case_key.as_str(), length.as_str()])?;
        }
        Ok(())
    })
}

pub fn write_pair_metadata(path: &Path, pairs: &[Pair]) -> Result<(), BoxError> {
    atomic_csv(path, |w| {
        w.write_record([
            "case_key",
            "case_name",
            "case_name_abbreviation",
            "decision_date",
            "opinion_type",
            "dissent_ind",
            "majority_text",
            "dissent_text",
            "majority_cites",
            "dissent_cites",
            "unattributed_cites_count",
        ])?;
        for pair in pairs {
            let dissent_ind = pair.dissent_ind.to_string();
            let majority_cites = serde_json::to_string(&pair.majority_cites)?;
            let dissent_cites = serde_json::to_string(&pair.dissent_cites)?;
            let unattributed = pair.unattributed_cites_count.to_string();
            w.write_record([
                pair.case_key.as_str(),
                pair.case_name.as_str(),
                pair.case_name_abbreviation.as_str(),
                pair.decision_date.as_str(),
                "dissent",
                dissent_ind.as_str(),
                pair.majority_text.as_str(),
                pair.dissent_text.as_str(),
                majority_cites.as_str(),
                dissent_cites.as_str(),
                unattributed.as_str(),
            ])?;
        }
        Ok(())
    })
}

/// Read a previously written pair table, so the embedding stages can run
/// without the raw archive. Rows that fail to parse are skipped.
pub fn read_pair_metadata(path: &Path) -> Result<Vec<Pair>, BoxError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let case_key = column("case_key").ok_or("pair table: missing case_key column")?;
    let dissent_ind = column("dissent_ind").ok_or("pair table: missing dissent_ind column")?;
    let majority_text = column("majority_text").ok_or("pair table: missing majority_text column")?;
    let dissent_text = column("dissent_text").ok_or("pair table: missing dissent_text column")?;
    let case_name = column("case_name");
    let case_name_abbreviation = column("case_name_abbreviation");
    let decision_date = column("decision_date");
    let majority_cites = column("majority_cites");
    let dissent_cites = column("dissent_cites");
    let unattributed = column("unattributed_cites_count");

    let field = |record: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| record.get(i)).unwrap_or_default().to_string()
    };
    let cites = |record: &csv::StringRecord, idx: Option<usize>| -> Vec<String> {
        idx.and_then(|i| record.get(i))
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    };

    let mut pairs = Vec::new();
    let mut skipped = 0;
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let (key, ind) = match (
            record.get(case_key),
            record.get(dissent_ind).and_then(|v| v.parse::<usize>().ok()),
        ) {
            (Some(key), Some(ind)) if !key.is_empty() => (key.to_string(), ind),
            _ => {
                skipped += 1;
                continue;
            }
        };
        pairs.push(Pair {
            case_key: key,
            case_name: field(&record, case_name),
            case_name_abbreviation: field(&record, case_name_abbreviation),
            decision_date: field(&record, decision_date),
            dissent_ind: ind,
            majority_text: field(&record, Some(majority_text)),
            dissent_text: field(&record, Some(dissent_text)),
            majority_cites: cites(&record, majority_cites),
            dissent_cites: cites(&record, dissent_cites),
            unattributed_cites_count: field(&record, unattributed).parse().unwrap_or(0),
        });
    }
    if skipped > 0 {
        println!("  ⚠ Skipped {} unreadable pair rows", skipped);
    }
    Ok(pairs)
}

pub fn write_document_mapping(path: &Path, mapping: &[DocumentMapping]) -> Result<(), BoxError> {
    atomic_csv(path, |w| {
        w.write_record(["index", "case_key", "opinion_label"])?;
        for entry in mapping {
            let index = entry.index.to_string();
            w.write_record([
                index.as_str(),
                entry.case_key.as_str(),
                entry.opinion_label.as_str(),
            ])?;
        }
        Ok(())
    })
}

pub fn write_embeddings(path: &Path, vectors: &[Vec<f32>]) -> Result<(), BoxError> {
    let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
    atomic_csv(path, |w| {
        let mut header = vec!["index".to_string()];
        header.extend((0..dim).map(|i| format!("dim_{}", i)));
        w.write_record(&header)?;
        for (index, vector) in vectors.iter().enumerate() {
            let mut row = vec![index.to_string()];
            row.extend(vector.iter().map(|v| v.to_string()));
            w.write_record(&row)?;
        }
        Ok(())
    })
}

pub fn write_pair_metrics(
    path: &Path,
    metrics: &[PairMetric],
    value_header: &str,
) -> Result<(), BoxError> {
    atomic_csv(path, |w| {
        w.write_record([
            "case_key",
            "majority_opinion_label",
            "dissent_opinion_label",
            value_header,
        ])?;
        for metric in metrics {
            let value = metric.value.to_string();
            w.write_record([
                metric.case_key.as_str(),
                metric.majority_opinion_label.as_str(),
                metric.dissent_opinion_label.as_str(),
                value.as_str(),
            ])?;
        }
        Ok(())
    })
}

pub fn write_doc_topics(
    path: &Path,
    mapping: &[DocumentMapping],
    doc_topic: &[Vec<f64>],
) -> Result<(), BoxError> {
    let topics = doc_topic.first().map(|row| row.len()).unwrap_or(0);
    atomic_csv(path, |w| {
        let mut header = vec!["case_key".to_string(), "opinion_label".to_string()];
        header.extend((0..topics).map(|i| format!("Topic {}", i)));
        w.write_record(&header)?;
        for (entry, row) in mapping.iter().zip(doc_topic) {
            let mut record = vec![entry.case_key.clone(), entry.opinion_label.clone()];
            record.extend(row.iter().map(|v| v.to_string()));
            w.write_record(&record)?;
        }
        Ok(())
    })
}

pub fn write_topic_word(
    path: &Path,
    vocab: &[String],
    topic_word: &[Vec<f64>],
) -> Result<(), BoxError> {
    atomic_csv(path, |w| {
        w.write_record(vocab)?;
        for row in topic_word {
            w.write_record(row.iter().map(|v| v.to_string()).collect::<Vec<_>>())?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Pair {
        Pair {
            case_key: "c1".into(),
            case_name: "Smith v. Jones".into(),
            case_name_abbreviation: "Smith".into(),
            decision_date: "1950-01-02".into(),
            dissent_ind: 2,
            majority_text: "we, the \"majority\"".into(),
            dissent_text: "dissenting".into(),
            majority_cites: vec!["100 U.S. 1".into(), "5 U.S. 137".into()],
            dissent_cites: vec![],
            unattributed_cites_count: 3,
        }
    }

    #[test]
    fn pair_metadata_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair_metadata.csv");
        write_pair_metadata(&path, &[pair()]).unwrap();
        let pairs = read_pair_metadata(&path).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].case_key, "c1");
        assert_eq!(pairs[0].dissent_ind, 2);
        assert_eq!(pairs[0].majority_text, "we, the \"majority\"");
        assert_eq!(pairs[0].majority_cites, vec!["100 U.S. 1", "5 U.S. 137"]);
        assert_eq!(pairs[0].unattributed_cites_count, 3);
    }

    #[test]
    fn writes_leave_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/majority_length.csv");
        write_majority_lengths(&path, &[("c1".into(), 120)]).unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("case_key,majority_length"));
        assert!(body.contains("c1,120"));
    }

    #[test]
    fn mapping_and_metrics_tables_have_expected_headers() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = vec![DocumentMapping {
            index: 0,
            case_key: "c1".into(),
            opinion_label: "majority".into(),
        }];
        let map_path = dir.path().join("document_mapping.csv");
        write_document_mapping(&map_path, &mapping).unwrap();
        assert!(std::fs::read_to_string(&map_path)
            .unwrap()
            .starts_with("index,case_key,opinion_label"));

        let metric = PairMetric {
            case_key: "c1".into(),
            majority_opinion_label: "majority".into(),
            dissent_opinion_label: "dissent1".into(),
            value: 0.25,
        };
        let metrics_path = dir.path().join("cosine_similarity_metadata.csv");
        write_pair_metrics(&metrics_path, &[metric], "cosine_similarity").unwrap();
        let body = std::fs::read_to_string(&metrics_path).unwrap();
        assert!(body.starts_with("case_key,majority_opinion_label,dissent_opinion_label,cosine_similarity"));
        assert!(body.contains("c1,majority,dissent1,0.25"));
    }

    #[test]
    fn topic_tables_align_rows_with_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = vec![
            DocumentMapping {
                index: 0,
                case_key: "c1".into(),
                opinion_label: "majority".into(),
            },
            DocumentMapping {
                index: 1,
                case_key: "c1".into(),
                opinion_label: "dissent1".into(),
            },
        ];
        let doc_topic = vec![vec![0.5, 0.5], vec![0.25, 0.75]];
        let path = dir.path().join("document_topic_distributions.csv");
        write_doc_topics(&path, &mapping, &doc_topic).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("case_key,opinion_label,Topic 0,Topic 1"));
        assert!(body.contains("c1,dissent1,0.25,0.75"));
    }
}
