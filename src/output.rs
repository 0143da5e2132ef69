use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One scraped article: the same document in both scripts, plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub hangul: String,
    pub hanja: String,
    pub url: String,
}

pub fn output_path(out_dir: &Path, slug: &str) -> PathBuf {
    out_dir.join(format!("{}.jsonl", slug))
}

/// Sections whose file is already on disk are never re-scraped.
pub fn already_scraped(path: &Path) -> bool {
    path.exists()
}

/// Write a section's records as one JSON object per line, in one pass.
pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
    }

    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub struct SectionStatus {
    pub slug: String,
    pub records: usize,
}

/// Scan the output directory and count records per section file.
pub fn read_status(out_dir: &Path) -> Result<Vec<SectionStatus>> {
    let mut statuses = Vec::new();
    if !out_dir.exists() {
        return Ok(statuses);
    }

    for entry in fs::read_dir(out_dir)
        .with_context(|| format!("Failed to read output dir {}", out_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let slug = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let records = contents.lines().filter(|l| !l.trim().is_empty()).count();
        statuses.push(SectionStatus { slug, records });
    }

    statuses.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<Record> {
        vec![
            Record {
                title: "태조실록 1권".to_string(),
                hangul: "태조가 왕위에 올랐다.".to_string(),
                hanja: "太祖卽位。".to_string(),
                url: "https://sillok.history.go.kr/id/kaa_10107017_001".to_string(),
            },
            Record {
                title: "태조실록 1권, 2번째기사".to_string(),
                hangul: "도읍을 한양으로 옮겼다.".to_string(),
                hanja: "遷都于漢陽。".to_string(),
                url: "https://sillok.history.go.kr/id/kaa_10107017_002".to_string(),
            },
        ]
    }

    #[test]
    fn one_parseable_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "kaa");
        write_records(&path, &sample_records()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let record: Record = serde_json::from_str(line).unwrap();
            assert!(!record.title.is_empty());
            assert!(!record.hangul.is_empty());
            assert!(!record.hanja.is_empty());
            assert!(!record.url.is_empty());
        }
    }

    #[test]
    fn existing_file_reports_already_scraped() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "kaa");
        assert!(!already_scraped(&path));

        write_records(&path, &sample_records()).unwrap();
        assert!(already_scraped(&path));
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(&dir.path().join("nested"), "kba");
        write_records(&path, &sample_records()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn status_counts_lines_per_file() {
        let dir = tempfile::tempdir().unwrap();
        write_records(&output_path(dir.path(), "kba"), &sample_records()).unwrap();
        write_records(&output_path(dir.path(), "kaa"), &sample_records()[..1]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let statuses = read_status(dir.path()).unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].slug, "kaa");
        assert_eq!(statuses[0].records, 1);
        assert_eq!(statuses[1].slug, "kba");
        assert_eq!(statuses[1].records, 2);
    }

    #[test]
    fn status_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let statuses = read_status(&dir.path().join("nowhere")).unwrap();
        assert!(statuses.is_empty());
    }
}
