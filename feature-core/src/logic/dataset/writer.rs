use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::{DatasetError, RawRecord};

/// Write records as JSONL, replacing the file atomically
pub fn write_records(path: &Path, records: &[RawRecord]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("jsonl.tmp");
    {
        let mut out = BufWriter::new(File::create(&tmp)?);
        for record in records {
            let json = serde_json::to_string(record).map_err(std::io::Error::from)?;
            writeln!(out, "{}", json)?;
        }
        out.flush()?;
    }
    fs::rename(&tmp, path)?;

    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read a JSONL split, skipping blank lines
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>, DatasetError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| DatasetError::Parse {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(DatasetError::Empty(path.display().to_string()));
    }

    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
