//! Embedding input for the CLI.
//!
//! Records arrive as JSON Lines, one `{"id": ..., "vector": [...]}` object
//! per line. Queries are either a bare JSON array or a single record.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};

/// One embedding to add, keyed by the caller's identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
}

/// Reads every record from a JSON Lines file. Blank lines are skipped.
pub fn read_records(path: &Path) -> IndexResult<Vec<EmbeddingRecord>> {
    let file = File::open(path).map_err(|e| IndexError::io(path, e))?;
    parse_records(BufReader::new(file), path)
}

/// Parses JSON Lines records from `reader`; `source` only labels errors.
pub fn parse_records(reader: impl BufRead, source: &Path) -> IndexResult<Vec<EmbeddingRecord>> {
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| IndexError::io(source, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: EmbeddingRecord = serde_json::from_str(line).map_err(|e| {
            IndexError::invalid_argument(format!(
                "{}:{}: not an embedding record: {e}",
                source.display(),
                line_no + 1
            ))
        })?;
        records.push(record);
    }

    Ok(records)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryInput {
    Bare(Vec<f32>),
    Record { vector: Vec<f32> },
}

/// Parses a query embedding from a JSON array or an object with `vector`.
pub fn parse_vector(text: &str) -> IndexResult<Vec<f32>> {
    let input: QueryInput = serde_json::from_str(text.trim()).map_err(|e| {
        IndexError::invalid_argument(format!("query is not a JSON array of numbers: {e}"))
    })?;

    Ok(match input {
        QueryInput::Bare(vector) | QueryInput::Record { vector } => vector,
    })
}

/// Reads a query embedding file, see [`parse_vector`].
pub fn read_vector(path: &Path) -> IndexResult<Vec<f32>> {
    let text = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
    parse_vector(&text)
}
