//! Split a symbol universe into rows of work for distributed dispatch.
//!
//! With N symbols and R rows: `base = N / (R - 1)`, `rem = N % (R - 1)`.
//! Rows `0..R-1` take consecutive blocks of `base` symbols; the last row takes
//! the final `rem` symbols of the universe (empty when `rem == 0`).
//!
//! The partition file has one row per group, comma-separated, no header.
//! Cluster jobs pick their row by zero-based job index.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("invalid row count {rows}: at least 2 rows are required")]
    InvalidRowCount { rows: usize },

    #[error("partition file has {available} rows, job index {index} is out of range")]
    RowOutOfRange { index: usize, available: usize },

    #[error("partition file I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// One unit of distributed work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionGroup {
    pub group_id: usize,
    pub symbols: Vec<String>,
}

/// Splits an ordered universe into a fixed number of rows.
#[derive(Debug, Clone, Copy)]
pub struct SymbolPartitioner {
    rows: usize,
}

impl SymbolPartitioner {
    pub fn new(rows: usize) -> Result<Self, PartitionError> {
        if rows <= 1 {
            return Err(PartitionError::InvalidRowCount { rows });
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn partition(&self, symbols: &[String]) -> Vec<PartitionGroup> {
        let n = symbols.len();
        let regular_rows = self.rows - 1;
        let base = n / regular_rows;
        let rem = n % regular_rows;

        let mut groups: Vec<PartitionGroup> = (0..regular_rows)
            .map(|r| PartitionGroup {
                group_id: r,
                symbols: symbols[r * base..(r + 1) * base].to_vec(),
            })
            .collect();

        // Tail of the whole universe, not the boundary of the previous block.
        groups.push(PartitionGroup {
            group_id: regular_rows,
            symbols: symbols[n - rem..].to_vec(),
        });

        groups
    }
}

/// Write the partition artifact: one comma-separated row per group.
pub fn write_partition_file(path: &Path, groups: &[PartitionGroup]) -> Result<(), PartitionError> {
    let mut out = BufWriter::new(File::create(path)?);
    for group in groups {
        writeln!(out, "{}", group.symbols.join(","))?;
    }
    out.flush()?;
    Ok(())
}

/// Read every row of a partition artifact.
pub fn read_partition_file(path: &Path) -> Result<Vec<PartitionGroup>, PartitionError> {
    let reader = BufReader::new(File::open(path)?);
    reader
        .lines()
        .enumerate()
        .map(|(group_id, line)| {
            Ok(PartitionGroup {
                group_id,
                symbols: parse_row(&line?),
            })
        })
        .collect()
}

/// Read the row for one cluster job.
pub fn read_partition_row(path: &Path, index: usize) -> Result<PartitionGroup, PartitionError> {
    let mut groups = read_partition_file(path)?;
    let available = groups.len();
    if index >= available {
        return Err(PartitionError::RowOutOfRange { index, available });
    }
    Ok(groups.swap_remove(index))
}

/// Split a comma-separated symbol row, dropping blanks and stray `\r`.
pub fn parse_row(line: &str) -> Vec<String> {
    line.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
