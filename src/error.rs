//! Error types of the driver library.

use std::io;

/// Failure to parse the generation ledger. Any of these aborts the
/// reclaim/age computation of the current cycle.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger line {line_no}: expected 4 integer fields, got '{line}'")]
    MalformedLine { line_no: usize, line: String },

    #[error("ledger line {line_no}: invalid integer '{field}'")]
    InvalidNumber { line_no: usize, field: String },

    #[error("ledger line {line_no}: generation row before any memcg header")]
    OrphanGeneration { line_no: usize },
}

/// Failure talking to the lru_gen command port.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("failed to read generation ledger: {0}")]
    Read(#[source] io::Error),

    #[error("failed to write directive for memcg {cgroup_id}: {source}")]
    Write {
        cgroup_id: String,
        #[source]
        source: io::Error,
    },
}

/// Failure of one driver cycle.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to scan page flag table {source_name}: {source}")]
    FlagTable {
        source_name: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Port(#[from] PortError),
}
