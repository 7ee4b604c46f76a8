use crate::util::basic::SError;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid {format} record at line {line}: {reason}")]
    InvalidRecord {
        format: &'static str,
        line: u64,
        reason: String,
    },
    #[error("Failed to read {format} input after line {lines}: {source}")]
    ImportFailed {
        format: &'static str,
        lines: u64,
        source: std::io::Error,
    },
    #[error("Ledger error: {0}")]
    Ledger(SError),
    #[error("Lot allocation failed: {0}")]
    Allocation(SError),
}
