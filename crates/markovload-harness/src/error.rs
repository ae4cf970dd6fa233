//! Harness errors.

use std::path::PathBuf;

use markovload_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown {workload} matrix preset '{name}'")]
    UnknownPreset { workload: &'static str, name: String },
    #[error("unknown allocator '{0}', expected system, libc or counting")]
    UnknownAllocator(String),
    #[error("matrix must be square with 4 or 7 rows, got {rows} rows of {columns}")]
    MatrixShape { rows: usize, columns: usize },
    #[error("{count} structured log violation(s)")]
    LogViolations { count: usize },
}

impl HarnessError {
    /// Process exit code for the CLI: 2 for bad input, 1 for run failures.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Io(_) | Self::File { .. } => 1,
            Self::Json(_)
            | Self::Config(_)
            | Self::UnknownPreset { .. }
            | Self::UnknownAllocator(_)
            | Self::MatrixShape { .. }
            | Self::LogViolations { .. } => 2,
        }
    }
}

/// Read a file, keeping its path in the error.
pub fn read_file(path: &std::path::Path) -> Result<String, HarnessError> {
    std::fs::read_to_string(path).map_err(|source| HarnessError::File {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_input_exits_with_two() {
        let err = HarnessError::from(ConfigError::ZeroSlots);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("at least one slot"));
        assert_eq!(HarnessError::UnknownAllocator("x".into()).exit_code(), 2);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_file(std::path::Path::new("/nonexistent/markovload.json")).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("/nonexistent/markovload.json"));
    }
}
