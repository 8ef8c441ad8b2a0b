use thiserror::Error;
use tickscreen_core::{CoreError, ReportError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickscreen_core::ValidationError),

    #[error(transparent)]
    Config(#[from] tickscreen_core::ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("provider setup failed: {0}")]
    Provider(String),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Usage(_) => 2,
            Self::Core(CoreError::Validation(_) | CoreError::Config(_)) => 2,
            Self::Core(CoreError::Report(ReportError::MergeCardinality { .. })) => 3,
            Self::Core(CoreError::Report(_)) => 4,
            Self::Output(_) => 4,
            Self::Provider(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickscreen_core::{MergeSide, ValidationError};

    #[test]
    fn exit_codes_follow_error_category() {
        let merge = CliError::Core(CoreError::Report(ReportError::MergeCardinality {
            company: "INFY".into(),
            side: MergeSide::Ema,
        }));
        assert_eq!(merge.exit_code(), 3);
        assert_eq!(CliError::Validation(ValidationError::EmptySymbol).exit_code(), 2);
        assert_eq!(
            CliError::Core(CoreError::Report(ReportError::Io {
                path: "out".into(),
                source: std::io::Error::other("disk full"),
            }))
            .exit_code(),
            4
        );
        assert_eq!(CliError::Provider("missing --data-dir".into()).exit_code(), 5);
    }
}
