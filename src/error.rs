use std::path::PathBuf;
use thiserror::Error;

use crate::config::{PipelineStep, Tool};

/// Exit code used for usage and validation errors
pub const USAGE_EXIT_CODE: i32 = 2;

/// error handling for the whole pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error(
        "Failed trying to execute '{program}' ({tool}). Make sure it is in your $PATH and you have execution permissions."
    )]
    ToolNotFound { tool: Tool, program: String },

    #[error("{tool} failed{} on: {cmd}", PipelineError::format_code(code))]
    ToolFailed {
        tool: Tool,
        cmd: String,
        code: Option<i32>,
    },

    #[error("[{step}] required input {path:?} does not exist")]
    MissingInput { step: PipelineStep, path: PathBuf },

    #[error("[{step}] expected output {path:?} was not produced")]
    MissingOutput { step: PipelineStep, path: PathBuf },

    #[error("Failed parsing {context}: {msg}")]
    Parse { context: String, msg: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    #[cold]
    pub fn invalid_input<M: Into<String>>(msg: M) -> Self {
        PipelineError::InvalidInput(msg.into())
    }

    #[cold]
    pub fn parse<C: Into<String>, M: Into<String>>(context: C, msg: M) -> Self {
        PipelineError::Parse {
            context: context.into(),
            msg: msg.into(),
        }
    }

    /// Process exit code for this error
    ///
    /// # Example
    ///
    /// ``` rust, no_run
    /// let err = PipelineError::invalid_input("--read1 is required");
    /// assert_eq!(err.exit_code(), 2);
    /// ```
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::InvalidInput(_) | PipelineError::Config(_) => USAGE_EXIT_CODE,
            PipelineError::ToolFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }

    fn format_code(code: &Option<i32>) -> String {
        match code {
            Some(c) => format!(" with exit code {}", c),
            None => " (terminated by signal)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_exit_with_two() {
        assert_eq!(PipelineError::invalid_input("x").exit_code(), 2);
        assert_eq!(PipelineError::Config("x".into()).exit_code(), 2);
    }

    #[test]
    fn test_tool_failure_propagates_code() {
        let err = PipelineError::ToolFailed {
            tool: Tool::Rsem,
            cmd: "rsem-calculate-expression".into(),
            code: Some(137),
        };
        assert_eq!(err.exit_code(), 137);

        let err = PipelineError::ToolFailed {
            tool: Tool::Star,
            cmd: "STAR".into(),
            code: None,
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_io_errors_exit_with_one() {
        let err: PipelineError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert_eq!(err.exit_code(), 1);
    }
}
