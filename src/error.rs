use std::io;

use thiserror::Error;

/// The error taxonomy produced by parsing and evaluating a flow file.
///
/// Each variant formats to the single diagnostic line that is written to
/// standard error before the process exits with status 1.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("cyclic dependency detected at '{0}'")]
    Cycle(String),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("child process for '{component}' failed")]
    ChildFailed { component: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
