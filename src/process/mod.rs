use std::fmt;

pub mod executor;

pub use executor::PipelineExecutor;

use crate::core::commands::CommandError;

#[derive(Debug)]
pub enum ProcessError {
    Io(std::io::Error),
    Sys(nix::Error),
    Command(CommandError),
    Spawn(String),
}

impl From<std::io::Error> for ProcessError {
    fn from(err: std::io::Error) -> Self {
        ProcessError::Io(err)
    }
}

impl From<nix::Error> for ProcessError {
    fn from(err: nix::Error) -> Self {
        ProcessError::Sys(err)
    }
}

impl From<CommandError> for ProcessError {
    fn from(err: CommandError) -> Self {
        ProcessError::Command(err)
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Io(err) => write!(f, "IO error: {}", err),
            ProcessError::Sys(err) => write!(f, "Process error: {}", err),
            ProcessError::Command(err) => write!(f, "{}", err),
            ProcessError::Spawn(msg) => write!(f, "Spawn error: {}", msg),
        }
    }
}

impl std::error::Error for ProcessError {}
