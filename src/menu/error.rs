//! Errors surfaced by the menu engine.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MenuError {
    /// The controlling terminal could not be switched to raw mode.
    #[error("failed to enter raw mode: {0}")]
    RawMode(#[source] io::Error),

    /// The terminal size could not be read.
    #[error("failed to query terminal size: {0}")]
    Dimensions(#[source] io::Error),

    /// The controlling terminal could not be opened for reading.
    #[error("failed to open tty: {0}")]
    Tty(#[source] io::Error),

    #[error("failed to write menu: {0}")]
    Io(#[from] io::Error),
}

impl MenuError {
    /// Whether the menu failed before anything was drawn.
    pub fn is_fatal_at_start(&self) -> bool {
        matches!(
            self,
            MenuError::RawMode(_) | MenuError::Dimensions(_) | MenuError::Tty(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MenuError>;
