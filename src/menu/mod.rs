//! # Menu Module
//!
//! An inline, single-choice terminal picker over a list that may still be
//! changing while the user looks at it.
//!
//! ## Components
//!
//! - [`terminal`] - raw mode, size query and resize notifications behind
//!   [`TerminalPort`]
//! - [`store`] - the ordered, identity-keyed row store
//! - [`layout`] - column sizing and fixed-width lines
//! - [`render`] - ANSI output, redrawn in place below the input line
//! - [`state`] - cursor, scroll offset and typed input
//! - [`keys`] - raw key chunk decoding
//! - [`event_loop`] - the [`Menu`] loop tying the sources together
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = Session::open(CrosstermTerminal)?;
//! let (tx, rx) = tokio::sync::mpsc::channel(64);
//! tokio::spawn(produce_rows(tx));
//! let choice = Menu::new(10)
//!     .pick(&mut session, rx, std::io::stderr(), &cancel)
//!     .await?;
//! ```

pub mod error;
pub mod event_loop;
pub mod keys;
pub mod layout;
pub mod render;
pub mod row;
pub mod state;
pub mod store;
pub mod terminal;

pub use error::MenuError;
pub use event_loop::{Menu, DEFAULT_LINES};
pub use keys::Key;
pub use row::Row;
pub use state::{MenuState, Outcome};
pub use store::{Change, ItemStore};
pub use terminal::{spawn_key_reader, CrosstermTerminal, Session, TerminalPort};
