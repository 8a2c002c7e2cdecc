//! # SSH Module
//!
//! - [`keys`] - public key fingerprints and the local `~/.ssh` scan
//! - [`session`] - handing the terminal over to `ssh`

pub mod keys;
pub mod session;

pub use keys::{default_ssh_dir, local_public_keys, parse_key, KeyParseError};
pub use session::{connect, Target};
