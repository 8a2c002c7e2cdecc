//! # Cloud Module
//!
//! Access to the GPU cloud's instance API.
//!
//! - [`types`] - request and response bodies, [`Title`] and [`Region`]
//! - [`client`] - the authenticated HTTP [`Client`] and the capability traits
//!   producers are written against

pub mod client;
pub mod types;

pub use client::{offers, Client, InstanceApi, KeyCatalog, SshKeyCatalog};
pub use types::{Instance, InstanceQuote, LaunchRequest, Region, SshKey, Status, Title};
