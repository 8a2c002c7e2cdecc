//! lambdactl - launch, reach and terminate cloud GPU instances
//!
//! This library provides the inline terminal picker the CLI is built around,
//! the cloud API client, and the row producers that feed one to the other.

pub mod cloud;
pub mod config;
pub mod logging;
pub mod menu;
pub mod rows;
pub mod ssh;
