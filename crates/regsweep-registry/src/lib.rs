//! # regsweep-registry
//!
//! Docker Registry v2 collaborator for RegSweep.
//!
//! This crate owns all registry I/O: authenticated tag listing with
//! pagination, digest resolution, optional creation-time resolution from
//! the image config blob, and batched manifest deletion. It produces the
//! [`ImageRecord`](regsweep_core::ImageRecord) listing the planner
//! consumes and executes the delete set a computed plan designates; it
//! never makes retention decisions itself.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod types;

pub use client::{RegistryAuth, RegistryClient};
pub use error::{RegistryError, Result};
pub use types::{DeleteFailure, DeleteOutcome};
