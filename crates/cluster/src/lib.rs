//! Boundary to the managed search cluster.
//!
//! This crate provides:
//! - [`IndexAdmin`] for listing, probing, creating and deleting indices
//! - [`LeadershipCheck`] for asking whether the local node is the elected master
//! - [`NodeProbe`] for liveness pings and local process statistics
//! - [`ProcessHealth`], the shared "engine started" flag
//! - [`EsHttpClient`], the REST implementation of all three traits
//! - [`InMemoryCluster`], an in-process implementation for tests

pub mod admin;
pub mod error;
pub mod health;
pub mod http;
pub mod leader;
pub mod memory;

pub use admin::{IndexAdmin, IndexSnapshot, IndexStatus};
pub use error::ClusterError;
pub use health::{CpuStats, MemStats, NodeProbe, ProcessHealth, ProcessStats};
pub use http::EsHttpClient;
pub use leader::LeadershipCheck;
pub use memory::{ClusterCall, InMemoryCluster};
