//! Kubernetes API Client for Workbench
//!
//! A thin, typed facade over the Kubernetes API for the Workbench
//! controllers. Covers the three workbench kinds (`Workspace`, `Unit`,
//! `Tunnel`) plus the derived core objects (`Pod`, `Service`).
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClient, ClusterClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kube = kube::Client::try_default().await?;
//! let client = ClusterClient::new(kube, None);
//!
//! // Read a workspace and its derived unit
//! let ws = client.get_workspace("team-a", "bench-1").await?;
//! let unit = client.get_unit("team-a", "bench-1").await?;
//! println!("{:?} {:?}", ws.spec.framework, unit.status);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed errors**: 404/409 responses become [`ClusterError::NotFound`],
//!   [`ClusterError::AlreadyExists`] and [`ClusterError::Conflict`] so
//!   reconcilers can branch on them
//! - **Status subresource**: status updates go through merge patches on
//!   the status subresource, never full-object replacement
//! - **Mocking**: [`ClusterClientTrait`] abstracts every operation; the
//!   `test-util` feature ships an in-memory [`MockClusterClient`]

pub mod client;
#[path = "trait.rs"]
pub mod cluster_trait;
pub mod error;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::ClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
#[cfg(feature = "test-util")]
pub use mock::MockClusterClient;
