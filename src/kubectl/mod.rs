//! kubectl version negotiation and provisioning
//!
//! Picks the kubectl version matching the cluster the user talks to, finds or
//! downloads a binary of that version, and hands the process over to it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │    Probe     │────▶│   Resolver   │◀────│  Downloader  │
//! │ (API server) │     │ (fallbacks)  │     │   (mirror)   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                             │                     │
//!                             ▼                     ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │    Finder    │────▶│    Cache     │
//!                      │ (PATH+cache) │     │ (local bins) │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`version`]: Tolerant semantic versions and the version-skew rule
//! - [`binary`]: Discovered binaries and selection among them
//! - [`platform`]: Host os/arch in Kubernetes release naming
//! - [`cache`]: Cache entry naming and the local download directory
//! - [`client_version`]: Asking an installed kubectl for its version
//! - [`finder`]: BinaryFinder trait and the filesystem implementation
//! - [`downloader`]: Downloader trait
//! - [`mirror`]: Downloader for the official release mirror
//! - [`kubeconfig`]: Locating the current cluster's API server
//! - [`probe`]: ClusterVersionProbe trait and the API server implementation
//! - [`resolver`]: Version selection state machine
//! - [`exec`]: Process replacement
//! - [`error`]: Error types

pub mod binary;
pub mod cache;
pub mod client_version;
pub mod downloader;
pub mod error;
pub mod exec;
pub mod finder;
pub mod kubeconfig;
pub mod mirror;
pub mod platform;
pub mod probe;
pub mod resolver;
pub mod version;
