//! Registry resolution engine
//!
//! Resolves the newest release of a package and the release date of a
//! pinned version across several registries, with a persistent cache in
//! front of them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Coordinator │────▶│    Cache    │     │  Validator  │
//! │ (workers)   │     │  (sqlite)   │     │ (screening) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  Registries │────▶│  Resolvers  │
//! │ (HTTP, per  │     │ (pick the   │
//! │  ecosystem) │     │  latest)    │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: SQLite-backed result cache
//! - [`coordinator`]: Bounded concurrent lookups with per-key deduplication
//! - [`registry`]: Registry trait and retry policy
//! - [`registries`]: Concrete registry clients (crates.io, npm, PyPI, Maven, CocoaPods)
//! - [`resolver`] / [`resolvers`]: Latest-version selection per ecosystem
//! - [`validator`]: Screening of latest-version candidates
//! - [`error`]: Error types for cache and registry operations
//! - [`semver`]: Version parsing and comparison
//! - [`types`]: Common types like `ResolutionResult`

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod resolvers;
pub mod semver;
pub mod types;
pub mod validator;
