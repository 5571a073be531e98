//! Analysis layer
//! - finding.rs: Finding and its classification
//! - engine.rs: Alarm decision engine
//! - overlay.rs: Direct-dependency allow-list from manifests
//! - report.rs: Report lines and summary

pub mod engine;
pub mod finding;
pub mod overlay;
pub mod report;

pub use engine::{Engine, EngineSettings};
pub use finding::{Classification, Finding, UnresolvedReason, Update};
pub use overlay::Overlay;
pub use report::{ReportOptions, Summary, write_report};
