pub mod analyzer;
pub mod config;
pub mod ignore;
pub mod parser;
pub mod purl;
pub mod sbom;
pub mod version;
