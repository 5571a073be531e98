//! Registry implementations for resolving package releases

pub mod cocoapods;
pub mod crates_io;
pub mod maven;
pub mod npm;
pub mod pypi;

use std::collections::HashMap;

use tracing::debug;

pub use cocoapods::CocoaPodsRegistry;
pub use crates_io::CratesIoRegistry;
pub use maven::MavenRegistry;
pub use npm::NpmRegistry;
pub use pypi::PypiRegistry;

use crate::config::{HttpConfig, RegistriesConfig};
use crate::purl::{Ecosystem, PackageIdentifier};
use crate::version::error::RegistryError;
use crate::version::registry::{Registry, RetryPolicy};
use crate::version::types::ResolutionResult;

/// One client per ecosystem, dispatched by the identifier's ecosystem tag
pub enum RegistryClient {
    CratesIo(CratesIoRegistry),
    Npm(NpmRegistry),
    PyPI(PypiRegistry),
    Maven(MavenRegistry),
    CocoaPods(CocoaPodsRegistry),
}

impl RegistryClient {
    pub fn ecosystem(&self) -> Ecosystem {
        match self {
            RegistryClient::CratesIo(_) => Ecosystem::Cargo,
            RegistryClient::Npm(_) => Ecosystem::Npm,
            RegistryClient::PyPI(_) => Ecosystem::PyPI,
            RegistryClient::Maven(_) => Ecosystem::Maven,
            RegistryClient::CocoaPods(_) => Ecosystem::CocoaPods,
        }
    }

    fn as_registry(&self) -> &dyn Registry {
        match self {
            RegistryClient::CratesIo(r) => r,
            RegistryClient::Npm(r) => r,
            RegistryClient::PyPI(r) => r,
            RegistryClient::Maven(r) => r,
            RegistryClient::CocoaPods(r) => r,
        }
    }
}

#[async_trait::async_trait]
impl Registry for RegistryClient {
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        self.as_registry().resolve_latest(package).await
    }

    async fn release_date(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        self.as_registry().release_date(package).await
    }
}

/// The set of enabled registry clients
///
/// Lookups for an ecosystem without a client fail with
/// [`RegistryError::Disabled`].
#[derive(Default)]
pub struct Registries {
    clients: HashMap<Ecosystem, RegistryClient>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client: RegistryClient) {
        self.clients.insert(client.ecosystem(), client);
    }

    pub fn is_enabled(&self, ecosystem: Ecosystem) -> bool {
        self.clients.contains_key(&ecosystem)
    }

    fn client(&self, ecosystem: Ecosystem) -> Result<&RegistryClient, RegistryError> {
        self.clients
            .get(&ecosystem)
            .ok_or_else(|| RegistryError::Disabled(ecosystem.to_string()))
    }
}

#[async_trait::async_trait]
impl Registry for Registries {
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        self.client(package.ecosystem)?
            .resolve_latest(package)
            .await
    }

    async fn release_date(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        self.client(package.ecosystem)?.release_date(package).await
    }
}

/// Builds the clients for every registry the configuration leaves enabled
pub fn create_default_registries(config: &RegistriesConfig, http: &HttpConfig) -> Registries {
    let timeout = http.timeout();
    let retry = RetryPolicy {
        max_attempts: http.max_attempts,
        ..RetryPolicy::default()
    };
    let url = |custom: &Option<String>, default: &'static str| -> String {
        custom.clone().unwrap_or_else(|| default.to_string())
    };

    let mut registries = Registries::new();
    for ecosystem in Ecosystem::ALL {
        if !config.is_enabled(ecosystem) {
            debug!("Registry for {} is disabled", ecosystem);
            continue;
        }
        let client = match ecosystem {
            Ecosystem::Cargo => RegistryClient::CratesIo(CratesIoRegistry::with_http(
                &url(&config.cargo.base_url, crates_io::DEFAULT_BASE_URL),
                timeout,
                retry,
            )),
            Ecosystem::Npm => RegistryClient::Npm(NpmRegistry::with_http(
                &url(&config.npm.base_url, npm::DEFAULT_BASE_URL),
                timeout,
                retry,
            )),
            Ecosystem::PyPI => RegistryClient::PyPI(PypiRegistry::with_http(
                &url(&config.pypi.base_url, pypi::DEFAULT_PYPI_REGISTRY),
                timeout,
                retry,
            )),
            Ecosystem::Maven => RegistryClient::Maven(MavenRegistry::with_http(
                &url(&config.maven.base_url, maven::DEFAULT_CENTRAL_URL),
                &url(&config.maven.google_url, maven::DEFAULT_GOOGLE_URL),
                &url(&config.maven.search_url, maven::DEFAULT_SEARCH_URL),
                timeout,
                retry,
            )),
            Ecosystem::CocoaPods => RegistryClient::CocoaPods(CocoaPodsRegistry::with_http(
                &url(&config.cocoapods.base_url, cocoapods::DEFAULT_BASE_URL),
                timeout,
                retry,
            )),
        };
        registries.insert(client);
    }

    registries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use mockito::Server;

    #[tokio::test]
    async fn disabled_ecosystem_returns_disabled_error() {
        let config = RegistriesConfig {
            cargo: RegistryConfig {
                enabled: false,
                base_url: None,
            },
            ..RegistriesConfig::default()
        };
        let registries = create_default_registries(&config, &HttpConfig::default());

        assert!(!registries.is_enabled(Ecosystem::Cargo));
        assert!(registries.is_enabled(Ecosystem::Npm));

        let result = registries
            .resolve_latest(&PackageIdentifier::new(
                Ecosystem::Cargo,
                None,
                "serde",
                "1.0.0",
            ))
            .await;
        assert_eq!(result, Err(RegistryError::Disabled("cargo".to_string())));
    }

    #[tokio::test]
    async fn dispatches_to_client_of_identifier_ecosystem() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/pods/Kingfisher")
            .with_status(200)
            .with_body(r#"{"versions":[{"name":"7.0.0","created_at":"2021-09-01 00:00:00 UTC"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let config = RegistriesConfig {
            cocoapods: RegistryConfig {
                enabled: true,
                base_url: Some(server.url()),
            },
            ..RegistriesConfig::default()
        };
        let registries = create_default_registries(&config, &HttpConfig::default());

        let result = registries
            .resolve_latest(&PackageIdentifier::new(
                Ecosystem::CocoaPods,
                None,
                "Kingfisher",
                "6.0.0",
            ))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.latest_version, "7.0.0");
        assert_eq!(result.source, "cocoapods-trunk");
    }
}
