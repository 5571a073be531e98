//! Alarm decision engine
//!
//! Classifies every SBOM component by the age of its pinned release. The
//! order is fixed: release dates first, then the threshold, then (for alarms
//! only) the latest-release lookup and its validation, and the ignore rules
//! last. Ignore rules can only turn an ALARM into IGNORED.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::analyzer::finding::{Classification, Finding, UnresolvedReason, Update};
use crate::ignore::IgnoreRules;
use crate::purl::{PackageIdentifier, PurlError};
use crate::sbom::SbomComponent;
use crate::version::coordinator::Coordinator;
use crate::version::registry::Registry;
use crate::version::semver::is_different_version;
use crate::version::validator::{Validation, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub threshold_days: u32,
    pub check_updates: bool,
}

pub struct Engine<R: Registry> {
    coordinator: Coordinator<R>,
    ignore_rules: IgnoreRules,
    settings: EngineSettings,
}

impl<R: Registry> Engine<R> {
    pub fn new(
        coordinator: Coordinator<R>,
        ignore_rules: IgnoreRules,
        settings: EngineSettings,
    ) -> Self {
        Self {
            coordinator,
            ignore_rules,
            settings,
        }
    }

    pub fn coordinator(&self) -> &Coordinator<R> {
        &self.coordinator
    }

    /// Classifies a single component
    pub async fn evaluate(&self, component: &SbomComponent, as_of: DateTime<Utc>) -> Finding {
        let mut findings = self.evaluate_all(std::slice::from_ref(component), as_of).await;
        // evaluate_all yields exactly one finding per component
        findings.remove(0)
    }

    /// One finding per component, in input order
    pub async fn evaluate_all(
        &self,
        components: &[SbomComponent],
        as_of: DateTime<Utc>,
    ) -> Vec<Finding> {
        let parsed: Vec<Result<PackageIdentifier, PurlError>> =
            components.iter().map(SbomComponent::identifier).collect();

        let identifiers: Vec<PackageIdentifier> = parsed
            .iter()
            .filter_map(|id| id.as_ref().ok().cloned())
            .collect();
        let release_dates = self.coordinator.release_dates_many(&identifiers).await;

        let mut findings: Vec<Finding> = components
            .iter()
            .zip(parsed)
            .map(|(component, parsed)| match parsed {
                Err(e) => {
                    debug!("Skipping {}: {}", component.purl, e);
                    Finding::unresolved(&component.purl, None, UnresolvedReason::from(&e))
                }
                Ok(id) => match release_dates.get(&id) {
                    Some(Ok(resolved)) => self.classify_age(component, id, resolved.release_date, as_of),
                    Some(Err(e)) => {
                        Finding::unresolved(&component.purl, Some(id), UnresolvedReason::from(e))
                    }
                    None => Finding::unresolved(
                        &component.purl,
                        Some(id),
                        UnresolvedReason::LookupFailed("no lookup result".to_string()),
                    ),
                },
            })
            .collect();

        if self.settings.check_updates {
            self.attach_updates(&mut findings).await;
        }

        let today = as_of.date_naive();
        for finding in findings.iter_mut().filter(|f| f.is_alarm()) {
            self.apply_ignore_rules(finding, today);
        }

        findings
    }

    fn classify_age(
        &self,
        component: &SbomComponent,
        id: PackageIdentifier,
        release_date: Option<DateTime<Utc>>,
        as_of: DateTime<Utc>,
    ) -> Finding {
        let Some(released) = release_date else {
            return Finding::unresolved(
                &component.purl,
                Some(id),
                UnresolvedReason::UnknownReleaseDate,
            );
        };

        // Clock skew between registries and the local host must not
        // produce negative ages
        let age_days = (as_of - released).num_days().max(0);
        let classification = if age_days > i64::from(self.settings.threshold_days) {
            Classification::Alarm
        } else {
            Classification::Ok
        };

        Finding {
            purl: component.purl.clone(),
            identifier: Some(id),
            release_date: Some(released),
            age_days: Some(age_days),
            classification,
            update: None,
        }
    }

    async fn attach_updates(&self, findings: &mut [Finding]) {
        let alarming: Vec<PackageIdentifier> = findings
            .iter()
            .filter(|f| f.is_alarm())
            .filter_map(|f| f.identifier.clone())
            .collect();
        if alarming.is_empty() {
            return;
        }

        let latest = self.coordinator.resolve_many(&alarming).await;

        for finding in findings.iter_mut().filter(|f| f.is_alarm()) {
            let Some(id) = &finding.identifier else {
                continue;
            };
            let Some(Ok(candidate)) = latest.get(id) else {
                debug!("No latest version for {}", id);
                continue;
            };

            if let Validation::Rejected(reason) =
                validate(candidate, &id.version, finding.release_date)
            {
                info!("Discarding latest version of {}: {}", id.base_purl(), reason);
                continue;
            }

            if is_different_version(id.ecosystem, &id.version, &candidate.latest_version) {
                finding.update = Some(Update {
                    latest_version: candidate.latest_version.clone(),
                    source: candidate.source.clone(),
                });
            }
        }
    }

    fn apply_ignore_rules(&self, finding: &mut Finding, today: chrono::NaiveDate) {
        let mut spellings = vec![finding.purl.clone()];
        if let Some(id) = &finding.identifier {
            spellings.push(id.to_purl());
            spellings.push(id.base_purl());
        }
        let spellings: Vec<&str> = spellings.iter().map(String::as_str).collect();

        if let Some(rule) = self.ignore_rules.evaluate(&spellings, today) {
            debug!("Ignoring alarm for {}", finding.purl);
            finding.classification = Classification::Ignored {
                reason: rule.reason.clone(),
            };
        }
    }
}
