//! Line-oriented report of findings

use std::io::{self, Write};

use crate::analyzer::finding::{Classification, Finding};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub threshold_days: u32,
    pub show_ignored: bool,
    pub show_unresolved: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub alarms: usize,
    pub ignored: usize,
    pub unresolved: usize,
}

impl Summary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        findings.iter().fold(
            Summary {
                total: findings.len(),
                ..Default::default()
            },
            |mut summary, finding| {
                match finding.classification {
                    Classification::Ok => summary.ok += 1,
                    Classification::Alarm => summary.alarms += 1,
                    Classification::Ignored { .. } => summary.ignored += 1,
                    Classification::Unresolved(_) => summary.unresolved += 1,
                }
                summary
            },
        )
    }

    /// Closing line printed on stderr
    pub fn closing_line(&self, threshold_days: u32) -> String {
        let mut line = if self.alarms == 0 {
            format!(
                "Analysis complete. No components older than {} days found.",
                threshold_days
            )
        } else {
            format!(
                "Analysis complete. {} of {} components older than {} days.",
                self.alarms, self.total, threshold_days
            )
        };
        if self.ignored > 0 || self.unresolved > 0 {
            line.push_str(&format!(
                " ({} ignored, {} unresolved)",
                self.ignored, self.unresolved
            ));
        }
        line
    }
}

pub fn alarm_line(finding: &Finding, threshold_days: u32) -> String {
    let released = finding
        .release_date
        .map(|d| d.date_naive().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mut line = format!(
        "ALARM: {} | Released: {} | Age: {} days (Limit: {} days)",
        finding.display_purl(),
        released,
        finding.age_days.unwrap_or_default(),
        threshold_days
    );
    if let (Some(update), Some(id)) = (&finding.update, &finding.identifier) {
        line.push_str(&format!(
            " | UPDATE_AVAILABLE: latest: {} (current: {}) [source={}]",
            update.latest_version, id.version, update.source
        ));
    }
    line
}

/// Writes the report body and returns the tallies
pub fn write_report<W: Write>(
    out: &mut W,
    findings: &[Finding],
    options: ReportOptions,
) -> io::Result<Summary> {
    for finding in findings.iter().filter(|f| f.is_alarm()) {
        writeln!(out, "{}", alarm_line(finding, options.threshold_days))?;
    }

    if options.show_ignored {
        let ignored: Vec<&Finding> = findings.iter().filter(|f| f.is_ignored()).collect();
        if !ignored.is_empty() {
            writeln!(out)?;
            writeln!(out, "Ignored components:")?;
            for finding in ignored {
                let reason = match &finding.classification {
                    Classification::Ignored { reason: Some(reason) } => reason.as_str(),
                    _ => "no reason given",
                };
                writeln!(out, "IGNORED: {} | Reason: {}", finding.display_purl(), reason)?;
            }
        }
    }

    if options.show_unresolved {
        let unresolved: Vec<&Finding> = findings.iter().filter(|f| f.is_unresolved()).collect();
        if !unresolved.is_empty() {
            writeln!(out)?;
            writeln!(out, "Unresolved components:")?;
            for finding in unresolved {
                if let Classification::Unresolved(reason) = &finding.classification {
                    writeln!(out, "UNRESOLVED: {} | {}", finding.purl, reason)?;
                }
            }
        }
    }

    Ok(Summary::from_findings(findings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::finding::{UnresolvedReason, Update};
    use crate::purl::PackageIdentifier;
    use chrono::{TimeZone, Utc};

    fn alarm(purl: &str, update: Option<Update>) -> Finding {
        Finding {
            purl: purl.to_string(),
            identifier: Some(PackageIdentifier::parse(purl).unwrap()),
            release_date: Some(Utc.with_ymd_and_hms(2024, 3, 8, 9, 30, 0).unwrap()),
            age_days: Some(450),
            classification: Classification::Alarm,
            update,
        }
    }

    fn render(findings: &[Finding], show_ignored: bool, show_unresolved: bool) -> String {
        let mut out = Vec::new();
        write_report(
            &mut out,
            findings,
            ReportOptions {
                threshold_days: 30,
                show_ignored,
                show_unresolved,
            },
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn alarm_line_with_update() {
        let finding = alarm(
            "pkg:cargo/serde@1.0.100",
            Some(Update {
                latest_version: "1.0.200".to_string(),
                source: "crates.io".to_string(),
            }),
        );

        assert_eq!(
            alarm_line(&finding, 30),
            "ALARM: pkg:cargo/serde@1.0.100 | Released: 2024-03-08 | Age: 450 days (Limit: 30 days) | UPDATE_AVAILABLE: latest: 1.0.200 (current: 1.0.100) [source=crates.io]"
        );
    }

    #[test]
    fn alarm_line_without_update() {
        let finding = alarm("pkg:npm/left-pad@1.3.0", None);
        assert_eq!(
            alarm_line(&finding, 30),
            "ALARM: pkg:npm/left-pad@1.3.0 | Released: 2024-03-08 | Age: 450 days (Limit: 30 days)"
        );
    }

    #[test]
    fn ignored_and_unresolved_sections_are_opt_in() {
        let mut ignored = alarm("pkg:maven/com.google.android.gms/play-services-base@18.0.1", None);
        ignored.classification = Classification::Ignored {
            reason: Some("platform".to_string()),
        };
        let unresolved = Finding::unresolved("pkg:golang/x@v1", None, UnresolvedReason::NotFound);
        let findings = vec![alarm("pkg:cargo/serde@1.0.100", None), ignored, unresolved];

        let hidden = render(&findings, false, false);
        assert_eq!(hidden.lines().count(), 1);
        assert!(!hidden.contains("IGNORED:"));

        let shown = render(&findings, true, true);
        assert!(shown.contains(
            "IGNORED: pkg:maven/com.google.android.gms/play-services-base@18.0.1 | Reason: platform"
        ));
        assert!(shown.contains("UNRESOLVED: pkg:golang/x@v1 | not found in registry"));
    }

    #[test]
    fn closing_line_reports_clean_run() {
        let summary = Summary::from_findings(&[]);
        assert_eq!(
            summary.closing_line(30),
            "Analysis complete. No components older than 30 days found."
        );
    }

    #[test]
    fn closing_line_counts_alarms() {
        let summary = Summary::from_findings(&[alarm("pkg:cargo/serde@1.0.100", None)]);
        assert_eq!(summary.alarms, 1);
        assert_eq!(
            summary.closing_line(30),
            "Analysis complete. 1 of 1 components older than 30 days."
        );
    }
}
