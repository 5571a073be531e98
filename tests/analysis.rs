//! End-to-end analysis of SBOM components against registries

mod helper;

use std::sync::Arc;

use tempfile::TempDir;

use helper::{FakeRegistry, days_ago, fixed_now, write_sbom};
use sbom_age_check::analyzer::{
    Classification, Engine, EngineSettings, Finding, ReportOptions, write_report,
};
use sbom_age_check::config::{HttpConfig, RegistriesConfig, RegistryConfig};
use sbom_age_check::ignore::IgnoreRules;
use sbom_age_check::sbom::{self, SbomComponent};
use sbom_age_check::version::cache::Cache;
use sbom_age_check::version::coordinator::Coordinator;
use sbom_age_check::version::registries::create_default_registries;
use sbom_age_check::version::registry::Registry;

fn engine<R: Registry>(
    registry: Arc<R>,
    cache: Arc<Cache>,
    ignore_rules: IgnoreRules,
    threshold_days: u32,
) -> Engine<R> {
    Engine::new(
        Coordinator::new(registry, cache, 4),
        ignore_rules,
        EngineSettings {
            threshold_days,
            check_updates: true,
        },
    )
}

fn components(purls: &[&str]) -> Vec<SbomComponent> {
    purls.iter().map(|p| SbomComponent::new(p, None)).collect()
}

fn render(findings: &[Finding], show_ignored: bool) -> String {
    let mut out = Vec::new();
    write_report(
        &mut out,
        findings,
        ReportOptions {
            threshold_days: 30,
            show_ignored,
            show_unresolved: false,
        },
    )
    .unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_serde_is_reported_with_update() {
    let registry = Arc::new(
        FakeRegistry::new()
            .with_release("pkg:cargo/serde@1.0.100", Some(days_ago(450)))
            .with_latest("pkg:cargo/serde", "1.0.200", Some(days_ago(400)), "crates.io"),
    );
    let engine = engine(
        registry.clone(),
        Arc::new(Cache::in_memory().unwrap()),
        IgnoreRules::default(),
        30,
    );

    let findings = engine
        .evaluate_all(&components(&["pkg:cargo/serde@1.0.100"]), fixed_now())
        .await;

    assert_eq!(findings[0].classification, Classification::Alarm);
    assert_eq!(findings[0].age_days, Some(450));
    assert_eq!(
        findings[0].update.as_ref().map(|u| u.latest_version.as_str()),
        Some("1.0.200")
    );

    let report = render(&findings, false);
    assert!(report.starts_with("ALARM: pkg:cargo/serde@1.0.100 | Released: "));
    assert!(report.contains(
        "| Age: 450 days (Limit: 30 days) | UPDATE_AVAILABLE: latest: 1.0.200 (current: 1.0.100) [source=crates.io]"
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn second_run_from_populated_cache_makes_no_registry_calls() {
    let temp_dir = TempDir::new().unwrap();
    let cache_path = temp_dir.path().join("cache.db");
    let purls = [
        "pkg:cargo/serde@1.0.100",
        "pkg:npm/left-pad@1.3.0",
        "pkg:maven/com.google.guava/guava@31.0.1-jre",
    ];
    let registry = || {
        Arc::new(
            FakeRegistry::new()
                .with_release("pkg:cargo/serde@1.0.100", Some(days_ago(450)))
                .with_latest("pkg:cargo/serde", "1.0.200", Some(days_ago(400)), "crates.io")
                .with_release("pkg:npm/left-pad@1.3.0", Some(days_ago(2000)))
                .with_latest("pkg:npm/left-pad", "1.3.0", Some(days_ago(2000)), "npm")
                .with_release(
                    "pkg:maven/com.google.guava/guava@31.0.1-jre",
                    Some(days_ago(10)),
                ),
        )
    };

    let first_registry = registry();
    let first = {
        let cache = Arc::new(Cache::open(&cache_path).unwrap());
        let findings = engine(first_registry.clone(), cache.clone(), IgnoreRules::default(), 30)
            .evaluate_all(&components(&purls), fixed_now())
            .await;
        cache.flush().unwrap();
        findings
    };
    assert_eq!(first_registry.release_calls(), 3);
    assert_eq!(first_registry.latest_calls(), 2);

    let second_registry = registry();
    let cache = Arc::new(Cache::open(&cache_path).unwrap());
    let second = engine(second_registry.clone(), cache, IgnoreRules::default(), 30)
        .evaluate_all(&components(&purls), fixed_now())
        .await;

    assert_eq!(second_registry.total_calls(), 0);
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn components_sharing_a_key_trigger_one_lookup() {
    let registry = Arc::new(
        FakeRegistry::new()
            .with_release("pkg:npm/lodash@4.17.15", Some(days_ago(1500)))
            .with_latest("pkg:npm/lodash", "4.17.21", Some(days_ago(1200)), "npm"),
    );
    let engine = engine(
        registry.clone(),
        Arc::new(Cache::in_memory().unwrap()),
        IgnoreRules::default(),
        30,
    );

    let findings = engine
        .evaluate_all(&components(&["pkg:npm/lodash@4.17.15"; 6]), fixed_now())
        .await;

    assert_eq!(registry.release_calls(), 1);
    assert_eq!(registry.latest_calls(), 1);
    assert_eq!(findings.len(), 6);
    assert!(findings.iter().all(|f| f == &findings[0]));
}

#[tokio::test(flavor = "multi_thread")]
async fn regex_ignore_rule_moves_gms_alarm_to_ignored_section() {
    let (rules, rejected) = IgnoreRules::parse(
        r#"
- purl_regex: '^pkg:maven/com\.google\.android\.gms/.*'
  reason: managed by the platform team
"#,
    )
    .unwrap();
    assert!(rejected.is_empty());

    let registry = Arc::new(
        FakeRegistry::new()
            .with_release(
                "pkg:maven/com.google.android.gms/play-services-base@18.0.1",
                Some(days_ago(900)),
            )
            .with_release("pkg:cargo/serde@1.0.100", Some(days_ago(450)))
            .with_latest("pkg:cargo/serde", "1.0.200", Some(days_ago(400)), "crates.io"),
    );
    let engine = engine(
        registry,
        Arc::new(Cache::in_memory().unwrap()),
        rules,
        30,
    );

    let findings = engine
        .evaluate_all(
            &components(&[
                "pkg:maven/com.google.android.gms/play-services-base@18.0.1",
                "pkg:cargo/serde@1.0.100",
            ]),
            fixed_now(),
        )
        .await;

    assert_eq!(
        findings[0].classification,
        Classification::Ignored {
            reason: Some("managed by the platform team".to_string())
        }
    );
    assert_eq!(findings[1].classification, Classification::Alarm);

    let hidden = render(&findings, false);
    assert!(!hidden.contains("play-services-base"));

    let shown = render(&findings, true);
    assert!(shown.contains(
        "IGNORED: pkg:maven/com.google.android.gms/play-services-base@18.0.1 | Reason: managed by the platform team"
    ));
    assert!(!shown.contains("ALARM: pkg:maven/com.google.android.gms"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sbom_file_is_analyzed_in_document_order() {
    let temp_dir = TempDir::new().unwrap();
    let sbom_path = write_sbom(
        &temp_dir,
        &[
            "pkg:pypi/requests@2.31.0",
            "pkg:cocoapods/Alamofire@4.0.0",
            "pkg:npm/%40types/node@20.0.0",
        ],
    );
    let registry = Arc::new(
        FakeRegistry::new()
            .with_release("pkg:pypi/requests@2.31.0", Some(days_ago(5)))
            .with_release("pkg:cocoapods/Alamofire@4.0.0", None)
            .with_release("pkg:npm/%40types/node@20.0.0", Some(days_ago(700))),
    );
    let engine = engine(
        registry,
        Arc::new(Cache::in_memory().unwrap()),
        IgnoreRules::default(),
        30,
    );

    let components = sbom::load(&sbom_path).unwrap();
    let findings = engine.evaluate_all(&components, fixed_now()).await;

    let classifications: Vec<&Classification> =
        findings.iter().map(|f| &f.classification).collect();
    assert_eq!(classifications[0], &Classification::Ok);
    assert!(matches!(classifications[1], Classification::Unresolved(_)));
    assert_eq!(classifications[2], &Classification::Alarm);
    // No latest release is known for @types/node, so no update is attached
    assert_eq!(findings[2].update, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn crates_io_over_http_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v1/crates/serde")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "versions": [
                    {"num": "1.0.200", "yanked": false, "created_at": "2024-04-27T12:00:00Z"},
                    {"num": "1.0.150", "yanked": true, "created_at": "2023-12-01T12:00:00Z"},
                    {"num": "1.0.100", "yanked": false, "created_at": "2024-03-08T12:00:00Z"}
                ]
            })
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let registries = RegistriesConfig {
        cargo: RegistryConfig {
            enabled: true,
            base_url: Some(server.url()),
        },
        npm: RegistryConfig {
            enabled: false,
            base_url: None,
        },
        ..Default::default()
    };
    let registry = Arc::new(create_default_registries(&registries, &HttpConfig::default()));
    let engine = engine(
        registry,
        Arc::new(Cache::in_memory().unwrap()),
        IgnoreRules::default(),
        30,
    );

    let findings = engine
        .evaluate_all(
            &components(&["pkg:cargo/serde@1.0.100", "pkg:npm/left-pad@1.3.0"]),
            fixed_now(),
        )
        .await;

    assert_eq!(findings[0].classification, Classification::Alarm);
    assert_eq!(
        findings[0].update.as_ref().map(|u| u.source.as_str()),
        Some("crates.io")
    );
    assert!(matches!(
        findings[1].classification,
        Classification::Unresolved(_)
    ));
}
