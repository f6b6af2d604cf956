use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use surge_core::{registry, ResourceClass};
use surge_fetch::{FetchError, Fetcher, RetryPolicy, Transport};
use surge_sync::{
    sync_class, DestinationStatus, FailureKind, Mode, Runner, Shutdown, SourceStatus,
};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRpixels";

/// In-memory upstream: url → body, unknown urls are 404.
#[derive(Default)]
struct FakeUpstream {
    bodies: Mutex<HashMap<String, Result<Vec<u8>, FetchError>>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeUpstream {
    fn serve(self: &Arc<Self>, url: &str, body: &[u8]) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.to_vec()));
    }

    fn fail(self: &Arc<Self>, url: &str, status: u16) {
        self.bodies.lock().unwrap().insert(
            url.to_string(),
            Err(FetchError::Status {
                status,
                url: url.to_string(),
            }),
        );
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for FakeUpstream {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            std::thread::sleep(*delay);
        }
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                })
            })
    }
}

fn runner(root: &Path, yaml: &str, upstream: Arc<FakeUpstream>, mode: Mode) -> Runner {
    let registry = registry::parse_str(yaml, &root.join("surge-sync.yaml")).unwrap();
    let fetcher = Fetcher::new(upstream, RetryPolicy::immediate(2));
    Runner::with_fetcher(root, registry, fetcher, mode).unwrap()
}

const TWO_SOURCES: &str = r#"
rules:
  sources:
    - id: low
      origin: https://a.example/x.list
      destination: proxy/x.conf
      format: rule-list
      priority: 1
    - id: high
      origin: https://b.example/x.list
      destination: proxy/x.conf
      format: rule-list
      priority: 2
"#;

fn rule_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.starts_with('#') && !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn higher_priority_value_wins_and_key_appears_once() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,x.com,P1\nDOMAIN,a.com,P1\n");
    upstream.serve("https://b.example/x.list", b"DOMAIN,x.com,P2\n");

    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    assert!(report.is_success(false));
    let lines = rule_lines(&root.path().join("rules/proxy/x.conf"));
    assert_eq!(lines, ["DOMAIN,x.com,P2", "DOMAIN,a.com,P1"]);
    assert_eq!(report.summaries[0].destinations[0].overridden, 1);
}

#[tokio::test]
async fn second_run_without_upstream_change_is_unchanged() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,x.com,P1\n");
    upstream.serve("https://b.example/x.list", b"DOMAIN-SUFFIX,y.com\n");
    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);

    let first = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();
    assert_eq!(first.summaries[0].destinations[0].status, DestinationStatus::Updated);
    let bytes = fs::read(root.path().join("rules/proxy/x.conf")).unwrap();

    let second = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();
    for d in &second.summaries[0].destinations {
        assert_eq!(d.status, DestinationStatus::Unchanged, "{}", d.path.display());
    }
    let hash = first.summaries[0].destinations[0].content_hash.clone();
    assert_eq!(hash.as_ref().map(String::len), Some(64));
    assert_eq!(second.summaries[0].destinations[0].content_hash, hash);
    assert_eq!(fs::read(root.path().join("rules/proxy/x.conf")).unwrap(), bytes);
}

#[tokio::test]
async fn private_override_file_wins_over_any_upstream_priority() {
    let root = TempDir::new().unwrap();
    let private = root.path().join("rules/private/proxy/x.conf");
    fs::create_dir_all(private.parent().unwrap()).unwrap();
    fs::write(&private, "DOMAIN,x.com,MINE\n").unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,x.com,P1\n");
    upstream.serve("https://b.example/x.list", b"DOMAIN,x.com,P2\nDOMAIN,z.com,P2\n");

    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    let lines = rule_lines(&root.path().join("rules/proxy/x.conf"));
    assert_eq!(lines, ["DOMAIN,x.com,MINE", "DOMAIN,z.com,P2"]);
    let dest = &report.summaries[0].destinations[0];
    assert!(dest.sources.iter().any(|s| s.private && s.origin == "rules/private/proxy/x.conf"));
    assert_eq!(fs::read_to_string(&private).unwrap(), "DOMAIN,x.com,MINE\n");
}

#[tokio::test]
async fn private_descriptor_source_is_applied_last() {
    let yaml = r#"
rules:
  sources:
    - id: mine
      origin: https://me.example/x.list
      destination: x.conf
      format: rule-list
      private: true
    - id: upstream
      origin: https://a.example/x.list
      destination: x.conf
      format: rule-list
      priority: 100
"#;
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://me.example/x.list", b"DOMAIN,x.com,MINE\n");
    upstream.serve("https://a.example/x.list", b"DOMAIN,x.com,THEIRS\n");

    let runner = runner(root.path(), yaml, upstream, Mode::Write);
    runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();
    assert_eq!(rule_lines(&root.path().join("rules/x.conf")), ["DOMAIN,x.com,MINE"]);
}

#[tokio::test]
async fn failed_only_source_leaves_file_untouched() {
    let yaml = r#"
rules:
  sources:
    - id: gone
      origin: https://a.example/gone.list
      destination: gone.conf
      format: rule-list
    - id: fine
      origin: https://a.example/fine.list
      destination: fine.conf
      format: rule-list
"#;
    let root = TempDir::new().unwrap();
    let existing = root.path().join("rules/gone.conf");
    fs::create_dir_all(existing.parent().unwrap()).unwrap();
    fs::write(&existing, b"# previous\nDOMAIN,kept.com\n").unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    upstream.fail("https://a.example/gone.list", 503);
    upstream.serve("https://a.example/fine.list", b"DOMAIN,fine.com\n");

    let runner = runner(root.path(), yaml, upstream.clone(), Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    assert_eq!(fs::read(&existing).unwrap(), b"# previous\nDOMAIN,kept.com\n");
    let dests = &report.summaries[0].destinations;
    assert!(matches!(
        dests[0].status,
        DestinationStatus::Failed {
            kind: FailureKind::EmptyResult,
            ..
        }
    ));
    assert!(matches!(dests[0].sources[0].status, SourceStatus::FetchFailed { .. }));
    assert_eq!(dests[1].status, DestinationStatus::Updated);
    assert!(!report.is_success(false));
    // 503 is transient: retried up to the policy's two attempts.
    assert_eq!(upstream.calls(), 3);
}

#[tokio::test]
async fn private_override_alone_does_not_replace_failed_upstream() {
    let root = TempDir::new().unwrap();
    let private = root.path().join("rules/private/proxy/x.conf");
    fs::create_dir_all(private.parent().unwrap()).unwrap();
    fs::write(&private, "DOMAIN,x.com,MINE\n").unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    assert!(report.summaries[0].destinations[0].status.is_failed());
    assert!(!root.path().join("rules/proxy/x.conf").exists());
}

const PRIVATE_DESCRIPTOR: &str = r#"
rules:
  sources:
    - id: mine
      origin: https://me.example/x.list
      destination: x.conf
      format: rule-list
      private: true
    - id: upstream
      origin: https://a.example/x.list
      destination: x.conf
      format: rule-list
"#;

#[tokio::test]
async fn failed_private_descriptor_keeps_previous_output() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://me.example/x.list", b"DOMAIN,x.com,MINE\n");
    upstream.serve("https://a.example/x.list", b"DOMAIN,x.com,THEIRS\n");
    let runner = runner(root.path(), PRIVATE_DESCRIPTOR, upstream.clone(), Mode::Write);
    runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();
    let path = root.path().join("rules/x.conf");
    let before = fs::read(&path).unwrap();

    upstream.fail("https://me.example/x.list", 404);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    let dest = &report.summaries[0].destinations[0];
    match &dest.status {
        DestinationStatus::Failed {
            kind: FailureKind::PrivateOverride,
            reason,
        } => assert!(reason.contains("https://me.example/x.list"), "{reason}"),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(dest.content_hash, None);
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(rule_lines(&path), ["DOMAIN,x.com,MINE"]);
    assert!(!report.is_success(false));
}

#[tokio::test]
async fn unparsable_private_file_fails_destination() {
    let root = TempDir::new().unwrap();
    let private = root.path().join("rules/private/proxy/x.conf");
    fs::create_dir_all(private.parent().unwrap()).unwrap();
    fs::write(&private, "<!DOCTYPE html>\n<html><body>saved by mistake</body></html>\n").unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,x.com,P1\n");
    upstream.serve("https://b.example/x.list", b"DOMAIN,x.com,P2\n");
    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    let dest = &report.summaries[0].destinations[0];
    assert!(matches!(
        dest.status,
        DestinationStatus::Failed {
            kind: FailureKind::PrivateOverride,
            ..
        }
    ));
    let private_report = dest.sources.iter().find(|s| s.private).unwrap();
    assert!(matches!(private_report.status, SourceStatus::FormatError { .. }));
    assert!(!root.path().join("rules/proxy/x.conf").exists());
    assert!(!report.is_success(false));
}

#[tokio::test]
async fn unreadable_private_file_fails_destination() {
    let root = TempDir::new().unwrap();
    let existing = root.path().join("rules/proxy/x.conf");
    fs::create_dir_all(existing.parent().unwrap()).unwrap();
    fs::write(&existing, b"old\n").unwrap();
    // A directory where the override file should be cannot be read.
    fs::create_dir_all(root.path().join("rules/private/proxy/x.conf")).unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,x.com,P1\n");
    upstream.serve("https://b.example/x.list", b"DOMAIN,x.com,P2\n");
    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    let dest = &report.summaries[0].destinations[0];
    assert!(matches!(
        dest.status,
        DestinationStatus::Failed {
            kind: FailureKind::PrivateOverride,
            ..
        }
    ));
    assert_eq!(fs::read(&existing).unwrap(), b"old\n");
}

#[tokio::test]
async fn commit_failure_on_one_destination_does_not_block_others() {
    let yaml = r#"
rules:
  sources:
    - id: blocked
      origin: https://a.example/blocked.list
      destination: blocker/x.conf
      format: rule-list
    - id: fine
      origin: https://a.example/fine.list
      destination: ok.conf
      format: rule-list
"#;
    let root = TempDir::new().unwrap();
    // A regular file where the destination's parent directory must go.
    fs::create_dir_all(root.path().join("rules")).unwrap();
    fs::write(root.path().join("rules/blocker"), b"not a directory\n").unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/blocked.list", b"DOMAIN,blocked.com\n");
    upstream.serve("https://a.example/fine.list", b"DOMAIN,fine.com\n");
    let runner = runner(root.path(), yaml, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    let dests = &report.summaries[0].destinations;
    let blocked = dests
        .iter()
        .find(|d| d.path == Path::new("rules/blocker/x.conf"))
        .unwrap();
    assert!(matches!(
        blocked.status,
        DestinationStatus::Failed {
            kind: FailureKind::Commit,
            ..
        }
    ));
    let ok = dests.iter().find(|d| d.path == Path::new("rules/ok.conf")).unwrap();
    assert_eq!(ok.status, DestinationStatus::Updated);
    assert_eq!(rule_lines(&root.path().join("rules/ok.conf")), ["DOMAIN,fine.com"]);
    assert_eq!(fs::read(root.path().join("rules/blocker")).unwrap(), b"not a directory\n");
    assert_eq!(report.summaries[0].counts().failed, 1);
    assert!(!report.is_success(false));
}

#[tokio::test]
async fn malformed_line_does_not_block_valid_lines() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve(
        "https://a.example/x.list",
        b"DOMAIN,a.com\nthis is not a rule\nDOMAIN,b.com\n",
    );
    upstream.serve("https://b.example/x.list", b"DOMAIN,c.com\n");

    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    assert_eq!(
        rule_lines(&root.path().join("rules/proxy/x.conf")),
        ["DOMAIN,a.com", "DOMAIN,b.com", "DOMAIN,c.com"]
    );
    let low = &report.summaries[0].destinations[0].sources[0];
    assert_eq!(
        low.status,
        SourceStatus::Ok {
            entries: 2,
            rejected: 1,
            duplicates: 0
        }
    );
    assert!(report.is_success(true));
}

#[tokio::test]
async fn html_error_page_is_excluded_from_merge() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,a.com,P1\n");
    upstream.serve(
        "https://b.example/x.list",
        b"<!DOCTYPE html>\n<html><body>Rate limited</body></html>\n",
    );

    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    let dest = &report.summaries[0].destinations[0];
    assert_eq!(dest.status, DestinationStatus::Updated);
    assert!(matches!(dest.sources[1].status, SourceStatus::FormatError { .. }));
    assert!(report.is_success(false));
    assert!(!report.is_success(true), "strict mode flags the failed source");
}

#[tokio::test]
async fn output_does_not_depend_on_fetch_completion_order() {
    let root_a = TempDir::new().unwrap();
    let root_b = TempDir::new().unwrap();
    let bodies = [
        ("https://a.example/x.list", b"DOMAIN,a.com\nDOMAIN,x.com,P1\n".as_slice()),
        ("https://b.example/x.list", b"DOMAIN,b.com\nDOMAIN,x.com,P2\n".as_slice()),
    ];

    let slow_first = Arc::new(FakeUpstream {
        delays: HashMap::from([("https://a.example/x.list".to_string(), Duration::from_millis(80))]),
        ..FakeUpstream::default()
    });
    let slow_second = Arc::new(FakeUpstream {
        delays: HashMap::from([("https://b.example/x.list".to_string(), Duration::from_millis(80))]),
        ..FakeUpstream::default()
    });
    for (url, body) in bodies {
        slow_first.serve(url, body);
        slow_second.serve(url, body);
    }

    runner(root_a.path(), TWO_SOURCES, slow_first, Mode::Write)
        .run(&[ResourceClass::Rules], &Shutdown::new())
        .await
        .unwrap();
    runner(root_b.path(), TWO_SOURCES, slow_second, Mode::Write)
        .run(&[ResourceClass::Rules], &Shutdown::new())
        .await
        .unwrap();

    assert_eq!(
        fs::read(root_a.path().join("rules/proxy/x.conf")).unwrap(),
        fs::read(root_b.path().join("rules/proxy/x.conf")).unwrap()
    );
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,a.com\n");

    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::DryRun);
    let report = runner.run(&[ResourceClass::Rules], &Shutdown::new()).await.unwrap();

    assert_eq!(report.summaries[0].destinations[0].status, DestinationStatus::WouldUpdate);
    assert!(!root.path().join("rules").exists());
}

#[tokio::test]
async fn diff_mode_attaches_unified_diff() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,a.com\n");
    upstream.serve("https://b.example/x.list", b"DOMAIN,b.com\n");

    runner(root.path(), TWO_SOURCES, upstream.clone(), Mode::Write)
        .run(&[ResourceClass::Rules], &Shutdown::new())
        .await
        .unwrap();
    upstream.serve("https://b.example/x.list", b"DOMAIN,c.com\n");

    let report = runner(root.path(), TWO_SOURCES, upstream, Mode::Diff)
        .run(&[ResourceClass::Rules], &Shutdown::new())
        .await
        .unwrap();
    let dest = &report.summaries[0].destinations[0];
    let diff = dest.diff.as_deref().unwrap();
    assert!(diff.contains("--- a/rules/proxy/x.conf"));
    assert!(diff.contains("-DOMAIN,b.com"));
    assert!(diff.contains("+DOMAIN,c.com"));
    assert_eq!(dest.status, DestinationStatus::WouldUpdate);
    assert!(rule_lines(&root.path().join("rules/proxy/x.conf")).contains(&"DOMAIN,b.com".to_string()));
}

const ICONS: &str = r#"
icons:
  index:
    name: Test Icons
    base_url: https://cdn.example/icons
  sources:
    - id: apple
      origin: https://img.example/Apple.png
      destination: apps/Apple.png
      format: image
    - id: broken
      origin: https://img.example/Broken.png
      destination: apps/Broken.png
      format: image
"#;

#[tokio::test]
async fn icons_are_written_verbatim_and_indexed() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://img.example/Apple.png", PNG);
    upstream.serve("https://img.example/Broken.png", b"<html>404</html>");

    let runner = runner(root.path(), ICONS, upstream, Mode::Write);
    let report = runner.run(&[ResourceClass::Icons], &Shutdown::new()).await.unwrap();

    assert_eq!(fs::read(root.path().join("icons/apps/Apple.png")).unwrap(), PNG);
    assert!(!root.path().join("icons/apps/Broken.png").exists());

    let index: serde_json::Value =
        serde_json::from_slice(&fs::read(root.path().join("icons/icons.json")).unwrap()).unwrap();
    assert_eq!(index["name"], "Test Icons");
    assert_eq!(index["icons"].as_array().unwrap().len(), 1);
    assert_eq!(index["icons"][0]["url"], "https://cdn.example/icons/apps/Apple.png");

    let paths: Vec<_> = report.summaries[0]
        .destinations
        .iter()
        .map(|d| d.path.to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(paths, ["icons/apps/Apple.png", "icons/apps/Broken.png", "icons/icons.json"]);
}

#[tokio::test]
async fn icon_index_ignores_template_overrides() {
    let root = TempDir::new().unwrap();
    let overrides = root.path().join(".surge-sync/templates");
    fs::create_dir_all(&overrides).unwrap();
    fs::write(overrides.join("icons.json.tera"), "{{ name }} is not json\n").unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://img.example/Apple.png", PNG);
    let runner = runner(root.path(), ICONS, upstream, Mode::Write);
    runner.run(&[ResourceClass::Icons], &Shutdown::new()).await.unwrap();

    let text = fs::read_to_string(root.path().join("icons/icons.json")).unwrap();
    let index: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(index["name"], "Test Icons");
}

#[tokio::test]
async fn modules_render_header_and_blocks() {
    let yaml = r#"
modules:
  sources:
    - id: ads
      origin: https://m.example/ads.sgmodule
      destination: ads.sgmodule
      format: module
"#;
    let root = TempDir::new().unwrap();
    let private = root.path().join("modules/private/ads.sgmodule");
    fs::create_dir_all(private.parent().unwrap()).unwrap();
    fs::write(&private, "[MITM]\nhostname = %APPEND% mine.example\n").unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve(
        "https://m.example/ads.sgmodule",
        b"#!name=Ads\n[Rule]\nDOMAIN,ad.example,REJECT\n[MITM]\nhostname = %APPEND% ad.example\n",
    );
    runner(root.path(), yaml, upstream, Mode::Write)
        .run(&[ResourceClass::Modules], &Shutdown::new())
        .await
        .unwrap();

    let text = fs::read_to_string(root.path().join("modules/ads.sgmodule")).unwrap();
    assert!(text.contains("# Upstream: https://m.example/ads.sgmodule\n"));
    assert!(text.ends_with(
        "#!name=Ads\n\n[Rule]\nDOMAIN,ad.example,REJECT\n\n[MITM]\nhostname = %APPEND% mine.example\n"
    ));
}

#[tokio::test]
async fn shutdown_before_fetch_cancels_sources_and_keeps_files() {
    let root = TempDir::new().unwrap();
    let existing = root.path().join("rules/proxy/x.conf");
    fs::create_dir_all(existing.parent().unwrap()).unwrap();
    fs::write(&existing, b"old\n").unwrap();

    let upstream = Arc::new(FakeUpstream::default());
    upstream.serve("https://a.example/x.list", b"DOMAIN,a.com\n");
    let registry = registry::parse_str(TWO_SOURCES, Path::new("surge-sync.yaml")).unwrap();
    let ctx = surge_sync::SyncContext {
        root: root.path().to_path_buf(),
        registry: Arc::new(registry),
        fetcher: Fetcher::new(upstream.clone(), RetryPolicy::immediate(1)),
        engine: Arc::new(surge_renderer::TemplateEngine::new(None).unwrap()),
        mode: Mode::Write,
    };

    let shutdown = Shutdown::new();
    shutdown.trigger();
    let summary = sync_class(&ctx, ResourceClass::Rules, &shutdown).await.unwrap();

    assert_eq!(upstream.calls(), 0);
    let dest = &summary.destinations[0];
    assert!(dest.status.is_failed());
    assert!(dest.sources.iter().all(|s| s.status == SourceStatus::Cancelled));
    assert_eq!(fs::read(&existing).unwrap(), b"old\n");
}

#[tokio::test]
async fn runner_skips_remaining_classes_after_shutdown() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    let runner = runner(root.path(), TWO_SOURCES, upstream, Mode::Write);
    let shutdown = Shutdown::new();
    shutdown.trigger();

    let report = runner.run(ResourceClass::all(), &shutdown).await.unwrap();
    assert!(report.summaries.is_empty());
    assert!(report.interrupted);
    assert!(!report.is_success(false));
}

#[tokio::test]
async fn classes_run_in_fixed_order() {
    let root = TempDir::new().unwrap();
    let upstream = Arc::new(FakeUpstream::default());
    let runner = runner(root.path(), "version: 1\n", upstream, Mode::Write);
    let report = runner
        .run(
            &[ResourceClass::Modules, ResourceClass::Icons, ResourceClass::Rules],
            &Shutdown::new(),
        )
        .await
        .unwrap();
    let order: Vec<_> = report.summaries.iter().map(|s| s.resource_class).collect();
    assert_eq!(order, [ResourceClass::Icons, ResourceClass::Rules, ResourceClass::Modules]);
    assert!(report.is_success(true));
    assert_eq!(report.destination_count(), 0);
}
