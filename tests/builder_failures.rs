// tests/builder_failures.rs

mod common;
use common::*;

use watchmill::watch::ChangeKind;

#[tokio::test]
async fn one_failing_file_does_not_abort_the_rest() {
    init_tracing();
    let fs = mock_fs();
    fs.add_file("/proj/src/app.ts", "export const a = 1;");
    fs.add_file("/proj/src/bad.ts", "export const b = 1;");
    fs.add_file("/proj/src/util.ts", "export const u = 1;");
    let builder = FakeBuilder::new();
    builder.fail("bad.ts");

    let mut filer = fake_filer(&fs, ts_config(), &builder);
    let summary = with_timeout(filer.init()).await.unwrap();

    assert_eq!(summary.built, 2);
    assert_eq!(summary.failed, 1);
    assert!(exists(&fs, "/proj/build/dev/browser/app.ts"));
    assert!(exists(&fs, "/proj/build/dev/browser/util.ts"));
    assert!(!exists(&fs, "/proj/build/dev/browser/bad.ts"));
}

#[tokio::test]
async fn failed_file_retries_on_the_next_event_even_if_unchanged() {
    init_tracing();
    let fs = mock_fs();
    fs.add_file("/proj/src/app.ts", "export const a = 1;");
    let builder = FakeBuilder::new();
    builder.fail("app.ts");

    let mut filer = fake_filer(&fs, ts_config(), &builder);
    with_timeout(filer.init()).await.unwrap();
    builder.reset_calls();
    builder.heal("app.ts");

    // Same bytes; only the failure makes this rebuild instead of cache-hit.
    with_timeout(filer.apply_change(change(ChangeKind::Update, "/proj/src/app.ts"))).await;

    assert_eq!(builder.builds_of("app.ts"), 1);
    assert_eq!(
        read_str(&fs, "/proj/build/dev/browser/app.ts"),
        "export const a = 1;"
    );
}

#[tokio::test]
async fn later_failure_keeps_the_prior_artifact() {
    init_tracing();
    let fs = mock_fs();
    fs.add_file("/proj/src/app.ts", "export const a = 1;");
    let builder = FakeBuilder::new();

    let mut filer = fake_filer(&fs, ts_config(), &builder);
    with_timeout(filer.init()).await.unwrap();

    builder.fail("app.ts");
    fs.add_file("/proj/src/app.ts", "export const a = 2;");
    with_timeout(filer.apply_change(change(ChangeKind::Update, "/proj/src/app.ts"))).await;

    assert_eq!(filer.summary().failed, 1);
    assert_eq!(
        read_str(&fs, "/proj/build/dev/browser/app.ts"),
        "export const a = 1;"
    );

    builder.heal("app.ts");
    fs.add_file("/proj/src/app.ts", "export const a = 3;");
    with_timeout(filer.apply_change(change(ChangeKind::Update, "/proj/src/app.ts"))).await;

    assert_eq!(
        read_str(&fs, "/proj/build/dev/browser/app.ts"),
        "export const a = 3;"
    );
}

#[tokio::test]
async fn failure_in_one_config_leaves_the_others_output_alone() {
    init_tracing();
    let fs = mock_fs();
    fs.add_file("/proj/src/app.ts", "export const a = 1;");
    let builder = FakeBuilder::new();
    builder.fail_in("app.ts", "node");

    let config = ConfigBuilder::new("/proj/src", "/proj/build")
        .build_section("browser", "browser", &["**/*.ts"])
        .build_section("node", "node", &["**/*.ts"])
        .build();
    let mut filer = fake_filer(&fs, config, &builder);
    let summary = with_timeout(filer.init()).await.unwrap();

    assert_eq!(summary.built, 1);
    assert_eq!(summary.failed, 1);
    assert!(exists(&fs, "/proj/build/dev/browser/app.ts"));
    assert!(!exists(&fs, "/proj/build/dev/node/app.ts"));

    builder.reset_calls();
    builder.heal("app.ts");
    with_timeout(filer.apply_change(change(ChangeKind::Update, "/proj/src/app.ts"))).await;

    // The healthy config stays a cache hit; only the failed one rebuilds.
    assert_eq!(
        builder.calls(),
        vec![("app.ts".to_string(), "node".to_string())]
    );
    assert!(exists(&fs, "/proj/build/dev/node/app.ts"));
}

#[tokio::test]
async fn restart_retries_failures_recorded_before_shutdown() {
    init_tracing();
    let fs = mock_fs();
    fs.add_file("/proj/src/app.ts", "export const a = 1;");
    let builder = FakeBuilder::new();
    builder.fail("app.ts");

    let mut filer = fake_filer(&fs, ts_config(), &builder);
    let summary = with_timeout(filer.init()).await.unwrap();
    assert_eq!(summary.failed, 1);
    with_timeout(filer.close()).await.unwrap();

    builder.heal("app.ts");
    builder.reset_calls();
    let mut filer = fake_filer(&fs, ts_config(), &builder);
    let summary = with_timeout(filer.init()).await.unwrap();

    assert_eq!(summary.built, 1);
    assert_eq!(builder.builds_of("app.ts"), 1);
    assert!(exists(&fs, "/proj/build/dev/browser/app.ts"));
}
