//! End-to-end mirror scenarios against the in-memory bucket
//!
//! Run with: cargo test --test mirror_tests

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;

use minio_deploy::deploy::{deploy_settings, deploy_with, plan_with};
use minio_deploy::sync::{MemoryBucket, Mirror, MirrorOptions};
use minio_deploy::{DeployConfig, DeployError, Settings};

fn build_site(root: &Path) {
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::write(root.join("index.html"), "<!doctype html><title>site</title>").unwrap();
    fs::write(root.join("assets/app.js"), "console.log('hi')").unwrap();
}

fn config(source: &Path, prefix: &str, remove_extra: bool) -> DeployConfig {
    Settings {
        endpoint: Some("http://localhost:9000".into()),
        access_key: Some("minioadmin".into()),
        secret_key: Some("minioadmin".into()),
        bucket: Some("site".into()),
        prefix: Some(prefix.into()),
        remove_extra: Some(if remove_extra { "1" } else { "0" }.into()),
        source_dir: Some(source.to_string_lossy().into_owned()),
        concurrency: Some("4".into()),
        ..Default::default()
    }
    .resolve()
    .unwrap()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn scenario_a_fresh_upload_with_content_types() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let store = MemoryBucket::new("site");

    let report = deploy_with(&store, &config(dir.path(), "", false), false)
        .await
        .unwrap();

    assert_eq!(
        store.keys(),
        vec!["assets/app.js".to_string(), "index.html".to_string()]
    );
    assert_eq!(
        store.object("index.html").unwrap().content_type,
        "text/html"
    );
    assert_eq!(
        store.object("assets/app.js").unwrap().content_type,
        "application/javascript"
    );
    assert_eq!(
        store.object("assets/app.js").unwrap().body,
        b"console.log('hi')".to_vec()
    );
    assert_eq!(report.bucket_created, Some(true));
    assert_eq!(report.mirror.unwrap().uploaded, 2);
}

#[tokio::test]
async fn scenario_b_stale_key_removed_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let store = MemoryBucket::with_objects(
        "site",
        vec![
            ("index.html".to_string(), b"old".to_vec()),
            ("assets/old.js".to_string(), b"stale".to_vec()),
        ],
    );

    let report = deploy_with(&store, &config(dir.path(), "", true), false)
        .await
        .unwrap();

    assert_eq!(
        store.keys(),
        vec!["assets/app.js".to_string(), "index.html".to_string()]
    );
    assert_eq!(report.mirror.unwrap().deleted, 1);
    // Existing objects are overwritten unconditionally
    assert_eq!(
        store.object("index.html").unwrap().body,
        b"<!doctype html><title>site</title>".to_vec()
    );
}

#[tokio::test]
async fn scenario_c_stale_key_kept_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let store =
        MemoryBucket::with_objects("site", vec![("assets/old.js".to_string(), b"stale".to_vec())]);

    deploy_with(&store, &config(dir.path(), "", false), false)
        .await
        .unwrap();

    assert_eq!(store.object("assets/old.js").unwrap().body, b"stale".to_vec());
    assert_eq!(store.calls().listings, 0);
    assert!(store.calls().delete_batches.is_empty());
}

#[tokio::test]
async fn scenario_d_missing_bucket_setting() {
    let settings = Settings {
        endpoint: Some("http://localhost:9000".into()),
        access_key: Some("minioadmin".into()),
        secret_key: Some("minioadmin".into()),
        ..Default::default()
    };

    // Fails while resolving, before any bucket client exists
    let err = deploy_settings(settings, false).await.unwrap_err();

    assert!(err.to_string().contains("MINIO_BUCKET"));
    assert!(err.is_preflight());
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn plan_matches_dry_run_for_missing_bucket() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let config = config(dir.path(), "site", true);
    let store = MemoryBucket::new("site");

    let plan = plan_with(&store, &config).await.unwrap();
    let report = deploy_with(&store, &config, true).await.unwrap();

    assert_eq!(plan.uploads.len(), 2);
    assert!(plan.deletions.is_empty());
    assert_eq!(report.mirror.unwrap().deleted, 0);
    assert_eq!(store.calls().listings, 0);
    assert!(!store.exists());
}

#[tokio::test]
async fn scenario_e_missing_source_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBucket::new("site");

    let err = deploy_with(&store, &config(&dir.path().join("dist"), "", true), false)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::SourceNotFound(_)));
    assert!(err.to_string().contains("Run the build first"));
    assert_eq!(store.calls().total(), 0);
}

// ============================================================================
// MIRROR PROPERTIES
// ============================================================================

#[tokio::test]
async fn second_run_leaves_key_set_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let store =
        MemoryBucket::with_objects("site", vec![("assets/old.js".to_string(), b"stale".to_vec())]);
    let config = config(dir.path(), "", false);

    deploy_with(&store, &config, false).await.unwrap();
    let after_first = store.keys();
    let index_first = store.object("index.html").unwrap();

    deploy_with(&store, &config, false).await.unwrap();
    assert_eq!(store.keys(), after_first);
    assert_eq!(store.object("index.html").unwrap(), index_first);
    assert_eq!(store.calls().puts, 4);
}

#[tokio::test]
async fn prefix_scopes_uploads_and_deletions() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let store = MemoryBucket::with_objects(
        "site",
        vec![
            ("widgets/info/assets/old.js".to_string(), vec![1]),
            ("widgets/info-old/index.html".to_string(), vec![2]),
            ("root.txt".to_string(), vec![3]),
        ],
    );

    deploy_with(&store, &config(dir.path(), "/widgets/info/", true), false)
        .await
        .unwrap();

    assert_eq!(
        store.keys(),
        vec![
            "root.txt".to_string(),
            "widgets/info-old/index.html".to_string(),
            "widgets/info/assets/app.js".to_string(),
            "widgets/info/index.html".to_string(),
        ]
    );
}

#[tokio::test]
async fn paged_listing_is_diffed_as_one_sequence() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let stale = (0..25).map(|i| (format!("assets/stale-{:02}.js", i), vec![0u8]));
    let store = MemoryBucket::with_objects("site", stale).with_page_size(4);

    let plan = plan_with(&store, &config(dir.path(), "", true)).await.unwrap();
    assert_eq!(plan.deletions.len(), 25);
    assert_eq!(plan.uploads.len(), 2);

    deploy_with(&store, &config(dir.path(), "", true), false)
        .await
        .unwrap();
    assert_eq!(store.keys().len(), 2);
}

#[tokio::test]
async fn dry_run_against_missing_bucket_plans_uploads_only() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let store = MemoryBucket::new("site");

    let report = deploy_with(&store, &config(dir.path(), "", true), true)
        .await
        .unwrap();

    assert!(report.mirror.unwrap().dry_run);
    assert!(!store.exists());
    assert_eq!(store.calls().creates, 0);
    assert_eq!(store.calls().listings, 0);
}

#[tokio::test]
async fn upload_failure_is_reported_with_progress() {
    let dir = tempfile::tempdir().unwrap();
    build_site(dir.path());
    let store = MemoryBucket::with_objects("site", Vec::<(String, Vec<u8>)>::new());
    store.fail_on("index.html");

    let options = MirrorOptions {
        concurrency: 1,
        ..Default::default()
    };
    let err = Mirror::new(&store, options)
        .run(dir.path())
        .await
        .unwrap_err();

    match err {
        DeployError::Transfer {
            key,
            completed,
            total,
            ..
        } => {
            assert_eq!(key, "index.html");
            // Files upload in path order: assets/app.js went first
            assert_eq!(completed, 1);
            assert_eq!(total, 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(store.keys(), vec!["assets/app.js".to_string()]);
}
