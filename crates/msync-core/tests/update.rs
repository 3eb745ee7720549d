use std::sync::{Arc, Mutex};

use httptest::{matchers::*, responders::*, Expectation, Server};
use msync_core::{CommitReconciler, DirectoryOutcome};
use msync_domain::{FileChange, FileStatus, SourceResultType};
use serde_json::{json, Value};

mod common;

use common::{
    catalog_for, http_client, package_path, FakeSourceTree, CATALOG_PATH, DEFAULT_LOCALE_FILE,
    FUNCTION_KEY, INSTALLER_FILE, SINGLETON, VERSION_FILE,
};

const TOOL_DIR: &str = "manifests/c/Contoso/Tool/1.2.0";
const APP_DIR: &str = "manifests/f/Fabrikam/App/3.1.0";

fn added(path: &str) -> FileChange {
    FileChange::new(path, FileStatus::Added, format!("https://raw.example/{path}"))
}

fn removed(path: &str, raw_url: String) -> FileChange {
    FileChange::new(path, FileStatus::Removed, raw_url)
}

fn expect_new_package(server: &Server, id: &str) {
    server.expect(
        Expectation::matching(request::method_path("GET", package_path(id)))
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", CATALOG_PATH),
            request::headers(contains(("x-functions-key", FUNCTION_KEY))),
        ])
        .respond_with(status_code(200)),
    );
}

#[tokio::test]
async fn added_singleton_is_posted_to_catalog() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", package_path("Contoso.Tool")),
            request::headers(contains(("x-functions-key", FUNCTION_KEY))),
        ])
        .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", CATALOG_PATH),
            request::body(json_decoded(|body: &Value| {
                body["PackageIdentifier"] == "Contoso.Tool"
                    && body["Versions"][0]["PackageVersion"] == "1.2.0"
            })),
        ])
        .respond_with(status_code(200)),
    );

    let path = format!("{TOOL_DIR}/Contoso.Tool.yaml");
    let source = FakeSourceTree::new()
        .with_commit("c1", vec![added(&path)])
        .with_file(&path, SINGLETON);
    let http = http_client();
    let catalog = catalog_for(&server, &http);

    let batch = CommitReconciler::new(&source, &catalog, &http)
        .reconcile_commits(&["c1".to_string()])
        .await;
    assert_eq!(batch.overall_result(), SourceResultType::Success);
    assert_eq!(batch.commit_results().len(), 1);
    assert_eq!(batch.commit_results()[0].result(), SourceResultType::Success);
}

#[tokio::test]
async fn multi_file_directory_is_merged_before_upsert() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", package_path("Fabrikam.App")))
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", CATALOG_PATH),
            request::body(json_decoded(|body: &Value| {
                let version = &body["Versions"][0];
                version["PackageVersion"] == "3.1.0"
                    && version["DefaultLocale"]["Publisher"] == "Fabrikam"
                    && version["Installers"][0]["InstallerType"] == "exe"
            })),
        ])
        .respond_with(status_code(200)),
    );

    let version = format!("{APP_DIR}/Fabrikam.App.yaml");
    let installer = format!("{APP_DIR}/Fabrikam.App.installer.yaml");
    let locale = format!("{APP_DIR}/Fabrikam.App.locale.en-US.yaml");
    let source = FakeSourceTree::new()
        .with_commit("c1", vec![added(&installer)])
        .with_file(&version, VERSION_FILE)
        .with_file(&installer, INSTALLER_FILE)
        .with_file(&locale, DEFAULT_LOCALE_FILE);
    let http = http_client();
    let catalog = catalog_for(&server, &http);

    let outcome = CommitReconciler::new(&source, &catalog, &http)
        .reconcile_directory("c1", APP_DIR, &[])
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DirectoryOutcome::Upserted {
            package_id: "Fabrikam.App".into(),
            version: "3.1.0".into(),
        }
    );
}

#[tokio::test]
async fn removed_directory_deletes_package() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/raw/Contoso.Tool.yaml"))
            .respond_with(status_code(200).body(SINGLETON)),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("DELETE", package_path("Contoso.Tool")),
            request::headers(contains(("x-functions-key", FUNCTION_KEY))),
        ])
        .respond_with(status_code(200)),
    );

    let path = format!("{TOOL_DIR}/Contoso.Tool.yaml");
    let source = FakeSourceTree::new().with_commit(
        "c1",
        vec![removed(&path, server.url_str("/raw/Contoso.Tool.yaml"))],
    );
    let http = http_client();
    let catalog = catalog_for(&server, &http);

    let batch = CommitReconciler::new(&source, &catalog, &http)
        .reconcile_commits(&["c1".to_string()])
        .await;
    assert_eq!(batch.commit_results()[0].result(), SourceResultType::Success);
}

#[tokio::test]
async fn deletion_stops_after_first_success() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/raw/gone.yaml"))
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/raw/Contoso.Tool.yaml"))
            .respond_with(status_code(200).body(SINGLETON)),
    );
    server.expect(
        Expectation::matching(request::method_path("DELETE", package_path("Contoso.Tool")))
            .times(1)
            .respond_with(status_code(404)),
    );

    let source = FakeSourceTree::new();
    let http = http_client();
    let catalog = catalog_for(&server, &http);
    let deleted = vec![
        server.url_str("/raw/gone.yaml"),
        server.url_str("/raw/Contoso.Tool.yaml"),
        server.url_str("/raw/never-fetched.yaml"),
    ];

    let outcome = CommitReconciler::new(&source, &catalog, &http)
        .reconcile_directory("c1", TOOL_DIR, &deleted)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DirectoryOutcome::Deleted {
            package_id: "Contoso.Tool".into()
        }
    );
}

#[tokio::test]
async fn failing_commit_does_not_stop_the_batch() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", package_path("Contoso.Tool")))
            .times(2)
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(request::method_path("POST", CATALOG_PATH))
            .times(2)
            .respond_with(status_code(200)),
    );

    let path = format!("{TOOL_DIR}/Contoso.Tool.yaml");
    let source = FakeSourceTree::new()
        .with_commit("c1", vec![added(&path)])
        .with_commit("c3", vec![added(&path)])
        .with_file(&path, SINGLETON);
    let http = http_client();
    let catalog = catalog_for(&server, &http);

    let commits = vec!["c1".to_string(), "c2".to_string(), "c3".to_string()];
    let batch = CommitReconciler::new(&source, &catalog, &http)
        .reconcile_commits(&commits)
        .await;

    assert_eq!(batch.overall_result(), SourceResultType::Success);
    let results: Vec<_> = batch
        .commit_results()
        .iter()
        .map(|result| (result.commit_id(), result.result()))
        .collect();
    assert_eq!(
        results,
        vec![
            ("c1", SourceResultType::Success),
            ("c2", SourceResultType::Failure),
            ("c3", SourceResultType::Success),
        ]
    );
    assert!(batch.commit_results()[1].metadata().contains("c2"));
}

#[tokio::test]
async fn merge_failure_skips_directory_but_keeps_others() {
    let server = Server::run();
    expect_new_package(&server, "Contoso.Tool");

    let tool = format!("{TOOL_DIR}/Contoso.Tool.yaml");
    // Version file without its installer cannot be merged.
    let version = format!("{APP_DIR}/Fabrikam.App.yaml");
    let locale = format!("{APP_DIR}/Fabrikam.App.locale.en-US.yaml");
    let source = FakeSourceTree::new()
        .with_commit("c1", vec![added(&tool), added(&version)])
        .with_file(&tool, SINGLETON)
        .with_file(&version, VERSION_FILE)
        .with_file(&locale, DEFAULT_LOCALE_FILE);
    let http = http_client();
    let catalog = catalog_for(&server, &http);

    let reconciler = CommitReconciler::new(&source, &catalog, &http);
    let skipped = reconciler
        .reconcile_directory("c1", APP_DIR, &[])
        .await
        .unwrap();
    assert_eq!(skipped, DirectoryOutcome::Skipped);

    let result = reconciler.reconcile_commit("c1").await.unwrap();
    assert_eq!(result.result(), SourceResultType::Success);
}

#[tokio::test]
async fn commit_without_manifests_is_a_failure() {
    let server = Server::run();
    let source = FakeSourceTree::new().with_commit(
        "c1",
        vec![FileChange::new(
            "README.md",
            FileStatus::Modified,
            "https://raw.example/README.md",
        )],
    );
    let http = http_client();
    let catalog = catalog_for(&server, &http);

    let result = CommitReconciler::new(&source, &catalog, &http)
        .reconcile_commit("c1")
        .await
        .unwrap();
    assert_eq!(result.result(), SourceResultType::Failure);
}

#[tokio::test]
async fn catalog_errors_fail_the_commit_without_aborting() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", package_path("Contoso.Tool")))
            .respond_with(status_code(503)),
    );

    let path = format!("{TOOL_DIR}/Contoso.Tool.yaml");
    let source = FakeSourceTree::new()
        .with_commit("c1", vec![added(&path)])
        .with_file(&path, SINGLETON);
    let http = http_client();
    let catalog = catalog_for(&server, &http);

    let batch = CommitReconciler::new(&source, &catalog, &http)
        .reconcile_commits(&["c1".to_string()])
        .await;
    assert_eq!(batch.overall_result(), SourceResultType::Success);
    assert_eq!(batch.commit_results()[0].result(), SourceResultType::Failure);
}

#[tokio::test]
async fn written_record_reads_back_with_merged_identity() {
    let mut server = Server::run();
    // A plain YAML scalar 3.10 would read back as the number 3.1.
    let unquoted =
        |content: &str| content.replace("PackageVersion: '3.1.0'", "PackageVersion: 3.10");
    let version = format!("{APP_DIR}/Fabrikam.App.yaml");
    let installer = format!("{APP_DIR}/Fabrikam.App.installer.yaml");
    let locale = format!("{APP_DIR}/Fabrikam.App.locale.en-US.yaml");
    let source = FakeSourceTree::new()
        .with_file(&version, &unquoted(VERSION_FILE))
        .with_file(&installer, &unquoted(INSTALLER_FILE))
        .with_file(&locale, &unquoted(DEFAULT_LOCALE_FILE));
    let http = http_client();
    let catalog = catalog_for(&server, &http);
    let reconciler = CommitReconciler::new(&source, &catalog, &http);

    let written = Arc::new(Mutex::new(None::<Value>));
    let sink = Arc::clone(&written);
    server.expect(
        Expectation::matching(request::method_path("GET", package_path("Fabrikam.App")))
            .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", CATALOG_PATH),
            request::body(json_decoded(move |body: &Value| {
                *sink.lock().unwrap() = Some(body.clone());
                true
            })),
        ])
        .respond_with(status_code(200)),
    );
    let first = reconciler
        .reconcile_directory("c1", APP_DIR, &[])
        .await
        .unwrap();
    assert_eq!(
        first,
        DirectoryOutcome::Upserted {
            package_id: "Fabrikam.App".into(),
            version: "3.10".into(),
        }
    );
    server.verify_and_clear();

    let stored = written.lock().unwrap().clone().expect("record was posted");
    assert_eq!(stored["PackageIdentifier"], "Fabrikam.App");
    assert_eq!(stored["Versions"][0]["PackageVersion"], "3.10");

    server.expect(
        Expectation::matching(request::method_path("GET", package_path("Fabrikam.App")))
            .respond_with(json_encoded(json!({ "Data": stored.clone() }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("PUT", package_path("Fabrikam.App")),
            request::body(json_decoded(move |body: &Value| *body == stored)),
        ])
        .respond_with(status_code(200)),
    );
    let second = reconciler
        .reconcile_directory("c2", APP_DIR, &[])
        .await
        .unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn listing_failure_fails_the_whole_commit() {
    let server = Server::run();
    let tool = format!("{TOOL_DIR}/Contoso.Tool.yaml");
    let version = format!("{APP_DIR}/Fabrikam.App.yaml");
    let source = FakeSourceTree::new()
        .with_commit("c1", vec![added(&version), added(&tool)])
        .with_file(&tool, SINGLETON)
        .with_file(&version, VERSION_FILE)
        .with_broken_listing(APP_DIR);
    let http = http_client();
    let catalog = catalog_for(&server, &http);

    let batch = CommitReconciler::new(&source, &catalog, &http)
        .reconcile_commits(&["c1".to_string()])
        .await;
    assert_eq!(batch.overall_result(), SourceResultType::Success);
    let result = &batch.commit_results()[0];
    assert_eq!(result.result(), SourceResultType::Failure);
    assert!(result.metadata().contains(APP_DIR), "{}", result.metadata());
    assert!(result.metadata().contains("502"), "{}", result.metadata());
}
