//! Integration tests for the per-document version chain.

mod helpers;

use docvault_core::error::ErrorKind;
use docvault_core::events::LifecycleEvent;
use docvault_core::types::DocumentId;
use docvault_entity::node::Node;

use helpers::{TestApp, upload};

fn assert_chain_well_formed(versions: &[docvault_entity::document::DocumentVersion]) {
    assert_eq!(versions.iter().filter(|v| v.is_latest).count(), 1);
    let mut numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=versions.len() as i32).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_reupload_then_revert_scenario() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "report.pdf").await;
    let doc_id = created.document.id;
    assert_eq!(created.version.version_number, 1);
    assert_eq!(
        created.version.change_description.as_deref(),
        Some("Initial upload")
    );

    let second = app
        .services
        .lifecycle
        .re_upload(&app.ctx, doc_id, &upload("report-final.pdf", "blob://v2-longer"), Some("Fixes"))
        .await
        .expect("re-upload failed");
    assert_eq!(second.value.version.version_number, 2);
    assert_eq!(second.value.document.file_url, "blob://v2-longer");
    assert_eq!(second.value.document.current_version, 2);

    let v1 = app
        .services
        .versions()
        .get_by_number(doc_id, 1)
        .await
        .expect("v1 missing");
    assert!(!v1.is_latest);

    let third = app
        .services
        .lifecycle
        .revert_to_version(&app.ctx, doc_id, 1)
        .await
        .expect("revert failed");
    let v3 = &third.value.version;
    assert_eq!(v3.version_number, 3);
    assert!(v3.is_latest);
    assert_eq!(v3.file_url, v1.file_url);
    assert_eq!(v3.size_bytes, v1.size_bytes);
    assert_eq!(v3.mime_type, v1.mime_type);
    assert_eq!(v3.extension, v1.extension);
    assert_eq!(v3.change_description.as_deref(), Some("Restored from version 1"));
    assert_eq!(third.value.document.file_url, v1.file_url);
    assert_eq!(third.value.document.size_bytes, v1.size_bytes);
    assert_eq!(third.value.document.current_version_id, v3.id);

    match third.event {
        LifecycleEvent::VersionAppended {
            previous_version,
            new_version,
            restored_from,
            ..
        } => {
            assert_eq!(previous_version, 2);
            assert_eq!(new_version, 3);
            assert_eq!(restored_from, Some(1));
        }
        other => panic!("unexpected event {other:?}"),
    }

    let all = app.services.versions().get_all(doc_id).await.expect("list failed");
    let numbers: Vec<i32> = all.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![3, 2, 1]);
    assert_eq!(all[2], v1);
    assert_eq!(all[1].file_url, "blob://v2-longer");
    assert!(!all[1].is_latest);
    assert_chain_well_formed(&all);
    app.assert_consistent(dept.id).await;
}

#[tokio::test]
async fn test_extension_mismatch_rejected_without_change() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "report.pdf").await;

    let err = app
        .services
        .lifecycle
        .re_upload(&app.ctx, created.document.id, &upload("report.docx", "blob://v2"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let versions = app
        .services
        .versions()
        .get_all(created.document.id)
        .await
        .expect("list failed");
    assert_eq!(versions.len(), 1);
    let Node::Document(document) = app
        .services
        .lifecycle
        .get_node(created.document.id.into())
        .await
        .expect("document missing")
    else {
        panic!("expected a document");
    };
    assert_eq!(document, created.document);
}

#[tokio::test]
async fn test_rename_projects_onto_latest_version_only() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "report.pdf").await;
    let doc_id = created.document.id;
    app.services
        .lifecycle
        .re_upload(&app.ctx, doc_id, &upload("report.pdf", "blob://v2"), None)
        .await
        .expect("re-upload failed");

    app.services
        .lifecycle
        .rename(&app.ctx, doc_id.into(), "summary")
        .await
        .expect("rename failed");

    let v1 = app.services.versions().get_by_number(doc_id, 1).await.expect("v1");
    let v2 = app.services.versions().get_by_number(doc_id, 2).await.expect("v2");
    assert_eq!(v1.name, "report");
    assert_eq!(v1.original_name, "report.pdf");
    assert_eq!(v1.path_at_creation, "/Eng/report.pdf");
    assert_eq!(v2.name, "summary");
    assert_eq!(v2.original_name, "summary.pdf");
    assert_eq!(v2.path_at_creation, "/Eng/summary.pdf");
    assert!(v2.is_latest);
}

#[tokio::test]
async fn test_revert_keeps_current_name() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "draft.txt").await;
    let doc_id = created.document.id;
    app.services
        .lifecycle
        .rename(&app.ctx, doc_id.into(), "final")
        .await
        .expect("rename failed");
    app.services
        .lifecycle
        .re_upload(&app.ctx, doc_id, &upload("final.txt", "blob://v2"), None)
        .await
        .expect("re-upload failed");

    let reverted = app
        .services
        .lifecycle
        .revert_to_version(&app.ctx, doc_id, 1)
        .await
        .expect("revert failed")
        .value;
    assert_eq!(reverted.document.name, "final");
    assert_eq!(reverted.document.path, "/Eng/final.txt");
    assert_eq!(reverted.version.name, "final");
    assert_eq!(reverted.version.file_url, "blob://v1");
}

#[tokio::test]
async fn test_get_latest_is_stable_without_writes() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "a.pdf").await;

    let first = app.services.versions().get_latest(created.document.id).await.expect("latest");
    let second = app.services.versions().get_latest(created.document.id).await.expect("latest");
    assert_eq!(first, second);
    assert_eq!(first, created.version);
}

#[tokio::test]
async fn test_missing_versions_and_documents() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "a.pdf").await;

    let err = app
        .services
        .lifecycle
        .revert_to_version(&app.ctx, created.document.id, 7)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app.services.versions().get_all(DocumentId::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .services
        .lifecycle
        .re_upload(&app.ctx, DocumentId::new(), &upload("a.pdf", "blob://x"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_deleted_document_rejects_new_versions() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "a.pdf").await;
    app.services
        .lifecycle
        .soft_delete(&app.ctx, created.document.id.into())
        .await
        .expect("delete failed");

    let err = app
        .services
        .lifecycle
        .re_upload(&app.ctx, created.document.id, &upload("a.pdf", "blob://v2"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);
}

#[tokio::test]
async fn test_invalid_upload_metadata_rejected() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "a.pdf").await;

    let mut bad = upload("a.pdf", "");
    bad.size_bytes = 1;
    let err = app
        .services
        .lifecycle
        .re_upload(&app.ctx, created.document.id, &bad, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reuploads_keep_single_latest() {
    let app = TestApp::with_config(
        r#"
        [versioning]
        conflict_retries = 16
        "#,
    )
    .await;
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "shared.pdf").await;
    let doc_id = created.document.id;

    let mut handles = Vec::new();
    for i in 0..6 {
        let services = app.services.clone();
        let ctx = app.ctx.clone();
        handles.push(tokio::spawn(async move {
            services
                .lifecycle
                .re_upload(&ctx, doc_id, &upload("shared.pdf", &format!("blob://c{i}")), None)
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked").expect("re-upload failed");
    }

    let versions = app.services.versions().get_all(doc_id).await.expect("list failed");
    assert_eq!(versions.len(), 7);
    assert_chain_well_formed(&versions);
    assert_eq!(versions[0].version_number, 7);
    app.assert_consistent(dept.id).await;
}
