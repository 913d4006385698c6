//! Integration tests for soft delete, restore, purge, and lifecycle events.

mod helpers;

use docvault_core::error::ErrorKind;
use docvault_core::events::LifecycleEvent;
use docvault_core::types::{DocumentId, FolderId, NodeRef, PageRequest};

use helpers::TestApp;

#[tokio::test]
async fn test_soft_delete_cascades_to_descendants() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    let b = app.folder(a.id, "B").await;
    let doc = app.document(b.id, "f.pdf").await;
    let keep = app.folder(dept.id, "Keep").await;

    let outcome = app
        .services
        .lifecycle
        .soft_delete(&app.ctx, a.id.into())
        .await
        .expect("delete failed");
    assert!(outcome.value.is_deleted());
    assert!(matches!(outcome.event, LifecycleEvent::SoftDeleted { affected: 3, .. }));

    let shared = outcome.value.deleted_at();
    for node in [NodeRef::from(b.id), NodeRef::from(doc.document.id)] {
        let node = app.services.lifecycle.get_node(node).await.expect("node missing");
        assert!(node.is_deleted());
        assert_eq!(node.deleted_at(), shared);
    }
    assert!(!app.reload_folder(keep.id).await.is_deleted);

    let trash = app.services.lifecycle.list_trash(dept.id).await.expect("trash failed");
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].node, NodeRef::Folder(a.id));
    assert_eq!(trash[0].path, "/Eng/A");

    let children = app
        .services
        .lifecycle
        .list_children(dept.id.into(), &PageRequest::default())
        .await
        .expect("list failed");
    assert_eq!(children.total_items, 1);
    app.assert_consistent(dept.id).await;
}

#[tokio::test]
async fn test_operations_on_deleted_or_missing_nodes() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let folder = app.folder(dept.id, "A").await;
    app.services
        .lifecycle
        .soft_delete(&app.ctx, folder.id.into())
        .await
        .expect("delete failed");

    let err = app
        .services
        .lifecycle
        .soft_delete(&app.ctx, folder.id.into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let err = app
        .services
        .lifecycle
        .rename(&app.ctx, folder.id.into(), "B")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let err = app
        .services
        .lifecycle
        .create_folder(&app.ctx, folder.id.into(), "Child")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let err = app
        .services
        .lifecycle
        .rename(&app.ctx, FolderId::new().into(), "B")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .services
        .lifecycle
        .soft_delete(&app.ctx, DocumentId::new().into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .services
        .lifecycle
        .restore(&app.ctx, FolderId::from_uuid(dept.id.into_uuid()).into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_restore_requires_live_parent() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    let b = app.folder(a.id, "B").await;
    app.services
        .lifecycle
        .soft_delete(&app.ctx, a.id.into())
        .await
        .expect("delete failed");

    let err = app
        .services
        .lifecycle
        .restore(&app.ctx, b.id.into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let restored = app
        .services
        .lifecycle
        .restore(&app.ctx, a.id.into())
        .await
        .expect("restore failed");
    assert!(matches!(restored.event, LifecycleEvent::Restored { affected: 2, .. }));
    assert!(!app.reload_folder(b.id).await.is_deleted);

    let err = app
        .services
        .lifecycle
        .restore(&app.ctx, a.id.into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);
    app.assert_consistent(dept.id).await;
}

#[tokio::test]
async fn test_restore_brings_back_only_the_same_deletion() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let folder = app.folder(dept.id, "Reports").await;
    let early = app.document(folder.id, "old.pdf").await;
    let late = app.document(folder.id, "new.pdf").await;

    app.services
        .lifecycle
        .soft_delete(&app.ctx, early.document.id.into())
        .await
        .expect("delete failed");
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    app.services
        .lifecycle
        .soft_delete(&app.ctx, folder.id.into())
        .await
        .expect("delete failed");

    app.services
        .lifecycle
        .restore(&app.ctx, folder.id.into())
        .await
        .expect("restore failed");

    let late = app
        .services
        .lifecycle
        .get_node(late.document.id.into())
        .await
        .expect("node missing");
    assert!(!late.is_deleted());
    let early_node = app
        .services
        .lifecycle
        .get_node(early.document.id.into())
        .await
        .expect("node missing");
    assert!(early_node.is_deleted());

    let trash = app.services.lifecycle.list_trash(dept.id).await.expect("trash failed");
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].node, NodeRef::Document(early.document.id));

    app.services
        .lifecycle
        .restore(&app.ctx, early.document.id.into())
        .await
        .expect("restore failed");
    app.assert_consistent(dept.id).await;
}

#[tokio::test]
async fn test_purge_requires_trash_and_removes_subtree() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    let b = app.folder(a.id, "B").await;
    let doc = app.document(b.id, "f.pdf").await;

    let err = app
        .services
        .lifecycle
        .purge(&app.ctx, a.id.into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    app.services
        .lifecycle
        .soft_delete(&app.ctx, a.id.into())
        .await
        .expect("delete failed");
    let purged = app
        .services
        .lifecycle
        .purge(&app.ctx, a.id.into())
        .await
        .expect("purge failed");
    assert_eq!(purged.value, 3);

    assert!(app.paths(dept.id).await.is_empty());
    let err = app
        .services
        .versions()
        .get_all(doc.document.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(app.services.lifecycle.list_trash(dept.id).await.expect("trash").is_empty());
}

#[tokio::test]
async fn test_outcome_carries_actor_in_domain_event() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;

    let outcome = app
        .services
        .lifecycle
        .create_folder(&app.ctx, dept.id.into(), "Projects")
        .await
        .expect("create failed");
    let event = outcome.domain_event(&app.ctx);
    assert_eq!(event.actor_id, Some(app.ctx.user_id));
    match event.payload {
        LifecycleEvent::FolderCreated { folder_id, path, .. } => {
            assert_eq!(folder_id, outcome.value.id);
            assert_eq!(path, "/Eng/Projects");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_mixed_sequence_stays_consistent() {
    let app = TestApp::new().await;
    let eng = app.department("Eng").await;
    let sales = app.department("Sales").await;
    let projects = app.folder(eng.id, "Projects").await;
    let q4 = app.folder(projects.id, "Q4").await;
    let plan = app.document(q4.id, "plan.xlsx").await;
    let lifecycle = &app.services.lifecycle;

    lifecycle
        .rename(&app.ctx, projects.id.into(), "Initiatives")
        .await
        .expect("rename failed");
    lifecycle
        .re_upload(
            &app.ctx,
            plan.document.id,
            &helpers::upload("plan.xlsx", "blob://v2"),
            None,
        )
        .await
        .expect("re-upload failed");
    lifecycle
        .move_to(&app.ctx, q4.id.into(), sales.id.into())
        .await
        .expect("move failed");
    lifecycle
        .rename(&app.ctx, plan.document.id.into(), "roadmap")
        .await
        .expect("rename failed");
    lifecycle
        .soft_delete(&app.ctx, q4.id.into())
        .await
        .expect("delete failed");
    lifecycle
        .restore(&app.ctx, q4.id.into())
        .await
        .expect("restore failed");

    assert_eq!(app.paths(eng.id).await, vec!["/Eng/Initiatives"]);
    assert_eq!(app.paths(sales.id).await, vec!["/Sales/Q4", "/Sales/Q4/roadmap.xlsx"]);
    app.assert_consistent(eng.id).await;
    app.assert_consistent(sales.id).await;
}
