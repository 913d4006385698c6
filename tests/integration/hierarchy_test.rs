//! Integration tests for path computation and subtree cascades.

mod helpers;

use docvault_core::error::ErrorKind;
use docvault_core::events::LifecycleEvent;
use docvault_core::types::{FolderId, NodeRef, PageRequest, ParentRef};
use docvault_entity::node::Node;

use helpers::TestApp;

#[tokio::test]
async fn test_paths_computed_from_parent() {
    let app = TestApp::new().await;
    let eng = app.department("Engineering").await;
    let projects = app.folder(eng.id, "Projects").await;
    let q4 = app.folder(projects.id, "Q4").await;
    let doc = app.document(q4.id, "plan.xlsx").await;

    assert_eq!(projects.path, "/Engineering/Projects");
    assert_eq!(q4.path, "/Engineering/Projects/Q4");
    assert_eq!(doc.document.path, "/Engineering/Projects/Q4/plan.xlsx");
    assert_eq!(doc.document.name, "plan");
    assert_eq!(doc.document.extension, "xlsx");
    app.assert_consistent(eng.id).await;
}

#[tokio::test]
async fn test_rename_cascades_to_whole_subtree_only() {
    let app = TestApp::new().await;
    let a = app.department("A").await;
    let b = app.folder(a.id, "B").await;
    let c = app.folder(b.id, "C").await;
    app.document(c.id, "f.pdf").await;
    let sibling = app.folder(a.id, "BB").await;
    app.document(sibling.id, "g.pdf").await;

    let outcome = app
        .services
        .lifecycle
        .rename(&app.ctx, b.id.into(), "B2")
        .await
        .expect("rename failed");

    assert_eq!(
        app.paths(a.id).await,
        vec!["/A/B2", "/A/B2/C", "/A/B2/C/f.pdf", "/A/BB", "/A/BB/g.pdf"]
    );
    match outcome.event {
        LifecycleEvent::Renamed {
            old_path,
            new_path,
            descendants_updated,
            ..
        } => {
            assert_eq!(old_path, "/A/B");
            assert_eq!(new_path, "/A/B2");
            assert_eq!(descendants_updated, 2);
        }
        other => panic!("unexpected event {other:?}"),
    }
    app.assert_consistent(a.id).await;
}

#[tokio::test]
async fn test_move_folder_across_departments() {
    let app = TestApp::new().await;
    let eng = app.department("Eng").await;
    let sales = app.department("Sales").await;
    let projects = app.folder(eng.id, "Projects").await;
    let q4 = app.folder(projects.id, "Q4").await;
    let plan = app.document(projects.id, "plan.xlsx").await;

    let outcome = app
        .services
        .lifecycle
        .move_to(&app.ctx, projects.id.into(), ParentRef::Department(sales.id))
        .await
        .expect("move failed");

    let q4 = app.reload_folder(q4.id).await;
    assert_eq!(q4.path, "/Sales/Projects/Q4");
    assert_eq!(q4.department_id, sales.id);
    let Node::Document(plan) = app
        .services
        .lifecycle
        .get_node(plan.document.id.into())
        .await
        .expect("document missing")
    else {
        panic!("expected a document");
    };
    assert_eq!(plan.path, "/Sales/Projects/plan.xlsx");
    assert_eq!(plan.department_id, sales.id);

    assert!(app.paths(eng.id).await.is_empty());
    match outcome.event {
        LifecycleEvent::Moved {
            old_parent,
            new_parent,
            old_path,
            new_path,
            ..
        } => {
            assert_eq!(old_parent, ParentRef::Department(eng.id));
            assert_eq!(new_parent, ParentRef::Department(sales.id));
            assert_eq!(old_path, "/Eng/Projects");
            assert_eq!(new_path, "/Sales/Projects");
        }
        other => panic!("unexpected event {other:?}"),
    }
    app.assert_consistent(sales.id).await;
}

#[tokio::test]
async fn test_move_document_keeps_versions_untouched() {
    let app = TestApp::new().await;
    let dept = app.department("Ops").await;
    let src = app.folder(dept.id, "Inbox").await;
    let dst = app.folder(dept.id, "Filed").await;
    let doc = app.document(src.id, "memo.txt").await;

    app.services
        .lifecycle
        .move_to(&app.ctx, doc.document.id.into(), dst.id.into())
        .await
        .expect("move failed");

    let latest = app
        .services
        .versions()
        .get_latest(doc.document.id)
        .await
        .expect("latest missing");
    assert_eq!(latest.path_at_creation, "/Ops/Inbox/memo.txt");
    assert_eq!(app.paths(dept.id).await[1], "/Ops/Filed/memo.txt");
}

#[tokio::test]
async fn test_move_into_own_subtree_rejected() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    let b = app.folder(a.id, "B").await;
    let c = app.folder(b.id, "C").await;
    let before = app.paths(dept.id).await;

    for target in [a.id, c.id] {
        let err = app
            .services
            .lifecycle
            .move_to(&app.ctx, a.id.into(), target.into())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
    }
    assert_eq!(app.paths(dept.id).await, before);
}

#[tokio::test]
async fn test_move_into_deleted_or_missing_parent() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let trash = app.folder(dept.id, "Old").await;
    let doc = app.document(dept.id, "notes.md").await;
    app.services
        .lifecycle
        .soft_delete(&app.ctx, trash.id.into())
        .await
        .expect("delete failed");

    let err = app
        .services
        .lifecycle
        .move_to(&app.ctx, doc.document.id.into(), trash.id.into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let err = app
        .services
        .lifecycle
        .move_to(
            &app.ctx,
            doc.document.id.into(),
            ParentRef::Folder(FolderId::new()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_depth_limit_applies_to_create_and_move() {
    let app = TestApp::with_config(
        r#"
        [hierarchy]
        max_depth = 2
        "#,
    )
    .await;
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    let b = app.folder(a.id, "B").await;

    let err = app
        .services
        .lifecycle
        .create_folder(&app.ctx, b.id.into(), "C")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let x = app.folder(dept.id, "X").await;
    let err = app
        .services
        .lifecycle
        .move_to(&app.ctx, a.id.into(), x.id.into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    app.document(b.id, "deep.pdf").await;
}

#[tokio::test]
async fn test_invalid_names_rejected() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let folder = app.folder(dept.id, "Docs").await;

    for name in ["", "   ", "a/b", "..", "."] {
        let err = app
            .services
            .lifecycle
            .create_folder(&app.ctx, dept.id.into(), name)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "name {name:?}");
    }

    let err = app
        .services
        .lifecycle
        .rename(&app.ctx, folder.id.into(), &"x".repeat(256))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let trimmed = app.folder(dept.id, "  Spaced  ").await;
    assert_eq!(trimmed.path, "/Eng/Spaced");
}

#[tokio::test]
async fn test_upload_extension_with_separator_rejected() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;

    let err = app
        .services
        .lifecycle
        .create_document(&app.ctx, dept.id.into(), &helpers::upload("report.p/df", "blob://v1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(!err.is_retryable());

    let mut explicit = helpers::upload("report", "blob://v1");
    explicit.extension = Some("tar gz".to_string());
    let err = app
        .services
        .lifecycle
        .create_document(&app.ctx, dept.id.into(), &explicit)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(app.paths(dept.id).await.is_empty());
}

#[tokio::test]
async fn test_inactive_department_rejects_new_children() {
    let app = TestApp::new().await;
    let eng = app.department("Eng").await;
    let other = app.department("Other").await;
    let folder = app.folder(eng.id, "Docs").await;
    let stray = app.folder(other.id, "Stray").await;

    app.services
        .departments
        .deactivate(&app.ctx, eng.id)
        .await
        .expect("deactivate failed");

    let err = app
        .services
        .lifecycle
        .create_folder(&app.ctx, eng.id.into(), "New")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let err = app
        .services
        .lifecycle
        .move_to(&app.ctx, stray.id.into(), eng.id.into())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let renamed = app
        .services
        .lifecycle
        .rename(&app.ctx, folder.id.into(), "Documents")
        .await
        .expect("rename inside an inactive department should work");
    assert_eq!(renamed.value.path(), "/Eng/Documents");
}

#[tokio::test]
async fn test_rename_document_strips_typed_extension() {
    let app = TestApp::new().await;
    let dept = app.department("Finance").await;
    let doc = app.document(dept.id, "budget.pdf").await;

    let outcome = app
        .services
        .lifecycle
        .rename(&app.ctx, doc.document.id.into(), "budget-2025.PDF")
        .await
        .expect("rename failed");

    let Node::Document(renamed) = outcome.value else {
        panic!("expected a document");
    };
    assert_eq!(renamed.name, "budget-2025");
    assert_eq!(renamed.original_name, "budget-2025.pdf");
    assert_eq!(renamed.path, "/Finance/budget-2025.pdf");
    assert_eq!(renamed.extension, "pdf");
}

#[tokio::test]
async fn test_list_children_folders_first_and_paged() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    app.document(dept.id, "a-doc.txt").await;
    app.folder(dept.id, "Zeta").await;
    app.folder(dept.id, "Alpha").await;
    let gone = app.folder(dept.id, "Gone").await;
    app.services
        .lifecycle
        .soft_delete(&app.ctx, gone.id.into())
        .await
        .expect("delete failed");

    let page = app
        .services
        .lifecycle
        .list_children(dept.id.into(), &PageRequest::new(1, 2))
        .await
        .expect("list failed");
    let names: Vec<&str> = page.items.iter().map(|n| n.name()).collect();
    assert_eq!(names, vec!["Alpha", "Zeta"]);
    assert_eq!(page.total_items, 3);
    assert!(page.has_next);

    let page = app
        .services
        .lifecycle
        .list_children(dept.id.into(), &PageRequest::new(2, 2))
        .await
        .expect("list failed");
    assert_eq!(page.items.len(), 1);
    assert!(matches!(page.items[0].node_ref(), NodeRef::Document(_)));
}

#[tokio::test]
async fn test_tree_view_matches_hierarchy() {
    let app = TestApp::new().await;
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    app.folder(a.id, "B").await;
    app.document(a.id, "x.pdf").await;
    app.document(dept.id, "top.pdf").await;

    let tree = app.services.tree.build_tree(dept.id).await.expect("tree failed");
    assert_eq!(tree.total_folders, 2);
    assert_eq!(tree.total_documents, 2);
    assert_eq!(tree.root_document_count, 1);
    assert_eq!(tree.roots[0].document_count, 1);
    assert_eq!(tree.roots[0].children[0].path, "/Eng/A/B");
}
