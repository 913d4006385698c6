//! PostgreSQL-only tests: row locking in subtree cascades, the version
//! chain's database guards, and row decoding. Skipped without `DATABASE_URL`.

mod helpers;

use std::time::Duration;

use uuid::Uuid;

use docvault_core::error::ErrorKind;
use docvault_core::types::{DocumentVersionId, ParentRef};
use docvault_database::repositories::VersionRepository;
use docvault_entity::node::Node;

use helpers::TestApp;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rename_cascade_sees_child_moved_out_concurrently() {
    let Some(app) = TestApp::postgres("").await else {
        return;
    };
    let pool = app.pool();
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    let b = app.folder(a.id, "B").await;
    let x = app.folder(dept.id, "X").await;

    // Another writer holds B while it moves B under X.
    let mut mover = pool.begin().await.expect("begin failed");
    sqlx::query("SELECT id FROM folders WHERE id = $1 FOR UPDATE")
        .bind(b.id.into_uuid())
        .execute(&mut *mover)
        .await
        .expect("lock failed");
    sqlx::query("UPDATE folders SET parent_id = $2, path = $3 WHERE id = $1")
        .bind(b.id.into_uuid())
        .bind(x.id.into_uuid())
        .bind("/Eng/X/B")
        .execute(&mut *mover)
        .await
        .expect("move failed");

    let services = app.services.clone();
    let ctx = app.ctx.clone();
    let folder_id = a.id;
    let rename = tokio::spawn(async move {
        services.lifecycle.rename(&ctx, folder_id.into(), "A2").await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    mover.commit().await.expect("commit failed");
    rename
        .await
        .expect("task panicked")
        .expect("rename failed");

    assert_eq!(app.paths(dept.id).await, vec!["/Eng/A2", "/Eng/X", "/Eng/X/B"]);
    app.assert_consistent(dept.id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rename_cascade_sees_child_created_concurrently() {
    let Some(app) = TestApp::postgres("").await else {
        return;
    };
    let pool = app.pool();
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    let b = app.folder(a.id, "B").await;

    // Another writer has share-locked B and is inserting a child under it.
    let mut creator = pool.begin().await.expect("begin failed");
    sqlx::query("SELECT id FROM folders WHERE id = $1 FOR SHARE")
        .bind(b.id.into_uuid())
        .execute(&mut *creator)
        .await
        .expect("lock failed");
    sqlx::query(
        "INSERT INTO folders (id, department_id, parent_kind, parent_id, name, path, created_by) \
         VALUES ($1, $2, 'folder', $3, 'N', '/Eng/A/B/N', $4)",
    )
    .bind(Uuid::new_v4())
    .bind(dept.id.into_uuid())
    .bind(b.id.into_uuid())
    .bind(Uuid::new_v4())
    .execute(&mut *creator)
    .await
    .expect("insert failed");

    let services = app.services.clone();
    let ctx = app.ctx.clone();
    let folder_id = a.id;
    let rename = tokio::spawn(async move {
        services.lifecycle.rename(&ctx, folder_id.into(), "A2").await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    creator.commit().await.expect("commit failed");
    let outcome = rename
        .await
        .expect("task panicked")
        .expect("rename failed");

    assert_eq!(
        app.paths(dept.id).await,
        vec!["/Eng/A2", "/Eng/A2/B", "/Eng/A2/B/N"]
    );
    assert_eq!(outcome.value.path(), "/Eng/A2");
    app.assert_consistent(dept.id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_cascades_keep_paths_consistent() {
    let Some(app) = TestApp::postgres(
        r#"
        [versioning]
        conflict_retries = 8
        "#,
    )
    .await
    else {
        return;
    };
    let dept = app.department("Eng").await;

    for round in 0..8 {
        let a = app.folder(dept.id, &format!("A{round}")).await;
        let b = app.folder(a.id, "B").await;
        app.document(b.id, "f.pdf").await;
        let x = app.folder(dept.id, &format!("X{round}")).await;

        let lifecycle = &app.services.lifecycle;
        let new_name = format!("R{round}");
        let (renamed, moved) = tokio::join!(
            lifecycle.rename(&app.ctx, a.id.into(), &new_name),
            lifecycle.move_to(&app.ctx, b.id.into(), x.id.into()),
        );
        renamed.expect("rename failed");
        moved.expect("move failed");

        let b = app.reload_folder(b.id).await;
        assert_eq!(b.path, format!("/Eng/X{round}/B"));
    }
    app.assert_consistent(dept.id).await;
}

#[tokio::test]
async fn test_second_latest_version_is_a_retryable_conflict() {
    let Some(app) = TestApp::postgres("").await else {
        return;
    };
    let pool = app.pool();
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "a.pdf").await;

    let repo = VersionRepository::new(pool.clone());
    let mut duplicate = created.version.clone();
    duplicate.id = DocumentVersionId::new();
    duplicate.version_number = 2;

    let mut conn = pool.acquire().await.expect("acquire failed");
    let err = repo.insert(&mut conn, &duplicate).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvariantViolation);
    assert!(err.is_retryable());

    let versions = app
        .services
        .versions()
        .get_all(created.document.id)
        .await
        .expect("list failed");
    assert_eq!(versions, vec![created.version]);
}

#[tokio::test]
async fn test_demote_only_clears_the_expected_latest() {
    let Some(app) = TestApp::postgres("").await else {
        return;
    };
    let pool = app.pool();
    let dept = app.department("Eng").await;
    let created = app.document(dept.id, "a.pdf").await;
    let doc_id = created.document.id;
    let repo = VersionRepository::new(pool.clone());

    let mut tx = pool.begin().await.expect("begin failed");
    assert!(!repo.demote(&mut tx, doc_id, DocumentVersionId::new()).await.expect("demote"));
    assert!(repo.demote(&mut tx, doc_id, created.version.id).await.expect("demote"));
    assert!(!repo.demote(&mut tx, doc_id, created.version.id).await.expect("demote"));
    tx.rollback().await.expect("rollback failed");

    let latest = app
        .services
        .versions()
        .get_latest(doc_id)
        .await
        .expect("latest missing");
    assert_eq!(latest.id, created.version.id);
}

#[tokio::test]
async fn test_rows_decode_parent_references() {
    let Some(app) = TestApp::postgres("").await else {
        return;
    };
    let dept = app.department("Eng").await;
    let a = app.folder(dept.id, "A").await;
    let b = app.folder(a.id, "B").await;
    let doc = app.document(b.id, "f.pdf").await;

    assert_eq!(app.reload_folder(a.id).await.parent, ParentRef::Department(dept.id));
    assert_eq!(app.reload_folder(b.id).await.parent, ParentRef::Folder(a.id));
    let Node::Document(document) = app
        .services
        .lifecycle
        .get_node(doc.document.id.into())
        .await
        .expect("document missing")
    else {
        panic!("expected a document");
    };
    assert_eq!(document.parent, ParentRef::Folder(b.id));
    assert_eq!(document.department_id, dept.id);
}
