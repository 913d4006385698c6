//! Version chain: append, revert, rename projection, queries.

use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use validator::Validate;

use docvault_core::config::VersioningConfig;
use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_core::types::{DocumentId, DocumentVersionId};
use docvault_database::store::{DocumentRelocation, VersionAppend, VersionProjection};
use docvault_database::{HierarchyStore, SharedStore, VersionStore};
use docvault_entity::document::{Document, DocumentVersion, FileMetadata};

use crate::context::RequestContext;
use crate::retry::with_conflict_retry;

/// A document together with one of its versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionedDocument {
    /// The document after the operation.
    pub document: Document,
    /// The version the operation produced.
    pub version: DocumentVersion,
}

/// Outcome of an append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendedVersion {
    /// The document with its cached content fields synced.
    pub document: Document,
    /// The new latest version.
    pub version: DocumentVersion,
    /// The number of the version it replaced as latest.
    pub previous_version: i32,
}

/// Owns each document's ordered, immutable version log and its single
/// latest marker.
///
/// Rows are never edited after insertion, except for the `is_latest`
/// flip and the rename projection onto the latest row.
#[derive(Debug, Clone)]
pub struct VersionChain {
    store: SharedStore,
    config: VersioningConfig,
}

impl VersionChain {
    /// Creates a new version chain over `store`.
    pub fn new(store: SharedStore, config: VersioningConfig) -> Self {
        Self { store, config }
    }

    /// The configured versioning behaviour.
    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    async fn document(&self, document_id: DocumentId) -> AppResult<Document> {
        self.store
            .find_document(document_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {document_id} not found")))
    }

    /// The current latest version.
    pub async fn get_latest(&self, document_id: DocumentId) -> AppResult<DocumentVersion> {
        self.store
            .find_latest_version(document_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Document {document_id} has no latest version"))
            })
    }

    /// Every version, latest first, then by descending number.
    pub async fn get_all(&self, document_id: DocumentId) -> AppResult<Vec<DocumentVersion>> {
        self.document(document_id).await?;
        self.store.list_versions(document_id).await
    }

    /// A version by number.
    pub async fn get_by_number(
        &self,
        document_id: DocumentId,
        version_number: i32,
    ) -> AppResult<DocumentVersion> {
        self.store
            .find_version(document_id, version_number)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Version {version_number} of document {document_id} not found"
                ))
            })
    }

    /// Build version 1 of a document that is about to be created.
    pub fn first_version(
        &self,
        ctx: &RequestContext,
        document: &Document,
        upload: &FileMetadata,
    ) -> DocumentVersion {
        DocumentVersion {
            id: document.current_version_id,
            document_id: document.id,
            version_number: 1,
            name: document.name.clone(),
            original_name: upload.original_name.clone(),
            file_url: upload.file_url.clone(),
            size_bytes: upload.size_bytes,
            mime_type: upload.mime_type.clone(),
            extension: document.extension.clone(),
            is_latest: true,
            path_at_creation: document.path.clone(),
            change_description: Some(self.config.initial_description.clone()),
            created_by: ctx.user_id,
            created_at: Utc::now(),
        }
    }

    /// Append `upload` as the new latest version.
    ///
    /// The extension must match the document's; a mismatch leaves the
    /// chain untouched. A lost race against another append is retried up
    /// to `conflict_retries` times before it surfaces.
    pub async fn append(
        &self,
        ctx: &RequestContext,
        document_id: DocumentId,
        upload: &FileMetadata,
        change_description: Option<&str>,
    ) -> AppResult<AppendedVersion> {
        upload
            .validate()
            .map_err(|e| AppError::validation(format!("Invalid upload metadata: {e}")))?;

        with_conflict_retry("append_version", self.config.conflict_retries, || {
            self.append_once(ctx, document_id, upload, change_description)
        })
        .await
    }

    async fn append_once(
        &self,
        ctx: &RequestContext,
        document_id: DocumentId,
        upload: &FileMetadata,
        change_description: Option<&str>,
    ) -> AppResult<AppendedVersion> {
        let document = self.document(document_id).await?;
        if document.is_deleted {
            return Err(AppError::invalid_operation(format!(
                "Document {document_id} is deleted"
            )));
        }

        let extension = upload.normalized_extension();
        if extension != document.extension {
            return Err(AppError::invalid_operation(format!(
                "Cannot replace a .{} document with a .{extension} file",
                document.extension
            )));
        }

        let latest = self.store.find_latest_version(document_id).await?.ok_or_else(|| {
            AppError::internal(format!("Document {document_id} has no latest version"))
        })?;

        let version = DocumentVersion {
            id: DocumentVersionId::new(),
            document_id,
            version_number: latest.version_number + 1,
            name: document.name.clone(),
            original_name: upload.original_name.clone(),
            file_url: upload.file_url.clone(),
            size_bytes: upload.size_bytes,
            mime_type: upload.mime_type.clone(),
            extension: document.extension.clone(),
            is_latest: true,
            path_at_creation: document.path.clone(),
            change_description: change_description.map(str::to_string),
            created_by: ctx.user_id,
            created_at: Utc::now(),
        };

        let (document, version) = self
            .store
            .append_version(&VersionAppend {
                expected_latest: latest.id,
                version,
            })
            .await?;

        debug!(
            document_id = %document_id,
            demoted = latest.version_number,
            promoted = version.version_number,
            "Latest version moved forward"
        );

        Ok(AppendedVersion {
            document,
            version,
            previous_version: latest.version_number,
        })
    }

    /// Re-instate the content of version `version_number` as a new latest
    /// version. The display name stays the document's current one.
    pub async fn revert(
        &self,
        ctx: &RequestContext,
        document_id: DocumentId,
        version_number: i32,
    ) -> AppResult<AppendedVersion> {
        let document = self.document(document_id).await?;
        let source = self.get_by_number(document_id, version_number).await?;

        let content = FileMetadata {
            original_name: document.original_name.clone(),
            file_url: source.file_url,
            size_bytes: source.size_bytes,
            mime_type: source.mime_type,
            extension: Some(source.extension),
        };
        let description = self.config.restore_description(version_number);
        let appended = self
            .append(ctx, document_id, &content, Some(description.as_str()))
            .await?;

        debug!(
            document_id = %document_id,
            restored_from = version_number,
            version = appended.version.version_number,
            "Version content re-instated"
        );
        Ok(appended)
    }

    /// The rewrite of the latest version's display fields that goes with
    /// a document rename. Older versions keep the name they were created
    /// under.
    pub async fn rename_projection(
        &self,
        change: &DocumentRelocation,
    ) -> AppResult<VersionProjection> {
        let latest = self.get_latest(change.document_id).await?;
        Ok(VersionProjection {
            version_id: latest.id,
            name: change.name.clone(),
            original_name: change.original_name.clone(),
            path_at_creation: change.path.clone(),
        })
    }
}
