// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Document repository.

use async_trait::async_trait;
use bastion_auth_core::{Document, DocumentId, TeamId, UserId};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row::{parse_column, parse_optional, parse_timestamp};

#[async_trait]
pub trait DocumentStore: Send + Sync {
	async fn create_document(&self, document: &Document) -> Result<(), DbError>;
	async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, DbError>;
	async fn list_visible_documents(
		&self,
		viewer: &UserId,
		viewer_team: Option<&TeamId>,
		include_restricted: bool,
	) -> Result<Vec<Document>, DbError>;
	async fn update_document(&self, document: &Document) -> Result<(), DbError>;
	async fn delete_document(&self, id: &DocumentId) -> Result<bool, DbError>;
}

#[derive(Clone)]
pub struct DocumentRepository {
	pool: SqlitePool,
}

impl DocumentRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, document), fields(document_id = %document.id, sensitivity = %document.sensitivity))]
	pub async fn create_document(&self, document: &Document) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO documents (id, owner_id, team_id, title, body, sensitivity, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(document.id.to_string())
		.bind(document.owner_id.to_string())
		.bind(document.team_id.map(|t| t.to_string()))
		.bind(&document.title)
		.bind(&document.body)
		.bind(document.sensitivity.as_str())
		.bind(document.created_at.to_rfc3339())
		.bind(document.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(document_id = %document.id, "document created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(document_id = %id))]
	pub async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, owner_id, team_id, title, body, sensitivity, created_at, updated_at
			FROM documents
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_document(&r)).transpose()
	}

	/// Documents the viewer may see, most recently updated first: their own and
	/// those of their team. Restricted documents are included only for their
	/// owner unless `include_restricted`.
	#[tracing::instrument(skip(self), fields(viewer = %viewer))]
	pub async fn list_visible_documents(
		&self,
		viewer: &UserId,
		viewer_team: Option<&TeamId>,
		include_restricted: bool,
	) -> Result<Vec<Document>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, owner_id, team_id, title, body, sensitivity, created_at, updated_at
			FROM documents
			WHERE (owner_id = ? OR (team_id IS NOT NULL AND team_id = ?))
				AND (sensitivity != 'restricted' OR owner_id = ? OR ?)
			ORDER BY updated_at DESC
			"#,
		)
		.bind(viewer.to_string())
		.bind(viewer_team.map(|t| t.to_string()))
		.bind(viewer.to_string())
		.bind(include_restricted)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_document).collect()
	}

	/// # Errors
	/// Returns `DbError::NotFound` if the document does not exist.
	#[tracing::instrument(skip(self, document), fields(document_id = %document.id))]
	pub async fn update_document(&self, document: &Document) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE documents SET title = ?, body = ?, sensitivity = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&document.title)
		.bind(&document.body)
		.bind(document.sensitivity.as_str())
		.bind(document.updated_at.to_rfc3339())
		.bind(document.id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("document {}", document.id)));
		}

		tracing::debug!(document_id = %document.id, "document updated");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(document_id = %id))]
	pub async fn delete_document(&self, id: &DocumentId) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM documents WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(document_id = %id, "document deleted");
		}
		Ok(deleted)
	}
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, DbError> {
	let id: String = row.get("id");
	let owner_id: String = row.get("owner_id");
	let team_id: Option<String> = row.get("team_id");
	let sensitivity: String = row.get("sensitivity");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(Document {
		id: parse_column(&id, "document id")?,
		owner_id: parse_column(&owner_id, "owner_id")?,
		team_id: parse_optional(team_id, "team_id")?,
		title: row.get("title"),
		body: row.get("body"),
		sensitivity: parse_column(&sensitivity, "sensitivity")?,
		created_at: parse_timestamp(&created_at, "created_at")?,
		updated_at: parse_timestamp(&updated_at, "updated_at")?,
	})
}

#[async_trait]
impl DocumentStore for DocumentRepository {
	async fn create_document(&self, document: &Document) -> Result<(), DbError> {
		self.create_document(document).await
	}

	async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, DbError> {
		self.get_document(id).await
	}

	async fn list_visible_documents(
		&self,
		viewer: &UserId,
		viewer_team: Option<&TeamId>,
		include_restricted: bool,
	) -> Result<Vec<Document>, DbError> {
		self.list_visible_documents(viewer, viewer_team, include_restricted)
			.await
	}

	async fn update_document(&self, document: &Document) -> Result<(), DbError> {
		self.update_document(document).await
	}

	async fn delete_document(&self, id: &DocumentId) -> Result<bool, DbError> {
		self.delete_document(id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use bastion_auth_core::{DocumentDraft, DocumentPatch, Sensitivity};

	fn draft(title: &str, sensitivity: Sensitivity) -> DocumentDraft {
		DocumentDraft {
			title: title.to_string(),
			body: "Containment steps".to_string(),
			sensitivity: Some(sensitivity),
		}
	}

	#[tokio::test]
	async fn create_get_update_delete() {
		let repo = DocumentRepository::new(create_test_pool().await);
		let owner = UserId::generate();
		let document = draft("Playbook", Sensitivity::Internal).into_document(owner, None);

		repo.create_document(&document).await.unwrap();
		assert_eq!(repo.get_document(&document.id).await.unwrap().unwrap(), document);

		let patch = DocumentPatch {
			sensitivity: Some(Sensitivity::Confidential),
			..DocumentPatch::default()
		};
		let next = patch.apply(&document);
		repo.update_document(&next).await.unwrap();
		assert_eq!(
			repo.get_document(&document.id).await.unwrap().unwrap().sensitivity,
			Sensitivity::Confidential
		);

		assert!(repo.delete_document(&document.id).await.unwrap());
		assert!(repo.get_document(&document.id).await.unwrap().is_none());
		assert!(!repo.delete_document(&document.id).await.unwrap());
	}

	#[tokio::test]
	async fn update_missing_document_is_not_found() {
		let repo = DocumentRepository::new(create_test_pool().await);
		let ghost = draft("Ghost", Sensitivity::Public).into_document(UserId::generate(), None);
		assert!(matches!(
			repo.update_document(&ghost).await,
			Err(DbError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn restricted_documents_are_hidden_from_teammates() {
		let repo = DocumentRepository::new(create_test_pool().await);
		let team = TeamId::generate();
		let owner = UserId::generate();
		let teammate = UserId::generate();

		repo.create_document(&draft("Open", Sensitivity::Public).into_document(owner, Some(team)))
			.await
			.unwrap();
		repo.create_document(
			&draft("Secret", Sensitivity::Restricted).into_document(owner, Some(team)),
		)
		.await
		.unwrap();

		assert_eq!(
			repo.list_visible_documents(&owner, None, false).await.unwrap().len(),
			2
		);
		let titles: Vec<String> = repo
			.list_visible_documents(&teammate, Some(&team), false)
			.await
			.unwrap()
			.into_iter()
			.map(|d| d.title)
			.collect();
		assert_eq!(titles, ["Open"]);
		assert_eq!(
			repo.list_visible_documents(&teammate, Some(&team), true)
				.await
				.unwrap()
				.len(),
			2
		);
	}

	#[tokio::test]
	async fn other_teams_and_personal_documents_are_never_listed() {
		let repo = DocumentRepository::new(create_test_pool().await);
		let owner = UserId::generate();
		let outsider = UserId::generate();

		repo.create_document(
			&draft("Team secret", Sensitivity::Restricted)
				.into_document(owner, Some(TeamId::generate())),
		)
		.await
		.unwrap();
		repo.create_document(&draft("Notes", Sensitivity::Public).into_document(owner, None))
			.await
			.unwrap();

		assert!(repo
			.list_visible_documents(&outsider, Some(&TeamId::generate()), true)
			.await
			.unwrap()
			.is_empty());
		assert!(repo
			.list_visible_documents(&outsider, None, true)
			.await
			.unwrap()
			.is_empty());
	}
}
