//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` and `SignatureRequestStore` ports from the `core` crate.
//! It handles all interactions with the PostgreSQL database using `sqlx`.
//!
//! Documents persist as one row with JSONB pages/fields/recipients columns,
//! so a save/load round trip preserves every attribute of the snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doc_signer_core::domain::{
    Document, DocumentStatus, Field, PageImage, Recipient, RequestStatus, SignatureRequest,
};
use doc_signer_core::ports::{
    DocumentStore, PortError, PortResult, SignatureRequestStore,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the persistence and token-layer ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    owner_id: Option<String>,
    name: String,
    pages: Json<Vec<PageImage>>,
    fields: Json<Vec<Field>>,
    recipients: Json<Vec<Recipient>>,
    status: String,
    is_template: bool,
    template_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        let status: DocumentStatus = self
            .status
            .parse()
            .map_err(|e: String| PortError::Unexpected(e))?;
        Ok(Document {
            id: self.id,
            name: self.name,
            pages: self.pages.0,
            fields: self.fields.0,
            recipients: self.recipients.0,
            status,
            is_template: self.is_template,
            template_id: self.template_id,
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            sent_at: self.sent_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(FromRow)]
struct SignatureRequestRecord {
    id: Uuid,
    document_id: Uuid,
    signer_name: String,
    signer_email: String,
    access_token: String,
    status: String,
    signing_order: i32,
    created_at: DateTime<Utc>,
    signed_at: Option<DateTime<Utc>>,
}

impl SignatureRequestRecord {
    fn to_domain(self) -> PortResult<SignatureRequest> {
        let status: RequestStatus = self
            .status
            .parse()
            .map_err(|e: String| PortError::Unexpected(e))?;
        Ok(SignatureRequest {
            id: self.id,
            document_id: self.document_id,
            signer_name: self.signer_name,
            signer_email: self.signer_email,
            access_token: self.access_token,
            status,
            order: self.signing_order as u32,
            created_at: self.created_at,
            signed_at: self.signed_at,
        })
    }
}

const DOCUMENT_COLUMNS: &str = "id, owner_id, name, pages, fields, recipients, status, \
     is_template, template_id, created_at, updated_at, sent_at, completed_at";

const REQUEST_COLUMNS: &str = "id, document_id, signer_name, signer_email, access_token, \
     status, signing_order, created_at, signed_at";

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn get(&self, id: Uuid) -> PortResult<Document> {
        let query = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let record = sqlx::query_as::<_, DocumentRecord>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Document {} not found", id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn list(&self, owner_id: Option<&str>) -> PortResult<Vec<Document>> {
        let records = match owner_id {
            Some(owner) => {
                let query = format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE owner_id = $1 \
                     ORDER BY updated_at DESC"
                );
                sqlx::query_as::<_, DocumentRecord>(&query)
                    .bind(owner)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let query =
                    format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY updated_at DESC");
                sqlx::query_as::<_, DocumentRecord>(&query)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(unexpected)?;

        records.into_iter().map(DocumentRecord::to_domain).collect()
    }

    async fn create(&self, document: Document) -> PortResult<Document> {
        let query = format!(
            "INSERT INTO documents ({DOCUMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {DOCUMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&query)
            .bind(document.id)
            .bind(&document.owner_id)
            .bind(&document.name)
            .bind(Json(&document.pages))
            .bind(Json(&document.fields))
            .bind(Json(&document.recipients))
            .bind(document.status.to_string())
            .bind(document.is_template)
            .bind(document.template_id)
            .bind(document.created_at)
            .bind(document.updated_at)
            .bind(document.sent_at)
            .bind(document.completed_at)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn update(&self, document: Document) -> PortResult<Document> {
        let query = format!(
            "UPDATE documents SET owner_id = $2, name = $3, pages = $4, fields = $5, \
             recipients = $6, status = $7, is_template = $8, template_id = $9, \
             updated_at = $10, sent_at = $11, completed_at = $12 \
             WHERE id = $1 RETURNING {DOCUMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&query)
            .bind(document.id)
            .bind(&document.owner_id)
            .bind(&document.name)
            .bind(Json(&document.pages))
            .bind(Json(&document.fields))
            .bind(Json(&document.recipients))
            .bind(document.status.to_string())
            .bind(document.is_template)
            .bind(document.template_id)
            .bind(document.updated_at)
            .bind(document.sent_at)
            .bind(document.completed_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Document {} not found", document.id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `SignatureRequestStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SignatureRequestStore for DbAdapter {
    async fn create_for_document(&self, document: &Document) -> PortResult<Vec<SignatureRequest>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut requests = Vec::with_capacity(document.recipients.len());

        let mut recipients: Vec<&Recipient> = document.recipients.iter().collect();
        recipients.sort_by_key(|r| r.order);

        for recipient in recipients {
            let query = format!(
                "INSERT INTO signature_requests ({REQUEST_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 RETURNING {REQUEST_COLUMNS}"
            );
            let record = sqlx::query_as::<_, SignatureRequestRecord>(&query)
                .bind(Uuid::new_v4())
                .bind(document.id)
                .bind(&recipient.name)
                .bind(&recipient.email)
                .bind(Uuid::new_v4().to_string())
                .bind(RequestStatus::Pending.to_string())
                .bind(recipient.order as i32)
                .bind(Utc::now())
                .bind(Option::<DateTime<Utc>>::None)
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
            requests.push(record.to_domain()?);
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(requests)
    }

    async fn get_by_token(&self, access_token: &str) -> PortResult<SignatureRequest> {
        let query =
            format!("SELECT {REQUEST_COLUMNS} FROM signature_requests WHERE access_token = $1");
        let record = sqlx::query_as::<_, SignatureRequestRecord>(&query)
            .bind(access_token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => PortError::Unauthorized,
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn list_for_document(&self, document_id: Uuid) -> PortResult<Vec<SignatureRequest>> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM signature_requests WHERE document_id = $1 \
             ORDER BY signing_order"
        );
        let records = sqlx::query_as::<_, SignatureRequestRecord>(&query)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records
            .into_iter()
            .map(SignatureRequestRecord::to_domain)
            .collect()
    }

    async fn advance(
        &self,
        access_token: &str,
        status: RequestStatus,
        signed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        let current = self.get_by_token(access_token).await?;
        if !current.status.can_advance_to(status) {
            return Err(PortError::Invalid(format!(
                "Signature request cannot move from {} to {}",
                current.status, status
            )));
        }
        sqlx::query(
            "UPDATE signature_requests SET status = $2, signed_at = COALESCE($3, signed_at) \
             WHERE access_token = $1",
        )
        .bind(access_token)
        .bind(status.to_string())
        .bind(signed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
