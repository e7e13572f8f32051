//! crates/doc_signer_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's external
//! collaborators. These traits form the boundary of the hexagonal
//! architecture: the core hands fully-formed snapshots across them and
//! never sees a database, a PDF parser, a token table or a mail relay.

use crate::domain::{Document, PageImage, Recipient, RequestStatus, SignatureRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A generic error type for all port operations. Transport failures are
/// surfaced to the caller unchanged; the core never retries implicitly.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Rejected by collaborator: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Persistence for document snapshots. The store assigns and returns ids;
/// a saved-then-loaded document must equal the original in every field.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: Uuid) -> PortResult<Document>;

    async fn list(&self, owner_id: Option<&str>) -> PortResult<Vec<Document>>;

    async fn create(&self, document: Document) -> PortResult<Document>;

    async fn update(&self, document: Document) -> PortResult<Document>;

    async fn delete(&self, id: Uuid) -> PortResult<()>;
}

/// Turns an uploaded source file into page rasters at capture scale.
/// The core never parses the original document format itself.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn rasterize(&self, file: &[u8]) -> PortResult<Vec<PageImage>>;
}

/// The token layer: per-recipient signing invitations keyed by opaque
/// access tokens. The core only ever receives the resolved request and
/// never validates tokens itself.
#[async_trait]
pub trait SignatureRequestStore: Send + Sync {
    /// Creates one request per document recipient, in signing order,
    /// minting a fresh access token for each.
    async fn create_for_document(&self, document: &Document) -> PortResult<Vec<SignatureRequest>>;

    async fn get_by_token(&self, access_token: &str) -> PortResult<SignatureRequest>;

    async fn list_for_document(&self, document_id: Uuid) -> PortResult<Vec<SignatureRequest>>;

    /// Advances a request's status. Implementations must hold the
    /// pending -> viewed -> signed monotonicity.
    async fn advance(
        &self,
        access_token: &str,
        status: RequestStatus,
        signed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()>;
}

/// Outbound notification dispatch, fire-and-forget from the core's
/// perspective: a failure is reported to the caller, never retried here.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_signing_link(
        &self,
        recipient: &Recipient,
        signing_link: &str,
        document_name: &str,
    ) -> PortResult<()>;

    async fn send_completion_notice(
        &self,
        emails: &[String],
        document_name: &str,
    ) -> PortResult<()>;
}
