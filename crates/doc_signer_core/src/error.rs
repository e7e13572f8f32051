//! crates/doc_signer_core/src/error.rs
//!
//! The error type shared by the store, the signature producers and the
//! geometry/visibility helpers. Compositing has its own error type in
//! [`crate::compositor`] because its failure modes are per page.

use crate::domain::DocumentStatus;
use uuid::Uuid;

/// Errors raised by synchronous core operations. Every operation that
/// returns one of these guarantees it mutated nothing first.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// The operation's input was rejected; the document is unchanged.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Any mutation attempted on a completed document.
    #[error("Document is completed and can no longer be modified")]
    ImmutableDocument,

    /// A field referenced a recipient that is not in the document.
    #[error("Recipient {0} does not exist on this document")]
    UnknownRecipient(Uuid),

    /// A field referenced a page number that is not in the document.
    #[error("Page {0} does not exist on this document")]
    UnknownPage(u32),

    /// A document-status change that would move the lifecycle backwards
    /// (or skip a required guard).
    #[error("Illegal status transition from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// A raster could not be encoded into its data-URI form.
    #[error("Image encoding failed: {0}")]
    Encode(String),
}

/// A convenience type alias for `Result<T, DomainError>`.
pub type DomainResult<T> = Result<T, DomainError>;
