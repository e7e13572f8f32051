//! crates/doc_signer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format;
//! the serde attributes only pin the camelCase wire shape so that a
//! save/load round trip through persistence is lossless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The document-level lifecycle. Transitions are monotonic: a document
/// never moves backwards, and `completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Completed,
}

impl DocumentStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Staying in place is always allowed (saves re-persist the current
    /// status). `Draft -> Completed` is the self-signing short circuit:
    /// an owner may fill and composite a document locally without ever
    /// routing it to a remote signer.
    pub fn can_advance_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Draft, Draft)
                | (Draft, Sent)
                | (Draft, Completed)
                | (Sent, Sent)
                | (Sent, Completed)
                | (Completed, Completed)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentStatus::Draft => write!(f, "draft"),
            DocumentStatus::Sent => write!(f, "sent"),
            DocumentStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "sent" => Ok(DocumentStatus::Sent),
            "completed" => Ok(DocumentStatus::Completed),
            other => Err(format!("'{other}' is not a document status")),
        }
    }
}

/// The kind of value a field collects from its recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    Signature,
    Initials,
    Text,
    Date,
    Number,
}

impl FieldKind {
    /// Signature and initials fields hold an encoded raster image
    /// (a data URI); the remaining kinds hold a plain string.
    pub fn is_image(self) -> bool {
        matches!(self, FieldKind::Signature | FieldKind::Initials)
    }
}

/// One rasterized page of the source document, at capture scale.
///
/// Pages are produced by the out-of-scope rasterizer and are immutable,
/// except that the compositor replaces `image_url` with the burned-in
/// raster for the same page number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageImage {
    pub page_number: u32,
    /// Encoded raster, as a `data:image/...;base64,` URI.
    pub image_url: String,
    pub width: u32,
    pub height: u32,
}

/// A party assigned to one or more fields, identified by signing order
/// and a display color drawn from a fixed palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub color: String,
    pub order: u32,
}

/// A typed, positioned placeholder on a page requiring a value from one
/// recipient.
///
/// `x` and `y` are percentages of the page extent (0..=100). `width` and
/// `height` are in the linear pixel units of the editing canvas and are
/// scaled by [`crate::geometry::RasterScale`] when burned into a page
/// raster of a different resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub page_number: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// `None` means the field sits in the unassigned bucket (its owner
    /// was removed) and must be reassigned before the document is sent.
    pub recipient_id: Option<Uuid>,
    pub required: bool,
    /// Image data URI for SIGNATURE/INITIALS, plain string otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Field {
    /// Whether the field carries a usable value: present for image
    /// kinds, non-blank after trimming for string kinds.
    pub fn has_value(&self) -> bool {
        match &self.value {
            None => false,
            Some(v) if self.kind.is_image() => !v.is_empty(),
            Some(v) => !v.trim().is_empty(),
        }
    }
}

/// Per-recipient signing progress, tracked independently of the
/// document-level status and monotonic: pending -> viewed -> signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Viewed,
    Signed,
}

impl RequestStatus {
    pub fn can_advance_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Viewed)
                | (Pending, Signed)
                | (Viewed, Viewed)
                | (Viewed, Signed)
                | (Signed, Signed)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Viewed => write!(f, "viewed"),
            RequestStatus::Signed => write!(f, "signed"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "viewed" => Ok(RequestStatus::Viewed),
            "signed" => Ok(RequestStatus::Signed),
            other => Err(format!("'{other}' is not a request status")),
        }
    }
}

/// One recipient's invitation to sign a document, keyed by an opaque
/// access token that the out-of-scope token layer hands to signers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signer_name: String,
    pub signer_email: String,
    pub access_token: String,
    pub status: RequestStatus,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
}

/// The authoritative state of one document under design or signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub pages: Vec<PageImage>,
    pub fields: Vec<Field>,
    pub recipients: Vec<Recipient>,
    pub status: DocumentStatus,
    pub is_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<Uuid>,
    /// Opaque owner identity, assigned by the external access layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn field(&self, id: Uuid) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn recipient(&self, id: Uuid) -> Option<&Recipient> {
        self.recipients.iter().find(|r| r.id == id)
    }

    pub fn recipient_by_email(&self, email: &str) -> Option<&Recipient> {
        self.recipients.iter().find(|r| r.email == email)
    }

    pub fn page(&self, page_number: u32) -> Option<&PageImage> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }

    pub fn fields_on_page(&self, page_number: u32) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.page_number == page_number)
    }
}

/// A recipient-scoped projection of a document: only the fields addressed
/// to the token's recipient, plus that recipient's own identity.
///
/// This is a view computed on demand, never a persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerView {
    pub document_id: Uuid,
    pub document_name: String,
    pub status: DocumentStatus,
    pub pages: Vec<PageImage>,
    pub fields: Vec<Field>,
    pub recipient: Recipient,
}
