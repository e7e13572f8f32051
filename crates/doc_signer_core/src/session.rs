//! crates/doc_signer_core/src/session.rs
//!
//! The in-memory authoritative store for one document. A
//! [`DocumentSession`] is an explicitly passed handle owned by the active
//! editing/signing flow; there is no process-wide current document. Every
//! public operation is an atomic mutation: inputs are validated before any
//! state changes, so a returned error means the document is untouched.
//!
//! Observers receive the latest document snapshot through a
//! `tokio::sync::watch` channel.

use crate::domain::{Document, DocumentStatus, Field, FieldKind, PageImage, Recipient};
use crate::error::{DomainError, DomainResult};
use crate::geometry;
use crate::visibility;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

/// Display colors assigned to recipients, cycling by insertion index.
pub const RECIPIENT_COLORS: [&str; 6] = [
    "#3b82f6", "#ef4444", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899",
];

/// The input for [`DocumentSession::add_field`].
#[derive(Debug, Clone)]
pub struct NewField {
    pub kind: FieldKind,
    pub page_number: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub recipient_id: Uuid,
    pub required: bool,
}

/// A merge-patch for [`DocumentSession::update_field`]. Absent members
/// leave the field untouched.
#[derive(Debug, Clone, Default)]
pub struct FieldPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub value: Option<String>,
    pub recipient_id: Option<Uuid>,
}

/// An exclusive handle over one in-memory document.
pub struct DocumentSession {
    document: Document,
    updates: watch::Sender<Document>,
}

impl DocumentSession {
    /// Creates a fresh draft document with no pages, fields or recipients.
    pub fn create(name: &str) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Document name must not be empty".to_string(),
            ));
        }
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            name: name.to_string(),
            pages: Vec::new(),
            fields: Vec::new(),
            recipients: Vec::new(),
            status: DocumentStatus::Draft,
            is_template: false,
            template_id: None,
            owner_id: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
            completed_at: None,
        };
        Ok(Self::load(document))
    }

    /// Wraps an existing document, replacing any previous state wholesale.
    /// Used when hydrating from persistence.
    pub fn load(document: Document) -> Self {
        let (updates, _) = watch::channel(document.clone());
        Self { document, updates }
    }

    /// The current document snapshot.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Consumes the session, handing back ownership of the document.
    pub fn into_document(self) -> Document {
        self.document
    }

    /// A receiver that always holds the latest document snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Document> {
        self.updates.subscribe()
    }

    /// Renames the document (e.g. after the source file is chosen).
    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        self.ensure_mutable()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "Document name must not be empty".to_string(),
            ));
        }
        self.document.name = name.to_string();
        self.publish();
        Ok(())
    }

    /// Adds a recipient, assigning the next palette color and the next
    /// signing-order index.
    pub fn add_recipient(&mut self, name: &str, email: &str) -> DomainResult<Recipient> {
        self.ensure_mutable()?;
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(DomainError::Validation(
                "Recipient name and email must not be empty".to_string(),
            ));
        }
        let index = self.document.recipients.len();
        let recipient = Recipient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            color: RECIPIENT_COLORS[index % RECIPIENT_COLORS.len()].to_string(),
            order: index as u32 + 1,
        };
        self.document.recipients.push(recipient.clone());
        self.publish();
        Ok(recipient)
    }

    /// Removes a recipient. Fields it owned are not deleted: they move to
    /// the unassigned bucket and must be reassigned before the document
    /// can be sent.
    pub fn remove_recipient(&mut self, id: Uuid) -> DomainResult<()> {
        self.ensure_mutable()?;
        if self.document.recipient(id).is_none() {
            return Err(DomainError::UnknownRecipient(id));
        }
        self.document.recipients.retain(|r| r.id != id);
        for field in &mut self.document.fields {
            if field.recipient_id == Some(id) {
                field.recipient_id = None;
            }
        }
        self.publish();
        Ok(())
    }

    /// Places a new field. The target page and recipient must exist;
    /// position and size are clamped into their legal ranges.
    pub fn add_field(&mut self, spec: NewField) -> DomainResult<Field> {
        self.ensure_mutable()?;
        if self.document.recipient(spec.recipient_id).is_none() {
            return Err(DomainError::UnknownRecipient(spec.recipient_id));
        }
        if self.document.page(spec.page_number).is_none() {
            return Err(DomainError::UnknownPage(spec.page_number));
        }
        let (width, height) = geometry::clamp_size(spec.width, spec.height);
        let field = Field {
            id: Uuid::new_v4(),
            kind: spec.kind,
            page_number: spec.page_number,
            x: geometry::clamp_percent(spec.x),
            y: geometry::clamp_percent(spec.y),
            width,
            height,
            recipient_id: Some(spec.recipient_id),
            required: spec.required,
            value: None,
        };
        self.document.fields.push(field.clone());
        self.publish();
        Ok(field)
    }

    /// Merges a patch into a field. A no-op if the id is unknown.
    pub fn update_field(&mut self, id: Uuid, patch: FieldPatch) -> DomainResult<()> {
        self.ensure_mutable()?;
        if let Some(recipient_id) = patch.recipient_id {
            if self.document.recipient(recipient_id).is_none() {
                return Err(DomainError::UnknownRecipient(recipient_id));
            }
        }
        let Some(field) = self.document.fields.iter_mut().find(|f| f.id == id) else {
            return Ok(());
        };
        if let Some(x) = patch.x {
            field.x = geometry::clamp_percent(x);
        }
        if let Some(y) = patch.y {
            field.y = geometry::clamp_percent(y);
        }
        if patch.width.is_some() || patch.height.is_some() {
            let (width, height) = geometry::clamp_size(
                patch.width.unwrap_or(field.width),
                patch.height.unwrap_or(field.height),
            );
            field.width = width;
            field.height = height;
        }
        if let Some(value) = patch.value {
            field.value = Some(value);
        }
        if let Some(recipient_id) = patch.recipient_id {
            field.recipient_id = Some(recipient_id);
        }
        self.publish();
        Ok(())
    }

    pub fn remove_field(&mut self, id: Uuid) -> DomainResult<()> {
        self.ensure_mutable()?;
        self.document.fields.retain(|f| f.id != id);
        self.publish();
        Ok(())
    }

    /// Replaces the page list, used after rasterization and after the
    /// compositor emits burned-in pages. Page numbers must be contiguous
    /// and 1-based.
    pub fn set_pages(&mut self, pages: Vec<PageImage>) -> DomainResult<()> {
        self.ensure_mutable()?;
        let mut numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        numbers.sort_unstable();
        for (index, number) in numbers.iter().enumerate() {
            if *number != index as u32 + 1 {
                return Err(DomainError::Validation(
                    "Page numbers must be contiguous and start at 1".to_string(),
                ));
            }
        }
        self.document.pages = pages;
        self.publish();
        Ok(())
    }

    /// Advances the document to `sent`. Requires at least one recipient
    /// and no required field left in the unassigned bucket.
    pub fn mark_sent(&mut self) -> DomainResult<()> {
        self.ensure_transition(DocumentStatus::Sent)?;
        if self.document.recipients.is_empty() {
            return Err(DomainError::Validation(
                "Cannot send a document with no recipients".to_string(),
            ));
        }
        if self
            .document
            .fields
            .iter()
            .any(|f| f.required && f.recipient_id.is_none())
        {
            return Err(DomainError::Validation(
                "Every required field must be assigned to a recipient before sending"
                    .to_string(),
            ));
        }
        self.document.status = DocumentStatus::Sent;
        self.document.sent_at = Some(Utc::now());
        self.publish();
        Ok(())
    }

    /// Advances the document to `completed`. Requires every required
    /// field in scope to carry a value. For the single-signer flow the
    /// scope is the whole document; multi-party flows complete through
    /// their per-recipient requests and call this once all have signed.
    pub fn mark_completed(&mut self) -> DomainResult<()> {
        self.ensure_transition(DocumentStatus::Completed)?;
        if !visibility::is_complete(self.document.fields.iter()) {
            return Err(DomainError::Validation(
                "Every required field must be filled before completion".to_string(),
            ));
        }
        self.document.status = DocumentStatus::Completed;
        self.document.completed_at = Some(Utc::now());
        self.publish();
        Ok(())
    }

    fn ensure_mutable(&self) -> DomainResult<()> {
        if self.document.status == DocumentStatus::Completed {
            return Err(DomainError::ImmutableDocument);
        }
        Ok(())
    }

    fn ensure_transition(&self, next: DocumentStatus) -> DomainResult<()> {
        if !self.document.status.can_advance_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.document.status,
                to: next,
            });
        }
        Ok(())
    }

    fn publish(&mut self) {
        self.document.updated_at = Utc::now();
        let _ = self.updates.send(self.document.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_page(page_number: u32) -> PageImage {
        PageImage {
            page_number,
            image_url: "data:image/png;base64,AAAA".to_string(),
            width: 800,
            height: 1000,
        }
    }

    fn session_with_page() -> (DocumentSession, Recipient) {
        let mut session = DocumentSession::create("contract.pdf").unwrap();
        session.set_pages(vec![blank_page(1)]).unwrap();
        let recipient = session.add_recipient("Ada", "ada@example.com").unwrap();
        (session, recipient)
    }

    fn signature_spec(recipient_id: Uuid) -> NewField {
        NewField {
            kind: FieldKind::Signature,
            page_number: 1,
            x: 10.0,
            y: 10.0,
            width: 150.0,
            height: 40.0,
            recipient_id,
            required: true,
        }
    }

    #[test]
    fn create_rejects_blank_names() {
        assert!(matches!(
            DocumentSession::create("   "),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn recipients_cycle_through_the_palette() {
        let mut session = DocumentSession::create("doc").unwrap();
        for i in 0..8 {
            let r = session
                .add_recipient(&format!("R{i}"), &format!("r{i}@example.com"))
                .unwrap();
            assert_eq!(r.color, RECIPIENT_COLORS[i % RECIPIENT_COLORS.len()]);
            assert_eq!(r.order, i as u32 + 1);
        }
    }

    #[test]
    fn add_recipient_rejects_empty_name_or_email() {
        let mut session = DocumentSession::create("doc").unwrap();
        assert!(session.add_recipient("", "a@example.com").is_err());
        assert!(session.add_recipient("Ada", "  ").is_err());
        assert!(session.document().recipients.is_empty());
    }

    #[test]
    fn add_field_requires_existing_page_and_recipient() {
        let (mut session, recipient) = session_with_page();

        let mut bad_page = signature_spec(recipient.id);
        bad_page.page_number = 7;
        assert!(matches!(
            session.add_field(bad_page),
            Err(DomainError::UnknownPage(7))
        ));

        let stranger = Uuid::new_v4();
        assert!(matches!(
            session.add_field(signature_spec(stranger)),
            Err(DomainError::UnknownRecipient(_))
        ));

        assert!(session.document().fields.is_empty());
        session.add_field(signature_spec(recipient.id)).unwrap();
        assert_eq!(session.document().fields.len(), 1);
    }

    #[test]
    fn add_field_clamps_position_and_size() {
        let (mut session, recipient) = session_with_page();
        let mut spec = signature_spec(recipient.id);
        spec.x = 130.0;
        spec.y = -5.0;
        spec.width = 10.0;
        spec.height = 5.0;
        let field = session.add_field(spec).unwrap();
        assert_eq!(field.x, 100.0);
        assert_eq!(field.y, 0.0);
        assert_eq!(field.width, geometry::MIN_FIELD_WIDTH);
        assert_eq!(field.height, geometry::MIN_FIELD_HEIGHT);
    }

    #[test]
    fn update_field_is_a_no_op_for_unknown_ids() {
        let (mut session, _) = session_with_page();
        let before = session.document().clone();
        session
            .update_field(
                Uuid::new_v4(),
                FieldPatch {
                    x: Some(50.0),
                    ..FieldPatch::default()
                },
            )
            .unwrap();
        assert_eq!(before.fields, session.document().fields);
    }

    #[test]
    fn update_field_merges_and_clamps() {
        let (mut session, recipient) = session_with_page();
        let field = session.add_field(signature_spec(recipient.id)).unwrap();
        session
            .update_field(
                field.id,
                FieldPatch {
                    x: Some(101.0),
                    value: Some("data:image/png;base64,BBBB".to_string()),
                    ..FieldPatch::default()
                },
            )
            .unwrap();
        let updated = session.document().field(field.id).unwrap();
        assert_eq!(updated.x, 100.0);
        assert_eq!(updated.y, 10.0, "unpatched members are untouched");
        assert_eq!(updated.value.as_deref(), Some("data:image/png;base64,BBBB"));
    }

    #[test]
    fn removing_a_recipient_moves_its_fields_to_the_unassigned_bucket() {
        let (mut session, recipient) = session_with_page();
        let a = session.add_field(signature_spec(recipient.id)).unwrap();
        let b = session.add_field(signature_spec(recipient.id)).unwrap();

        session.remove_recipient(recipient.id).unwrap();

        assert!(session.document().recipients.is_empty());
        assert_eq!(session.document().fields.len(), 2);
        for id in [a.id, b.id] {
            assert_eq!(session.document().field(id).unwrap().recipient_id, None);
        }
    }

    #[test]
    fn sending_requires_recipients_and_full_assignment() {
        let mut session = DocumentSession::create("doc").unwrap();
        session.set_pages(vec![blank_page(1)]).unwrap();
        assert!(matches!(
            session.mark_sent(),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(session.document().status, DocumentStatus::Draft);

        let recipient = session.add_recipient("Ada", "ada@example.com").unwrap();
        session.add_field(signature_spec(recipient.id)).unwrap();
        session.remove_recipient(recipient.id).unwrap();
        let other = session.add_recipient("Grace", "grace@example.com").unwrap();
        // the orphaned required field blocks sending until reassigned
        assert!(session.mark_sent().is_err());

        let field_id = session.document().fields[0].id;
        session
            .update_field(
                field_id,
                FieldPatch {
                    recipient_id: Some(other.id),
                    ..FieldPatch::default()
                },
            )
            .unwrap();
        session.mark_sent().unwrap();
        assert_eq!(session.document().status, DocumentStatus::Sent);
        assert!(session.document().sent_at.is_some());
    }

    #[test]
    fn completion_requires_every_required_field_filled() {
        let (mut session, recipient) = session_with_page();
        let field = session.add_field(signature_spec(recipient.id)).unwrap();
        assert!(session.mark_completed().is_err());

        session
            .update_field(
                field.id,
                FieldPatch {
                    value: Some("data:image/png;base64,CCCC".to_string()),
                    ..FieldPatch::default()
                },
            )
            .unwrap();
        session.mark_completed().unwrap();
        assert_eq!(session.document().status, DocumentStatus::Completed);
        assert!(session.document().completed_at.is_some());
    }

    #[test]
    fn completed_documents_reject_every_mutation() {
        let (mut session, recipient) = session_with_page();
        let field = session.add_field(signature_spec(recipient.id)).unwrap();
        session
            .update_field(
                field.id,
                FieldPatch {
                    value: Some("data:image/png;base64,CCCC".to_string()),
                    ..FieldPatch::default()
                },
            )
            .unwrap();
        session.mark_completed().unwrap();

        let snapshot = session.document().clone();
        assert!(matches!(
            session.add_field(signature_spec(recipient.id)),
            Err(DomainError::ImmutableDocument)
        ));
        assert!(matches!(
            session.add_recipient("Eve", "eve@example.com"),
            Err(DomainError::ImmutableDocument)
        ));
        assert!(matches!(
            session.remove_field(field.id),
            Err(DomainError::ImmutableDocument)
        ));
        assert!(matches!(
            session.set_pages(vec![blank_page(1)]),
            Err(DomainError::ImmutableDocument)
        ));
        assert_eq!(&snapshot, session.document(), "nothing mutated");
    }

    #[test]
    fn set_pages_rejects_gaps() {
        let mut session = DocumentSession::create("doc").unwrap();
        assert!(session
            .set_pages(vec![blank_page(1), blank_page(3)])
            .is_err());
        assert!(session
            .set_pages(vec![blank_page(2), blank_page(1)])
            .is_ok());
    }

    #[test]
    fn observers_see_the_latest_snapshot() {
        let (mut session, _) = session_with_page();
        let rx = session.subscribe();
        session.rename("renamed.pdf").unwrap();
        assert_eq!(rx.borrow().name, "renamed.pdf");
    }
}
