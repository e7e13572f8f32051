//! crates/doc_signer_core/src/visibility.rs
//!
//! Derives, for a given actor, which fields are addressable and whether
//! the required ones are filled. The owner (design view) sees everything;
//! a recipient sees exactly the fields addressed to them.

use crate::domain::{Document, Field, SignerView};
use uuid::Uuid;

/// The fields an actor may see and fill. `None` is the owner/design view
/// and returns all fields; `Some(id)` returns the fields whose recipient
/// matches exactly. Unassigned fields belong to no recipient's view.
pub fn visible_fields(document: &Document, recipient_id: Option<Uuid>) -> Vec<&Field> {
    match recipient_id {
        None => document.fields.iter().collect(),
        Some(id) => document
            .fields
            .iter()
            .filter(|f| f.recipient_id == Some(id))
            .collect(),
    }
}

/// True iff every required field in the given scope carries a usable
/// value. Field order is irrelevant.
pub fn is_complete<'a, I>(fields: I) -> bool
where
    I: IntoIterator<Item = &'a Field>,
{
    fields.into_iter().filter(|f| f.required).all(Field::has_value)
}

/// Signing progress over one actor's field scope, not the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningProgress {
    pub signed: usize,
    pub total: usize,
}

pub fn progress(document: &Document, recipient_id: Option<Uuid>) -> SigningProgress {
    let fields = visible_fields(document, recipient_id);
    SigningProgress {
        signed: fields.iter().filter(|f| f.has_value()).count(),
        total: fields.len(),
    }
}

/// The token-gated projection handed to an external signer: the
/// recipient's identity plus only the fields addressed to them.
pub fn signer_view(document: &Document, recipient_id: Uuid) -> Option<SignerView> {
    let recipient = document.recipient(recipient_id)?.clone();
    let fields = visible_fields(document, Some(recipient_id))
        .into_iter()
        .cloned()
        .collect();
    Some(SignerView {
        document_id: document.id,
        document_name: document.name.clone(),
        status: document.status,
        pages: document.pages.clone(),
        fields,
        recipient,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;
    use crate::session::{DocumentSession, FieldPatch, NewField};
    use crate::domain::PageImage;

    fn spec(kind: FieldKind, recipient_id: Uuid, required: bool) -> NewField {
        NewField {
            kind,
            page_number: 1,
            x: 5.0,
            y: 5.0,
            width: 150.0,
            height: 40.0,
            recipient_id,
            required,
        }
    }

    fn two_party_document() -> (Document, Uuid, Uuid) {
        let mut session = DocumentSession::create("doc").unwrap();
        session
            .set_pages(vec![PageImage {
                page_number: 1,
                image_url: "data:image/png;base64,AAAA".to_string(),
                width: 800,
                height: 1000,
            }])
            .unwrap();
        let ada = session.add_recipient("Ada", "ada@example.com").unwrap();
        let grace = session.add_recipient("Grace", "grace@example.com").unwrap();
        session.add_field(spec(FieldKind::Signature, ada.id, true)).unwrap();
        session.add_field(spec(FieldKind::Date, ada.id, false)).unwrap();
        session.add_field(spec(FieldKind::Initials, grace.id, true)).unwrap();
        (session.into_document(), ada.id, grace.id)
    }

    #[test]
    fn owner_sees_all_recipients_see_theirs() {
        let (doc, ada, grace) = two_party_document();
        assert_eq!(visible_fields(&doc, None).len(), 3);
        assert_eq!(visible_fields(&doc, Some(ada)).len(), 2);
        assert_eq!(visible_fields(&doc, Some(grace)).len(), 1);
        assert_eq!(visible_fields(&doc, Some(Uuid::new_v4())).len(), 0);
    }

    #[test]
    fn recipient_views_partition_the_field_list() {
        let (mut doc, ada, grace) = two_party_document();
        // push one field into the unassigned bucket
        doc.fields[1].recipient_id = None;

        let per_recipient: usize = [ada, grace]
            .iter()
            .map(|id| visible_fields(&doc, Some(*id)).len())
            .sum();
        let unassigned = doc.fields.iter().filter(|f| f.recipient_id.is_none()).count();
        assert_eq!(per_recipient + unassigned, doc.fields.len());
        assert!(visible_fields(&doc, Some(ada)).len() <= doc.fields.len());
    }

    #[test]
    fn completion_ignores_optional_fields_and_field_order() {
        let (doc, _, _) = two_party_document();
        assert!(!is_complete(doc.fields.iter()));

        let mut filled = doc.clone();
        for f in &mut filled.fields {
            if f.required {
                f.value = Some("data:image/png;base64,BBBB".to_string());
            }
        }
        assert!(is_complete(filled.fields.iter()));

        filled.fields.reverse();
        assert!(is_complete(filled.fields.iter()));
    }

    #[test]
    fn blank_text_values_do_not_complete_a_field() {
        let (mut doc, _, _) = two_party_document();
        for f in &mut doc.fields {
            f.required = true;
            f.value = Some(if f.kind.is_image() {
                "data:image/png;base64,BBBB".to_string()
            } else {
                "  ".to_string()
            });
        }
        assert!(!is_complete(doc.fields.iter()));
    }

    #[test]
    fn progress_is_scoped_to_the_recipient() {
        let (mut doc, ada, _) = two_party_document();
        let field_id = doc.fields[0].id;
        let mut session = DocumentSession::load(doc);
        session
            .update_field(
                field_id,
                FieldPatch {
                    value: Some("data:image/png;base64,BBBB".to_string()),
                    ..FieldPatch::default()
                },
            )
            .unwrap();
        doc = session.into_document();

        assert_eq!(progress(&doc, Some(ada)), SigningProgress { signed: 1, total: 2 });
        assert_eq!(progress(&doc, None), SigningProgress { signed: 1, total: 3 });
    }

    #[test]
    fn signer_view_projects_identity_and_fields() {
        let (doc, ada, _) = two_party_document();
        let view = signer_view(&doc, ada).unwrap();
        assert_eq!(view.recipient.id, ada);
        assert_eq!(view.fields.len(), 2);
        assert!(view.fields.iter().all(|f| f.recipient_id == Some(ada)));
        assert_eq!(view.pages.len(), 1);

        assert!(signer_view(&doc, Uuid::new_v4()).is_none());
    }
}
