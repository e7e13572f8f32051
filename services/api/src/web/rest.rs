//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints: document CRUD
//! for the owner, send-for-signature, and the token-gated signing flow
//! for external recipients.

use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use doc_signer_core::domain::{
    Document, DocumentStatus, RequestStatus, SignatureRequest, SignerView,
};
use doc_signer_core::error::DomainError;
use doc_signer_core::ports::PortError;
use doc_signer_core::session::{DocumentSession, FieldPatch};
use doc_signer_core::visibility;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize)]
pub struct ListDocumentsParams {
    pub owner: Option<String>,
}

/// The response payload for a send-for-signature request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDocumentResponse {
    pub document: Document,
    pub signature_requests: Vec<SignatureRequest>,
}

/// The token-gated projection handed to an external signer, plus that
/// signer's own progress.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerViewResponse {
    #[serde(flatten)]
    pub view: SignerView,
    pub signed_count: usize,
    pub total_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedField {
    pub id: Uuid,
    pub value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSignatureRequest {
    pub fields: Vec<SubmittedField>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSignatureResponse {
    pub success: bool,
    pub all_signed: bool,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn port_error(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Invalid(_) => StatusCode::CONFLICT,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn domain_error(e: DomainError) -> (StatusCode, String) {
    let status = match &e {
        DomainError::Validation(_)
        | DomainError::UnknownRecipient(_)
        | DomainError::UnknownPage(_) => StatusCode::BAD_REQUEST,
        DomainError::ImmutableDocument | DomainError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        DomainError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

//=========================================================================================
// Document Handlers (owner side)
//=========================================================================================

pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListDocumentsParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let documents = state
        .store
        .list(params.owner.as_deref())
        .await
        .map_err(port_error)?;
    Ok(Json(documents))
}

pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state.store.get(id).await.map_err(port_error)?;
    Ok(Json(document))
}

pub async fn create_document_handler(
    State(state): State<Arc<AppState>>,
    Json(document): Json<Document>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let created = state.store.create(document).await.map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replaces a stored document with the submitted snapshot. Completed
/// documents are immutable, and the status may only move forward.
pub async fn update_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(mut document): Json<Document>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let existing = state.store.get(id).await.map_err(port_error)?;
    if existing.status == DocumentStatus::Completed {
        return Err(domain_error(DomainError::ImmutableDocument));
    }
    if !existing.status.can_advance_to(document.status) {
        return Err(domain_error(DomainError::InvalidTransition {
            from: existing.status,
            to: document.status,
        }));
    }
    document.id = id;
    let updated = state.store.update(document).await.map_err(port_error)?;
    Ok(Json(updated))
}

pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.store.delete(id).await.map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Routes a draft to its recipients: advances the lifecycle to `sent`,
/// mints one access-token request per recipient and queues the signing
/// link emails. Email dispatch is fire-and-forget; a failed send is
/// logged, never retried.
pub async fn send_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state.store.get(id).await.map_err(port_error)?;
    let mut session = DocumentSession::load(document);
    session.mark_sent().map_err(domain_error)?;
    let document = session.into_document();

    let requests = state
        .requests
        .create_for_document(&document)
        .await
        .map_err(port_error)?;
    let document = state.store.update(document).await.map_err(port_error)?;

    for request in &requests {
        let Some(recipient) = document.recipient_by_email(&request.signer_email).cloned()
        else {
            continue;
        };
        let link = format!(
            "{}/sign/{}",
            state.config.frontend_url, request.access_token
        );
        let notifier = state.notifier.clone();
        let document_name = document.name.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier
                .send_signing_link(&recipient, &link, &document_name)
                .await
            {
                warn!(error = %e, email = %recipient.email, "failed to send signing link");
            }
        });
    }

    Ok(Json(SendDocumentResponse {
        document,
        signature_requests: requests,
    }))
}

//=========================================================================================
// Signing Handlers (token-gated recipient side)
//=========================================================================================

/// Resolves an access token to its recipient-scoped view of the
/// document. The first fetch moves the request from pending to viewed.
pub async fn signer_view_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request = state.requests.get_by_token(&token).await.map_err(port_error)?;
    let document = state
        .store
        .get(request.document_id)
        .await
        .map_err(port_error)?;

    if request.status == RequestStatus::Pending {
        state
            .requests
            .advance(&token, RequestStatus::Viewed, None)
            .await
            .map_err(port_error)?;
    }

    let recipient = document
        .recipient_by_email(&request.signer_email)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "The signer is no longer a recipient of this document".to_string(),
            )
        })?;
    let progress = visibility::progress(&document, Some(recipient.id));
    let view = visibility::signer_view(&document, recipient.id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            "The signer is no longer a recipient of this document".to_string(),
        )
    })?;

    Ok(Json(SignerViewResponse {
        view,
        signed_count: progress.signed,
        total_count: progress.total,
    }))
}

/// Accepts a signer's field values. Only fields addressed to the token's
/// recipient are writable; the rest of the submission is ignored. When
/// the last outstanding request signs, the field values are burned into
/// the page rasters and the document completes.
pub async fn submit_signature_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<SubmitSignatureRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request = state.requests.get_by_token(&token).await.map_err(port_error)?;
    let document = state
        .store
        .get(request.document_id)
        .await
        .map_err(port_error)?;
    let recipient = document
        .recipient_by_email(&request.signer_email)
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "The signer is no longer a recipient of this document".to_string(),
            )
        })?;

    let mut session = DocumentSession::load(document);
    for submitted in payload.fields {
        let addressed = session
            .document()
            .field(submitted.id)
            .map(|f| f.recipient_id == Some(recipient.id))
            .unwrap_or(false);
        if !addressed {
            continue;
        }
        session
            .update_field(
                submitted.id,
                FieldPatch {
                    value: Some(submitted.value),
                    ..FieldPatch::default()
                },
            )
            .map_err(domain_error)?;
    }

    let visible = visibility::visible_fields(session.document(), Some(recipient.id));
    if !visibility::is_complete(visible) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Required fields are missing values".to_string(),
        ));
    }

    state
        .requests
        .advance(&token, RequestStatus::Signed, Some(Utc::now()))
        .await
        .map_err(port_error)?;

    let all_requests = state
        .requests
        .list_for_document(session.document().id)
        .await
        .map_err(port_error)?;
    let all_signed =
        !all_requests.is_empty() && all_requests.iter().all(|r| r.status == RequestStatus::Signed);

    if all_signed {
        let composited = state
            .compositor()
            .composite(session.document())
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        session.set_pages(composited).map_err(domain_error)?;
        session.mark_completed().map_err(domain_error)?;
    }

    let document = state
        .store
        .update(session.into_document())
        .await
        .map_err(port_error)?;

    if all_signed {
        let mut emails: Vec<String> = all_requests
            .iter()
            .map(|r| r.signer_email.clone())
            .collect();
        if let Some(owner) = document.owner_id.clone() {
            emails.push(owner);
        }
        let notifier = state.notifier.clone();
        let document_name = document.name.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier
                .send_completion_notice(&emails, &document_name)
                .await
            {
                warn!(error = %e, "failed to send completion notices");
            }
        });
    }

    Ok(Json(SubmitSignatureResponse {
        success: true,
        all_signed,
    }))
}
