//! services/api/src/adapters/mail.rs
//!
//! This module contains the outbound-mail adapter, the concrete
//! implementation of the `Notifier` port. Messages go out through an HTTP
//! mail API; when no API is configured (local development), every send is
//! logged and reported as successful instead.

use async_trait::async_trait;
use doc_signer_core::domain::Recipient;
use doc_signer_core::ports::{Notifier, PortError, PortResult};
use serde::Serialize;
use tracing::info;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `Notifier` port against an HTTP mail API.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    /// Creates a new `HttpMailer`. `api_url == None` disables dispatch.
    pub fn new(api_url: Option<String>, api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }

    async fn dispatch(&self, to: &str, subject: &str, html: &str) -> PortResult<()> {
        let Some(api_url) = &self.api_url else {
            info!(to, subject, "mail dispatch disabled; logging instead of sending");
            return Ok(());
        };

        let message = OutboundMessage {
            from: &self.from,
            to,
            subject,
            html,
        };
        let mut request = self.client.post(api_url).json(&message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Mail API rejected the message with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// `Notifier` Trait Implementation
//=========================================================================================

#[async_trait]
impl Notifier for HttpMailer {
    async fn send_signing_link(
        &self,
        recipient: &Recipient,
        signing_link: &str,
        document_name: &str,
    ) -> PortResult<()> {
        let subject = format!("Please sign: {document_name}");
        let html = format!(
            "<p>Hi <strong>{}</strong>,</p>\
             <p>You have been asked to sign <strong>{document_name}</strong>.</p>\
             <p><a href=\"{signing_link}\">Sign the document</a></p>\
             <p>Or open this link: {signing_link}</p>",
            recipient.name
        );
        self.dispatch(&recipient.email, &subject, &html).await
    }

    async fn send_completion_notice(
        &self,
        emails: &[String],
        document_name: &str,
    ) -> PortResult<()> {
        let subject = format!("Completed: {document_name}");
        let html = format!(
            "<p>All signatures are complete.</p>\
             <p><strong>{document_name}</strong> has been signed by every party; \
             the final pages are available in Document Signer.</p>"
        );
        for email in emails {
            self.dispatch(email, &subject, &html).await?;
        }
        Ok(())
    }
}
