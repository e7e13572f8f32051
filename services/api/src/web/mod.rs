pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible to the binary
// that builds the web server router.
pub use rest::{
    create_document_handler, delete_document_handler, get_document_handler,
    list_documents_handler, send_document_handler, signer_view_handler,
    submit_signature_handler, update_document_handler,
};
pub use state::AppState;
