pub mod compositor;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod ports;
pub mod session;
pub mod signature;
pub mod visibility;

pub use compositor::{CompositeError, Compositor};
pub use domain::{
    Document, DocumentStatus, Field, FieldKind, PageImage, Recipient, RequestStatus,
    SignatureRequest, SignerView,
};
pub use error::{DomainError, DomainResult};
pub use geometry::RasterScale;
pub use ports::{DocumentStore, Notifier, PageSource, PortError, PortResult, SignatureRequestStore};
pub use session::{DocumentSession, FieldPatch, NewField};
pub use signature::{FontLibrary, SignaturePad, TypedSignature};
