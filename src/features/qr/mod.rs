pub mod encoder;
pub mod handler;
pub mod key;
pub mod models;
pub mod service;

pub use handler::create_qr_router;
pub use key::object_key;
pub use models::{GenerateQrParams, GenerateQrResponse};
pub use service::{GeneratedQr, PNG_CONTENT_TYPE, QrUploadService};
