/// Content hashing and uploaded-body metadata
pub mod digest;
pub mod envelope;

pub use digest::{content_digest, is_digest, verify_content, DIGEST_HEX_LEN};
pub use envelope::Envelope;
