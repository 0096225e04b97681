// Infrastructure - credentials, outbound services and request plumbing
pub mod cookies;        // Session cookie encoding
pub mod google;         // Google ID-token verification
pub mod mailer;         // Transactional email
pub mod middleware;     // Session gate and viewer context
pub mod security;       // Password hashing and reset tokens
pub mod token_codec;    // Signed session credentials
pub mod viewer;         // Viewer context

pub use token_codec::{Principal, TokenCodec, TokenError};
pub use viewer::ViewerContext;
