// Request middleware - session gating for pages, viewer context for the API

pub mod session_middleware;
pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use session_middleware::session_middleware;
pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::*;
