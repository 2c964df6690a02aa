//! Request handler module
//!
//! Routes the single relay endpoint: preflight, guards, then the relay core.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
