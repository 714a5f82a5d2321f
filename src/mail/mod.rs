//! Inbound mail decoding: MIME envelope parsing and list-view previews.

pub mod parser;
pub mod preview;

pub use parser::parse_message;
pub use preview::generate_preview;
