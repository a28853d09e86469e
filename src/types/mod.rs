//! Rosetta wire types
//!
//! - `models`: identifiers, operations, blocks and errors
//! - `messages`: request and response bodies for each endpoint

pub mod messages;
pub mod models;

pub use messages::*;
pub use models::*;
