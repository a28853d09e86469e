//! Rosetta HTTP API
//!
//! All endpoints except `/health` take a JSON body via `POST`. Errors are
//! returned as HTTP 500 with a Rosetta error object.
//!
//! # Endpoints
//!
//! ## Network
//! - `POST /network/list`
//! - `POST /network/options`
//! - `POST /network/status` (online)
//!
//! ## Data (online)
//! - `POST /account/balance`
//! - `POST /block`
//! - `POST /block/transaction`
//!
//! ## Construction
//! - `POST /construction/derive`
//! - `POST /construction/preprocess`
//! - `POST /construction/metadata` (online)
//! - `POST /construction/payloads`
//! - `POST /construction/parse`
//! - `POST /construction/combine`
//! - `POST /construction/hash`
//! - `POST /construction/submit` (online)

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
