//! Wire types for the measurement receiver protocol.
//!
//! This crate contains the frame-level shapes exchanged with a producer over
//! the message-queue transport. These types represent the "protocol layer":
//! the bytes as they appear on the wire and the serde payloads carried inside
//! them.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: framing, parsing and serialization only
//! * Transport agnostic: parts are plain byte vectors
//! * Stable: changes only when the wire format changes
//!
//! Decoding policy (schema checks, error classification, persistence) lives in
//! `receiver-runtime`.

pub mod envelope;
pub mod object;
pub mod params;
pub mod request;
pub mod schema;
pub mod topic;

pub use envelope::*;
pub use object::*;
pub use params::*;
pub use request::*;
pub use schema::*;
pub use topic::*;
