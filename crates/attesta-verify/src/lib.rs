//! # attesta-verify
//!
//! Response verification for the ATTESTA evidence engines.
//!
//! This crate provides [`ResponseDecoder`], which turns raw JSON engine
//! responses into typed `VisionResult`, `ForensicResult`, and `LogicResult`
//! values. Decoding runs in two phases:
//!
//! 1. **Structural**: JSON Schema validation via the `jsonschema` crate.
//! 2. **Semantic**: rules a schema cannot express, such as a finite
//!    confidence and non-blank extracted-field names.
//!
//! A response failing either phase becomes `EngineError::Malformed`.
//! Descriptors that repeat extracted personal data are kept with the value
//! replaced by [`REDACTED`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use attesta_verify::ResponseDecoder;
//!
//! let decoder = ResponseDecoder::new()?;
//! let vision = decoder.decode_vision(body)?;
//! ```

pub mod decoder;
pub mod schema;

pub use decoder::{ResponseDecoder, REDACTED};
pub use schema::{response_schema, MAX_DESCRIPTORS};
