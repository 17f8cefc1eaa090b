//! # attesta-engines
//!
//! Adapters between the ATTESTA orchestrator and remote analysis services.
//!
//! - [`EngineTransport`]: the wire seam; one JSON request, one JSON reply
//! - [`HttpTransport`]: `reqwest` POSTs with a bearer credential
//! - [`VisionClient`], [`ForensicClient`], [`LogicClient`]: engine trait
//!   implementations that decode replies through `attesta-verify`
//! - [`RemoteAttestationGate`]: the device and liveness checks
//!
//! ## Usage
//!
//! ```rust,ignore
//! let transport = Arc::new(HttpTransport::new(url, Some(token), Duration::from_secs(2))?);
//! let decoder = Arc::new(ResponseDecoder::new()?);
//! let vision = Arc::new(VisionClient::new(transport.clone(), decoder.clone()));
//! ```

pub mod clients;
pub mod http;
pub mod transport;

pub use clients::{ForensicClient, LogicClient, RemoteAttestationGate, VisionClient};
pub use http::{classify_status, HttpTransport};
pub use transport::EngineTransport;
