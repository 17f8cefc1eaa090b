//! The per-request holder of personal data.
//!
//! A `RequestContext` owns the immutable request (document bytes, claims)
//! and, once the vision engine has answered, the extracted fields. It is the
//! only place these live. Dropping it zeroizes all of them.

use attesta_contracts::{
    evidence::ExtractedFields,
    request::{RequestId, VerificationRequest},
};

#[derive(Debug)]
pub struct RequestContext {
    request: VerificationRequest,
    extracted: Option<ExtractedFields>,
}

impl RequestContext {
    pub fn new(request: VerificationRequest) -> Self {
        Self {
            request,
            extracted: None,
        }
    }

    pub fn id(&self) -> &RequestId {
        self.request.id()
    }

    pub fn request(&self) -> &VerificationRequest {
        &self.request
    }

    /// Take ownership of the fields the vision engine extracted.
    pub fn attach_fields(&mut self, fields: ExtractedFields) {
        self.extracted = Some(fields);
    }

    pub fn extracted(&self) -> Option<&ExtractedFields> {
        self.extracted.as_ref()
    }
}
