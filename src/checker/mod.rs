// src/checker/mod.rs
// =============================================================================
// This module contains the link verification stage.
//
// Submodules:
// - http: HEAD-based liveness checks, status classification and the bounded
//   worker pool that checks every unique URL once
// =============================================================================

mod http;

pub use http::{verify_links, LinkStatus, Verification, VerificationReport, VerifyOptions};
