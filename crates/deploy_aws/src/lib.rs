//! AWS-oriented adapters and handlers for Lambda deployment packaging.
//!
//! This crate owns runtime integration details (S3 upload, Lambda code
//! updates) and the deployment pipeline that drives them. Deterministic
//! packaging primitives live in `crates/deploy_core`.

pub mod adapters;
pub mod handlers;
