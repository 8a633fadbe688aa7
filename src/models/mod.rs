//! Core data models for the ingestion service.
//!
//! `object` describes what lands in the bucket, `upload` what crosses the
//! HTTP boundary.

pub mod object;
pub mod upload;
