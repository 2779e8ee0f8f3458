#![deny(missing_docs)]

//! Core library for the SummarizeIt summarization server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Plain-text extraction from uploaded documents.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization pipeline: length policy, chunking, and generation.
pub mod summarize;
