//! Annotation Engine Integration Tests
//!
//! End-to-end behaviour of both storage tiers through `AnnotationEngine`,
//! verified against instrumented in-memory stores and a filesystem blob store.

#[path = "../common/mod.rs"]
mod common;

mod create;
mod get;
mod replace;
mod saga;
mod sweep;
