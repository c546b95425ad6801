//! `formcheck-core` -- pure domain logic for exercise form analysis.
//!
//! Everything in this crate is synchronous and free of I/O: the data
//! model, geometry, quality gating rules, reliability accounting, signal
//! preparation, repetition segmentation, the per-exercise analyzers, the
//! standards table, scoring, and diagnostics. The async pipeline that
//! drives video decoding and pose estimation lives in
//! `formcheck-pipeline`.

pub mod analysis;
pub mod analyzers;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod exercise;
pub mod geometry;
pub mod landmarks;
pub mod metadata;
pub mod movement;
pub mod quality_gate;
pub mod reliability;
pub mod sampling;
pub mod scoring;
pub mod segmentation;
pub mod series;
pub mod signal;
pub mod standards;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
