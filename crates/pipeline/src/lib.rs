//! `formcheck-pipeline` -- the async per-request analysis pipeline.
//!
//! Wires the pure stages in `formcheck-core` to the two external
//! capabilities: a [`source::VideoSource`] that probes and decodes video,
//! and an [`estimator::PoseEstimator`] that turns a frame into landmarks.
//! [`pipeline::Pipeline`] runs one request under a deadline and a
//! cancellation token and always returns a tagged outcome.

pub mod estimator;
pub mod extraction;
pub mod ffmpeg;
pub mod pipeline;
pub mod source;

pub use pipeline::{AnalysisReport, AnalysisRequest, Pipeline, Progress};
