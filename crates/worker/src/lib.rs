//! `formcheck-worker` -- runs batches of form analyses from a job manifest.

pub mod config;
pub mod jobs;
