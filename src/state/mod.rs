//! State module for tracking pipeline progress
//!
//! A run moves through [`PipelineStage`]s strictly in order:
//! generating index URLs, discovering articles, draining the queue, completed.

mod pipeline_stage;

pub use pipeline_stage::PipelineStage;
