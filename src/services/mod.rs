//! Side services used by the pipeline.

pub mod images;
