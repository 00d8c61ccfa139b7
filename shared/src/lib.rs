//! Shared components and utilities for the grism workspace.
//!
//! This crate holds the frame/cube geometry types and the parallel
//! scatter/reduce helpers that the dispersion engine is built on, kept
//! separate so tools and benches can use them without the full engine.

pub mod algo;
pub mod image_size;
