//! Test utilities for the lazyseq crates.
//!
//! This crate provides instrumented sources for exercising materializer graphs:
//! - Sources that count how often they are asked for each element
//! - Sources that fail past a given index, or that are slow to answer
//! - A source whose size is at the edge of the index space
//! - Random data generation for model-based tests
//!
//! # Usage
//!
//! This crate is intended for the integration tests of the lazyseq crates.

pub mod data_gen;
pub mod sources;

pub use sources::{CountingSource, FailingSource, HugeSource, SlowSource};
