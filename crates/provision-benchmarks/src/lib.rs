//! Provision benchmarking suite
//!
//! Benchmarks for catalog manifest parsing and install list resolution.

pub mod common;

pub use common::*;
