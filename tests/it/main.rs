//! Single test binary entry point.
//!
//! All tests compile into one binary to keep link times down.
//!
//! Structure:
//! - helpers: fixtures and assertion shortcuts
//! - integration: multi-step derivation workflows
//! - unit: single-module tests against the public API

mod helpers;
mod integration;
mod unit;
