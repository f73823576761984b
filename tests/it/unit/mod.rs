//! Unit tests for single modules, through the public API.

mod config_tests;
mod filter_mask_tests;
mod perf_tests;
mod snapshot_tests;
mod table_utils_tests;
mod transforms_tests;
