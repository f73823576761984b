//! Integration tests for CoreTable.
//!
//! These tests chain several derivations and check the invariants that must
//! hold across the whole chain.

mod completion_tests;
mod derivation_tests;
mod input_tests;
