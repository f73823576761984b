//! Unit tests for perf module.

use coretable::perf::{
    ScopedTimer, is_profiling_enabled, measure, measure_and_log, set_profiling_enabled,
    timers_started,
};

#[test]
fn test_scoped_timer_creation() {
    // High threshold: dropping must not warn
    let timer = ScopedTimer::new("test_op", 1000.0);
    assert_eq!(timer.name(), "test_op");
    assert!(timer.elapsed_ms() >= 0.0);
}

#[test]
fn test_timer_ids_increase() {
    let first = ScopedTimer::with_default_threshold("first");
    let second = ScopedTimer::with_default_threshold("second");
    assert!(second.id() > first.id());
    assert!(timers_started() > second.id());
}

#[test]
fn test_measure_helpers_return_results() {
    let (value, elapsed) = measure(|| (1..=10).sum::<i32>());
    assert_eq!(value, 55);
    assert!(elapsed >= 0.0);
    assert_eq!(measure_and_log("sum", 1000.0, || 7), 7);
}

#[test]
fn test_profiling_can_be_toggled_at_runtime() {
    let initial = is_profiling_enabled();

    set_profiling_enabled(true);
    assert!(is_profiling_enabled());
    drop(ScopedTimer::for_profiling("traced"));

    set_profiling_enabled(false);
    assert!(!is_profiling_enabled());

    set_profiling_enabled(initial);
}
