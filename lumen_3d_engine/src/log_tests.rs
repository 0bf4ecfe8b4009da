//! Unit tests for log.rs
//!
//! Tests LogSeverity ordering, DefaultLogger filtering and plain formatting.

use crate::log::{format_plain, DefaultLogger, LogEntry, LogSeverity, Logger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "lumen3d::RenderSystem".to_string(),
        message: "swapchain recreated".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug_names() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_filters_below_min_severity() {
    let logger = DefaultLogger::new(LogSeverity::Warn);
    assert!(!logger.accepts(LogSeverity::Trace));
    assert!(!logger.accepts(LogSeverity::Info));
    assert!(logger.accepts(LogSeverity::Warn));
    assert!(logger.accepts(LogSeverity::Error));
}

#[test]
fn test_default_logger_default_threshold() {
    let logger = DefaultLogger::default();
    if cfg!(debug_assertions) {
        assert_eq!(logger.min_severity(), LogSeverity::Debug);
    } else {
        assert_eq!(logger.min_severity(), LogSeverity::Info);
    }
}

#[test]
fn test_default_logger_prints_every_severity() {
    let logger = DefaultLogger::new(LogSeverity::Trace);
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("render_system.rs"), Some(42)));
    }
}

// ============================================================================
// FORMAT TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let line = format_plain(&entry(LogSeverity::Info, None, None));
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[lumen3d::RenderSystem]"));
    assert!(line.ends_with("swapchain recreated"));
}

#[test]
fn test_format_plain_with_location() {
    let line = format_plain(&entry(LogSeverity::Error, Some("vulkan.rs"), Some(123)));
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("(vulkan.rs:123)"));
}

#[test]
fn test_format_plain_ignores_partial_location() {
    let line = format_plain(&entry(LogSeverity::Warn, Some("vulkan.rs"), None));
    assert!(!line.contains("vulkan.rs"));
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}
