//! Unit tests for the validation debug messenger
//!
//! The callback is driven directly with hand-built callback data, no
//! Vulkan instance required.

use super::*;
use serial_test::serial;

fn fire(severity: vk::DebugUtilsMessageSeverityFlagsEXT, message: &CStr) -> vk::Bool32 {
    let data = vk::DebugUtilsMessengerCallbackDataEXT::default()
        .message_id_name(c"VUID-obsidian-test")
        .message(message);
    unsafe {
        vulkan_debug_callback(
            severity,
            vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            &data,
            std::ptr::null_mut(),
        )
    }
}

// ============================================================================
// SEVERITY MAPPING TESTS
// ============================================================================

#[test]
fn test_severity_flags() {
    assert_eq!(
        severity_flags(DebugSeverity::ErrorsOnly),
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
    );
    assert!(severity_flags(DebugSeverity::WarningsAndAbove)
        .contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
    assert!(!severity_flags(DebugSeverity::WarningsAndAbove)
        .contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
    assert!(severity_flags(DebugSeverity::All).contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}

#[test]
fn test_log_severity() {
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR), LogSeverity::Error);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING), LogSeverity::Warn);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::INFO), LogSeverity::Info);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE), LogSeverity::Trace);
}

#[test]
fn test_validation_stats_total() {
    let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
    assert_eq!(stats.total(), 10);
    assert_eq!(ValidationStats::default().total(), 0);
}

// ============================================================================
// CALLBACK TESTS
// ============================================================================

#[test]
#[serial]
fn test_callback_counts_messages() {
    init_debug_config(Config { severity: DebugSeverity::All, enable_stats: true });

    assert_eq!(fire(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, c"first"), vk::FALSE);
    assert_eq!(fire(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, c"first"), vk::FALSE);
    assert_eq!(fire(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, c"second"), vk::FALSE);

    let stats = validation_stats();
    assert_eq!(stats.errors, 2);
    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.total(), 3);

    cleanup_debug_config();
}

#[test]
#[serial]
fn test_callback_filters_by_severity() {
    init_debug_config(Config { severity: DebugSeverity::ErrorsOnly, enable_stats: true });

    fire(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, c"filtered");
    fire(vk::DebugUtilsMessageSeverityFlagsEXT::INFO, c"filtered");
    assert_eq!(validation_stats().total(), 0);

    cleanup_debug_config();
}

#[test]
#[serial]
fn test_callback_ignored_without_config() {
    init_debug_config(Config { severity: DebugSeverity::All, enable_stats: true });
    cleanup_debug_config();

    fire(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, c"late message");
    assert_eq!(validation_stats().total(), 0);
}
