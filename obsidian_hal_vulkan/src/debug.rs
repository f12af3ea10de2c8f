/// Vulkan Debug Messenger - forwards validation layer messages to the HAL logger
///
/// Only compiled with the `vulkan-validation` feature. Messages are routed
/// through `obsidian::log` under the `obsidian::vulkan::validation` source,
/// counted per severity, and identical messages are grouped so repeats show
/// an occurrence counter.

use ash::vk;
use colored::*;
use obsidian_hal::obsidian::log::{log, LogSeverity};
use obsidian_hal::obsidian::DebugSeverity;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

const SOURCE: &str = "obsidian::vulkan::validation";

/// Callback configuration, `None` outside the backend's lifetime
static DEBUG_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Per-severity message counters
static COUNTERS: SeverityCounters = SeverityCounters::new();

/// Occurrences of each distinct message text
static REPEATS: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Messenger configuration
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Lowest severity forwarded to the logger
    pub severity: DebugSeverity,
    /// Count messages and group repeats
    pub enable_stats: bool,
}

/// Validation message counts since the backend was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

const ERRORS: usize = 0;
const WARNINGS: usize = 1;
const INFO: usize = 2;
const VERBOSE: usize = 3;

struct SeverityCounters([AtomicU32; 4]);

impl SeverityCounters {
    const fn new() -> Self {
        Self([AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)])
    }

    fn bump(&self, severity: LogSeverity) {
        let slot = match severity {
            LogSeverity::Error => ERRORS,
            LogSeverity::Warn => WARNINGS,
            LogSeverity::Info => INFO,
            LogSeverity::Debug | LogSeverity::Trace => VERBOSE,
        };
        self.0[slot].fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ValidationStats {
        let read = |slot: usize| self.0[slot].load(Ordering::Relaxed);
        ValidationStats {
            errors: read(ERRORS),
            warnings: read(WARNINGS),
            info: read(INFO),
            verbose: read(VERBOSE),
        }
    }

    fn clear(&self) {
        for counter in &self.0 {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Record one more occurrence of `message`, returning how many were seen
fn count_repeat(message: &str) -> u32 {
    match REPEATS.lock() {
        Ok(mut repeats) => {
            let count = repeats.get_or_insert_with(FxHashMap::default).entry(message.to_string()).or_insert(0);
            *count += 1;
            *count
        }
        Err(_) => 1,
    }
}

/// Initialize debug configuration, resetting statistics
pub(crate) fn init_debug_config(config: Config) {
    COUNTERS.clear();

    if let Ok(mut repeats) = REPEATS.lock() {
        *repeats = Some(FxHashMap::default());
    }
    if let Ok(mut debug_config) = DEBUG_CONFIG.lock() {
        *debug_config = Some(config);
    }
}

/// Drop the configuration so late callbacks during teardown are ignored
pub(crate) fn cleanup_debug_config() {
    if let Ok(mut debug_config) = DEBUG_CONFIG.lock() {
        *debug_config = None;
    }
}

/// Severity flags the messenger subscribes to
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::WarningsAndAbove => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// HAL log severity for a Vulkan message severity
pub(crate) fn log_severity(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Info
    } else {
        LogSeverity::Trace
    }
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Current validation statistics
pub fn validation_stats() -> ValidationStats {
    COUNTERS.snapshot()
}

/// Print the message counts gathered so far to stdout
pub fn print_validation_stats_report() {
    let stats = validation_stats();

    if stats.total() == 0 {
        println!("{}", "Vulkan validation: clean".green().bold());
        return;
    }

    let rows = [
        ("errors", stats.errors, Color::Red),
        ("warnings", stats.warnings, Color::Yellow),
        ("info", stats.info, Color::Cyan),
        ("verbose", stats.verbose, Color::BrightBlack),
    ];

    println!("{}", "Vulkan validation messages".bright_blue().bold());
    for (label, count, color) in rows {
        if count > 0 {
            println!("  {:<9}{}", label.color(color), count);
        }
    }
    println!("  {:<9}{}", "total".bold(), stats.total());

    let repeated = REPEATS
        .lock()
        .ok()
        .and_then(|repeats| repeats.as_ref().map(|map| map.values().filter(|&&count| count > 1).count()))
        .unwrap_or(0);
    if repeated > 0 {
        println!("  {} distinct message(s) repeated", repeated);
    }
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        fallback.into()
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers; never aborts the Vulkan call.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let data = &*p_callback_data;
    let message_id_name = c_str_or(data.p_message_id_name, "Unknown");
    let message = c_str_or(data.p_message, "No message");

    let config = match DEBUG_CONFIG.lock() {
        Ok(guard) => match *guard {
            Some(config) => config,
            None => return vk::FALSE,
        },
        Err(_) => return vk::FALSE,
    };

    if !severity_flags(config.severity).intersects(message_severity) {
        return vk::FALSE;
    }

    let severity = log_severity(message_severity);

    let repeats = if config.enable_stats {
        COUNTERS.bump(severity);
        count_repeat(&message)
    } else {
        1
    };
    let repeat_suffix = if repeats > 1 { format!(" [x{}]", repeats) } else { String::new() };

    log(
        severity,
        SOURCE,
        format!(
            "[{}]{} {}: {}",
            message_type_name(message_type),
            repeat_suffix,
            message_id_name,
            message
        ),
    );

    vk::FALSE
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
