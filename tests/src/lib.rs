//! LLM-RAG-OS Test Suite
//!
//! This crate tests kernel code by directly including kernel source files.
//! This bypasses no_std restrictions while testing the actual kernel logic.
//!
//! # How it works
//! 1. We define the kernel's logging macros (kinfo!, kwarn!, etc.) here so
//!    included sources resolve `crate::kinfo!` against this crate
//! 2. We use `#[path = "..."]` to include kernel and module source files directly
//! 3. The `core::` references in kernel code work because std re-exports core
//!
//! Module crates are linked into the same binary, so the `kmod_log_*` imports
//! of a module resolve to the kernel's exported definitions just like the
//! loader's symbol table would on target.

// Re-export alloc crate for kernel code that uses alloc::vec, alloc::string, etc.
extern crate alloc;

// ===========================================================================
// Kernel logging macros - same shape as the kernel's, writing to the real
// kernel log ring so tests can inspect what was emitted
// ===========================================================================

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::logger::log($level, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kfatal {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::FATAL, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::ERROR, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::WARN, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::INFO, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::DEBUG, $($arg)*);
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::TRACE, $($arg)*);
    }};
}

// ===========================================================================
// Import kernel source files directly using #[path]
// ===========================================================================

// Kernel log and dmesg ring
#[path = "../../src/logger.rs"]
pub mod logger;

// POSIX errno values
#[path = "../../src/posix.rs"]
pub mod posix;

// Module loader, modinfo, symbol table, taint
#[path = "../../src/kmod/mod.rs"]
pub mod kmod;

// Kernel bring-up and teardown
#[path = "../../src/init.rs"]
pub mod init;

pub use init::{kernel_init, kernel_shutdown};

// ===========================================================================
// Kernel modules
// ===========================================================================

// LLM skeleton module (modules/llm)
#[allow(unused_attributes)]
#[path = "../../modules/llm/src/lib.rs"]
pub mod llm_module;

// ===========================================================================
// Test modules
// ===========================================================================

#[cfg(test)]
mod tests;
