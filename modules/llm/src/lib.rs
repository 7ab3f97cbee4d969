//! LLM Kernel Module for LLM-RAG-OS
//!
//! Skeleton loadable kernel module (.nkm). It announces itself on load and
//! unload and declares the task and scheduler records that later LLM work
//! will be built on. Nothing constructs, queues or frees those records yet.
//!
//! # Module Entry Points
//!
//! - `module_init`: Called when module is loaded
//! - `module_exit`: Called when module is unloaded
//!
//! # Kernel API Usage
//!
//! - Logging (kmod_log_*)

#![no_std]
#![allow(dead_code)]

use core::ffi::{c_char, c_void};
use core::ptr;

// ============================================================================
// Module Metadata
// ============================================================================

/// Module name
pub const MODULE_NAME: &str = "llm";
/// Module version
pub const MODULE_VERSION: &str = "1.0.0";
/// Module description
pub const MODULE_DESC: &str = "Skeleton LLM kernel module";
/// Module type (255 = Other)
pub const MODULE_TYPE: u8 = 255;
/// Module license (GPL, doesn't taint kernel)
pub const MODULE_LICENSE: &str = "GPL";
/// Module author
pub const MODULE_AUTHOR: &str = "LLM-RAG-OS";
/// Source version (in-tree module)
pub const MODULE_SRCVERSION: &str = "in-tree";

/// modinfo string table packed into the .nkm image by the build system
pub const MODULE_INFO: &[u8] = b"version=1.0.0\0\
description=Skeleton LLM kernel module\0\
author=LLM-RAG-OS\0\
license=GPL\0\
srcversion=in-tree\0";

#[used]
#[cfg_attr(target_os = "none", link_section = ".modinfo")]
static MODINFO_SECTION: [u8; MODULE_INFO.len()] = modinfo_section();

const fn modinfo_section() -> [u8; MODULE_INFO.len()] {
    let mut out = [0u8; MODULE_INFO.len()];
    let mut i = 0;
    while i < out.len() {
        out[i] = MODULE_INFO[i];
        i += 1;
    }
    out
}

/// Message logged by `module_init`
pub const LOAD_MESSAGE: &[u8] = b"LLM kernel module loaded\n";
/// Message logged by `module_exit`
pub const UNLOAD_MESSAGE: &[u8] = b"LLM kernel module unloaded\n";

// ============================================================================
// Kernel API declarations (resolved at load time from kernel symbol table)
// ============================================================================

extern "C" {
    fn kmod_log_info(msg: *const u8, len: usize);
    fn kmod_log_error(msg: *const u8, len: usize);
}

macro_rules! mod_info {
    ($msg:expr) => {
        unsafe { kmod_log_info($msg.as_ptr(), $msg.len()) }
    };
}

#[cfg(target_os = "none")]
macro_rules! mod_error {
    ($msg:expr) => {
        unsafe { kmod_log_error($msg.as_ptr(), $msg.len()) }
    };
}

// ============================================================================
// Data model
// ============================================================================

/// A unit of LLM work: a prompt and the context it runs against.
///
/// Both fields are opaque; the module never reads or frees them.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LlmTask {
    pub prompt: *const c_char,
    pub context: *mut c_void,
}

impl LlmTask {
    pub const fn empty() -> Self {
        Self {
            prompt: ptr::null(),
            context: ptr::null_mut(),
        }
    }
}

impl Default for LlmTask {
    fn default() -> Self {
        Self::empty()
    }
}

/// Holder for a run of `LlmTask` records and a count.
///
/// `task_count` is not kept in sync with `tasks` by anything.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LlmScheduler {
    pub tasks: *mut LlmTask,
    pub task_count: u32,
}

impl LlmScheduler {
    pub const fn empty() -> Self {
        Self {
            tasks: ptr::null_mut(),
            task_count: 0,
        }
    }
}

impl Default for LlmScheduler {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Module entry points
// ============================================================================

/// Entry point table read by the kernel's module loader
#[repr(C)]
pub struct ModuleEntryPoints {
    pub init: Option<extern "C" fn() -> i32>,
    pub exit: Option<extern "C" fn()>,
}

#[no_mangle]
pub static MODULE_ENTRY_POINTS: ModuleEntryPoints = ModuleEntryPoints {
    init: Some(module_init),
    exit: Some(module_exit),
};

/// Module initialization - called when module is loaded by the kernel
#[no_mangle]
#[inline(never)]
pub extern "C" fn module_init() -> i32 {
    mod_info!(LOAD_MESSAGE);
    0
}

/// Module cleanup - called when module is unloaded
#[no_mangle]
#[inline(never)]
pub extern "C" fn module_exit() {
    mod_info!(UNLOAD_MESSAGE);
}

// ============================================================================
// Panic Handler (required for no_std)
// ============================================================================

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    mod_error!(b"llm module: PANIC!\n");
    loop {
        core::hint::spin_loop();
    }
}
