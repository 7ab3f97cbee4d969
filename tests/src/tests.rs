//! Kernel and module tests
//!
//! Tests the kernel core and the modules it loads:
//! - Kernel log (levels, dmesg ring, console sink, cmdline directives)
//! - NKM images and modinfo string tables
//! - Module loader lifecycle (load, init, unload, dependencies, errors)
//! - Exported symbol table and the kmod_log_* API
//! - Taint tracking
//! - The LLM skeleton module
//! - Kernel bring-up and shutdown
//!
//! Everything here shares the kernel's global state (module registry, log
//! ring, taint mask). Tests that touch it are `#[serial]`; tests that leave
//! state behind which cannot be undone (taint, blacklist, logger init) run
//! in a forked process via `rusty_fork_test!`.

mod support;

mod modinfo_tests;
