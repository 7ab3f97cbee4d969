//! Kernel bring-up and teardown for the module subsystem
//!
//! `kernel_init` is the owner of the load/unload lifecycle: once it has run,
//! modules can be handed to `kmod::load_module`. `kernel_shutdown` unloads
//! whatever is still loaded, newest first, so dependents go before the
//! modules they pin.

use crate::{kinfo, kmod, kwarn, logger};

pub fn kernel_init(cmdline: Option<&str>) {
    logger::init();

    if let Some(line) = cmdline {
        if let Some(level) = logger::parse_level_directive(line) {
            logger::set_max_level(level);
        }
    }

    kinfo!("Kernel log level set to {}", logger::max_level().as_str());

    kmod::init();

    if let Some(line) = cmdline {
        kmod::apply_cmdline(line);
    }
}

/// Unload every module in reverse load order. Returns how many were unloaded.
pub fn kernel_shutdown() -> usize {
    let modules = kmod::list_modules();
    kinfo!("Shutting down: unloading {} module(s)", modules.len());

    let mut unloaded = 0;
    for info in modules.iter().rev() {
        match kmod::unload_module(&info.name) {
            Ok(()) => unloaded += 1,
            Err(e) => kwarn!("Failed to unload module '{}': {}", info.name, e),
        }
    }

    unloaded
}
