//! Shared fixtures for building module images and reading the kernel log

use crate::kmod::{self, generate_nkm, ModInfo, ModuleEntry, ModuleType};
use crate::llm_module;
use crate::logger::{self, LogLevel, LogRecord};

/// modinfo table for an in-tree GPL module
pub fn gpl_modinfo(depends: &[&str]) -> Vec<u8> {
    modinfo_with("GPL", "in-tree", depends)
}

pub fn modinfo_with(license: &str, srcversion: &str, depends: &[&str]) -> Vec<u8> {
    ModInfo {
        version: String::from("1.0.0"),
        description: String::from("test module"),
        author: String::from("kmod tests"),
        license: String::from(license),
        srcversion: String::from(srcversion),
        depends: depends.iter().map(|dep| dep.to_string()).collect(),
    }
    .encode()
}

/// NKM image for an in-tree GPL module of type Other
pub fn image(name: &str, depends: &[&str]) -> Vec<u8> {
    generate_nkm(name, ModuleType::Other, &gpl_modinfo(depends))
}

pub fn llm_image() -> Vec<u8> {
    generate_nkm(
        llm_module::MODULE_NAME,
        ModuleType::Other,
        llm_module::MODULE_INFO,
    )
}

pub fn llm_entry() -> ModuleEntry {
    ModuleEntry::new(llm_module::module_init, llm_module::module_exit)
}

/// Unload everything (newest first) and put the logger back to defaults.
pub fn reset_kernel() {
    logger::set_max_level(LogLevel::INFO);
    logger::set_console(None);
    logger::set_clock(None);
    for info in kmod::list_modules().iter().rev() {
        let _ = kmod::unload_module(&info.name);
    }
    logger::clear();
}

/// Records written after `since` whose message contains `needle`
pub fn records_matching(since: u64, needle: &str) -> Vec<LogRecord> {
    logger::records_since(since)
        .into_iter()
        .filter(|record| record.message.contains(needle))
        .collect()
}
