//! Kernel Module (KMod) support for LLM-RAG-OS
//!
//! This module provides infrastructure for loading and managing kernel modules
//! (.nkm files), similar to Linux's .ko modules.
//!
//! # Module Lifecycle
//!
//! 1. Load: the operator hands the kernel an .nkm image and the module's
//!    entry points (`ModuleEntry`)
//! 2. Verify: header, blacklist, modinfo string table, dependencies
//! 3. Register: add to the module list in state `Loaded`, taint if needed
//! 4. Init: call the module's init function; nonzero aborts the load
//! 5. Running: the module is live until unloaded
//! 6. Unload: `Unloading`, call the module's exit function, remove
//!
//! Entry points are always called with the registry unlocked, so a module
//! may query the subsystem from its own hooks.

pub mod modinfo;
pub mod symbols;
pub mod taint;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

use crate::posix::errno;

pub use modinfo::{
    generate_nkm, license_is_gpl_compatible, ModInfo, NkmHeader, MAX_MODULE_NAME, NKM_MAGIC,
    NKM_VERSION,
};
pub use taint::{add_taint, get_taint, is_tainted, taint_string, TaintFlag};

/// Maximum number of loaded modules
pub const MAX_MODULES: usize = 32;

/// Maximum number of names accepted from `module_blacklist=`
pub const MAX_BLACKLIST: usize = 16;

/// Module state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Module is registered and its init function is running
    Loaded,
    /// Module is initialized and running
    Running,
    /// Module is being unloaded
    Unloading,
}

/// Module type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModuleType {
    /// Filesystem driver
    Filesystem = 1,
    /// Block device driver
    BlockDevice = 2,
    /// Character device driver
    CharDevice = 3,
    /// Network driver
    Network = 4,
    /// Other module type
    Other = 255,
}

impl ModuleType {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ModuleType::Filesystem,
            2 => ModuleType::BlockDevice,
            3 => ModuleType::CharDevice,
            4 => ModuleType::Network,
            _ => ModuleType::Other,
        }
    }
}

/// Module init entry point; 0 means success
pub type ModuleInitFn = extern "C" fn() -> i32;

/// Module exit entry point
pub type ModuleExitFn = extern "C" fn();

/// Entry points of a module, laid out like the `MODULE_ENTRY_POINTS`
/// table a module crate exports.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModuleEntry {
    pub init: Option<ModuleInitFn>,
    pub exit: Option<ModuleExitFn>,
}

impl ModuleEntry {
    /// Metadata-only module without code
    pub const NONE: Self = Self {
        init: None,
        exit: None,
    };

    pub const fn new(init: ModuleInitFn, exit: ModuleExitFn) -> Self {
        Self {
            init: Some(init),
            exit: Some(exit),
        }
    }
}

/// Module metadata (heap-allocated for dynamic strings)
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,
    pub srcversion: String,
    pub module_type: ModuleType,
    /// Current state
    pub state: ModuleState,
    /// Size of the module image in bytes
    pub size: usize,
    pub entry: ModuleEntry,
    /// Module dependencies (names of required modules)
    pub dependencies: Vec<String>,
    /// Reference count (how many modules depend on this)
    pub ref_count: usize,
    /// Loading this module tainted the kernel
    pub taints_kernel: bool,
}

impl ModuleInfo {
    fn from_image(header: &NkmHeader, modinfo: ModInfo, size: usize, entry: ModuleEntry) -> Self {
        let taints_kernel = !modinfo.is_gpl_compatible() || !modinfo.is_in_tree();
        Self {
            name: String::from(header.name_str()),
            version: modinfo.version,
            description: modinfo.description,
            author: modinfo.author,
            license: modinfo.license,
            srcversion: modinfo.srcversion,
            module_type: header.module_type(),
            state: ModuleState::Loaded,
            size,
            entry,
            dependencies: modinfo.depends,
            ref_count: 0,
            taints_kernel,
        }
    }

    /// Check if module can be safely unloaded
    pub fn can_unload(&self) -> bool {
        self.ref_count == 0 && self.state == ModuleState::Running
    }
}

/// Module loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleError {
    /// Invalid magic number
    InvalidMagic,
    /// Unsupported version
    UnsupportedVersion,
    /// File too small
    FileTooSmall,
    /// Invalid module format
    InvalidFormat,
    /// Module already loaded
    AlreadyLoaded,
    /// Too many modules loaded
    TooManyModules,
    /// Module not found
    NotFound,
    /// Missing dependency
    MissingDependency,
    /// Initialization failed
    InitFailed,
    /// Module is in use (has dependents or is mid-transition)
    InUse,
    /// Module name is on the `module_blacklist=` list
    Blacklisted,
}

impl ModuleError {
    /// Positive errno reported to the operator
    pub const fn errno(self) -> i32 {
        match self {
            ModuleError::AlreadyLoaded => errno::EEXIST,
            ModuleError::TooManyModules => errno::ENOMEM,
            ModuleError::InvalidMagic
            | ModuleError::UnsupportedVersion
            | ModuleError::FileTooSmall
            | ModuleError::InvalidFormat
            | ModuleError::InitFailed => errno::ENOEXEC,
            ModuleError::NotFound | ModuleError::MissingDependency => errno::ENOENT,
            ModuleError::InUse => errno::EBUSY,
            ModuleError::Blacklisted => errno::EPERM,
        }
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ModuleError::InvalidMagic => "invalid module magic",
            ModuleError::UnsupportedVersion => "unsupported module format version",
            ModuleError::FileTooSmall => "module image too small",
            ModuleError::InvalidFormat => "invalid module format",
            ModuleError::AlreadyLoaded => "module already loaded",
            ModuleError::TooManyModules => "too many modules loaded",
            ModuleError::NotFound => "module not found",
            ModuleError::MissingDependency => "missing module dependency",
            ModuleError::InitFailed => "module init failed",
            ModuleError::InUse => "module is in use",
            ModuleError::Blacklisted => "module is blacklisted",
        };
        f.write_str(msg)
    }
}

/// Module registry (heap-allocated)
struct ModuleRegistry {
    /// Loaded modules in load order
    modules: Vec<ModuleInfo>,
    /// Names refused by `module_blacklist=`
    blacklist: Vec<String>,
}

impl ModuleRegistry {
    const fn new() -> Self {
        Self {
            modules: Vec::new(),
            blacklist: Vec::new(),
        }
    }

    /// Register a module and pin its dependencies in one step. The caller
    /// has checked the dependencies under the same lock.
    fn register(&mut self, info: ModuleInfo) -> Result<(), ModuleError> {
        if self.modules.iter().any(|m| m.name == info.name) {
            return Err(ModuleError::AlreadyLoaded);
        }

        if self.modules.len() >= MAX_MODULES {
            return Err(ModuleError::TooManyModules);
        }

        for dep in &info.dependencies {
            if let Some(dep_info) = self.find_mut(dep) {
                dep_info.ref_count += 1;
            }
        }

        self.modules.push(info);
        Ok(())
    }

    /// First dependency that is not registered and Running
    fn missing_dependency<'a, S: AsRef<str>>(&self, deps: &'a [S]) -> Option<&'a str> {
        deps.iter().map(|dep| AsRef::<str>::as_ref(dep)).find(|dep| {
            !matches!(self.find(dep), Some(info) if info.state == ModuleState::Running)
        })
    }

    fn find(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules.iter().find(|m| m.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut ModuleInfo> {
        self.modules.iter_mut().find(|m| m.name == name)
    }

    /// Remove a module and drop the references it held on its dependencies.
    fn unregister(&mut self, name: &str) -> Result<ModuleInfo, ModuleError> {
        let pos = self
            .modules
            .iter()
            .position(|m| m.name == name)
            .ok_or(ModuleError::NotFound)?;

        // `remove`, not `swap_remove`: list order is load order
        let info = self.modules.remove(pos);
        for dep in &info.dependencies {
            if let Some(dep_info) = self.find_mut(dep) {
                dep_info.ref_count = dep_info.ref_count.saturating_sub(1);
            }
        }
        Ok(info)
    }

    fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.iter().any(|entry| entry == name)
    }
}

static MODULE_REGISTRY: Mutex<ModuleRegistry> = Mutex::new(ModuleRegistry::new());

/// Initialize the kmod subsystem
pub fn init() {
    // Initialize kernel symbol table first
    symbols::init();
    crate::kinfo!("Kernel module system initialized (max {} modules)", MAX_MODULES);
}

/// Parse `module_blacklist=a,b,c` from the kernel command line.
pub fn parse_blacklist_directive(cmdline: &str) -> Vec<String> {
    let mut names = Vec::new();
    for token in cmdline.split_whitespace() {
        if let Some(("module_blacklist", value)) = token.split_once('=') {
            for name in value.split(',').filter(|name| !name.is_empty()) {
                if names.len() < MAX_BLACKLIST && !names.iter().any(|n| n == name) {
                    names.push(String::from(name));
                }
            }
        }
    }
    names
}

/// Apply module-related kernel command line options.
pub fn apply_cmdline(cmdline: &str) {
    let names = parse_blacklist_directive(cmdline);
    if names.is_empty() {
        return;
    }
    crate::kinfo!("Module blacklist: {}", names.join(","));
    MODULE_REGISTRY.lock().blacklist = names;
}

pub fn is_blacklisted(name: &str) -> bool {
    MODULE_REGISTRY.lock().is_blacklisted(name)
}

/// Load a kernel module from its NKM image and run its init function.
pub fn load_module(data: &[u8], entry: ModuleEntry) -> Result<(), ModuleError> {
    let header = NkmHeader::parse(data)?;
    let name = header.name_str();
    if name.is_empty() {
        return Err(ModuleError::InvalidFormat);
    }

    crate::kinfo!(
        "Loading kernel module: {} (type: {:?})",
        name,
        header.module_type()
    );

    if is_blacklisted(name) {
        crate::kwarn!("Module '{}' is blacklisted, refusing to load", name);
        return Err(ModuleError::Blacklisted);
    }

    let modinfo = ModInfo::parse(header.string_table(data)?)?;
    let proprietary = !modinfo.is_gpl_compatible();
    let out_of_tree = !modinfo.is_in_tree();
    let info = ModuleInfo::from_image(&header, modinfo, data.len(), entry);
    let module_name = info.name.clone();

    let missing = {
        let mut registry = MODULE_REGISTRY.lock();
        match registry.missing_dependency(&info.dependencies) {
            Some(dep) => Some(String::from(dep)),
            None => {
                registry.register(info)?;
                None
            }
        }
    };
    if let Some(dep) = missing {
        crate::kwarn!("Missing module dependency: {}", dep);
        return Err(ModuleError::MissingDependency);
    }

    if proprietary {
        crate::kwarn!("{}: module license taints kernel", module_name);
        add_taint(TaintFlag::ProprietaryModule);
    }
    if out_of_tree {
        crate::kwarn!("{}: loading out-of-tree module taints kernel", module_name);
        add_taint(TaintFlag::OutOfTreeModule);
    }

    if let Some(init) = entry.init {
        let ret = init();
        if ret != 0 {
            crate::kwarn!("Module '{}' init returned error code: {}", module_name, ret);
            let unregistered = MODULE_REGISTRY.lock().unregister(&module_name);
            if let Err(e) = unregistered {
                crate::kerror!(
                    "Module '{}' left registered after failed init: {}",
                    module_name,
                    e
                );
            }
            return Err(ModuleError::InitFailed);
        }
    }

    let version = {
        let mut registry = MODULE_REGISTRY.lock();
        match registry.find_mut(&module_name) {
            Some(mod_info) => {
                mod_info.state = ModuleState::Running;
                mod_info.version.clone()
            }
            None => String::new(),
        }
    };

    crate::kinfo!(
        "Module '{}' loaded successfully (version: {})",
        module_name,
        version
    );

    Ok(())
}

/// Check if a module is loaded
pub fn is_loaded(name: &str) -> bool {
    MODULE_REGISTRY.lock().find(name).is_some()
}

/// Get module info (returns cloned data)
pub fn get_module_info(name: &str) -> Option<ModuleInfo> {
    MODULE_REGISTRY.lock().find(name).cloned()
}

/// Unload a module
pub fn unload_module(name: &str) -> Result<(), ModuleError> {
    unload(name, false)
}

/// Unload a module even if other modules still depend on it.
pub fn force_unload_module(name: &str) -> Result<(), ModuleError> {
    unload(name, true)
}

fn unload(name: &str, force: bool) -> Result<(), ModuleError> {
    crate::kinfo!("Unloading kernel module: {}", name);

    // Check if module can be unloaded and set state
    let checked = {
        let mut registry = MODULE_REGISTRY.lock();
        let info = registry.find_mut(name).ok_or(ModuleError::NotFound)?;
        if info.state != ModuleState::Running || (info.ref_count > 0 && !force) {
            Err((info.state, info.ref_count))
        } else {
            info.state = ModuleState::Unloading;
            Ok(info.entry)
        }
    };

    let entry = match checked {
        Ok(entry) => entry,
        Err((state, ref_count)) => {
            crate::kwarn!(
                "Module '{}' cannot be unloaded (state={:?}, ref_count={})",
                name,
                state,
                ref_count
            );
            return Err(ModuleError::InUse);
        }
    };

    if force {
        add_taint(TaintFlag::ForcedUnload);
    }

    if let Some(exit) = entry.exit {
        exit();
    }

    MODULE_REGISTRY.lock().unregister(name)?;

    crate::kinfo!("Module '{}' unloaded", name);
    Ok(())
}

/// List all loaded modules, in load order
pub fn list_modules() -> Vec<ModuleInfo> {
    MODULE_REGISTRY.lock().modules.clone()
}

/// Get module count
pub fn module_count() -> usize {
    MODULE_REGISTRY.lock().modules.len()
}

// ============================================================================
// Module Statistics and Diagnostics
// ============================================================================

/// Module subsystem statistics
#[derive(Debug, Clone)]
pub struct ModuleStats {
    /// Total number of loaded modules
    pub loaded_count: usize,
    /// Total image bytes held by loaded modules
    pub total_memory: usize,
    /// Number of modules by type
    pub by_type: ModuleTypeStats,
}

/// Module counts by type
#[derive(Debug, Clone, Default)]
pub struct ModuleTypeStats {
    pub filesystem: usize,
    pub block_device: usize,
    pub char_device: usize,
    pub network: usize,
    pub other: usize,
}

/// Get module subsystem statistics
pub fn get_module_stats() -> ModuleStats {
    let registry = MODULE_REGISTRY.lock();
    let mut stats = ModuleStats {
        loaded_count: registry.modules.len(),
        total_memory: 0,
        by_type: ModuleTypeStats::default(),
    };

    for info in &registry.modules {
        stats.total_memory += info.size;
        match info.module_type {
            ModuleType::Filesystem => stats.by_type.filesystem += 1,
            ModuleType::BlockDevice => stats.by_type.block_device += 1,
            ModuleType::CharDevice => stats.by_type.char_device += 1,
            ModuleType::Network => stats.by_type.network += 1,
            ModuleType::Other => stats.by_type.other += 1,
        }
    }

    stats
}

/// Print module subsystem status to kernel log
pub fn print_module_status() {
    let stats = get_module_stats();
    let symbol_stats = symbols::get_symbol_stats();

    crate::kinfo!("=== Kernel Module Subsystem Status ===");
    crate::kinfo!("Loaded modules: {}", stats.loaded_count);
    crate::kinfo!("Total module memory: {} bytes", stats.total_memory);
    crate::kinfo!(
        "By type: fs={} blk={} chr={} net={} other={}",
        stats.by_type.filesystem,
        stats.by_type.block_device,
        stats.by_type.char_device,
        stats.by_type.network,
        stats.by_type.other
    );
    crate::kinfo!(
        "Symbol table: {} symbols, {} bytes",
        symbol_stats.symbol_count,
        symbol_stats.total_bytes
    );
    crate::kinfo!("Taint: {}", taint_string());

    // Snapshot first: never log while holding the registry lock
    for info in list_modules() {
        crate::kinfo!(
            "  - {} v{} ({:?}, {:?}, {}) {} bytes, refs={}",
            info.name,
            info.version,
            info.module_type,
            info.state,
            info.license,
            info.size,
            info.ref_count
        );
    }
}

/// Find modules by type
pub fn find_modules_by_type(module_type: ModuleType) -> Vec<ModuleInfo> {
    MODULE_REGISTRY
        .lock()
        .modules
        .iter()
        .filter(|m| m.module_type == module_type)
        .cloned()
        .collect()
}

/// Check if all dependencies for a module are loaded and running
pub fn check_dependencies(deps: &[&str]) -> Result<(), ModuleError> {
    let missing = MODULE_REGISTRY
        .lock()
        .missing_dependency(deps)
        .map(String::from);

    match missing {
        Some(dep) => {
            crate::kwarn!("Missing module dependency: {}", dep);
            Err(ModuleError::MissingDependency)
        }
        None => Ok(()),
    }
}
