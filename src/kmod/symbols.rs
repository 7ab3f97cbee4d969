//! Kernel Symbol Table for Module Support
//!
//! This module exports kernel APIs that loadable modules can use.
//! Similar to Linux's EXPORT_SYMBOL mechanism.

use alloc::string::String;
use alloc::vec::Vec;

use spin::Mutex;

/// Symbol table entry
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KernelSymbol {
    /// Symbol name (null-terminated in the string table)
    pub name_offset: u32,
    /// Symbol address
    pub address: u64,
    /// Symbol type
    pub sym_type: SymbolType,
}

/// Symbol types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    Function = 1,
    Data = 2,
}

/// Maximum number of exported symbols
const MAX_SYMBOLS: usize = 64;

/// Size of the symbol name string table
const NAME_TABLE_SIZE: usize = 2048;

/// Kernel symbol registry
pub struct SymbolTable {
    symbols: [Option<KernelSymbol>; MAX_SYMBOLS],
    names: [u8; NAME_TABLE_SIZE],
    name_offset: usize,
    count: usize,
}

impl SymbolTable {
    const fn new() -> Self {
        const NONE: Option<KernelSymbol> = None;
        Self {
            symbols: [NONE; MAX_SYMBOLS],
            names: [0; NAME_TABLE_SIZE],
            name_offset: 0,
            count: 0,
        }
    }

    /// Register a new symbol. Re-registering an existing name updates it.
    pub fn register(&mut self, name: &str, address: u64, sym_type: SymbolType) -> bool {
        if name.is_empty() {
            return false;
        }

        if let Some(idx) = self.position(name) {
            if let Some(sym) = self.symbols[idx].as_mut() {
                sym.address = address;
                sym.sym_type = sym_type;
            }
            return true;
        }

        if self.count >= MAX_SYMBOLS {
            return false;
        }

        let name_len = name.len();
        if self.name_offset + name_len + 1 > self.names.len() {
            return false;
        }

        // Store name in string table
        let name_start = self.name_offset;
        self.names[name_start..name_start + name_len].copy_from_slice(name.as_bytes());
        self.names[name_start + name_len] = 0;
        self.name_offset += name_len + 1;

        self.symbols[self.count] = Some(KernelSymbol {
            name_offset: name_start as u32,
            address,
            sym_type,
        });
        self.count += 1;

        true
    }

    fn position(&self, name: &str) -> Option<usize> {
        (0..self.count).find(|&i| {
            self.symbols[i]
                .as_ref()
                .map(|sym| self.get_name(sym.name_offset as usize) == name)
                .unwrap_or(false)
        })
    }

    /// Lookup a symbol by name
    pub fn lookup(&self, name: &str) -> Option<u64> {
        self.position(name)
            .and_then(|i| self.symbols[i].as_ref())
            .map(|sym| sym.address)
    }

    /// Get symbol name from string table
    fn get_name(&self, offset: usize) -> &str {
        let start = offset;
        let mut end = start;
        while end < self.names.len() && self.names[end] != 0 {
            end += 1;
        }
        core::str::from_utf8(&self.names[start..end]).unwrap_or("")
    }

    /// Get all registered symbols
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        (0..self.count).filter_map(move |i| {
            self.symbols[i]
                .as_ref()
                .map(|sym| (self.get_name(sym.name_offset as usize), sym.address))
        })
    }
}

static KERNEL_SYMBOLS: Mutex<SymbolTable> = Mutex::new(SymbolTable::new());

/// Symbol table usage
#[derive(Debug, Clone, Copy)]
pub struct SymbolStats {
    pub symbol_count: usize,
    /// Bytes used in the name string table
    pub total_bytes: usize,
}

/// Initialize the kernel symbol table with exported APIs
pub fn init() {
    register_symbol("kmod_log_info", kmod_log_info as *const () as u64, SymbolType::Function);
    register_symbol("kmod_log_warn", kmod_log_warn as *const () as u64, SymbolType::Function);
    register_symbol("kmod_log_error", kmod_log_error as *const () as u64, SymbolType::Function);
    register_symbol("kmod_log_debug", kmod_log_debug as *const () as u64, SymbolType::Function);

    crate::kdebug!("Kernel symbol table initialized with {} symbols", symbol_count());
}

/// Register a kernel symbol
pub fn register_symbol(name: &str, address: u64, sym_type: SymbolType) -> bool {
    KERNEL_SYMBOLS.lock().register(name, address, sym_type)
}

/// Lookup a kernel symbol by name
pub fn lookup_symbol(name: &str) -> Option<u64> {
    KERNEL_SYMBOLS.lock().lookup(name)
}

/// Get the number of registered symbols
pub fn symbol_count() -> usize {
    KERNEL_SYMBOLS.lock().count
}

/// List all exported symbols
pub fn list_symbols() -> Vec<(String, u64)> {
    KERNEL_SYMBOLS
        .lock()
        .iter()
        .map(|(name, addr)| (String::from(name), addr))
        .collect()
}

pub fn get_symbol_stats() -> SymbolStats {
    let table = KERNEL_SYMBOLS.lock();
    SymbolStats {
        symbol_count: table.count,
        total_bytes: table.name_offset,
    }
}

// ============================================================================
// Kernel API Functions (exported to modules)
// ============================================================================

/// Borrow a module-supplied message, dropping one trailing newline.
///
/// # Safety
///
/// `msg` must point to `len` readable bytes.
unsafe fn module_message<'a>(msg: *const u8, len: usize) -> Option<&'a str> {
    if msg.is_null() || len == 0 {
        return None;
    }
    let bytes = core::slice::from_raw_parts(msg, len);
    let text = core::str::from_utf8(bytes).ok()?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Log an info message from a module
#[no_mangle]
pub extern "C" fn kmod_log_info(msg: *const u8, len: usize) {
    if let Some(s) = unsafe { module_message(msg, len) } {
        crate::kinfo!("[kmod] {}", s);
    }
}

/// Log a warning message from a module
#[no_mangle]
pub extern "C" fn kmod_log_warn(msg: *const u8, len: usize) {
    if let Some(s) = unsafe { module_message(msg, len) } {
        crate::kwarn!("[kmod] {}", s);
    }
}

/// Log an error message from a module
#[no_mangle]
pub extern "C" fn kmod_log_error(msg: *const u8, len: usize) {
    if let Some(s) = unsafe { module_message(msg, len) } {
        crate::kerror!("[kmod] {}", s);
    }
}

/// Log a debug message from a module
#[no_mangle]
pub extern "C" fn kmod_log_debug(msg: *const u8, len: usize) {
    if let Some(s) = unsafe { module_message(msg, len) } {
        crate::kdebug!("[kmod] {}", s);
    }
}
