//! NKM container and module metadata
//!
//! An `.nkm` image starts with a fixed little-endian header followed by a
//! string table of `key=value\0` entries, the same shape as the `.modinfo`
//! section of a Linux `.ko`:
//!
//! ```text
//! version=1.0.0\0description=...\0author=...\0license=GPL\0srcversion=in-tree\0
//! ```
//!
//! Recognised keys are `version`, `description`, `author`, `license`,
//! `srcversion` and `depends` (comma separated). Unknown keys are ignored so
//! newer tooling can add fields.

use alloc::string::String;
use alloc::vec::Vec;

use super::{ModuleError, ModuleType};

/// NKM file magic number: "NKM\x01"
pub const NKM_MAGIC: [u8; 4] = [b'N', b'K', b'M', 0x01];

/// NKM format version
pub const NKM_VERSION: u8 = 1;

/// Maximum module name length (including the terminating NUL)
pub const MAX_MODULE_NAME: usize = 32;

/// On-disk size of `NkmHeader`
pub const NKM_HEADER_SIZE: usize = 72;

/// Offset of the string table in images produced by `generate_nkm`
const NKM_STRING_TABLE_OFFSET: usize = 80;

/// srcversion of modules built from this tree
pub const SRCVERSION_IN_TREE: &str = "in-tree";

/// NKM file header (on-disk format)
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct NkmHeader {
    /// Magic number: "NKM\x01"
    pub magic: [u8; 4],
    /// Format version
    pub version: u8,
    /// Module type
    pub module_type: u8,
    /// Number of dependencies
    pub dep_count: u8,
    /// Reserved for future use
    pub flags: u8,
    /// Offset to code section from start of file
    pub code_offset: u32,
    /// Size of code section in bytes
    pub code_size: u32,
    /// Offset to init function within code section
    pub init_offset: u32,
    /// Size of init function
    pub init_size: u32,
    /// Reserved for alignment
    pub reserved: [u8; 8],
    /// Offset to string table
    pub string_table_offset: u32,
    /// Size of string table
    pub string_table_size: u32,
    /// Module name (null-terminated)
    pub name: [u8; MAX_MODULE_NAME],
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

impl NkmHeader {
    /// Parse NKM header from raw bytes
    pub fn parse(data: &[u8]) -> Result<Self, ModuleError> {
        if data.len() < NKM_HEADER_SIZE {
            return Err(ModuleError::FileTooSmall);
        }

        let magic = [data[0], data[1], data[2], data[3]];
        if magic != NKM_MAGIC {
            return Err(ModuleError::InvalidMagic);
        }

        let version = data[4];
        if version != NKM_VERSION {
            return Err(ModuleError::UnsupportedVersion);
        }

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&data[24..32]);
        let mut name = [0u8; MAX_MODULE_NAME];
        name.copy_from_slice(&data[40..40 + MAX_MODULE_NAME]);

        Ok(Self {
            magic,
            version,
            module_type: data[5],
            dep_count: data[6],
            flags: data[7],
            code_offset: read_u32(data, 8),
            code_size: read_u32(data, 12),
            init_offset: read_u32(data, 16),
            init_size: read_u32(data, 20),
            reserved,
            string_table_offset: read_u32(data, 32),
            string_table_size: read_u32(data, 36),
            name,
        })
    }

    /// Module name, empty when the field is not valid UTF-8
    pub fn name_str(&self) -> &str {
        let end = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(MAX_MODULE_NAME);
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn module_type(&self) -> ModuleType {
        ModuleType::from_u8(self.module_type)
    }

    /// Slice of `data` holding the string table. Empty if the image has none.
    pub fn string_table<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], ModuleError> {
        let offset = self.string_table_offset as usize;
        let size = self.string_table_size as usize;
        if size == 0 {
            return Ok(&[]);
        }
        let end = offset.checked_add(size).ok_or(ModuleError::InvalidFormat)?;
        if offset < NKM_HEADER_SIZE || end > data.len() {
            return Err(ModuleError::InvalidFormat);
        }
        Ok(&data[offset..end])
    }
}

/// Module metadata carried in the string table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModInfo {
    pub version: String,
    pub description: String,
    /// Repeated `author=` entries are joined with ", "
    pub author: String,
    pub license: String,
    pub srcversion: String,
    pub depends: Vec<String>,
}

impl ModInfo {
    pub fn parse(table: &[u8]) -> Result<Self, ModuleError> {
        let mut info = Self::default();

        for raw in table.split(|&b| b == 0).filter(|entry| !entry.is_empty()) {
            let entry = core::str::from_utf8(raw).map_err(|_| ModuleError::InvalidFormat)?;
            let (key, value) = entry.split_once('=').ok_or(ModuleError::InvalidFormat)?;

            match key {
                "version" => info.version = String::from(value),
                "description" => info.description = String::from(value),
                "author" => {
                    if !info.author.is_empty() {
                        info.author.push_str(", ");
                    }
                    info.author.push_str(value);
                }
                "license" => info.license = String::from(value),
                "srcversion" => info.srcversion = String::from(value),
                "depends" => {
                    info.depends = value
                        .split(',')
                        .map(str::trim)
                        .filter(|dep| !dep.is_empty())
                        .map(String::from)
                        .collect();
                }
                _ => {}
            }
        }

        Ok(info)
    }

    /// Serialize back to `key=value\0` entries, skipping empty fields.
    pub fn encode(&self) -> Vec<u8> {
        let mut table = Vec::new();
        let mut push = |key: &str, value: &str| {
            if value.is_empty() {
                return;
            }
            table.extend_from_slice(key.as_bytes());
            table.push(b'=');
            table.extend_from_slice(value.as_bytes());
            table.push(0);
        };

        push("version", &self.version);
        push("description", &self.description);
        push("author", &self.author);
        push("license", &self.license);
        push("srcversion", &self.srcversion);
        push("depends", &self.depends.join(","));

        table
    }

    pub fn is_gpl_compatible(&self) -> bool {
        license_is_gpl_compatible(&self.license)
    }

    pub fn is_in_tree(&self) -> bool {
        self.srcversion == SRCVERSION_IN_TREE
    }
}

/// Licenses that do not taint the kernel. A missing license is proprietary.
pub fn license_is_gpl_compatible(license: &str) -> bool {
    matches!(
        license,
        "GPL"
            | "GPL v2"
            | "GPL and additional rights"
            | "Dual BSD/GPL"
            | "Dual MIT/GPL"
            | "Dual MPL/GPL"
            | "MIT"
    )
}

/// Build an NKM image for a built-in module from its modinfo string table.
pub fn generate_nkm(name: &str, module_type: ModuleType, modinfo: &[u8]) -> Vec<u8> {
    let dep_count = ModInfo::parse(modinfo)
        .map(|info| info.depends.len().min(u8::MAX as usize) as u8)
        .unwrap_or(0);

    let mut data = Vec::with_capacity(NKM_STRING_TABLE_OFFSET + modinfo.len());

    data.extend_from_slice(&NKM_MAGIC);
    data.push(NKM_VERSION);
    data.push(module_type as u8);
    data.push(dep_count);
    data.push(0); // flags

    // Built-in modules carry no code section
    let table_offset = NKM_STRING_TABLE_OFFSET as u32;
    data.extend_from_slice(&table_offset.to_le_bytes()); // code_offset
    data.extend_from_slice(&0u32.to_le_bytes()); // code_size
    data.extend_from_slice(&0u32.to_le_bytes()); // init_offset
    data.extend_from_slice(&0u32.to_le_bytes()); // init_size

    data.extend_from_slice(&[0u8; 8]);

    data.extend_from_slice(&table_offset.to_le_bytes());
    data.extend_from_slice(&(modinfo.len() as u32).to_le_bytes());

    let mut name_buf = [0u8; MAX_MODULE_NAME];
    let mut name_len = name.len().min(MAX_MODULE_NAME - 1);
    while !name.is_char_boundary(name_len) {
        name_len -= 1;
    }
    name_buf[..name_len].copy_from_slice(&name.as_bytes()[..name_len]);
    data.extend_from_slice(&name_buf);

    data.resize(NKM_STRING_TABLE_OFFSET, 0);
    data.extend_from_slice(modinfo);

    data
}
