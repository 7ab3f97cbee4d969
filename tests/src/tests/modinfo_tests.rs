//! NKM format and modinfo tests (from src/kmod/modinfo.rs)

use super::support::{gpl_modinfo, image};
use crate::kmod::modinfo::{NKM_HEADER_SIZE, SRCVERSION_IN_TREE};
use crate::kmod::{
    generate_nkm, license_is_gpl_compatible, ModInfo, ModuleError, ModuleType, NkmHeader,
    MAX_MODULE_NAME, NKM_MAGIC, NKM_VERSION,
};
use crate::llm_module;

#[test]
fn test_generate_and_parse_nkm() {
    let data = generate_nkm("ext2", ModuleType::Filesystem, &gpl_modinfo(&[]));
    let header = NkmHeader::parse(&data).expect("parse failed");
    assert_eq!(header.name_str(), "ext2");
    assert_eq!(header.module_type(), ModuleType::Filesystem);
    assert_eq!(header.magic, NKM_MAGIC);
    assert_eq!(header.version, NKM_VERSION);
}

#[test]
fn test_string_table_located_after_header() {
    let table = gpl_modinfo(&["base", "block"]);
    let data = generate_nkm("dep", ModuleType::BlockDevice, &table);
    let header = NkmHeader::parse(&data).unwrap();

    let offset = header.string_table_offset as usize;
    let size = header.string_table_size as usize;
    assert!(offset >= NKM_HEADER_SIZE);
    assert_eq!(size, table.len());
    assert_eq!(data.len(), offset + size);
    assert_eq!(header.string_table(&data).unwrap(), &table[..]);
    assert_eq!(header.dep_count, 2);
}

#[test]
fn test_header_too_small() {
    let data = [0u8; NKM_HEADER_SIZE - 1];
    assert_eq!(NkmHeader::parse(&data).err(), Some(ModuleError::FileTooSmall));
    assert_eq!(NkmHeader::parse(&[]).err(), Some(ModuleError::FileTooSmall));
}

#[test]
fn test_header_bad_magic() {
    let mut data = image("bad", &[]);
    data[0] = b'X';
    assert_eq!(NkmHeader::parse(&data).err(), Some(ModuleError::InvalidMagic));
}

#[test]
fn test_header_unsupported_version() {
    let mut data = image("future", &[]);
    data[4] = NKM_VERSION + 1;
    assert_eq!(
        NkmHeader::parse(&data).err(),
        Some(ModuleError::UnsupportedVersion)
    );
}

#[test]
fn test_string_table_out_of_bounds() {
    let mut data = image("trunc", &[]);
    // string_table_size lives at bytes 36..40
    data[36..40].copy_from_slice(&0x1000u32.to_le_bytes());
    let header = NkmHeader::parse(&data).unwrap();
    assert_eq!(header.string_table(&data).err(), Some(ModuleError::InvalidFormat));
}

#[test]
fn test_string_table_inside_header_rejected() {
    let mut data = image("overlap", &[]);
    // string_table_offset lives at bytes 32..36
    data[32..36].copy_from_slice(&8u32.to_le_bytes());
    let header = NkmHeader::parse(&data).unwrap();
    assert_eq!(header.string_table(&data).err(), Some(ModuleError::InvalidFormat));
}

#[test]
fn test_long_name_truncated() {
    let long = "m".repeat(MAX_MODULE_NAME + 8);
    let data = generate_nkm(&long, ModuleType::Other, &[]);
    let header = NkmHeader::parse(&data).unwrap();
    assert_eq!(header.name_str().len(), MAX_MODULE_NAME - 1);
    assert!(long.starts_with(header.name_str()));

    // A multi-byte character straddling the limit is dropped whole
    let prefix = "a".repeat(MAX_MODULE_NAME - 2);
    let straddling = format!("{}é", prefix);
    assert_eq!(straddling.len(), MAX_MODULE_NAME);
    let data = generate_nkm(&straddling, ModuleType::Other, &[]);
    let header = NkmHeader::parse(&data).unwrap();
    assert_eq!(header.name_str(), prefix);

    let fits = format!("{}é", "b".repeat(MAX_MODULE_NAME - 3));
    let data = generate_nkm(&fits, ModuleType::Other, &[]);
    assert_eq!(NkmHeader::parse(&data).unwrap().name_str(), fits);
}

#[test]
fn test_unknown_module_type_is_other() {
    let mut data = image("odd", &[]);
    data[5] = 42;
    let header = NkmHeader::parse(&data).unwrap();
    assert_eq!(header.module_type(), ModuleType::Other);
}

#[test]
fn test_parse_llm_modinfo() {
    let info = ModInfo::parse(llm_module::MODULE_INFO).unwrap();
    assert_eq!(info.version, llm_module::MODULE_VERSION);
    assert_eq!(info.description, llm_module::MODULE_DESC);
    assert_eq!(info.author, llm_module::MODULE_AUTHOR);
    assert_eq!(info.license, llm_module::MODULE_LICENSE);
    assert_eq!(info.srcversion, llm_module::MODULE_SRCVERSION);
    assert!(info.depends.is_empty());
    assert!(info.is_gpl_compatible());
    assert!(info.is_in_tree());
}

#[test]
fn test_parse_repeated_author_and_depends() {
    let table = b"author=Alice\0author=Bob\0depends=base, block,,net\0";
    let info = ModInfo::parse(table).unwrap();
    assert_eq!(info.author, "Alice, Bob");
    assert_eq!(info.depends, vec!["base", "block", "net"]);
}

#[test]
fn test_parse_ignores_unknown_keys_and_padding() {
    let table = b"\0\0vermagic=6.1 SMP\0license=MIT\0\0intree=Y\0";
    let info = ModInfo::parse(table).unwrap();
    assert_eq!(info.license, "MIT");
    assert_eq!(info.version, "");
}

#[test]
fn test_parse_value_may_contain_equals() {
    let info = ModInfo::parse(b"description=a=b\0").unwrap();
    assert_eq!(info.description, "a=b");
}

#[test]
fn test_parse_rejects_malformed_entries() {
    assert_eq!(
        ModInfo::parse(b"license\0").err(),
        Some(ModuleError::InvalidFormat)
    );
    assert_eq!(
        ModInfo::parse(b"author=\xff\xfe\0").err(),
        Some(ModuleError::InvalidFormat)
    );
}

#[test]
fn test_parse_empty_table() {
    assert_eq!(ModInfo::parse(&[]).unwrap(), ModInfo::default());
}

#[test]
fn test_encode_skips_empty_fields() {
    let info = ModInfo {
        version: String::from("2.0"),
        license: String::from("GPL"),
        ..ModInfo::default()
    };
    assert_eq!(info.encode(), b"version=2.0\0license=GPL\0".to_vec());

    let parsed = ModInfo::parse(&info.encode()).unwrap();
    assert_eq!(parsed, info);
}

#[test]
fn test_license_compatibility() {
    assert!(license_is_gpl_compatible("GPL"));
    assert!(license_is_gpl_compatible("GPL v2"));
    assert!(license_is_gpl_compatible("Dual MIT/GPL"));
    assert!(license_is_gpl_compatible("MIT"));
    assert!(!license_is_gpl_compatible("Proprietary"));
    assert!(!license_is_gpl_compatible("gpl"));
    assert!(!license_is_gpl_compatible(""));
}

#[test]
fn test_in_tree_srcversion() {
    let mut info = ModInfo::parse(llm_module::MODULE_INFO).unwrap();
    assert_eq!(info.srcversion, SRCVERSION_IN_TREE);
    info.srcversion = String::from("3F2A1C0D9B");
    assert!(!info.is_in_tree());
}
