/// POSIX style error numbers (subset used at the module management boundary).
pub mod errno {
    pub const EPERM: i32 = 1; // Operation not permitted
    pub const ENOENT: i32 = 2; // No such file or directory
    pub const ENOEXEC: i32 = 8; // Exec format error
    pub const ENOMEM: i32 = 12; // Out of memory
    pub const EBUSY: i32 = 16; // Device or resource busy
    pub const EEXIST: i32 = 17; // File exists
}
