//! Kernel taint tracking
//!
//! Linux-compatible taint flags. Once a flag is set it stays set for the
//! lifetime of the kernel; there is no way to clear it.

use alloc::string::String;
use core::sync::atomic::{AtomicU32, Ordering};

static TAINT_MASK: AtomicU32 = AtomicU32::new(0);

/// Taint flags, bit positions match Linux `include/linux/panic.h`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TaintFlag {
    /// Proprietary (non GPL-compatible) module loaded
    ProprietaryModule = 1 << 0,
    /// Module load was forced
    ForcedLoad = 1 << 1,
    /// SMP kernel on hardware not certified for SMP
    Smp = 1 << 2,
    /// Module unload was forced
    ForcedUnload = 1 << 3,
    /// Machine check exception occurred
    MachineCheck = 1 << 4,
    /// Bad page referenced
    BadPage = 1 << 5,
    /// Tainted on user request
    UserRequest = 1 << 6,
    /// Kernel died (oops)
    Die = 1 << 7,
    /// ACPI table overridden
    OverriddenAcpiTable = 1 << 8,
    /// Kernel issued a warning
    Warn = 1 << 9,
    /// Staging driver loaded
    StagingDriver = 1 << 10,
    /// Firmware bug worked around
    FirmwareBug = 1 << 11,
    /// Out-of-tree module loaded
    OutOfTreeModule = 1 << 12,
    /// Unsigned module loaded
    UnsignedModule = 1 << 13,
    /// Soft lockup occurred
    Softlockup = 1 << 14,
    /// Kernel has been live patched
    LivePatch = 1 << 15,
    /// Auxiliary taint, distro-defined
    Aux = 1 << 16,
    /// Struct layout randomization seed tampered with
    RandomizeTampered = 1 << 17,
    /// Test module loaded
    Test = 1 << 18,
}

impl TaintFlag {
    /// All flags in column order of the taint string
    pub const ALL: [TaintFlag; 19] = [
        TaintFlag::ProprietaryModule,
        TaintFlag::ForcedLoad,
        TaintFlag::Smp,
        TaintFlag::ForcedUnload,
        TaintFlag::MachineCheck,
        TaintFlag::BadPage,
        TaintFlag::UserRequest,
        TaintFlag::Die,
        TaintFlag::OverriddenAcpiTable,
        TaintFlag::Warn,
        TaintFlag::StagingDriver,
        TaintFlag::FirmwareBug,
        TaintFlag::OutOfTreeModule,
        TaintFlag::UnsignedModule,
        TaintFlag::Softlockup,
        TaintFlag::LivePatch,
        TaintFlag::Aux,
        TaintFlag::RandomizeTampered,
        TaintFlag::Test,
    ];

    pub const fn as_char(self) -> char {
        match self {
            TaintFlag::ProprietaryModule => 'P',
            TaintFlag::ForcedLoad => 'F',
            TaintFlag::Smp => 'S',
            TaintFlag::ForcedUnload => 'R',
            TaintFlag::MachineCheck => 'M',
            TaintFlag::BadPage => 'B',
            TaintFlag::UserRequest => 'U',
            TaintFlag::Die => 'D',
            TaintFlag::OverriddenAcpiTable => 'A',
            TaintFlag::Warn => 'W',
            TaintFlag::StagingDriver => 'C',
            TaintFlag::FirmwareBug => 'I',
            TaintFlag::OutOfTreeModule => 'O',
            TaintFlag::UnsignedModule => 'E',
            TaintFlag::Softlockup => 'L',
            TaintFlag::LivePatch => 'K',
            TaintFlag::Aux => 'X',
            TaintFlag::RandomizeTampered => 'T',
            TaintFlag::Test => 'N',
        }
    }

    /// Character printed in this flag's column when it is not set
    const fn clear_char(self) -> char {
        match self {
            TaintFlag::ProprietaryModule => 'G',
            _ => ' ',
        }
    }
}

pub fn add_taint(flag: TaintFlag) {
    let prev = TAINT_MASK.fetch_or(flag as u32, Ordering::SeqCst);
    if prev & (flag as u32) == 0 {
        crate::kwarn!("Kernel tainted: {} ({:?})", flag.as_char(), flag);
    }
}

pub fn get_taint() -> u32 {
    TAINT_MASK.load(Ordering::SeqCst)
}

pub fn is_tainted(flag: TaintFlag) -> bool {
    get_taint() & (flag as u32) != 0
}

/// Render the taint mask the way `/proc/sys/kernel/tainted` tools do:
/// one column per flag, or "Not tainted".
pub fn taint_string() -> String {
    let mask = get_taint();
    if mask == 0 {
        return String::from("Not tainted");
    }

    TaintFlag::ALL
        .iter()
        .map(|flag| {
            if mask & (*flag as u32) != 0 {
                flag.as_char()
            } else {
                flag.clear_char()
            }
        })
        .collect()
}
