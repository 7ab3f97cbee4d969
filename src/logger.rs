use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use lazy_static::lazy_static;
use spin::Mutex;

/// Number of records the kernel log ring keeps before evicting the oldest.
pub const LOG_RING_CAPACITY: usize = 512;

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::INFO.priority());
static DROPPED_RECORDS: AtomicU64 = AtomicU64::new(0);

static CLOCK: Mutex<Option<fn() -> u64>> = Mutex::new(None);
static CONSOLE: Mutex<Option<fn(&str)>> = Mutex::new(None);

lazy_static! {
    static ref KLOG: Mutex<LogRing> = Mutex::new(LogRing::new());
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    PANIC,
    FATAL,
    ERROR,
    WARN,
    INFO,
    DEBUG,
    TRACE,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::PANIC => "PANIC",
            LogLevel::FATAL => "FATAL",
            LogLevel::ERROR => "ERROR",
            LogLevel::WARN => "WARN",
            LogLevel::INFO => "INFO",
            LogLevel::DEBUG => "DEBUG",
            LogLevel::TRACE => "TRACE",
        }
    }

    pub const fn priority(self) -> u8 {
        match self {
            LogLevel::PANIC => 0,
            LogLevel::FATAL => 1,
            LogLevel::ERROR => 2,
            LogLevel::WARN => 3,
            LogLevel::INFO => 4,
            LogLevel::DEBUG => 5,
            LogLevel::TRACE => 6,
        }
    }

    fn from_priority(value: u8) -> Self {
        match value {
            0 => LogLevel::PANIC,
            1 => LogLevel::FATAL,
            2 => LogLevel::ERROR,
            3 => LogLevel::WARN,
            4 => LogLevel::INFO,
            5 => LogLevel::DEBUG,
            _ => LogLevel::TRACE,
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("panic") {
            Some(LogLevel::PANIC)
        } else if value.eq_ignore_ascii_case("fatal") {
            Some(LogLevel::FATAL)
        } else if value.eq_ignore_ascii_case("error") {
            Some(LogLevel::ERROR)
        } else if value.eq_ignore_ascii_case("warn") || value.eq_ignore_ascii_case("warning") {
            Some(LogLevel::WARN)
        } else if value.eq_ignore_ascii_case("info") {
            Some(LogLevel::INFO)
        } else if value.eq_ignore_ascii_case("debug") {
            Some(LogLevel::DEBUG)
        } else if value.eq_ignore_ascii_case("trace") {
            Some(LogLevel::TRACE)
        } else {
            None
        }
    }
}

/// One entry of the kernel log ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Monotonic sequence number, never reused (survives `clear()`)
    pub seq: u64,
    pub timestamp_us: u64,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{timestamp}] [{level}] {message}",
            timestamp = TimestampDisplay {
                microseconds: self.timestamp_us
            },
            level = LevelDisplay(self.level),
            message = self.message,
        )
    }
}

struct LogRing {
    records: VecDeque<LogRecord>,
    next_seq: u64,
}

impl LogRing {
    fn new() -> Self {
        Self {
            records: VecDeque::with_capacity(LOG_RING_CAPACITY),
            next_seq: 1,
        }
    }

    fn push(&mut self, level: LogLevel, timestamp_us: u64, message: String) -> LogRecord {
        if self.records.len() >= LOG_RING_CAPACITY {
            self.records.pop_front();
            DROPPED_RECORDS.fetch_add(1, Ordering::Relaxed);
        }

        let record = LogRecord {
            seq: self.next_seq,
            timestamp_us,
            level,
            message,
        };
        self.next_seq += 1;
        self.records.push_back(record.clone());
        record
    }
}

pub fn init() {
    if LOGGER_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }

    lazy_static::initialize(&KLOG);
}

pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.load(Ordering::Relaxed)
}

pub fn log(level: LogLevel, args: fmt::Arguments<'_>) {
    let current = LOG_LEVEL.load(Ordering::Relaxed);
    if level.priority() > current {
        return;
    }

    let timestamp_us = boot_time_us();
    let record = KLOG
        .lock()
        .push(level, timestamp_us, alloc::fmt::format(args));

    // Copy the sink out so a console that logs cannot deadlock on CONSOLE.
    let console = *CONSOLE.lock();
    if let Some(console) = console {
        let line = alloc::format!("{}", record);
        console(&line);
    }
}

pub fn set_max_level(level: LogLevel) {
    LOG_LEVEL.store(level.priority(), Ordering::Relaxed);
}

pub fn max_level() -> LogLevel {
    LogLevel::from_priority(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn parse_level_directive(cmdline: &str) -> Option<LogLevel> {
    for token in cmdline.split_whitespace() {
        if let Some((key, value)) = token.split_once('=') {
            if key.eq_ignore_ascii_case("log") || key.eq_ignore_ascii_case("loglevel") {
                if let Some(level) = LogLevel::from_str(value) {
                    return Some(level);
                }
            }
        }
    }
    None
}

/// Install the time source used to stamp records, in microseconds since boot.
pub fn set_clock(clock: Option<fn() -> u64>) {
    *CLOCK.lock() = clock;
}

pub fn boot_time_us() -> u64 {
    let clock = *CLOCK.lock();
    clock.map(|now| now()).unwrap_or(0)
}

/// Install the console that receives every emitted line.
pub fn set_console(console: Option<fn(&str)>) {
    *CONSOLE.lock() = console;
}

/// Snapshot of the kernel log ring, oldest first.
pub fn records() -> Vec<LogRecord> {
    KLOG.lock().records.iter().cloned().collect()
}

/// Records with a sequence number greater than `seq`.
pub fn records_since(seq: u64) -> Vec<LogRecord> {
    KLOG.lock()
        .records
        .iter()
        .filter(|record| record.seq > seq)
        .cloned()
        .collect()
}

/// Sequence number of the newest record ever written, 0 if none.
pub fn last_seq() -> u64 {
    KLOG.lock().next_seq - 1
}

pub fn dropped_records() -> u64 {
    DROPPED_RECORDS.load(Ordering::Relaxed)
}

/// Empty the ring (`dmesg -C`). Sequence numbers keep counting.
pub fn clear() {
    KLOG.lock().records.clear();
}

struct TimestampDisplay {
    microseconds: u64,
}

impl fmt::Display for TimestampDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.microseconds / 1_000_000;
        let micros = self.microseconds % 1_000_000;
        write!(f, "{:>5}.{:06}", seconds, micros)
    }
}

struct LevelDisplay(LogLevel);

impl fmt::Display for LevelDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<5}", self.0.as_str())
    }
}
