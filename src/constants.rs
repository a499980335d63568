pub const MEMINFO_PATH: &str = "/proc/meminfo";
pub const ADB_BIN: &str = "adb";

pub const DEFAULT_TICK_RATE_MS: u64 = 1000;
pub const DEFAULT_WINDOW_SECS: u64 = 60;
