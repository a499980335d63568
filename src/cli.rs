use clap::{Parser, ValueEnum};

use crate::constants::{DEFAULT_TICK_RATE_MS, DEFAULT_WINDOW_SECS};
use crate::sampler::{ReadErrorPolicy, SamplerConfig};

#[derive(Parser, Debug)]
#[command(name = "mem_monitor", about = "Live stacked-area viewer for /proc/meminfo")]
pub struct Cli {
    /// Read counters from a connected device via adb instead of the local file
    #[arg(short, long)]
    pub remote: bool,

    /// Sample interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE_MS)]
    pub interval: u64,

    /// Total number of samples; runs until quit if omitted
    #[arg(short, long)]
    pub count: Option<u64>,

    /// Rolling window retained on the chart, in seconds
    #[arg(short, long, default_value_t = DEFAULT_WINDOW_SECS)]
    pub window: u64,

    /// Counter group to chart
    #[arg(short, long, value_enum, default_value = "usage")]
    pub graph: GraphKind,

    /// Run the counter consistency checks once and exit
    #[arg(long)]
    pub checks: bool,

    /// Stop on the first failed read instead of skipping that tick
    #[arg(long)]
    pub abort_on_error: bool,
}

impl Cli {
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval_ms: self.interval,
            window_secs: self.window,
            count: self.count,
            metrics: self
                .graph
                .metrics()
                .iter()
                .map(|m| m.to_string())
                .collect(),
            on_read_error: if self.abort_on_error {
                ReadErrorPolicy::Abort
            } else {
                ReadErrorPolicy::SkipTick
            },
        }
    }
}

/// Named counter groups; each maps to an ordered list of raw or derived
/// counters, bottom of the stack first.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphKind {
    /// Where the total memory went
    Usage,
    /// What user space is made of
    User,
    /// File-backed vs anonymous pages
    Cache,
    /// Available vs not-available split
    Available,
}

impl GraphKind {
    pub fn metrics(self) -> &'static [&'static str] {
        match self {
            GraphKind::Usage => &["MemFree", "@UserSpace", "@KernelSpace"],
            GraphKind::User => &["AnonPages", "Buffers", "Cached"],
            GraphKind::Cache => &["@FileBacked", "@Anonymous", "Slab"],
            GraphKind::Available => &["MemAvailable", "@MemNotAvailable"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_map_to_config() {
        let cli = Cli::parse_from(["mem_monitor"]);
        let config = cli.sampler_config();
        assert_eq!(config.interval_ms, DEFAULT_TICK_RATE_MS);
        assert_eq!(config.window_secs, DEFAULT_WINDOW_SECS);
        assert_eq!(config.count, None);
        assert_eq!(config.on_read_error, ReadErrorPolicy::SkipTick);
        assert_eq!(config.metrics, ["MemFree", "@UserSpace", "@KernelSpace"]);
    }

    #[test]
    fn abort_flag_selects_abort_policy() {
        let cli = Cli::parse_from(["mem_monitor", "--abort-on-error", "-c", "5"]);
        let config = cli.sampler_config();
        assert_eq!(config.on_read_error, ReadErrorPolicy::Abort);
        assert_eq!(config.count, Some(5));
    }
}
