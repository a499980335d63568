use std::collections::VecDeque;
use std::time::Duration;

use log::warn;

use crate::error::Error;
use crate::meminfo;
use crate::source::CounterSource;

/// What to do when a tick's read or parse fails mid-run. `SkipTick` keeps
/// the session alive with a gap at that timestamp; `Abort` stops sampling
/// and surfaces the error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorPolicy {
    SkipTick,
    Abort,
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub interval_ms: u64,
    pub window_secs: u64,
    /// Total ticks to run; unbounded when `None`.
    pub count: Option<u64>,
    /// Counter names to track, in stacking order.
    pub metrics: Vec<String>,
    pub on_read_error: ReadErrorPolicy,
}

/// History of one tracked counter: (elapsed seconds, kB) pairs. Every
/// series owned by a sampler has the same timestamps and length.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub points: VecDeque<(f64, i64)>,
}

impl Series {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            points: VecDeque::new(),
        }
    }

    pub fn latest(&self) -> Option<(f64, i64)> {
        self.points.back().copied()
    }
}

/// Receives the post-eviction snapshot after every successful tick, or the
/// tick's error when a read fails under `SkipTick`. Snapshots are borrowed,
/// so they cannot be retained across ticks.
pub trait SampleObserver {
    fn on_sample(&mut self, series: &[Series]);
    fn on_error(&mut self, tick_index: u64, error: &Error);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Running,
    Stopped,
}

pub struct Sampler<S> {
    config: SamplerConfig,
    source: S,
    series: Vec<Series>,
    tick_index: u64,
    state: SamplerState,
}

impl<S: CounterSource> Sampler<S> {
    pub fn new(config: SamplerConfig, source: S) -> Self {
        let series = config.metrics.iter().map(|m| Series::new(m)).collect();
        Self {
            config,
            source,
            series,
            tick_index: 0,
            state: SamplerState::Idle,
        }
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    pub fn start(&mut self) {
        if self.state == SamplerState::Idle {
            self.state = SamplerState::Running;
        }
    }

    /// Synchronous cancellation: once this returns, no further tick does
    /// anything and no further emissions occur.
    pub fn stop(&mut self) {
        self.state = SamplerState::Stopped;
    }

    /// Runs one sampling cycle. The caller owns the timer; a tick after
    /// Stopped is a no-op.
    pub fn tick(&mut self, observer: &mut dyn SampleObserver) -> Result<(), Error> {
        if self.state != SamplerState::Running {
            return Ok(());
        }

        // tick_index * interval, not wall clock, so timer jitter never
        // shows up as gaps on the x axis.
        let timestamp = self.tick_index as f64 * self.config.interval_ms as f64 / 1000.0;

        match self.sample() {
            Ok(values) => {
                for (series, value) in self.series.iter_mut().zip(values) {
                    series.points.push_back((timestamp, value));
                }
                self.evict(timestamp);
                observer.on_sample(&self.series);
            }
            Err(err) => match self.config.on_read_error {
                ReadErrorPolicy::SkipTick => {
                    warn!("tick {} skipped: {}", self.tick_index, err);
                    observer.on_error(self.tick_index, &err);
                }
                ReadErrorPolicy::Abort => {
                    self.state = SamplerState::Stopped;
                    return Err(err);
                }
            },
        }

        self.tick_index += 1;
        if let Some(count) = self.config.count {
            if self.tick_index >= count {
                self.state = SamplerState::Stopped;
            }
        }
        Ok(())
    }

    // All-or-nothing extraction keeps the series in lockstep: nothing is
    // appended anywhere unless every metric resolved.
    fn sample(&mut self) -> Result<Vec<i64>, Error> {
        let raw = self.source.read()?;
        let set = meminfo::parse(&raw)?;
        self.config
            .metrics
            .iter()
            .map(|m| set.get(m))
            .collect()
    }

    fn evict(&mut self, latest: f64) {
        let window = self.config.window_secs as f64;
        let expired = |points: &VecDeque<(f64, i64)>| {
            points
                .front()
                .map_or(false, |&(ts, _)| ts < latest - window)
        };
        while self.series.first().map_or(false, |s| expired(&s.points)) {
            for series in &mut self.series {
                series.points.pop_front();
            }
        }
    }
}
