use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

// process-wide CPU time, summed over every thread of the process
#[cfg(unix)]
fn process_cpu_time() -> Duration {
    // SAFETY: timespec is plain data and `ts` outlives the call writing it
    let (rc, ts) = unsafe {
        let mut ts = std::mem::zeroed::<libc::timespec>();
        (libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts), ts)
    };
    if rc != 0 {
        return Duration::ZERO;
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

#[cfg(not(unix))]
fn process_cpu_time() -> Duration {
    Duration::ZERO
}

/// Accumulated time for one named block: wall clock and the CPU time the
/// whole process spent meanwhile. A parallel block shows `cpu > total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingEntry {
    pub name: String,
    pub total: Duration,
    pub cpu: Duration,
    pub cycles: u32,
}

impl TimingEntry {
    pub fn mean(&self) -> Duration {
        self.per_cycle(self.total)
    }

    pub fn mean_cpu(&self) -> Duration {
        self.per_cycle(self.cpu)
    }

    fn per_cycle(&self, d: Duration) -> Duration {
        if self.cycles == 0 {
            Duration::ZERO
        } else {
            d / self.cycles
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulated {
    total: Duration,
    cpu: Duration,
    cycles: u32,
}

#[derive(Debug, Default)]
pub struct Timings {
    blocks: BTreeMap<String, Accumulated>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` and adds its wall-clock and process CPU time to the block
    /// `name`.
    pub fn time<R>(&mut self, name: &str, f: impl FnOnce() -> R) -> R {
        let cpu_start = process_cpu_time();
        let start = Instant::now();
        let out = f();
        let wall = start.elapsed();
        let cpu = process_cpu_time().saturating_sub(cpu_start);
        self.record(name, wall, cpu);
        out
    }

    pub fn record(&mut self, name: &str, wall: Duration, cpu: Duration) {
        let block = self.blocks.entry(name.to_owned()).or_default();
        block.total += wall;
        block.cpu += cpu;
        block.cycles += 1;
    }

    pub fn get(&self, name: &str) -> Option<TimingEntry> {
        self.blocks.get(name).map(|block| entry(name, block))
    }

    // sorted by name
    pub fn snapshot(&self) -> Vec<TimingEntry> {
        self.blocks
            .iter()
            .map(|(name, block)| entry(name, block))
            .collect()
    }

    pub fn reset(&mut self) {
        self.blocks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn entry(name: &str, block: &Accumulated) -> TimingEntry {
    TimingEntry {
        name: name.to_owned(),
        total: block.total,
        cpu: block.cpu,
        cycles: block.cycles,
    }
}

impl fmt::Display for Timings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<30}{:<20}{:<20}{:<10}",
            "Block name", "Time (ms)", "CPU (ms)", "Cycles"
        )?;
        writeln!(
            f,
            "{:<30}{:<20}{:<20}{:<10}",
            "----------", "---------", "--------", "------"
        )?;
        for entry in self.snapshot() {
            let mean_ms = entry.mean().as_secs_f64() * 1000.0;
            let cpu_ms = entry.mean_cpu().as_secs_f64() * 1000.0;
            writeln!(
                f,
                "{:<30}{:<20.4}{:<20.4}{:<10}",
                entry.name, mean_ms, cpu_ms, entry.cycles
            )?;
        }
        Ok(())
    }
}
