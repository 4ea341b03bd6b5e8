//! Resource Governor (spec component C9): detects hardware once at startup
//! and derives the worker/concurrency caps every other component queries
//! against, plus the memory-pressure gate the LLM adapter polls before
//! admitting a new call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sysinfo::{System, SystemExt};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryGate {
    Ok,
    Throttle,
    Deny,
}

/// Detected hardware characteristics, cached for the process lifetime (spec
/// §9 "Global mutable state": the governor caches detected hardware once at
/// startup).
#[derive(Debug, Clone, Copy)]
struct Hardware {
    physical_cores: usize,
    total_memory_kb: u64,
}

pub struct ResourceGovernor {
    hardware: Hardware,
    local_llm_lanes: Option<usize>,
    max_workers_override: Option<usize>,
    used_memory_kb: AtomicU64,
}

impl ResourceGovernor {
    /// Detects cores and total memory once; `local_llm_lanes` is `Some(L)`
    /// when a local provider is configured with `L` parallel execution lanes.
    pub fn detect(local_llm_lanes: Option<usize>, max_workers_override: Option<usize>) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        let hardware = Hardware {
            physical_cores: num_cpus::get_physical().max(1),
            total_memory_kb: sys.total_memory().max(1),
        };
        debug!(
            cores = hardware.physical_cores,
            total_memory_kb = hardware.total_memory_kb,
            "resource governor detected hardware"
        );
        Self {
            hardware,
            local_llm_lanes,
            max_workers_override,
            used_memory_kb: AtomicU64::new(0),
        }
    }

    pub fn physical_cores(&self) -> usize {
        self.hardware.physical_cores
    }

    /// Worker-count derivation per spec §4.9.
    pub fn worker_count(&self) -> usize {
        if let Some(cap) = self.max_workers_override {
            return cap.max(1);
        }

        let cores = self.hardware.physical_cores;
        const THREADS_PER_WORKER: f64 = 5.0;
        let ideal = ((cores as f64 * 1.5) / THREADS_PER_WORKER).round() as usize;

        let tier_cap = if cores >= 20 {
            8
        } else if cores >= 12 {
            6
        } else if cores >= 8 {
            4
        } else {
            2
        };

        let mut workers = ideal.clamp(1, tier_cap);

        if let Some(lanes) = self.local_llm_lanes {
            workers = workers.min(2 * lanes.max(1));
        }

        workers.max(1)
    }

    /// Records a fresh memory-usage sample (e.g. polled from `/proc` or
    /// `sysinfo` by the caller) and returns the corresponding gate state.
    pub fn record_memory_sample(&self, used_kb: u64) -> MemoryGate {
        self.used_memory_kb.store(used_kb, Ordering::Relaxed);
        self.check_memory()
    }

    /// Current memory gate per spec §4.9: <70% ok, 70-85% throttle, >85% deny.
    pub fn check_memory(&self) -> MemoryGate {
        let used = self.used_memory_kb.load(Ordering::Relaxed) as f64;
        let total = self.hardware.total_memory_kb as f64;
        let ratio = used / total;
        if ratio > 0.85 {
            MemoryGate::Deny
        } else if ratio > 0.70 {
            MemoryGate::Throttle
        } else {
            MemoryGate::Ok
        }
    }

    /// Blocks (async) up to `max_wait` polling every 500ms for the memory
    /// gate to clear `Deny`. Returns the final gate observed.
    pub async fn wait_for_memory(&self, max_wait: Duration) -> MemoryGate {
        let start = std::time::Instant::now();
        loop {
            let gate = self.check_memory();
            if gate != MemoryGate::Deny || start.elapsed() >= max_wait {
                if gate == MemoryGate::Deny {
                    warn!("memory gate still denying after {:?} wait", max_wait);
                }
                return gate;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governor_with(cores: usize) -> ResourceGovernor {
        ResourceGovernor {
            hardware: Hardware {
                physical_cores: cores,
                total_memory_kb: 16_000_000,
            },
            local_llm_lanes: None,
            max_workers_override: None,
            used_memory_kb: AtomicU64::new(0),
        }
    }

    #[test]
    fn worker_count_respects_tier_caps() {
        assert!(governor_with(24).worker_count() <= 8);
        assert!(governor_with(16).worker_count() <= 6);
        assert!(governor_with(10).worker_count() <= 4);
        assert!(governor_with(4).worker_count() <= 2);
    }

    #[test]
    fn explicit_override_wins() {
        let mut g = governor_with(24);
        g.max_workers_override = Some(1);
        assert_eq!(g.worker_count(), 1);
    }

    #[test]
    fn local_llm_lanes_cap_worker_count() {
        let mut g = governor_with(24);
        g.local_llm_lanes = Some(1);
        assert!(g.worker_count() <= 2);
    }

    #[test]
    fn memory_gate_thresholds() {
        let g = governor_with(8);
        assert_eq!(g.record_memory_sample(1_000_000), MemoryGate::Ok);
        assert_eq!(g.record_memory_sample(12_000_000), MemoryGate::Throttle);
        assert_eq!(g.record_memory_sample(14_500_000), MemoryGate::Deny);
    }

    #[tokio::test]
    async fn wait_for_memory_returns_once_cleared() {
        let g = governor_with(8);
        g.record_memory_sample(1_000_000);
        let gate = g.wait_for_memory(Duration::from_millis(50)).await;
        assert_eq!(gate, MemoryGate::Ok);
    }
}
