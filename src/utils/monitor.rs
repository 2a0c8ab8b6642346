use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub memory_usage_percent: f32,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

pub struct SystemMonitor {
    system: Arc<Mutex<System>>,
    pid: Pid,
    start_time: Instant,
    peak_memory: Arc<Mutex<u64>>,
    enabled: bool,
}

impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let mut system = System::new_with_specifics(RefreshKind::everything());

        let pid = sysinfo::get_current_pid().expect("Failed to get current PID");

        system.refresh_all();

        Self {
            system: Arc::new(Mutex::new(system)),
            pid,
            start_time: Instant::now(),
            peak_memory: Arc::new(Mutex::new(0)),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Refresh process info and record the peak RSS seen so far.
    pub fn sample(&self) {
        if !self.enabled {
            return;
        }

        let mut system = self.system.lock().unwrap();
        system.refresh_all();

        if let Some(process) = system.process(self.pid) {
            let memory_mb = process.memory() / (1024 * 1024);
            let mut peak = self.peak_memory.lock().unwrap();
            if memory_mb > *peak {
                *peak = memory_mb;
            }
        }
    }

    pub fn get_stats(&self) -> Option<SystemStats> {
        if !self.enabled {
            return None;
        }

        let mut system = self.system.lock().unwrap();
        system.refresh_all();

        let process = system.process(self.pid)?;
        let memory_bytes = process.memory();
        let memory_mb = memory_bytes / (1024 * 1024);
        let total_memory = system.total_memory();

        let memory_percent = if total_memory > 0 {
            (memory_bytes as f32 / total_memory as f32) * 100.0
        } else {
            0.0
        };

        let peak = {
            let mut peak = self.peak_memory.lock().unwrap();
            if memory_mb > *peak {
                *peak = memory_mb;
            }
            *peak
        };

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            memory_usage_percent: memory_percent,
            peak_memory_mb: peak,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_summary(&self) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "Resource usage: {:.1}% CPU, {} MB RSS ({:.1}% of system, peak {} MB), elapsed {:.2}s",
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.memory_usage_percent,
                stats.peak_memory_mb,
                stats.elapsed_time.as_secs_f64()
            );
        }
    }
}
