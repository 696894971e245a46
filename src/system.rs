//! Host resource usage reported by the status endpoints and `getSystemInfo`

use serde::Serialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Disks, Networks, System};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Point-in-time view of the host
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub cpu_usage: f32,
    pub memory_usage: f32,
    pub memory_available_gb: f64,
    pub disk_usage: f32,
    pub disk_free_gb: f64,
    pub network_sent_mb: f64,
    pub network_recv_mb: f64,
    pub platform: String,
    pub processor: String,
}

impl SystemSnapshot {
    /// Take a full snapshot. Blocks for the CPU sampling interval, so call it
    /// from `spawn_blocking` inside async code.
    pub fn capture() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.max(Duration::from_millis(200)));
        Self::from_system(&mut sys)
    }

    fn from_system(sys: &mut System) -> Self {
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == std::path::Path::new("/"))
            .or_else(|| disks.list().first());
        let (disk_usage, disk_free_gb) = match root {
            Some(disk) if disk.total_space() > 0 => {
                let used = disk.total_space().saturating_sub(disk.available_space());
                (
                    percent(used, disk.total_space()),
                    disk.available_space() as f64 / GIB,
                )
            }
            _ => (0.0, 0.0),
        };

        let networks = Networks::new_with_refreshed_list();
        let (sent, recv) = networks.list().iter().fold((0u64, 0u64), |(s, r), (_, data)| {
            (s + data.total_transmitted(), r + data.total_received())
        });

        let platform = format!(
            "{} {} ({})",
            System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            System::os_version().unwrap_or_default(),
            std::env::consts::ARCH
        );
        let processor = sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());

        Self {
            cpu_usage: round1(sys.global_cpu_usage()),
            memory_usage: round1(percent(sys.used_memory(), sys.total_memory())),
            memory_available_gb: round2(sys.available_memory() as f64 / GIB),
            disk_usage: round1(disk_usage),
            disk_free_gb: round2(disk_free_gb),
            network_sent_mb: round2(sent as f64 / MIB),
            network_recv_mb: round2(recv as f64 / MIB),
            platform,
            processor,
        }
    }

    /// Human-readable report used by the `getSystemInfo` tool
    pub fn to_report(&self) -> String {
        let value = serde_json::json!({
            "cpu_usage": format!("{}%", self.cpu_usage),
            "memory_usage": format!("{}%", self.memory_usage),
            "memory_available": format!("{:.2} GB", self.memory_available_gb),
            "disk_usage": format!("{}%", self.disk_usage),
            "disk_free": format!("{:.2} GB", self.disk_free_gb),
            "network_sent": format!("{:.2} MB", self.network_sent_mb),
            "network_recv": format!("{:.2} MB", self.network_recv_mb),
            "platform": self.platform,
            "processor": self.processor,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

/// Long-lived sampler for the status endpoint. CPU usage is measured
/// between consecutive calls, so no request has to sleep.
pub struct SystemMonitor {
    sys: Mutex<System>,
    started: Instant,
}

impl SystemMonitor {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self {
            sys: Mutex::new(sys),
            started: Instant::now(),
        }
    }

    /// (cpu %, memory %)
    pub fn usage(&self) -> (f32, f32) {
        match self.sys.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu_usage();
                sys.refresh_memory();
                (
                    round1(sys.global_cpu_usage()),
                    round1(percent(sys.used_memory(), sys.total_memory())),
                )
            }
            Err(_) => (0.0, 0.0),
        }
    }

    /// Full snapshot using the shared sampler
    pub fn snapshot(&self) -> SystemSnapshot {
        match self.sys.lock() {
            Ok(mut sys) => SystemSnapshot::from_system(&mut sys),
            Err(_) => SystemSnapshot::capture(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn percent(part: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64 * 100.0) as f32
    }
}

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
