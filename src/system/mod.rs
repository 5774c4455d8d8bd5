//! System monitor capability.
//!
//! [`SystemMonitor`] reads the host through `sysinfo` and returns plain
//! snapshot structs. Rendering ([`report`]) and health rules ([`health`]) work
//! on those snapshots only, so they are testable without a live host.

pub mod health;
pub mod report;

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use sysinfo::{
    Components, Disks, Networks, ProcessesToUpdate, System, MINIMUM_CPU_UPDATE_INTERVAL,
};
use tracing::debug;

use crate::error::{Error, Result};

/// Host-level facts and current utilization.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    pub os: String,
    pub kernel: String,
    pub architecture: String,
    pub hostname: String,
    pub boot_time: u64,
    pub uptime_secs: u64,
    pub physical_cores: Option<usize>,
    pub logical_cores: usize,
    pub cpu_percent: f32,
    pub per_core_percent: Vec<f32>,
    pub memory: MemorySnapshot,
    pub root_disk: Option<DiskSnapshot>,
}

/// RAM and swap in bytes.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

impl MemorySnapshot {
    pub fn percent(&self) -> f32 {
        percent(self.used, self.total)
    }

    pub fn swap_percent(&self) -> f32 {
        percent(self.swap_used, self.swap_total)
    }
}

/// One mounted filesystem.
#[derive(Debug, Clone, Default)]
pub struct DiskSnapshot {
    pub device: String,
    pub mount_point: String,
    pub file_system: String,
    pub total: u64,
    pub available: u64,
}

impl DiskSnapshot {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }

    pub fn percent(&self) -> f32 {
        percent(self.used(), self.total)
    }
}

/// One running process.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub memory_percent: f32,
    pub status: String,
}

/// Ordering for the process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSort {
    Cpu,
    Memory,
    Pid,
    /// Unrecognized key: keep the order the OS reported.
    Unsorted,
}

impl ProcessSort {
    pub fn parse(key: &str) -> Self {
        match key.to_lowercase().as_str() {
            "cpu" => ProcessSort::Cpu,
            "memory" => ProcessSort::Memory,
            "pid" => ProcessSort::Pid,
            _ => ProcessSort::Unsorted,
        }
    }

    /// Sort processes in place, highest usage first for cpu/memory.
    pub fn apply(&self, processes: &mut [ProcessSnapshot]) {
        match self {
            ProcessSort::Cpu => processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent)),
            ProcessSort::Memory => {
                processes.sort_by(|a, b| b.memory_percent.total_cmp(&a.memory_percent))
            }
            ProcessSort::Pid => processes.sort_by_key(|p| p.pid),
            ProcessSort::Unsorted => {}
        }
    }
}

/// One network interface with cumulative counters.
#[derive(Debug, Clone, Default)]
pub struct InterfaceSnapshot {
    pub name: String,
    pub mac: String,
    pub addresses: Vec<(IpAddr, u8)>,
    pub received: u64,
    pub transmitted: u64,
    pub packets_received: u64,
    pub packets_transmitted: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

/// A temperature sensor reading in °C.
#[derive(Debug, Clone)]
pub struct TemperatureReading {
    pub label: String,
    pub celsius: f32,
}

/// Live system probe. Cloning shares the underlying `sysinfo::System`.
#[derive(Clone)]
pub struct SystemMonitor {
    system: Arc<Mutex<System>>,
}

impl SystemMonitor {
    /// Create a monitor with a fully populated system view.
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new_all())),
        }
    }

    fn with_system<T>(&self, f: impl FnOnce(&mut System) -> T) -> Result<T> {
        let mut guard = self
            .system
            .lock()
            .map_err(|_| Error::Internal("system monitor lock poisoned".into()))?;
        Ok(f(&mut guard))
    }

    /// Host facts plus CPU usage sampled over the minimum update interval.
    ///
    /// Blocks for that interval; call from a blocking context.
    pub fn snapshot(&self) -> Result<SystemSnapshot> {
        let root_disk = self.root_disk();
        self.with_system(|sys| {
            sys.refresh_cpu_usage();
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
            sys.refresh_cpu_usage();
            sys.refresh_memory();

            let per_core: Vec<f32> = sys.cpus().iter().map(|c| c.cpu_usage()).collect();
            SystemSnapshot {
                os: format!(
                    "{} {}",
                    System::name().unwrap_or_else(|| "Unknown".into()),
                    System::os_version().unwrap_or_default()
                )
                .trim()
                .to_string(),
                kernel: System::kernel_version().unwrap_or_else(|| "Unknown".into()),
                architecture: std::env::consts::ARCH.to_string(),
                hostname: System::host_name().unwrap_or_else(|| "Unknown".into()),
                boot_time: System::boot_time(),
                uptime_secs: System::uptime(),
                physical_cores: System::physical_core_count(),
                logical_cores: per_core.len(),
                cpu_percent: sys.global_cpu_usage(),
                per_core_percent: per_core,
                memory: MemorySnapshot {
                    total: sys.total_memory(),
                    available: sys.available_memory(),
                    used: sys.used_memory(),
                    swap_total: sys.total_swap(),
                    swap_used: sys.used_swap(),
                },
                root_disk,
            }
        })
    }

    /// All processes with CPU usage sampled over the minimum update interval.
    ///
    /// Blocks for that interval; call from a blocking context.
    pub fn processes(&self) -> Result<Vec<ProcessSnapshot>> {
        self.with_system(|sys| {
            sys.refresh_memory();
            sys.refresh_processes(ProcessesToUpdate::All, true);
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
            sys.refresh_processes(ProcessesToUpdate::All, true);

            let total = sys.total_memory();
            let mut out: Vec<ProcessSnapshot> = sys
                .processes()
                .values()
                .map(|p| ProcessSnapshot {
                    pid: p.pid().as_u32(),
                    name: p.name().to_string_lossy().into_owned(),
                    cpu_percent: p.cpu_usage(),
                    memory_bytes: p.memory(),
                    memory_percent: percent(p.memory(), total),
                    status: p.status().to_string(),
                })
                .collect();
            out.sort_by_key(|p| p.pid);
            debug!("Collected {} processes", out.len());
            out
        })
    }

    /// Every mounted disk.
    pub fn disks(&self) -> Vec<DiskSnapshot> {
        Disks::new_with_refreshed_list()
            .list()
            .iter()
            .map(|d| DiskSnapshot {
                device: d.name().to_string_lossy().into_owned(),
                mount_point: d.mount_point().display().to_string(),
                file_system: d.file_system().to_string_lossy().into_owned(),
                total: d.total_space(),
                available: d.available_space(),
            })
            .collect()
    }

    /// The disk mounted at `/`, or the first disk when there is none.
    pub fn root_disk(&self) -> Option<DiskSnapshot> {
        let disks = self.disks();
        disks
            .iter()
            .find(|d| d.mount_point == "/")
            .or_else(|| disks.first())
            .cloned()
    }

    /// Network interfaces sorted by name.
    pub fn interfaces(&self) -> Vec<InterfaceSnapshot> {
        let networks = Networks::new_with_refreshed_list();
        let mut out: Vec<InterfaceSnapshot> = networks
            .iter()
            .map(|(name, data)| InterfaceSnapshot {
                name: name.clone(),
                mac: data.mac_address().to_string(),
                addresses: data
                    .ip_networks()
                    .iter()
                    .map(|n| (n.addr, n.prefix))
                    .collect(),
                received: data.total_received(),
                transmitted: data.total_transmitted(),
                packets_received: data.total_packets_received(),
                packets_transmitted: data.total_packets_transmitted(),
                errors_in: data.total_errors_on_received(),
                errors_out: data.total_errors_on_transmitted(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Temperature sensors that report a value.
    pub fn temperatures(&self) -> Vec<TemperatureReading> {
        Components::new_with_refreshed_list()
            .iter()
            .filter_map(|c| {
                c.temperature().map(|t| TemperatureReading {
                    label: c.label().to_string(),
                    celsius: t,
                })
            })
            .collect()
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemMonitor").finish_non_exhaustive()
    }
}

fn percent(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 100.0) as f32
    }
}
