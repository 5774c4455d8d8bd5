//! Text rendering of system snapshots.

use std::fmt::Write;

use chrono::{Local, TimeZone};

use super::{DiskSnapshot, InterfaceSnapshot, ProcessSnapshot, SystemSnapshot};

const BAR_CELLS: usize = 20;

/// Bytes in B/KB/MB/GB/TB/PB, base 1024, one decimal.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} PB", value)
}

/// `3d 4h 5m`, `4h 5m` or `5m 6s`.
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}

/// `[██████░░░░...]` with `BAR_CELLS` cells.
pub fn usage_bar(percent: f32) -> String {
    let filled = ((BAR_CELLS as f32 * percent / 100.0) as usize).min(BAR_CELLS);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

/// Integer with thousands separators.
pub fn with_commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_timestamp(epoch_secs: u64) -> String {
    Local
        .timestamp_opt(epoch_secs as i64, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".into())
}

pub fn render_system_info(snap: &SystemSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🖥️ System Information");
    let _ = writeln!(out, "{}\n", "=".repeat(50));

    let _ = writeln!(out, "📋 System Details:");
    let _ = writeln!(out, "  OS: {}", snap.os);
    let _ = writeln!(out, "  Kernel: {}", snap.kernel);
    let _ = writeln!(out, "  Architecture: {}", snap.architecture);
    let _ = writeln!(out, "  Hostname: {}", snap.hostname);
    let _ = writeln!(out, "  Agent Version: {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "  Boot Time: {}", format_timestamp(snap.boot_time));
    let _ = writeln!(out, "  Uptime: {}\n", format_uptime(snap.uptime_secs));

    let _ = writeln!(out, "🔧 CPU Information:");
    let _ = writeln!(
        out,
        "  Physical Cores: {}",
        snap.physical_cores
            .map(|c| c.to_string())
            .unwrap_or_else(|| "Unknown".into())
    );
    let _ = writeln!(out, "  Logical Cores: {}", snap.logical_cores);
    let _ = writeln!(out, "  CPU Usage: {:.1}%", snap.cpu_percent);
    let per_core = snap
        .per_core_percent
        .iter()
        .map(|c| format!("{:.1}%", c))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "  Per-Core Usage: {}\n", per_core);

    let mem = &snap.memory;
    let _ = writeln!(out, "💾 Memory Information:");
    let _ = writeln!(out, "  Total RAM: {}", format_bytes(mem.total));
    let _ = writeln!(out, "  Available RAM: {}", format_bytes(mem.available));
    let _ = writeln!(out, "  Used RAM: {}", format_bytes(mem.used));
    let _ = writeln!(out, "  RAM Usage: {:.1}%", mem.percent());
    let _ = writeln!(out, "  Swap Total: {}", format_bytes(mem.swap_total));
    let _ = writeln!(out, "  Swap Used: {}", format_bytes(mem.swap_used));
    let _ = writeln!(out, "  Swap Usage: {:.1}%\n", mem.swap_percent());

    let _ = writeln!(out, "💿 Disk Information:");
    match &snap.root_disk {
        Some(disk) => {
            let _ = writeln!(out, "  Total Disk: {}", format_bytes(disk.total));
            let _ = writeln!(out, "  Used Disk: {}", format_bytes(disk.used()));
            let _ = writeln!(out, "  Free Disk: {}", format_bytes(disk.available));
            let _ = writeln!(out, "  Disk Usage: {:.1}%", disk.percent());
        }
        None => {
            let _ = writeln!(out, "  No disks found.");
        }
    }

    out
}

pub fn render_processes(processes: &[ProcessSnapshot], limit: usize, sort_by: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🔄 Top {} Processes (sorted by {}):", limit, sort_by);
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(
        out,
        "{:<8} {:<25} {:<8} {:<10} {:<12} {:<10}",
        "PID", "Name", "CPU%", "Memory%", "Memory", "Status"
    );
    let _ = writeln!(out, "{}", "-".repeat(80));

    for p in processes.iter().take(limit) {
        let name: String = if p.name.is_empty() {
            "N/A".into()
        } else {
            p.name.chars().take(24).collect()
        };
        let _ = writeln!(
            out,
            "{:<8} {:<25} {:<8} {:<10} {:<12} {:<10}",
            p.pid,
            name,
            format!("{:.1}%", p.cpu_percent),
            format!("{:.1}%", p.memory_percent),
            format_bytes(p.memory_bytes),
            p.status
        );
    }

    out
}

pub fn render_disks(disks: &[DiskSnapshot]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "💿 Disk Usage Information");
    let _ = writeln!(out, "{}\n", "=".repeat(60));

    if disks.is_empty() {
        let _ = writeln!(out, "No mounted disks found.");
        return out;
    }

    for disk in disks {
        let pct = disk.percent();
        let _ = writeln!(out, "📁 Drive: {}", disk.device);
        let _ = writeln!(out, "  Mount Point: {}", disk.mount_point);
        let _ = writeln!(out, "  File System: {}", disk.file_system);
        let _ = writeln!(out, "  Total Size: {}", format_bytes(disk.total));
        let _ = writeln!(out, "  Used: {}", format_bytes(disk.used()));
        let _ = writeln!(out, "  Free: {}", format_bytes(disk.available));
        let _ = writeln!(out, "  Usage: {:.1}%", pct);
        let _ = writeln!(out, "  Progress: [{}] {:.1}%\n", usage_bar(pct), pct);
    }

    out
}

pub fn render_network(interfaces: &[InterfaceSnapshot]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🌐 Network Information");
    let _ = writeln!(out, "{}\n", "=".repeat(50));

    let _ = writeln!(out, "📡 Network Interfaces:");
    for iface in interfaces {
        let _ = writeln!(out, "  {}:", iface.name);
        let _ = writeln!(out, "    MAC: {}", iface.mac);
        for (addr, prefix) in &iface.addresses {
            let family = if addr.is_ipv4() { "IPv4" } else { "IPv6" };
            let _ = writeln!(out, "    {}: {}/{}", family, addr, prefix);
        }
        let _ = writeln!(
            out,
            "    Received: {}  Sent: {}\n",
            format_bytes(iface.received),
            format_bytes(iface.transmitted)
        );
    }

    let sum = |f: fn(&InterfaceSnapshot) -> u64| interfaces.iter().map(f).sum::<u64>();
    let _ = writeln!(out, "📊 Network I/O Statistics:");
    let _ = writeln!(out, "  Bytes Sent: {}", format_bytes(sum(|i| i.transmitted)));
    let _ = writeln!(out, "  Bytes Received: {}", format_bytes(sum(|i| i.received)));
    let _ = writeln!(out, "  Packets Sent: {}", with_commas(sum(|i| i.packets_transmitted)));
    let _ = writeln!(out, "  Packets Received: {}", with_commas(sum(|i| i.packets_received)));
    let _ = writeln!(out, "  Errors In: {}", with_commas(sum(|i| i.errors_in)));
    let _ = writeln!(out, "  Errors Out: {}", with_commas(sum(|i| i.errors_out)));

    out
}
