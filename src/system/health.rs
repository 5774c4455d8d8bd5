//! Health rules over a system snapshot.

use std::fmt::Write;

use super::TemperatureReading;

/// Inputs to the health check, all percentages in 0..=100.
#[derive(Debug, Clone, Default)]
pub struct HealthInputs {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk_percent: f32,
    pub temperatures: Vec<TemperatureReading>,
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthReport {
    /// Metrics within normal range.
    pub normal: Vec<String>,
    pub alerts: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl HealthReport {
    pub fn is_optimal(&self) -> bool {
        self.alerts.is_empty() && self.warnings.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🏥 System Health Check");
        let _ = writeln!(out, "{}\n", "=".repeat(40));

        for line in &self.normal {
            let _ = writeln!(out, "✅ {}", line);
        }
        if !self.alerts.is_empty() {
            let _ = writeln!(out, "\n🚨 ALERTS:");
            for alert in &self.alerts {
                let _ = writeln!(out, "  {}", alert);
            }
        }
        if !self.warnings.is_empty() {
            let _ = writeln!(out, "\n⚡ WARNINGS:");
            for warning in &self.warnings {
                let _ = writeln!(out, "  {}", warning);
            }
        }
        if self.is_optimal() {
            let _ = writeln!(out, "\n🎉 System is running optimally!");
        }

        let _ = writeln!(out, "\n💡 Recommendations:");
        for rec in &self.recommendations {
            let _ = writeln!(out, "  - {}", rec);
        }
        out
    }
}

/// Apply the CPU, memory, disk and temperature thresholds.
pub fn evaluate(inputs: &HealthInputs) -> HealthReport {
    let mut report = HealthReport::default();

    let cpu = inputs.cpu_percent;
    if cpu > 80.0 {
        report.alerts.push(format!("⚠️ High CPU usage: {:.1}%", cpu));
    } else if cpu > 60.0 {
        report.warnings.push(format!("⚡ Moderate CPU usage: {:.1}%", cpu));
    } else {
        report.normal.push(format!("CPU usage: {:.1}% (Normal)", cpu));
    }

    let mem = inputs.memory_percent;
    if mem > 90.0 {
        report.alerts.push(format!("🚨 Critical memory usage: {:.1}%", mem));
    } else if mem > 80.0 {
        report.alerts.push(format!("⚠️ High memory usage: {:.1}%", mem));
    } else if mem > 70.0 {
        report.warnings.push(format!("⚡ Moderate memory usage: {:.1}%", mem));
    } else {
        report.normal.push(format!("Memory usage: {:.1}% (Normal)", mem));
    }

    let disk = inputs.disk_percent;
    if disk > 95.0 {
        report.alerts.push(format!("🚨 Critical disk usage: {:.1}%", disk));
    } else if disk > 90.0 {
        report.alerts.push(format!("⚠️ High disk usage: {:.1}%", disk));
    } else if disk > 80.0 {
        report.warnings.push(format!("⚡ Moderate disk usage: {:.1}%", disk));
    } else {
        report.normal.push(format!("Disk usage: {:.1}% (Normal)", disk));
    }

    for t in &inputs.temperatures {
        if t.celsius > 80.0 {
            report
                .alerts
                .push(format!("🌡️ High temperature on {}: {:.1}°C", t.label, t.celsius));
        } else if t.celsius > 70.0 {
            report
                .warnings
                .push(format!("🌡️ Elevated temperature on {}: {:.1}°C", t.label, t.celsius));
        }
    }

    if cpu > 60.0 {
        report
            .recommendations
            .push("Consider closing unnecessary applications".into());
    }
    if mem > 70.0 {
        report
            .recommendations
            .push("Close unused programs to free up memory".into());
    }
    if disk > 80.0 {
        report
            .recommendations
            .push("Clean up disk space by removing unnecessary files".into());
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_normal_is_optimal() {
        let report = evaluate(&HealthInputs {
            cpu_percent: 10.0,
            memory_percent: 40.0,
            disk_percent: 50.0,
            temperatures: vec![],
        });
        assert!(report.is_optimal());
        assert_eq!(report.normal.len(), 3);
        assert!(report.recommendations.is_empty());
        assert!(report.render().contains("System is running optimally!"));
    }

    #[test]
    fn test_threshold_boundaries() {
        // Thresholds are strict: exactly 80% memory is only a warning.
        let report = evaluate(&HealthInputs {
            cpu_percent: 60.0,
            memory_percent: 80.0,
            disk_percent: 95.0,
            temperatures: vec![],
        });
        assert_eq!(report.normal, vec!["CPU usage: 60.0% (Normal)".to_string()]);
        assert_eq!(report.warnings, vec!["⚡ Moderate memory usage: 80.0%".to_string()]);
        assert_eq!(report.alerts, vec!["⚠️ High disk usage: 95.0%".to_string()]);
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn test_critical_levels_and_temperatures() {
        let report = evaluate(&HealthInputs {
            cpu_percent: 95.0,
            memory_percent: 91.0,
            disk_percent: 96.0,
            temperatures: vec![
                TemperatureReading {
                    label: "cpu0".into(),
                    celsius: 85.0,
                },
                TemperatureReading {
                    label: "nvme".into(),
                    celsius: 72.0,
                },
                TemperatureReading {
                    label: "gpu".into(),
                    celsius: 40.0,
                },
            ],
        });
        assert_eq!(report.alerts.len(), 4);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.alerts[1].starts_with("🚨 Critical memory"));
        assert!(report.warnings[0].contains("nvme"));
        let text = report.render();
        assert!(text.contains("🚨 ALERTS:"));
        assert!(text.contains("⚡ WARNINGS:"));
        assert!(!text.contains("optimally"));
    }
}
