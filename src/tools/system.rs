//! System monitor tools.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{blocking, parse_args, Tool, ToolContext};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::system::health::{evaluate, HealthInputs};
use crate::system::report::{render_disks, render_network, render_processes, render_system_info};
use crate::system::ProcessSort;

pub(super) fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(SystemInfoTool),
        Arc::new(ProcessesTool),
        Arc::new(DiskUsageTool),
        Arc::new(NetworkInfoTool),
        Arc::new(SystemHealthTool),
    ]
}

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Tool reporting host facts and utilization.
pub struct SystemInfoTool;

#[async_trait::async_trait]
impl Tool for SystemInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_system_info".into(),
            description: "Get comprehensive system information: OS, CPU, memory and root disk."
                .into(),
            input_schema: no_arguments(),
        }
    }

    async fn execute(&self, _arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let monitor = context.system.clone();
        let snapshot = blocking(move || monitor.snapshot()).await?;
        Ok(ToolCallResult::text(render_system_info(&snapshot)))
    }
}

/// Tool listing running processes.
pub struct ProcessesTool;

#[derive(Debug, Deserialize)]
struct ProcessesArgs {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default = "default_sort")]
    sort_by: String,
}

fn default_limit() -> usize {
    10
}

fn default_sort() -> String {
    "cpu".into()
}

#[async_trait::async_trait]
impl Tool for ProcessesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_processes".into(),
            description: "Get information about running processes.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Number of processes to show",
                        "default": 10
                    },
                    "sort_by": {
                        "type": "string",
                        "enum": ["cpu", "memory", "pid"],
                        "description": "Sort key",
                        "default": "cpu"
                    }
                }
            }),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: ProcessesArgs = parse_args(arguments)?;
        let monitor = context.system.clone();
        let mut processes = blocking(move || monitor.processes()).await?;
        ProcessSort::parse(&args.sort_by).apply(&mut processes);
        Ok(ToolCallResult::text(render_processes(
            &processes,
            args.limit,
            &args.sort_by,
        )))
    }
}

/// Tool reporting every mounted disk.
pub struct DiskUsageTool;

#[async_trait::async_trait]
impl Tool for DiskUsageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_disk_usage".into(),
            description: "Get detailed disk usage information for all mounted drives.".into(),
            input_schema: no_arguments(),
        }
    }

    async fn execute(&self, _arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let monitor = context.system.clone();
        let disks = blocking(move || Ok(monitor.disks())).await?;
        Ok(ToolCallResult::text(render_disks(&disks)))
    }
}

/// Tool reporting network interfaces and traffic.
pub struct NetworkInfoTool;

#[async_trait::async_trait]
impl Tool for NetworkInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_network_info".into(),
            description: "Get network interface addresses and traffic counters.".into(),
            input_schema: no_arguments(),
        }
    }

    async fn execute(&self, _arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let monitor = context.system.clone();
        let interfaces = blocking(move || Ok(monitor.interfaces())).await?;
        Ok(ToolCallResult::text(render_network(&interfaces)))
    }
}

/// Tool checking utilization against health thresholds.
pub struct SystemHealthTool;

#[async_trait::async_trait]
impl Tool for SystemHealthTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_system_health".into(),
            description: "Get overall system health status, alerts and recommendations.".into(),
            input_schema: no_arguments(),
        }
    }

    async fn execute(&self, _arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let monitor = context.system.clone();
        let inputs = blocking(move || {
            let snapshot = monitor.snapshot()?;
            Ok(HealthInputs {
                cpu_percent: snapshot.cpu_percent,
                memory_percent: snapshot.memory.percent(),
                disk_percent: snapshot.root_disk.map(|d| d.percent()).unwrap_or(0.0),
                temperatures: monitor.temperatures(),
            })
        })
        .await?;
        Ok(ToolCallResult::text(evaluate(&inputs).render()))
    }
}
