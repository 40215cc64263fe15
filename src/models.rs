// Copyright 2026 Pulse Scheduler Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Job/partition data model. Field names and constraints follow the SLURM-style
//! scheduler this service simulates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Job priority label; the numeric weight (not the label) drives ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Numeric weight used by the priority-FIFO ordering.
    pub fn weight(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 10,
            Priority::High => 50,
            Priority::Urgent => 100,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartitionState {
    Up,
    Down,
    Drain,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    PendingDependency,
    Running,
    Suspended,
    Completing,
    Completed,
    Failed,
    Timeout,
    Cancelled,
    NodeFail,
    Preempted,
}

impl JobState {
    /// A terminal state is one a job can never leave.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed
                | JobState::Failed
                | JobState::Timeout
                | JobState::Cancelled
                | JobState::NodeFail
                | JobState::Preempted
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResourceRequirements {
    pub cpus: u32,
    pub gpus: u32,
    pub memory_gb: f64,
    pub time_limit_minutes: u32,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            cpus: 1,
            gpus: 0,
            memory_gb: 1.0,
            time_limit_minutes: 60,
        }
    }
}

/// Resource dimensions, named so validation failures can point at the
/// exact constraint violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDimension {
    Cpus,
    Gpus,
    MemoryGb,
    TimeLimitMinutes,
}

impl std::fmt::Display for ResourceDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceDimension::Cpus => "cpus",
            ResourceDimension::Gpus => "gpus",
            ResourceDimension::MemoryGb => "memory_gb",
            ResourceDimension::TimeLimitMinutes => "time_limit_minutes",
        };
        f.write_str(s)
    }
}

/// Request to submit a new job. Distinct from `Job`: it carries no id, state,
/// or timestamps — those are assigned by the submission validator.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JobSubmission {
    pub name: String,
    #[serde(default = "default_partition")]
    pub partition: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub resources: ResourceRequirements,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_partition() -> String {
    "gpu".to_string()
}

fn default_command() -> String {
    "/bin/sleep 60".to_string()
}

fn default_user() -> String {
    "demo-user".to_string()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub partition: String,
    pub priority: Priority,
    pub priority_value: i64,
    pub resources: ResourceRequirements,
    pub command: String,
    pub account: Option<String>,
    pub user: String,

    pub state: JobState,
    pub exit_code: Option<i32>,
    pub node_id: Option<String>,

    pub submit_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Partition {
    pub name: String,
    pub state: PartitionState,
    pub total_nodes: u32,
    pub total_cpus: u32,
    pub total_gpus: u32,
    pub total_memory_gb: f64,

    pub allocated_cpus: u32,
    pub allocated_gpus: u32,
    pub allocated_memory_gb: f64,

    pub max_time_minutes: u32,
    pub default_time_minutes: u32,

    pub jobs_running: u32,
    pub jobs_pending: u32,
}

impl Partition {
    pub fn idle_cpus(&self) -> u32 {
        self.total_cpus - self.allocated_cpus
    }

    pub fn idle_gpus(&self) -> u32 {
        self.total_gpus - self.allocated_gpus
    }

    pub fn idle_memory_gb(&self) -> f64 {
        self.total_memory_gb - self.allocated_memory_gb
    }

    /// The four default partitions created on start.
    pub fn defaults() -> Vec<Partition> {
        vec![
            Partition::new("gpu", 4, 256, 32, 8192.0, 7200, 60),
            Partition::new("cpu", 4, 768, 0, 4096.0, 10080, 120),
            Partition::new("highmem", 2, 384, 0, 8192.0, 4320, 240),
            Partition::new("debug", 1, 16, 2, 128.0, 30, 10),
        ]
    }

    fn new(
        name: &str,
        total_nodes: u32,
        total_cpus: u32,
        total_gpus: u32,
        total_memory_gb: f64,
        max_time_minutes: u32,
        default_time_minutes: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            state: PartitionState::Up,
            total_nodes,
            total_cpus,
            total_gpus,
            total_memory_gb,
            allocated_cpus: 0,
            allocated_gpus: 0,
            allocated_memory_gb: 0.0,
            max_time_minutes,
            default_time_minutes,
            jobs_running: 0,
            jobs_pending: 0,
        }
    }
}

/// Envelope for `GET /jobs`: the filtered/limited page plus counts taken
/// over that same page, not the whole scheduler state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub total: usize,
    pub pending: usize,
    pub running: usize,
}

impl JobPage {
    pub fn new(jobs: Vec<Job>) -> Self {
        let pending = jobs.iter().filter(|j| j.state == JobState::Pending).count();
        let running = jobs.iter().filter(|j| j.state == JobState::Running).count();
        let total = jobs.len();
        Self {
            jobs,
            total,
            pending,
            running,
        }
    }
}

/// Envelope for `GET /partitions`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PartitionPage {
    pub partitions: Vec<Partition>,
    pub total: usize,
}

impl PartitionPage {
    pub fn new(partitions: Vec<Partition>) -> Self {
        let total = partitions.len();
        Self { partitions, total }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClusterSummary {
    pub total_nodes: u32,
    pub total_cpus: u32,
    pub total_gpus: u32,
    pub total_memory_gb: f64,

    pub allocated_cpus: u32,
    pub allocated_gpus: u32,
    pub allocated_memory_gb: f64,

    pub jobs_pending: u32,
    pub jobs_running: u32,
    pub jobs_completed_24h: u64,
    pub jobs_failed_24h: u64,

    pub partitions: usize,
}
