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

//! Prometheus metric exposure. Collectors are owned by a `Metrics` value
//! constructed once by `Scheduler::new`, not process-global `lazy_static!`s,
//! so registry lifecycle is explicit and restart-safe.

use prometheus::{
    Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, IntGauge, Opts, Registry, TextEncoder,
};

const CYCLE_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];
const WAIT_BUCKETS: &[f64] = &[1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0];
const RUNTIME_BUCKETS: &[f64] = &[
    1.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0, 14400.0,
];

pub struct Metrics {
    registry: Registry,

    // Cluster gauges
    pub cpus_total: IntGauge,
    pub cpus_allocated: IntGauge,
    pub cpus_idle: IntGauge,
    pub gpus_total: IntGauge,
    pub gpus_allocated: IntGauge,
    pub memory_total_bytes: Gauge,
    pub memory_allocated_bytes: Gauge,

    // Queue gauges
    pub queue_pending: IntGauge,
    pub queue_running: IntGauge,
    pub queue_suspended: IntGauge,
    pub queue_completing: IntGauge,

    // Per-partition / per-user / per-account gauges
    pub partition_cpus_total: GaugeVec,
    pub partition_cpus_allocated: GaugeVec,
    pub partition_gpus_total: GaugeVec,
    pub partition_gpus_allocated: GaugeVec,
    pub partition_jobs_running: GaugeVec,
    pub partition_jobs_pending: GaugeVec,
    pub partition_state: GaugeVec,
    pub user_jobs_running: GaugeVec,
    pub user_jobs_pending: GaugeVec,
    pub account_jobs_running: GaugeVec,
    pub account_jobs_pending: GaugeVec,

    // Counters
    pub jobs_submitted_total: prometheus::Counter,
    pub jobs_completed_total: prometheus::Counter,
    pub jobs_failed_total: prometheus::Counter,
    pub jobs_cancelled_total: prometheus::Counter,
    pub jobs_timeout_total: prometheus::Counter,

    // Histograms
    pub scheduler_cycle_seconds: Histogram,
    pub job_wait_time_seconds: Histogram,
    pub job_runtime_seconds: Histogram,

    // Scheduler-loop gauge
    pub scheduler_backfill_jobs: IntGauge,

    _scheduler_info: GaugeVec,
}

impl Metrics {
    pub fn new(version: &str) -> Self {
        let registry = Registry::new();

        macro_rules! register {
            ($collector:expr) => {{
                let c = $collector;
                registry.register(Box::new(c.clone())).expect("metric registration never fails for a freshly-built registry");
                c
            }};
        }

        let cpus_total = register!(IntGauge::new("slurm_cpus_total", "Total number of CPUs in the cluster").unwrap());
        let cpus_allocated = register!(IntGauge::new("slurm_cpus_allocated", "Number of allocated CPUs").unwrap());
        let cpus_idle = register!(IntGauge::new("slurm_cpus_idle", "Number of idle CPUs").unwrap());
        let gpus_total = register!(IntGauge::new("slurm_gpus_total", "Total number of GPUs in the cluster").unwrap());
        let gpus_allocated = register!(IntGauge::new("slurm_gpus_allocated", "Number of allocated GPUs").unwrap());
        let memory_total_bytes = register!(Gauge::new("slurm_memory_total_bytes", "Total memory in the cluster (bytes)").unwrap());
        let memory_allocated_bytes = register!(Gauge::new("slurm_memory_allocated_bytes", "Allocated memory (bytes)").unwrap());

        let queue_pending = register!(IntGauge::new("slurm_queue_pending", "Number of pending jobs in the queue").unwrap());
        let queue_running = register!(IntGauge::new("slurm_queue_running", "Number of running jobs").unwrap());
        let queue_suspended = register!(IntGauge::new("slurm_queue_suspended", "Number of suspended jobs").unwrap());
        let queue_completing = register!(IntGauge::new("slurm_queue_completing", "Number of jobs in completing state").unwrap());

        let partition_cpus_total = register!(GaugeVec::new(
            Opts::new("slurm_partition_cpus_total", "Total CPUs in partition"),
            &["partition"]
        ).unwrap());
        let partition_cpus_allocated = register!(GaugeVec::new(
            Opts::new("slurm_partition_cpus_allocated", "Allocated CPUs in partition"),
            &["partition"]
        ).unwrap());
        let partition_gpus_total = register!(GaugeVec::new(
            Opts::new("slurm_partition_gpus_total", "Total GPUs in partition"),
            &["partition"]
        ).unwrap());
        let partition_gpus_allocated = register!(GaugeVec::new(
            Opts::new("slurm_partition_gpus_allocated", "Allocated GPUs in partition"),
            &["partition"]
        ).unwrap());
        let partition_jobs_running = register!(GaugeVec::new(
            Opts::new("slurm_partition_jobs_running", "Running jobs in partition"),
            &["partition"]
        ).unwrap());
        let partition_jobs_pending = register!(GaugeVec::new(
            Opts::new("slurm_partition_jobs_pending", "Pending jobs in partition"),
            &["partition"]
        ).unwrap());
        let partition_state = register!(GaugeVec::new(
            Opts::new("slurm_partition_state", "Partition state (1=UP, 0=DOWN/DRAIN/INACTIVE)"),
            &["partition"]
        ).unwrap());

        let user_jobs_running = register!(GaugeVec::new(
            Opts::new("slurm_user_jobs_running", "Running jobs per user"),
            &["user"]
        ).unwrap());
        let user_jobs_pending = register!(GaugeVec::new(
            Opts::new("slurm_user_jobs_pending", "Pending jobs per user"),
            &["user"]
        ).unwrap());
        let account_jobs_running = register!(GaugeVec::new(
            Opts::new("slurm_account_jobs_running", "Running jobs per account"),
            &["account"]
        ).unwrap());
        let account_jobs_pending = register!(GaugeVec::new(
            Opts::new("slurm_account_jobs_pending", "Pending jobs per account"),
            &["account"]
        ).unwrap());

        let jobs_submitted_total = register!(prometheus::Counter::new("slurm_jobs_submitted_total", "Total number of jobs submitted").unwrap());
        let jobs_completed_total = register!(prometheus::Counter::new("slurm_jobs_completed_total", "Total number of jobs completed successfully").unwrap());
        let jobs_failed_total = register!(prometheus::Counter::new("slurm_jobs_failed_total", "Total number of jobs that failed").unwrap());
        let jobs_cancelled_total = register!(prometheus::Counter::new("slurm_jobs_cancelled_total", "Total number of jobs cancelled").unwrap());
        let jobs_timeout_total = register!(prometheus::Counter::new("slurm_jobs_timeout_total", "Total number of jobs that timed out").unwrap());

        let scheduler_cycle_seconds = register!(Histogram::with_opts(
            HistogramOpts::new("slurm_scheduler_cycle_seconds", "Time taken for scheduler cycle")
                .buckets(CYCLE_BUCKETS.to_vec())
        ).unwrap());
        let job_wait_time_seconds = register!(Histogram::with_opts(
            HistogramOpts::new("slurm_job_wait_time_seconds", "Time jobs spend waiting in queue")
                .buckets(WAIT_BUCKETS.to_vec())
        ).unwrap());
        let job_runtime_seconds = register!(Histogram::with_opts(
            HistogramOpts::new("slurm_job_runtime_seconds", "Actual job runtime")
                .buckets(RUNTIME_BUCKETS.to_vec())
        ).unwrap());

        let scheduler_backfill_jobs = register!(IntGauge::new("slurm_scheduler_backfill_jobs", "Number of jobs scheduled via backfill").unwrap());

        let scheduler_info = register!(GaugeVec::new(
            Opts::new("slurm_scheduler", "Scheduler information"),
            &["version", "scheduler_type", "algorithm"]
        ).unwrap());
        scheduler_info
            .with_label_values(&[version, "pulse-simulator", "priority-fifo"])
            .set(1.0);

        Metrics {
            registry,
            cpus_total,
            cpus_allocated,
            cpus_idle,
            gpus_total,
            gpus_allocated,
            memory_total_bytes,
            memory_allocated_bytes,
            queue_pending,
            queue_running,
            queue_suspended,
            queue_completing,
            partition_cpus_total,
            partition_cpus_allocated,
            partition_gpus_total,
            partition_gpus_allocated,
            partition_jobs_running,
            partition_jobs_pending,
            partition_state,
            user_jobs_running,
            user_jobs_pending,
            account_jobs_running,
            account_jobs_pending,
            jobs_submitted_total,
            jobs_completed_total,
            jobs_failed_total,
            jobs_cancelled_total,
            jobs_timeout_total,
            scheduler_cycle_seconds,
            job_wait_time_seconds,
            job_runtime_seconds,
            scheduler_backfill_jobs,
            _scheduler_info: scheduler_info,
        }
    }

    /// Render the Prometheus text exposition format for `GET /metrics`.
    pub fn gather(&self) -> String {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder
            .encode(&metric_families, &mut buf)
            .expect("text encoding of well-formed metric families never fails");
        String::from_utf8(buf).expect("Prometheus text encoder always emits valid UTF-8")
    }
}
