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

//! The scheduler engine: job store, partition resource model, lifecycle
//! transitions, submission validation, and the query surface.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::hash::node_id_for;
use crate::metrics::Metrics;
use crate::models::{
    ClusterSummary, Job, JobState, JobSubmission, Partition, PartitionState, ResourceDimension,
    ResourceRequirements,
};
use crate::rng::{JobRng, StdJobRng};

/// Cycle advancement only starts rolling for completion once a job has run
/// this long.
const COMPLETION_ROLL_MIN_RUNTIME_SECS: f64 = 10.0;
const COMPLETION_ROLL_FRACTION_THRESHOLD: f64 = 0.3;
const COMPLETION_ROLL_PROBABILITY: f64 = 0.05;
const COMPLETION_SUCCESS_PROBABILITY: f64 = 0.95;

/// Job names must be non-empty and no longer than this many characters.
const JOB_NAME_MAX_LEN: usize = 255;

/// Optional filters for `Scheduler::list_jobs`.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub state: Option<JobState>,
    pub partition: Option<String>,
    pub user: Option<String>,
    pub limit: usize,
}

impl JobFilter {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, 1000),
            ..Default::default()
        }
    }
}

struct CompletedEntry {
    at: DateTime<Utc>,
    state: JobState,
}

/// Everything a mutation touches besides the job records themselves: the
/// partition table, the state/user/account/partition indexes, the completed
/// jobs window, the id counter, and the injected RNG. Guarded by one mutex
/// so every multi-field mutation is atomic.
struct SchedulerState {
    partitions: HashMap<String, Partition>,
    jobs_by_state: HashMap<JobState, HashSet<String>>,
    jobs_by_user: HashMap<String, HashSet<String>>,
    jobs_by_account: HashMap<String, HashSet<String>>,
    jobs_by_partition: HashMap<String, HashSet<String>>,
    completed_jobs: VecDeque<CompletedEntry>,
    job_counter: u64,
    rng: Box<dyn JobRng>,
}

impl SchedulerState {
    fn index_mut(&mut self, state: JobState) -> &mut HashSet<String> {
        self.jobs_by_state.entry(state).or_default()
    }

    fn state_count(&self, state: JobState) -> usize {
        self.jobs_by_state.get(&state).map_or(0, |s| s.len())
    }

    fn prune_completed(&mut self, now: DateTime<Utc>) {
        let cutoff = now - ChronoDuration::hours(24);
        while matches!(self.completed_jobs.front(), Some(e) if e.at <= cutoff) {
            self.completed_jobs.pop_front();
        }
    }
}

pub struct Scheduler {
    jobs: DashMap<String, Job>,
    state: Mutex<SchedulerState>,
    metrics: Metrics,
    /// Flipped to `true` once the background scheduling cycle has started.
    /// Mutating calls made before that point are rejected with `NotReady`.
    ready: AtomicBool,
}

impl Scheduler {
    /// Construct a scheduler with the default partition set and
    /// an OS-entropy (or configured-seed) RNG.
    pub fn new(config: &SchedulerConfig) -> Arc<Self> {
        let rng: Box<dyn JobRng> = if config.rng_seed != 0 {
            Box::new(StdJobRng::from_seed(config.rng_seed))
        } else {
            Box::new(StdJobRng::from_entropy())
        };
        Self::with_rng(config, rng)
    }

    /// Construct with an explicit injected RNG — the seam tests use to pin
    /// the stochastic completion roll.
    pub fn with_rng(config: &SchedulerConfig, rng: Box<dyn JobRng>) -> Arc<Self> {
        let mut partitions = HashMap::new();
        for p in Partition::defaults() {
            partitions.insert(p.name.clone(), p);
        }

        let state = SchedulerState {
            partitions,
            jobs_by_state: HashMap::new(),
            jobs_by_user: HashMap::new(),
            jobs_by_account: HashMap::new(),
            jobs_by_partition: HashMap::new(),
            completed_jobs: VecDeque::new(),
            job_counter: 0,
            rng,
        };

        let scheduler = Arc::new(Scheduler {
            jobs: DashMap::new(),
            state: Mutex::new(state),
            metrics: Metrics::new(&config.version),
            ready: AtomicBool::new(false),
        });
        scheduler.refresh_metrics();
        scheduler
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Called once by the background scheduling cycle when it starts.
    /// Mutating calls made before this point return `NotReady`.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    // ---- Submission validator ------------------------------------------

    pub fn submit_job(&self, submission: JobSubmission) -> Result<Job> {
        if !self.is_ready() {
            return Err(SchedulerError::NotReady);
        }

        let name = submission.name.trim().replace(' ', "_");
        if name.is_empty() {
            return Err(SchedulerError::Validation(
                "job name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > JOB_NAME_MAX_LEN {
            return Err(SchedulerError::Validation(format!(
                "job name exceeds {JOB_NAME_MAX_LEN} characters"
            )));
        }

        let mut state = self.state.lock();

        let partition = state
            .partitions
            .get(&submission.partition)
            .ok_or_else(|| SchedulerError::unknown_partition(&submission.partition))?;

        validate_resources(&submission.resources, partition)?;

        state.job_counter += 1;
        let id = format!("{:06}", state.job_counter);
        let now = Utc::now();

        let job = Job {
            id: id.clone(),
            name,
            partition: submission.partition.clone(),
            priority: submission.priority,
            priority_value: submission.priority.weight(),
            resources: submission.resources,
            command: submission.command,
            account: submission.account.clone(),
            user: submission.user.clone(),
            state: JobState::Pending,
            exit_code: None,
            node_id: None,
            submit_time: now,
            start_time: None,
            end_time: None,
        };

        state.index_mut(JobState::Pending).insert(id.clone());
        state
            .jobs_by_user
            .entry(submission.user)
            .or_default()
            .insert(id.clone());
        if let Some(account) = &submission.account {
            state
                .jobs_by_account
                .entry(account.clone())
                .or_default()
                .insert(id.clone());
        }
        state
            .jobs_by_partition
            .entry(submission.partition.clone())
            .or_default()
            .insert(id.clone());

        state
            .partitions
            .get_mut(&submission.partition)
            .expect("partition looked up above")
            .jobs_pending += 1;

        self.jobs.insert(id, job.clone());
        self.metrics.jobs_submitted_total.inc();

        tracing::info!(job_id = %job.id, partition = %job.partition, "job submitted");
        Ok(job)
    }

    // ---- Query surface -------------------------------------------------

    pub fn get_job(&self, id: &str) -> Result<Job> {
        self.jobs
            .get(id)
            .map(|j| j.clone())
            .ok_or_else(|| SchedulerError::NotFound(format!("job {id} not found")))
    }

    pub fn list_jobs(&self, filter: JobFilter) -> Vec<Job> {
        let limit = if filter.limit == 0 {
            100
        } else {
            filter.limit.clamp(1, 1000)
        };

        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|j| filter.state.is_none_or(|s| j.state == s))
            .filter(|j| filter.partition.as_deref().is_none_or(|p| j.partition == p))
            .filter(|j| filter.user.as_deref().is_none_or(|u| j.user == u))
            .collect();

        jobs.sort_by(|a, b| b.submit_time.cmp(&a.submit_time));
        jobs.truncate(limit);
        jobs
    }

    pub fn partitions(&self) -> Vec<Partition> {
        let state = self.state.lock();
        let mut partitions: Vec<Partition> = state.partitions.values().cloned().collect();
        partitions.sort_by(|a, b| a.name.cmp(&b.name));
        partitions
    }

    /// Force a partition into a given state, bypassing the operator surface
    /// this service doesn't expose. Test-only seam for exercising non-UP
    /// admission behavior.
    #[cfg(test)]
    pub fn set_partition_state_for_test(&self, name: &str, new_state: PartitionState) {
        let mut state = self.state.lock();
        if let Some(partition) = state.partitions.get_mut(name) {
            partition.state = new_state;
        }
    }

    pub fn partition(&self, name: &str) -> Result<Partition> {
        let state = self.state.lock();
        state
            .partitions
            .get(name)
            .cloned()
            .ok_or_else(|| SchedulerError::NotFound(format!("partition {name} not found")))
    }

    pub fn cluster_summary(&self) -> ClusterSummary {
        let mut state = self.state.lock();
        let now = Utc::now();
        state.prune_completed(now);

        let jobs_completed_24h = state
            .completed_jobs
            .iter()
            .filter(|e| e.state == JobState::Completed)
            .count() as u64;
        let jobs_failed_24h = state
            .completed_jobs
            .iter()
            .filter(|e| matches!(e.state, JobState::Failed | JobState::Timeout | JobState::NodeFail))
            .count() as u64;

        let total_nodes = state.partitions.values().map(|p| p.total_nodes).sum();
        let total_cpus = state.partitions.values().map(|p| p.total_cpus).sum();
        let total_gpus = state.partitions.values().map(|p| p.total_gpus).sum();
        let total_memory_gb = state.partitions.values().map(|p| p.total_memory_gb).sum();
        let allocated_cpus = state.partitions.values().map(|p| p.allocated_cpus).sum();
        let allocated_gpus = state.partitions.values().map(|p| p.allocated_gpus).sum();
        let allocated_memory_gb = state
            .partitions
            .values()
            .map(|p| p.allocated_memory_gb)
            .sum();

        ClusterSummary {
            total_nodes,
            total_cpus,
            total_gpus,
            total_memory_gb,
            allocated_cpus,
            allocated_gpus,
            allocated_memory_gb,
            jobs_pending: state.state_count(JobState::Pending) as u32,
            jobs_running: state.state_count(JobState::Running) as u32,
            jobs_completed_24h,
            jobs_failed_24h,
            partitions: state.partitions.len(),
        }
    }

    // ---- Cancellation --------------------------------------------------

    pub fn cancel_job(&self, id: &str) -> Result<Job> {
        if !self.is_ready() {
            return Err(SchedulerError::NotReady);
        }

        let mut state = self.state.lock();
        let mut job_ref = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| SchedulerError::NotFound(format!("job {id} not found")))?;

        if job_ref.state.is_terminal() {
            // Idempotent: already-terminal jobs are a no-op, no metrics emitted.
            return Ok(job_ref.clone());
        }

        self.transition_locked(&mut state, &mut job_ref, JobState::Cancelled, None);
        self.metrics.jobs_cancelled_total.inc();
        tracing::info!(job_id = %id, "job cancelled");
        Ok(job_ref.clone())
    }

    // ---- Scheduling cycle ----------------------------------------------

    /// Runs one scheduling cycle: advance running jobs, admit pending jobs,
    /// republish metrics. Returns the number of jobs admitted this cycle.
    pub fn run_cycle(&self) -> usize {
        let now = Utc::now();
        self.advance_running_jobs(now);
        let admitted = self.admit_pending_jobs(now);
        self.metrics.scheduler_backfill_jobs.set(admitted as i64);
        self.refresh_metrics();
        admitted
    }

    fn advance_running_jobs(&self, now: DateTime<Utc>) {
        let running_ids: Vec<String> = {
            let state = self.state.lock();
            state
                .jobs_by_state
                .get(&JobState::Running)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default()
        };

        for id in running_ids {
            let mut state = self.state.lock();
            let Some(mut job_ref) = self.jobs.get_mut(&id) else {
                continue;
            };
            // The job may have been cancelled by a concurrent request between the
            // snapshot above and this lock acquisition; only still-RUNNING jobs
            // may be advanced.
            if job_ref.state != JobState::Running {
                continue;
            }
            let Some(start_time) = job_ref.start_time else {
                continue;
            };

            let runtime_secs = (now - start_time).num_milliseconds() as f64 / 1000.0;
            let time_limit_secs = job_ref.resources.time_limit_minutes as f64 * 60.0;

            if runtime_secs >= time_limit_secs {
                self.transition_locked(&mut state, &mut job_ref, JobState::Timeout, None);
                self.metrics.jobs_timeout_total.inc();
                tracing::info!(job_id = %id, "job timed out");
                continue;
            }

            let completion_fraction = runtime_secs / time_limit_secs.max(60.0);
            if runtime_secs > COMPLETION_ROLL_MIN_RUNTIME_SECS
                && completion_fraction > COMPLETION_ROLL_FRACTION_THRESHOLD
                && state.rng.unit() < COMPLETION_ROLL_PROBABILITY
            {
                if state.rng.unit() < COMPLETION_SUCCESS_PROBABILITY {
                    self.transition_locked(&mut state, &mut job_ref, JobState::Completed, None);
                    self.metrics.jobs_completed_total.inc();
                } else {
                    self.transition_locked(&mut state, &mut job_ref, JobState::Failed, Some(1));
                    self.metrics.jobs_failed_total.inc();
                }
            }
        }
    }

    /// Priority-FIFO admission with head-of-line bypass.
    fn admit_pending_jobs(&self, now: DateTime<Utc>) -> usize {
        let mut pending: Vec<Job> = {
            let state = self.state.lock();
            state
                .jobs_by_state
                .get(&JobState::Pending)
                .map(|ids| ids.iter().filter_map(|id| self.jobs.get(id).map(|j| j.clone())).collect())
                .unwrap_or_default()
        };

        pending.sort_by(|a, b| {
            b.priority_value
                .cmp(&a.priority_value)
                .then(a.submit_time.cmp(&b.submit_time))
        });

        let mut admitted = 0usize;
        for job in pending {
            let mut state = self.state.lock();
            let fits = {
                let Some(partition) = state.partitions.get(&job.partition) else {
                    continue;
                };
                if partition.state != PartitionState::Up {
                    continue;
                }
                job.resources.cpus <= partition.idle_cpus()
                    && job.resources.gpus <= partition.idle_gpus()
                    && job.resources.memory_gb <= partition.idle_memory_gb()
            };
            if !fits {
                continue;
            }

            let Some(mut job_ref) = self.jobs.get_mut(&job.id) else {
                continue;
            };
            // The job may have been cancelled by a concurrent request between the
            // snapshot above and this lock acquisition; only still-PENDING jobs
            // may be admitted.
            if job_ref.state != JobState::Pending {
                continue;
            }
            self.start_job(&mut state, &mut job_ref, now);
            admitted += 1;
        }
        admitted
    }

    /// Admission step: allocate resources, move indexes, set
    /// start_time/node_id, observe wait time. Caller already holds the lock
    /// and a mutable handle on the job entry.
    fn start_job(
        &self,
        state: &mut SchedulerState,
        job: &mut dashmap::mapref::one::RefMut<'_, String, Job>,
        now: DateTime<Utc>,
    ) {
        let req = job.resources;
        let partition = state
            .partitions
            .get_mut(&job.partition)
            .expect("partition existence checked by caller");

        partition.allocated_cpus += req.cpus;
        partition.allocated_gpus += req.gpus;
        partition.allocated_memory_gb += req.memory_gb;
        partition.jobs_pending -= 1;
        partition.jobs_running += 1;
        let node_id = node_id_for(&partition.name, partition.total_nodes, &job.id);

        state.index_mut(JobState::Pending).remove(&job.id);
        state.index_mut(JobState::Running).insert(job.id.clone());

        let wait_secs = (now - job.submit_time).num_milliseconds() as f64 / 1000.0;
        self.metrics.job_wait_time_seconds.observe(wait_secs.max(0.0));

        job.state = JobState::Running;
        job.start_time = Some(now);
        job.node_id = Some(node_id);

        tracing::info!(job_id = %job.id, node_id = ?job.node_id, "job admitted");
    }

    /// Lifecycle transition: release resources if leaving
    /// RUNNING, move index membership, stamp end_time/exit_code, and append
    /// to the completed-jobs window if the new state is terminal.
    fn transition_locked(
        &self,
        state: &mut SchedulerState,
        job: &mut dashmap::mapref::one::RefMut<'_, String, Job>,
        new_state: JobState,
        exit_code: Option<i32>,
    ) {
        let old_state = job.state;
        let now = Utc::now();

        if old_state == JobState::Running {
            if let Some(partition) = state.partitions.get_mut(&job.partition) {
                let req = job.resources;
                partition.allocated_cpus -= req.cpus;
                partition.allocated_gpus -= req.gpus;
                partition.allocated_memory_gb -= req.memory_gb;
                partition.jobs_running -= 1;
            }
            if let Some(start_time) = job.start_time {
                let runtime_secs = (now - start_time).num_milliseconds() as f64 / 1000.0;
                self.metrics.job_runtime_seconds.observe(runtime_secs.max(0.0));
            }
        }

        state.index_mut(old_state).remove(&job.id);
        state.index_mut(new_state).insert(job.id.clone());

        job.state = new_state;
        job.end_time = Some(now);
        if exit_code.is_some() {
            job.exit_code = exit_code;
        }

        if new_state.is_terminal() {
            state.completed_jobs.push_back(CompletedEntry {
                at: now,
                state: new_state,
            });
            state.prune_completed(now);
        }
    }

    // ---- Metrics publisher ---------------------------------------------

    fn refresh_metrics(&self) {
        let state = self.state.lock();

        let total_cpus: u32 = state.partitions.values().map(|p| p.total_cpus).sum();
        let allocated_cpus: u32 = state.partitions.values().map(|p| p.allocated_cpus).sum();
        let total_gpus: u32 = state.partitions.values().map(|p| p.total_gpus).sum();
        let allocated_gpus: u32 = state.partitions.values().map(|p| p.allocated_gpus).sum();
        let total_memory_gb: f64 = state.partitions.values().map(|p| p.total_memory_gb).sum();
        let allocated_memory_gb: f64 = state
            .partitions
            .values()
            .map(|p| p.allocated_memory_gb)
            .sum();

        self.metrics.cpus_total.set(total_cpus as i64);
        self.metrics.cpus_allocated.set(allocated_cpus as i64);
        self.metrics
            .cpus_idle
            .set((total_cpus - allocated_cpus) as i64);
        self.metrics.gpus_total.set(total_gpus as i64);
        self.metrics.gpus_allocated.set(allocated_gpus as i64);
        self.metrics
            .memory_total_bytes
            .set(total_memory_gb * 1024.0 * 1024.0 * 1024.0);
        self.metrics
            .memory_allocated_bytes
            .set(allocated_memory_gb * 1024.0 * 1024.0 * 1024.0);

        self.metrics
            .queue_pending
            .set(state.state_count(JobState::Pending) as i64);
        self.metrics
            .queue_running
            .set(state.state_count(JobState::Running) as i64);
        self.metrics
            .queue_suspended
            .set(state.state_count(JobState::Suspended) as i64);
        self.metrics
            .queue_completing
            .set(state.state_count(JobState::Completing) as i64);

        for partition in state.partitions.values() {
            let labels = [partition.name.as_str()];
            self.metrics
                .partition_cpus_total
                .with_label_values(&labels)
                .set(partition.total_cpus as f64);
            self.metrics
                .partition_cpus_allocated
                .with_label_values(&labels)
                .set(partition.allocated_cpus as f64);
            self.metrics
                .partition_gpus_total
                .with_label_values(&labels)
                .set(partition.total_gpus as f64);
            self.metrics
                .partition_gpus_allocated
                .with_label_values(&labels)
                .set(partition.allocated_gpus as f64);
            self.metrics
                .partition_jobs_running
                .with_label_values(&labels)
                .set(partition.jobs_running as f64);
            self.metrics
                .partition_jobs_pending
                .with_label_values(&labels)
                .set(partition.jobs_pending as f64);
            self.metrics
                .partition_state
                .with_label_values(&labels)
                .set(if partition.state == PartitionState::Up { 1.0 } else { 0.0 });
        }

        let mut user_running: HashMap<&str, i64> = HashMap::new();
        let mut user_pending: HashMap<&str, i64> = HashMap::new();
        let mut account_running: HashMap<&str, i64> = HashMap::new();
        let mut account_pending: HashMap<&str, i64> = HashMap::new();

        for entry in self.jobs.iter() {
            let job = entry.value();
            match job.state {
                JobState::Running => {
                    *user_running.entry(job.user.as_str()).or_insert(0) += 1;
                    if let Some(account) = &job.account {
                        *account_running.entry(account.as_str()).or_insert(0) += 1;
                    }
                }
                JobState::Pending => {
                    *user_pending.entry(job.user.as_str()).or_insert(0) += 1;
                    if let Some(account) = &job.account {
                        *account_pending.entry(account.as_str()).or_insert(0) += 1;
                    }
                }
                _ => {}
            }
        }

        let all_users: HashSet<&str> = user_running.keys().chain(user_pending.keys()).copied().collect();
        for user in all_users {
            self.metrics
                .user_jobs_running
                .with_label_values(&[user])
                .set(*user_running.get(user).unwrap_or(&0) as f64);
            self.metrics
                .user_jobs_pending
                .with_label_values(&[user])
                .set(*user_pending.get(user).unwrap_or(&0) as f64);
        }

        let all_accounts: HashSet<&str> = account_running
            .keys()
            .chain(account_pending.keys())
            .copied()
            .collect();
        for account in all_accounts {
            self.metrics
                .account_jobs_running
                .with_label_values(&[account])
                .set(*account_running.get(account).unwrap_or(&0) as f64);
            self.metrics
                .account_jobs_pending
                .with_label_values(&[account])
                .set(*account_pending.get(account).unwrap_or(&0) as f64);
        }
    }
}

/// Submission-time resource validation: every
/// requested dimension must fit the partition's *total* capacity, and the
/// requested time limit must fit the partition's policy envelope.
fn validate_resources(req: &ResourceRequirements, partition: &Partition) -> Result<()> {
    if req.cpus > partition.total_cpus {
        return Err(SchedulerError::oversized(
            ResourceDimension::Cpus,
            req.cpus,
            partition.total_cpus,
        ));
    }
    if req.gpus > partition.total_gpus {
        return Err(SchedulerError::oversized(
            ResourceDimension::Gpus,
            req.gpus,
            partition.total_gpus,
        ));
    }
    if req.memory_gb > partition.total_memory_gb {
        return Err(SchedulerError::oversized(
            ResourceDimension::MemoryGb,
            req.memory_gb,
            partition.total_memory_gb,
        ));
    }
    if req.time_limit_minutes > partition.max_time_minutes {
        return Err(SchedulerError::time_limit_exceeded(
            req.time_limit_minutes,
            partition.max_time_minutes,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::rng::{ConstantRng, ScriptedRng};

    fn submission(partition: &str, priority: Priority, cpus: u32) -> JobSubmission {
        JobSubmission {
            name: "job".to_string(),
            partition: partition.to_string(),
            priority,
            resources: ResourceRequirements {
                cpus,
                gpus: 0,
                memory_gb: 4.0,
                time_limit_minutes: 10,
            },
            command: "/bin/sleep 60".to_string(),
            account: None,
            user: "alice".to_string(),
        }
    }

    fn test_scheduler() -> Arc<Scheduler> {
        let config = SchedulerConfig {
            cycle_target_secs: 1.0,
            cycle_min_sleep_secs: 0.1,
            rng_seed: 1,
            version: "test".to_string(),
        };
        // No stochastic completion fires unless unit() returns < 0.05.
        let scheduler = Scheduler::with_rng(&config, Box::new(ConstantRng(0.99)));
        scheduler.mark_ready();
        scheduler
    }

    /// Basic admission into an empty cluster.
    #[test]
    fn basic_admission() {
        let scheduler = test_scheduler();
        let job = scheduler.submit_job(submission("debug", Priority::Normal, 2)).unwrap();
        scheduler.run_cycle();

        let job = scheduler.get_job(&job.id).unwrap();
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.node_id.as_deref(), Some("debug-node-01"));

        let partition = scheduler.partition("debug").unwrap();
        assert_eq!(partition.allocated_cpus, 2);

        let summary = scheduler.cluster_summary();
        assert_eq!(summary.jobs_running, 1);
    }

    /// A lower-priority job submitted first does not
    /// jump ahead of a higher-priority job submitted just after it.
    #[test]
    fn priority_ordering() {
        let scheduler = test_scheduler();
        // debug has 16 cpus total; consume 14 so only 2 idle remain.
        let filler = scheduler
            .submit_job(submission("debug", Priority::Normal, 14))
            .unwrap();
        scheduler.run_cycle();
        assert_eq!(scheduler.get_job(&filler.id).unwrap().state, JobState::Running);

        let a = scheduler
            .submit_job(submission("debug", Priority::Low, 2))
            .unwrap();
        let b = scheduler
            .submit_job(submission("debug", Priority::Urgent, 2))
            .unwrap();
        scheduler.run_cycle();

        assert_eq!(scheduler.get_job(&b.id).unwrap().state, JobState::Running);
        assert_eq!(scheduler.get_job(&a.id).unwrap().state, JobState::Pending);
    }

    /// A smaller job behind a larger one that
    /// cannot fit is still admitted in the same cycle.
    #[test]
    fn head_of_line_bypass() {
        let scheduler = test_scheduler();
        let filler = scheduler
            .submit_job(submission("debug", Priority::Normal, 14))
            .unwrap();
        scheduler.run_cycle();
        assert_eq!(scheduler.get_job(&filler.id).unwrap().state, JobState::Running);

        let x = scheduler
            .submit_job(submission("debug", Priority::High, 8))
            .unwrap();
        let y = scheduler
            .submit_job(submission("debug", Priority::Normal, 2))
            .unwrap();
        scheduler.run_cycle();

        assert_eq!(scheduler.get_job(&x.id).unwrap().state, JobState::Pending);
        assert_eq!(scheduler.get_job(&y.id).unwrap().state, JobState::Running);
    }

    /// An oversized submission is rejected and causes no state change.
    #[test]
    fn oversized_submission_rejected() {
        let scheduler = test_scheduler();
        let result = scheduler.submit_job(submission("debug", Priority::Normal, 17));
        assert!(result.is_err());

        let summary = scheduler.cluster_summary();
        assert_eq!(summary.jobs_pending, 0);
        assert_eq!(summary.jobs_running, 0);
    }

    /// Backdate a running job's start_time past its time
    /// limit and confirm the next cycle transitions it to TIMEOUT and
    /// restores partition counters, with no stochastic completion firing.
    #[test]
    fn timeout_transition() {
        let scheduler = test_scheduler();
        let job = scheduler
            .submit_job(submission("debug", Priority::Normal, 2))
            .unwrap();
        scheduler.run_cycle();
        assert_eq!(scheduler.get_job(&job.id).unwrap().state, JobState::Running);

        {
            let mut entry = scheduler.jobs.get_mut(&job.id).unwrap();
            entry.start_time = Some(Utc::now() - ChronoDuration::minutes(11));
        }
        scheduler.run_cycle();

        let job = scheduler.get_job(&job.id).unwrap();
        assert_eq!(job.state, JobState::Timeout);

        let partition = scheduler.partition("debug").unwrap();
        assert_eq!(partition.allocated_cpus, 0);
    }

    /// Cancellation before admission leaves partition counters
    /// untouched and never records an allocation.
    #[test]
    fn cancellation_before_admission() {
        let scheduler = test_scheduler();
        // Fill the partition so the next submission cannot be admitted.
        let filler = scheduler
            .submit_job(submission("debug", Priority::Urgent, 16))
            .unwrap();
        scheduler.run_cycle();
        assert_eq!(scheduler.get_job(&filler.id).unwrap().state, JobState::Running);

        let job = scheduler
            .submit_job(submission("debug", Priority::Normal, 2))
            .unwrap();
        let cancelled = scheduler.cancel_job(&job.id).unwrap();
        assert_eq!(cancelled.state, JobState::Cancelled);

        scheduler.run_cycle();
        let job = scheduler.get_job(&job.id).unwrap();
        assert_eq!(job.state, JobState::Cancelled);

        let partition = scheduler.partition("debug").unwrap();
        assert_eq!(partition.allocated_cpus, 16);
    }

    #[test]
    fn node_id_matches_debug_partitions_single_node() {
        let scheduler = test_scheduler();
        let job = scheduler
            .submit_job(submission("debug", Priority::Normal, 1))
            .unwrap();
        scheduler.run_cycle();
        let job = scheduler.get_job(&job.id).unwrap();
        assert_eq!(job.node_id.as_deref(), Some("debug-node-01"));
    }

    /// A submission to a DOWN partition is accepted but, unlike an idle-capacity
    /// partition, never admitted no matter how many cycles run.
    #[test]
    fn down_partition_accepts_submissions_but_never_admits() {
        let scheduler = test_scheduler();
        scheduler.set_partition_state_for_test("debug", PartitionState::Down);

        let job = scheduler
            .submit_job(submission("debug", Priority::Urgent, 1))
            .unwrap();
        for _ in 0..5 {
            scheduler.run_cycle();
        }

        let job = scheduler.get_job(&job.id).unwrap();
        assert_eq!(job.state, JobState::Pending);

        let partition = scheduler.partition("debug").unwrap();
        assert_eq!(partition.allocated_cpus, 0);
    }

    /// Mutating calls made before the background cycle has marked the
    /// scheduler ready are rejected instead of silently admitted.
    #[test]
    fn mutations_before_ready_are_rejected() {
        let config = SchedulerConfig {
            cycle_target_secs: 1.0,
            cycle_min_sleep_secs: 0.1,
            rng_seed: 1,
            version: "test".to_string(),
        };
        let scheduler = Scheduler::with_rng(&config, Box::new(ConstantRng(0.99)));

        let result = scheduler.submit_job(submission("debug", Priority::Normal, 1));
        assert!(matches!(result, Err(SchedulerError::NotReady)));

        scheduler.mark_ready();
        let job = scheduler
            .submit_job(submission("debug", Priority::Normal, 1))
            .unwrap();

        // Once ready, cancellation works too; a second scheduler kept
        // not-ready would still reject it.
        assert!(scheduler.cancel_job(&job.id).is_ok());
    }

    /// Job names over the 255-character limit are rejected.
    #[test]
    fn oversized_job_name_rejected() {
        let scheduler = test_scheduler();
        let mut long_name = submission("debug", Priority::Normal, 1);
        long_name.name = "x".repeat(256);
        let result = scheduler.submit_job(long_name);
        assert!(matches!(result, Err(SchedulerError::Validation(_))));

        let mut exact_name = submission("debug", Priority::Normal, 1);
        exact_name.name = "x".repeat(255);
        assert!(scheduler.submit_job(exact_name).is_ok());
    }

    /// `ScriptedRng` pins a multi-step sequence: two non-triggering cycles
    /// followed by a triggering roll that resolves to a failure.
    #[test]
    fn scripted_rng_drives_a_deterministic_completion_sequence() {
        let config = SchedulerConfig {
            cycle_target_secs: 1.0,
            cycle_min_sleep_secs: 0.1,
            rng_seed: 1,
            version: "test".to_string(),
        };
        // First two rolls (0.9) stay above COMPLETION_ROLL_PROBABILITY and
        // don't fire; the third (0.01) triggers; the fourth (0.99) resolves
        // above COMPLETION_SUCCESS_PROBABILITY, i.e. a failure.
        let scheduler = Scheduler::with_rng(
            &config,
            Box::new(ScriptedRng::new(vec![0.9, 0.9, 0.01, 0.99])),
        );
        scheduler.mark_ready();

        let job = scheduler
            .submit_job(submission("debug", Priority::Normal, 2))
            .unwrap();
        scheduler.run_cycle();
        assert_eq!(scheduler.get_job(&job.id).unwrap().state, JobState::Running);

        {
            let mut entry = scheduler.jobs.get_mut(&job.id).unwrap();
            entry.start_time = Some(Utc::now() - ChronoDuration::seconds(300));
        }

        scheduler.run_cycle();
        assert_eq!(scheduler.get_job(&job.id).unwrap().state, JobState::Running);
        scheduler.run_cycle();
        assert_eq!(scheduler.get_job(&job.id).unwrap().state, JobState::Running);
        scheduler.run_cycle();

        let job = scheduler.get_job(&job.id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.exit_code, Some(1));
    }
}
