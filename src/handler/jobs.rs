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

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{Job, JobPage, JobState, JobSubmission};
use crate::scheduler::{JobFilter, Scheduler};

#[utoipa::path(post, path = "/jobs", request_body = JobSubmission, responses((status = 201, body = Job)))]
pub async fn submit(
    State(scheduler): State<Arc<Scheduler>>,
    Json(submission): Json<JobSubmission>,
) -> Result<(StatusCode, Json<Job>)> {
    let job = scheduler.submit_job(submission)?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    state: Option<JobState>,
    partition: Option<String>,
    user: Option<String>,
    limit: Option<usize>,
}

#[utoipa::path(get, path = "/jobs", responses((status = 200, body = JobPage)))]
pub async fn list(
    State(scheduler): State<Arc<Scheduler>>,
    Query(query): Query<ListQuery>,
) -> Json<JobPage> {
    let filter = JobFilter {
        state: query.state,
        partition: query.partition,
        user: query.user,
        limit: query.limit.unwrap_or(100),
    };
    Json(JobPage::new(scheduler.list_jobs(filter)))
}

#[utoipa::path(get, path = "/jobs/{id}", responses((status = 200, body = Job), (status = 404)))]
pub async fn get(
    State(scheduler): State<Arc<Scheduler>>,
    Path(id): Path<String>,
) -> Result<Json<Job>> {
    Ok(Json(scheduler.get_job(&id)?))
}

#[utoipa::path(delete, path = "/jobs/{id}", responses((status = 200, body = Job), (status = 404)))]
pub async fn cancel(
    State(scheduler): State<Arc<Scheduler>>,
    Path(id): Path<String>,
) -> Result<Json<Job>> {
    Ok(Json(scheduler.cancel_job(&id)?))
}
