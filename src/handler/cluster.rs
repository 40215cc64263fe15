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

use axum::extract::State;
use axum::Json;

use crate::models::ClusterSummary;
use crate::scheduler::Scheduler;

#[utoipa::path(get, path = "/cluster/summary", responses((status = 200, body = ClusterSummary)))]
pub async fn summary(State(scheduler): State<Arc<Scheduler>>) -> Json<ClusterSummary> {
    Json(scheduler.cluster_summary())
}
