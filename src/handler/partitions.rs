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

use axum::extract::{Path, State};
use axum::Json;

use crate::error::Result;
use crate::models::{Partition, PartitionPage};
use crate::scheduler::Scheduler;

#[utoipa::path(get, path = "/partitions", responses((status = 200, body = PartitionPage)))]
pub async fn list(State(scheduler): State<Arc<Scheduler>>) -> Json<PartitionPage> {
    Json(PartitionPage::new(scheduler.partitions()))
}

#[utoipa::path(get, path = "/partitions/{name}", responses((status = 200, body = Partition), (status = 404)))]
pub async fn get(
    State(scheduler): State<Arc<Scheduler>>,
    Path(name): Path<String>,
) -> Result<Json<Partition>> {
    Ok(Json(scheduler.partition(&name)?))
}
