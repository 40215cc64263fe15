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

//! Environment-driven configuration, loaded once at startup. Follows the
//! teacher's `config::init()` split between nested `#[derive(EnvConfig)]`
//! sections and a top-level `init()` that applies `.env` overrides first.

use dotenv_config::EnvConfig;

#[derive(EnvConfig, Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(EnvConfig, Debug, Clone)]
pub struct HttpConfig {
    #[env_config(name = "HOST", default = "0.0.0.0")]
    pub host: String,
    #[env_config(name = "PORT", default = 8083)]
    pub port: u16,
}

#[derive(EnvConfig, Debug, Clone)]
pub struct SchedulerConfig {
    /// Target wall-clock length of one scheduling cycle.
    #[env_config(name = "PULSE_CYCLE_TARGET_SECS", default = 1.0)]
    pub cycle_target_secs: f64,
    /// Floor on the inter-cycle sleep, even if a cycle overruns its target.
    #[env_config(name = "PULSE_CYCLE_MIN_SLEEP_SECS", default = 0.1)]
    pub cycle_min_sleep_secs: f64,
    /// Fixed RNG seed for the stochastic completion roll. `0` (the default)
    /// means OS-entropy seeded, i.e. non-reproducible — the production mode.
    #[env_config(name = "PULSE_RNG_SEED", default = 0)]
    pub rng_seed: u64,
    #[env_config(name = "PULSE_SCHEDULER_VERSION", default = "1.0.0")]
    pub version: String,
}

impl Config {
    /// Load `.env` (if present, without overriding already-set process env)
    /// then build from the environment, falling back to built-in defaults.
    pub fn load() -> anyhow::Result<Config> {
        dotenvy::dotenv().ok();
        Config::init().map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))
    }
}
