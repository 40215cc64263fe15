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

//! Injectable randomness for the stochastic completion roll. The cycle
//! advancement step never calls a process-global generator directly; it only
//! ever calls through `JobRng`, so tests can pin outcomes deterministically.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait JobRng: Send {
    /// Uniform sample in `[0, 1)`.
    fn unit(&mut self) -> f64;
}

/// Production RNG: `StdRng` seeded once at scheduler construction.
pub struct StdJobRng {
    rng: StdRng,
}

impl StdJobRng {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl JobRng for StdJobRng {
    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Always returns the same value; useful to force or suppress completion
/// rolls deterministically in tests.
pub struct ConstantRng(pub f64);

impl JobRng for ConstantRng {
    fn unit(&mut self) -> f64 {
        self.0
    }
}

/// Replays a fixed sequence, looping once exhausted.
pub struct ScriptedRng {
    values: Vec<f64>,
    next: usize,
}

impl ScriptedRng {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "ScriptedRng needs at least one value");
        Self { values, next: 0 }
    }
}

impl JobRng for ScriptedRng {
    fn unit(&mut self) -> f64 {
        let v = self.values[self.next % self.values.len()];
        self.next += 1;
        v
    }
}
