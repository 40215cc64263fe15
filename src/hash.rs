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

//! Deterministic node assignment. `std`'s `DefaultHasher` is seeded randomly
//! per process, which would make `node_id` change across restarts for the
//! same job id — breaking dashboard stability. FNV-1a is a small,
//! dependency-free, fixed-constant hash that avoids it.

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

pub fn stable_hash(input: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// `"{partition}-node-{N:02d}"` where `N = (stable_hash(id) mod total_nodes) + 1`.
pub fn node_id_for(partition: &str, total_nodes: u32, job_id: &str) -> String {
    let n = (stable_hash(job_id) % total_nodes as u64) + 1;
    format!("{partition}-node-{n:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        assert_eq!(stable_hash("000001"), stable_hash("000001"));
        assert_ne!(stable_hash("000001"), stable_hash("000002"));
    }

    #[test]
    fn node_id_is_within_range_and_zero_padded() {
        for i in 0..50 {
            let id = node_id_for("debug", 1, &format!("{i:06}"));
            assert_eq!(id, "debug-node-01");
        }
        let id = node_id_for("gpu", 4, "000042");
        assert!(id.starts_with("gpu-node-0"));
        let suffix: u32 = id.rsplit('-').next().unwrap().parse().unwrap();
        assert!((1..=4).contains(&suffix));
    }
}
