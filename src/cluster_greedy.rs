// Greedy priority-queue clusterer (C8, section 4.8): once the live tile
// count has dropped low enough for an O(N^2) pair queue to be affordable,
// repeatedly merge the single cheapest pair until no more tiles remain to
// merge against.

use crate::histogram::{Histogram, HistogramSet};
use crate::util::clamp;

// `min_cluster_size` is a cubic ramp on `quality`, capped at
// `MAX_MIN_CLUSTER_SIZE` (section 4.8).
pub fn min_cluster_size(quality: i32) -> usize {
  let q = clamp(quality, 0, 100) as i64;
  let ramp = 1 + (q * q * q * 99) / 1_000_000;
  ramp.min(crate::consts::MAX_MIN_CLUSTER_SIZE as i64) as usize
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
  idx1: usize,
  idx2: usize,
  cost_diff: i64,
}

// A dense priority queue over all live pairs, with only the head-minimum
// invariant maintained (Design Notes, "Queue operations"): `push` appends
// and swaps into the head if it beats it; `pop` overwrites the popped slot
// with the last element. Correctness doesn't depend on full heap order
// since every merge does a complete linear scan to invalidate entries.
struct PairQueue {
  entries: Vec<QueueEntry>,
}

impl PairQueue {
  fn new() -> Self {
    Self { entries: Vec::new() }
  }

  fn push(&mut self, entry: QueueEntry) {
    self.entries.push(entry);
    let last = self.entries.len() - 1;
    if last > 0 && self.entries[last].cost_diff < self.entries[0].cost_diff {
      self.entries.swap(0, last);
    }
  }

  // Pop the current head (index 0), restoring the head invariant among
  // the remainder with an O(n) scan.
  fn pop_head(&mut self) -> Option<QueueEntry> {
    if self.entries.is_empty() {
      return None;
    }
    let head = self.entries[0];
    let last_idx = self.entries.len() - 1;
    self.entries[0] = self.entries[last_idx];
    self.entries.pop();
    if !self.entries.is_empty() {
      let mut min_pos = 0;
      for i in 1..self.entries.len() {
        if self.entries[i].cost_diff < self.entries[min_pos].cost_diff {
          min_pos = i;
        }
      }
      self.entries.swap(0, min_pos);
    }
    Some(head)
  }

  fn remove_touching(&mut self, idx1: usize, idx2: usize) {
    self.entries.retain(|e| e.idx1 != idx1 && e.idx2 != idx1 && e.idx1 != idx2 && e.idx2 != idx2);
    if !self.entries.is_empty() {
      let mut min_pos = 0;
      for i in 1..self.entries.len() {
        if self.entries[i].cost_diff < self.entries[min_pos].cost_diff {
          min_pos = i;
        }
      }
      self.entries.swap(0, min_pos);
    }
  }

  fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

fn cost_diff(a: &Histogram, b: &Histogram) -> i64 {
  let combined = Histogram::combined(a, b);
  let mut combined = combined;
  combined.estimate_bit_cost();
  combined.bit_cost - a.bit_cost - b.bit_cost
}

// Merge tiles greedily until the queue empties (section 4.8).
pub fn run_greedy_pass(set: &mut HistogramSet) {
  let live: Vec<usize> = set.iter_present().map(|(i, _)| i).collect();
  let mut queue = PairQueue::new();

  for a in 0..live.len() {
    for b in (a + 1)..live.len() {
      let (i, j) = (live[a], live[b]);
      let diff = cost_diff(set.get(i).unwrap(), set.get(j).unwrap());
      queue.push(QueueEntry { idx1: i, idx2: j, cost_diff: diff });
    }
  }

  while let Some(best) = queue.pop_head() {
    if !set.is_present(best.idx1) || !set.is_present(best.idx2) {
      // One side was already merged away by an earlier pop; this entry
      // is stale (its removal was deferred to the linear scan below).
      continue;
    }

    let other = set.get(best.idx2).unwrap().clone();
    let mut merged = set.get(best.idx1).unwrap().clone();
    merged.add(&other);
    merged.estimate_bit_cost();
    merged.recompute_trivial_symbol();
    let survivor = best.idx1;
    set.set(survivor, merged);
    set.clear(best.idx2);

    queue.remove_touching(best.idx1, best.idx2);

    for (other_idx, other_histo) in set.iter_present().map(|(i, h)| (i, h.clone())).collect::<Vec<_>>() {
      if other_idx == survivor {
        continue;
      }
      let diff = cost_diff(set.get(survivor).unwrap(), &other_histo);
      queue.push(QueueEntry { idx1: survivor, idx2: other_idx, cost_diff: diff });
    }
  }

  debug_assert!(queue.is_empty());
  set.shrink_to_fit_trailing_absent();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backward_ref::BackwardRef;

  fn tile(argb: u32) -> Histogram {
    let mut h = Histogram::new(0);
    for _ in 0..16 {
      h.add_symbol(BackwardRef::literal(argb));
    }
    h.estimate_bit_cost();
    h.recompute_trivial_symbol();
    h
  }

  #[test]
  fn min_cluster_size_is_one_at_quality_zero_and_ramps_up() {
    assert_eq!(min_cluster_size(0), 1);
    assert!(min_cluster_size(100) <= crate::consts::MAX_MIN_CLUSTER_SIZE);
  }

  #[test]
  fn identical_tiles_collapse_to_a_single_cluster() {
    let mut set = HistogramSet::new(6);
    for i in 0..6 {
      set.set(i, tile(0xFF113355));
    }
    run_greedy_pass(&mut set);
    assert_eq!(set.iter_present().count(), 1);
  }
}
