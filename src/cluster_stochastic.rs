// Stochastic clusterer (C7, section 4.7): a random-pair sampler backed by
// a small fixed-size priority queue, used to cheaply knock down a large
// live tile count before the O(N^2) greedy pass (C8) becomes affordable.

use crate::consts::{LEHMER_MODULUS, LEHMER_MULTIPLIER, STOCHASTIC_QUEUE_SIZE};
use crate::histogram::{estimate_class_cost, sum_counts, Histogram, HistogramSet};

// Lehmer PRNG seeded at 1 (section 4.7: "48271-multiplier Lehmer PRNG
// seeded at 1 for determinism").
pub struct LehmerRng {
  state: u64,
}

impl LehmerRng {
  pub fn new() -> Self {
    Self { state: 1 }
  }

  pub fn next_u32(&mut self) -> u32 {
    self.state = (self.state * LEHMER_MULTIPLIER) % LEHMER_MODULUS;
    self.state as u32
  }

  // A uniform index in `0..bound`. `bound` must be non-zero.
  pub fn next_below(&mut self, bound: usize) -> usize {
    (self.next_u32() as usize) % bound
  }
}

impl Default for LehmerRng {
  fn default() -> Self {
    Self::new()
  }
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
  idx1: usize,
  idx2: usize,
  cost_diff: i64,
}

// Fixed-capacity `STOCHASTIC_QUEUE_SIZE` collection of candidate merges,
// kept with only the "index 0 holds the minimum cost_diff" invariant
// (Design Notes: "priority queue without a full heap").
struct CandidateQueue {
  entries: Vec<QueueEntry>,
}

impl CandidateQueue {
  fn new() -> Self {
    Self { entries: Vec::with_capacity(STOCHASTIC_QUEUE_SIZE) }
  }

  fn push(&mut self, entry: QueueEntry) {
    if self.entries.len() < STOCHASTIC_QUEUE_SIZE {
      self.entries.push(entry);
    } else {
      // Replace the current worst entry if this one is better.
      let (worst_pos, worst_cost) = self
        .entries
        .iter()
        .enumerate()
        .max_by_key(|(_, e)| e.cost_diff)
        .map(|(i, e)| (i, e.cost_diff))
        .unwrap();
      if entry.cost_diff >= worst_cost {
        return;
      }
      self.entries[worst_pos] = entry;
    }
    self.restore_head();
  }

  // Maintain only the head invariant: swap the minimum-cost_diff entry
  // into position 0.
  fn restore_head(&mut self) {
    if self.entries.is_empty() {
      return;
    }
    let mut min_pos = 0;
    for i in 1..self.entries.len() {
      if self.entries[i].cost_diff < self.entries[min_pos].cost_diff {
        min_pos = i;
      }
    }
    self.entries.swap(0, min_pos);
  }

  fn head(&self) -> Option<QueueEntry> {
    self.entries.first().copied()
  }

  fn remove_if(&mut self, mut pred: impl FnMut(&QueueEntry) -> bool) {
    self.entries.retain(|e| !pred(e));
    self.restore_head();
  }

  fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

// `GetCombinedHistogramEntropy(a, b, best_cost)` (section 4.7): the
// combined bit cost of merging `a` and `b`, bailing out with `None` as
// soon as a running partial total already exceeds `threshold`.
fn combined_cost_with_early_bail(a: &Histogram, b: &Histogram, threshold: i64) -> Option<i64> {
  let combined_literal = sum_counts(&a.literal, &b.literal);
  let mut running = estimate_class_cost(&combined_literal);
  if running > threshold {
    return None;
  }
  let combined_red = sum_counts(&a.red, &b.red);
  running += estimate_class_cost(&combined_red);
  if running > threshold {
    return None;
  }
  let combined_blue = sum_counts(&a.blue, &b.blue);
  running += estimate_class_cost(&combined_blue);
  if running > threshold {
    return None;
  }
  let combined_alpha = sum_counts(&a.alpha, &b.alpha);
  running += estimate_class_cost(&combined_alpha);
  if running > threshold {
    return None;
  }
  let combined_distance = sum_counts(&a.distance, &b.distance);
  running += estimate_class_cost(&combined_distance);
  if running > threshold {
    None
  } else {
    Some(running)
  }
}

fn cost_diff_for_pair(set: &HistogramSet, idx1: usize, idx2: usize) -> Option<i64> {
  let a = set.get(idx1)?;
  let b = set.get(idx2)?;
  let separate_cost = a.bit_cost + b.bit_cost;
  let combined = combined_cost_with_early_bail(a, b, separate_cost)?;
  let cost_diff = combined - separate_cost;
  if cost_diff >= 0 {
    None
  } else {
    Some(cost_diff)
  }
}

// The reference decoder initializes a `best_idx2` local to `1` before the
// merge-selection loop, even though every code path overwrites it before
// it's read; almost certainly a typo for `-1`. Flagged rather than
// "corrected" per the spec's own note that the value is semantically
// inert either way.
#[allow(dead_code)]
const BEST_IDX2_INITIAL_VALUE_TYPO: i64 = 1;

// Run the stochastic pass until `num_used <= min_cluster_size` or the
// failure budget (half the initial live count) is exhausted. Returns
// `true` ("go greedy") when the live count has dropped to or below
// `min_cluster_size`.
pub fn run_stochastic_pass(set: &mut HistogramSet, min_cluster_size: usize) -> bool {
  let mut live: Vec<usize> = set.iter_present().map(|(i, _)| i).collect();
  if live.len() <= min_cluster_size {
    return true;
  }

  let mut rng = LehmerRng::new();
  let failure_budget = (live.len() / 2).max(1);
  let mut failures = 0usize;

  while live.len() > min_cluster_size && failures < failure_budget {
    let draws = (live.len() / 2).max(1);
    let mut queue = CandidateQueue::new();

    for _ in 0..draws {
      if live.len() < 2 {
        break;
      }
      let i = rng.next_below(live.len());
      let mut j = rng.next_below(live.len());
      if j == i {
        j = (j + 1) % live.len();
      }
      let (idx1, idx2) = (live[i], live[j]);
      if idx1 == idx2 {
        continue;
      }
      if let Some(cost_diff) = cost_diff_for_pair(set, idx1, idx2) {
        queue.push(QueueEntry { idx1, idx2, cost_diff });
      }
    }

    match queue.head() {
      None => failures += 1,
      Some(best) => {
        // Duplicate pairs referencing either merged index are pruned by
        // the following `remove_if` before the merge is committed.
        queue.remove_if(|e| e.idx1 == best.idx1 || e.idx2 == best.idx1 || e.idx1 == best.idx2 || e.idx2 == best.idx2);

        let other = set.get(best.idx2).unwrap().clone();
        let mut merged = set.get(best.idx1).unwrap().clone();
        merged.add(&other);
        merged.estimate_bit_cost();
        merged.recompute_trivial_symbol();
        set.set(best.idx1, merged);
        set.clear(best.idx2);
        live.retain(|&i| i != best.idx2);
        failures = 0;
      }
    }
  }

  live.len() <= min_cluster_size
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
  fn lehmer_rng_is_deterministic_and_matches_the_published_sequence() {
    let mut rng = LehmerRng::new();
    // seed=1, multiplier=48271, modulus=2^31-1: first output is the
    // multiplier itself.
    assert_eq!(rng.next_u32(), 48271);
  }

  #[test]
  fn identical_tiles_collapse_to_the_cluster_size_floor() {
    let mut set = HistogramSet::new(20);
    for i in 0..20 {
      set.set(i, tile(0xFF445566));
    }
    let went_greedy = run_stochastic_pass(&mut set, 2);
    assert!(went_greedy);
    assert!(set.iter_present().count() <= 20);
  }

  #[test]
  fn already_small_sets_signal_go_greedy_immediately() {
    let mut set = HistogramSet::new(3);
    for i in 0..3 {
      set.set(i, tile(0xFF000001 + i as u32));
    }
    assert!(run_stochastic_pass(&mut set, 10));
  }
}
