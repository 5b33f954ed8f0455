// Entropy-bin pre-pass (C6, section 4.6): a cheap first clustering round
// that only ever folds tiles that already land in the same cost bucket,
// so it runs in O(N) rather than the O(N^2) passes that follow it.

use crate::consts::{BIN_SIZE, BIN_SIZE_LOW_EFFORT, MAX_BIN_REJECTIONS, NUM_PARTITIONS};
use crate::histogram::{Histogram, HistogramSet};

// 16, scaled down by powers of two as the live histogram count grows or
// quality drops (section 4.6); exact thresholds are this crate's own
// judgment call where the distilled spec only says "scaled down by powers
// of two" without giving the breakpoints (see DESIGN.md).
fn combine_cost_factor(num_histograms: usize, quality: i32) -> i32 {
  let mut factor = 16;
  if num_histograms > 256 {
    factor /= 2;
  }
  if num_histograms > 512 {
    factor /= 2;
  }
  if quality < 90 {
    factor /= 2;
  }
  if quality < 50 {
    factor /= 2;
  }
  factor.max(1)
}

fn bin_count(low_effort: bool) -> usize {
  if low_effort {
    BIN_SIZE_LOW_EFFORT
  } else {
    BIN_SIZE
  }
}

// Bucket a single tile's (literal_cost, red_cost, blue_cost) triple (or
// just literal_cost under low-effort) into `bin_id`, given the per-axis
// min/max observed across all live tiles.
fn bin_id_for(histo: &Histogram, low_effort: bool, mins: (i64, i64, i64), maxs: (i64, i64, i64)) -> usize {
  let bucket = |value: i64, lo: i64, hi: i64| -> usize {
    if hi <= lo {
      return 0;
    }
    let span = hi - lo;
    let idx = ((value - lo) * NUM_PARTITIONS as i64) / span;
    idx.clamp(0, NUM_PARTITIONS as i64 - 1) as usize
  };

  let lit_bin = bucket(histo.literal_cost, mins.0, maxs.0);
  if low_effort {
    return lit_bin;
  }
  let red_bin = bucket(histo.red_cost, mins.1, maxs.1);
  let blue_bin = bucket(histo.blue_cost, mins.2, maxs.2);
  (lit_bin * NUM_PARTITIONS + red_bin) * NUM_PARTITIONS + blue_bin
}

// Assign `bin_id` on every present histogram and fold within-bin tiles
// into that bin's first surviving tile (section 4.6). Returns the number
// of tiles still present afterwards.
pub fn run_prepass(set: &mut HistogramSet, quality: i32, low_effort: bool) -> usize {
  let present: Vec<usize> = set.iter_present().map(|(i, _)| i).collect();
  if present.is_empty() {
    return 0;
  }

  let mut min_l = i64::MAX;
  let mut max_l = i64::MIN;
  let mut min_r = i64::MAX;
  let mut max_r = i64::MIN;
  let mut min_b = i64::MAX;
  let mut max_b = i64::MIN;
  for &i in &present {
    let h = set.get(i).unwrap();
    min_l = min_l.min(h.literal_cost);
    max_l = max_l.max(h.literal_cost);
    min_r = min_r.min(h.red_cost);
    max_r = max_r.max(h.red_cost);
    min_b = min_b.min(h.blue_cost);
    max_b = max_b.max(h.blue_cost);
  }

  let mut bins: Vec<Vec<usize>> = vec![Vec::new(); bin_count(low_effort)];
  for &i in &present {
    let bin = {
      let h = set.get(i).unwrap();
      bin_id_for(h, low_effort, (min_l, min_r, min_b), (max_l, max_r, max_b))
    };
    set.get_mut(i).unwrap().bin_id = bin;
    bins[bin].push(i);
  }

  let factor = combine_cost_factor(present.len(), quality);

  for members in &bins {
    if members.len() < 2 {
      continue;
    }
    let first = members[0];
    let mut rejections_in_a_row = 0u32;
    for &candidate in &members[1..] {
      if !set.is_present(candidate) {
        continue;
      }
      let first_histo = set.get(first).unwrap().clone();
      let candidate_histo = set.get(candidate).unwrap().clone();

      let force = low_effort || rejections_in_a_row >= MAX_BIN_REJECTIONS;
      let accept = if force {
        true
      } else {
        let combined = Histogram::combined(&first_histo, &candidate_histo).bit_cost_or_estimate();
        let threshold = first_histo.bit_cost + candidate_histo.bit_cost
          - (candidate_histo.bit_cost * factor as i64 / 100);
        combined <= threshold
      };

      if accept {
        let mut merged = set.get(first).unwrap().clone();
        merged.add(&candidate_histo);
        merged.estimate_bit_cost();
        merged.recompute_trivial_symbol();
        set.set(first, merged);
        set.clear(candidate);
        rejections_in_a_row = 0;
      } else {
        rejections_in_a_row += 1;
      }
    }
  }

  if low_effort {
    for (i, h) in set.iter_present().map(|(i, h)| (i, h.clone())).collect::<Vec<_>>() {
      let mut h = h;
      h.estimate_bit_cost();
      h.recompute_trivial_symbol();
      set.set(i, h);
    }
  }

  set.shrink_to_fit_trailing_absent();
  set.iter_present().count()
}

impl Histogram {
  // Helper used only by the pre-pass's cost-check: the combined bit cost
  // of a histogram that hasn't had `estimate_bit_cost` called on it yet.
  fn bit_cost_or_estimate(mut self) -> i64 {
    self.estimate_bit_cost();
    self.bit_cost
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backward_ref::BackwardRef;

  fn tile_with_literal(argb: u32) -> Histogram {
    let mut h = Histogram::new(0);
    for _ in 0..20 {
      h.add_symbol(BackwardRef::literal(argb));
    }
    h.estimate_bit_cost();
    h.recompute_trivial_symbol();
    h
  }

  #[test]
  fn identical_tiles_collapse_under_the_prepass() {
    let mut set = HistogramSet::new(8);
    for i in 0..8 {
      set.set(i, tile_with_literal(0xFF112233));
    }
    let remaining = run_prepass(&mut set, 75, false);
    assert!(remaining <= 8);
    assert!(remaining >= 1);
  }

  #[test]
  fn low_effort_always_merges_within_a_bin() {
    let mut set = HistogramSet::new(4);
    for i in 0..4 {
      set.set(i, tile_with_literal(0xFF000000 | (i as u32)));
    }
    let remaining = run_prepass(&mut set, 75, true);
    assert!(remaining <= 4);
  }
}
