// Per-tile symbol histogram and Huffman-cost estimator (C5, sections 3 and
// 4.5). Built once per tile from that tile's backward-reference stream,
// then repeatedly summed and cost-estimated by the three clustering passes
// (C6-C8) without ever touching the reference stream again.

use crate::backward_ref::BackwardRef;
use crate::consts::{NON_TRIVIAL, NUM_DISTANCE_CODES, NUM_LENGTH_CODES, NUM_LITERAL_CODES};
use crate::util::LOG_2_PRECISION_BITS;

pub type BitCost = i64;

fn bitcost_from_bits(bits: f64) -> BitCost {
  (bits * (1i64 << LOG_2_PRECISION_BITS) as f64).round() as BitCost
}

// VP8L's length/distance prefix code: buckets a length (or distance) minus
// one into one of the `NUM_LENGTH_CODES`/`NUM_DISTANCE_CODES` prefix
// symbols used by the Huffman-coded stream (the "extra bits" that refine
// within a bucket don't affect which histogram bin is incremented, so they
// aren't tracked here).
fn prefix_code(value_minus_one: u32) -> u32 {
  if value_minus_one < 4 {
    return value_minus_one;
  }
  let highest_bit = 31 - (value_minus_one - 1).leading_zeros();
  let second_highest_bit = (value_minus_one - 1 >> (highest_bit - 1)) & 1;
  2 * highest_bit + second_highest_bit
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UsedFlags {
  pub literal: bool,
  pub red: bool,
  pub blue: bool,
  pub alpha: bool,
  pub distance: bool,
}

#[derive(Debug, Clone)]
pub struct Histogram {
  // Sized `NUM_LITERAL_CODES + NUM_LENGTH_CODES + (1 << palette_code_bits)`
  // when `palette_code_bits > 0`, else `NUM_LITERAL_CODES + NUM_LENGTH_CODES`
  // (section 3: "sized by palette_code_bits").
  pub literal: Vec<u32>,
  pub red: [u32; 256],
  pub blue: [u32; 256],
  pub alpha: [u32; 256],
  pub distance: [u32; NUM_DISTANCE_CODES],

  pub is_used: UsedFlags,

  pub literal_cost: BitCost,
  pub red_cost: BitCost,
  pub blue_cost: BitCost,
  pub bit_cost: BitCost,

  pub trivial_symbol: u32,
  pub bin_id: usize,

  palette_code_bits: u32,
}

impl Histogram {
  pub fn new(palette_code_bits: u32) -> Self {
    let literal_len = NUM_LITERAL_CODES + NUM_LENGTH_CODES + if palette_code_bits > 0 { 1usize << palette_code_bits } else { 0 };
    Self {
      literal: vec![0u32; literal_len],
      red: [0u32; 256],
      blue: [0u32; 256],
      alpha: [0u32; 256],
      distance: [0u32; NUM_DISTANCE_CODES],
      is_used: UsedFlags::default(),
      literal_cost: 0,
      red_cost: 0,
      blue_cost: 0,
      bit_cost: 0,
      trivial_symbol: NON_TRIVIAL,
      bin_id: 0,
      palette_code_bits,
    }
  }

  pub fn palette_code_bits(&self) -> u32 {
    self.palette_code_bits
  }

  // Section 4.5, "Add-symbol".
  pub fn add_symbol(&mut self, sym: BackwardRef) {
    match sym {
      BackwardRef::Literal { argb } => {
        let a = (argb >> 24) & 0xFF;
        let r = (argb >> 16) & 0xFF;
        let g = (argb >> 8) & 0xFF;
        let b = argb & 0xFF;
        self.alpha[a as usize] += 1;
        self.red[r as usize] += 1;
        self.literal[g as usize] += 1;
        self.blue[b as usize] += 1;
      }
      BackwardRef::Copy { length, distance } => {
        let code = prefix_code(length.saturating_sub(1));
        self.literal[NUM_LITERAL_CODES + code as usize] += 1;
        let dcode = prefix_code(distance.saturating_sub(1));
        self.distance[dcode as usize] += 1;
      }
      BackwardRef::CacheIndex { idx } => {
        assert!(self.palette_code_bits > 0, "color-cache symbol requires palette_code_bits > 0");
        self.literal[NUM_LITERAL_CODES + NUM_LENGTH_CODES + idx as usize] += 1;
      }
    }
  }

  // Sum `other` into `self` in place; panics if the two histograms don't
  // agree on `palette_code_bits` (section 3: "adding two histograms with
  // different values is forbidden").
  pub fn add(&mut self, other: &Histogram) {
    assert_eq!(self.palette_code_bits, other.palette_code_bits, "histogram palette_code_bits mismatch");
    assert_eq!(self.literal.len(), other.literal.len());
    for i in 0..self.literal.len() {
      self.literal[i] += other.literal[i];
    }
    for i in 0..256 {
      self.red[i] += other.red[i];
      self.blue[i] += other.blue[i];
      self.alpha[i] += other.alpha[i];
    }
    for i in 0..NUM_DISTANCE_CODES {
      self.distance[i] += other.distance[i];
    }
    self.trivial_symbol = if self.trivial_symbol != NON_TRIVIAL && self.trivial_symbol == other.trivial_symbol {
      self.trivial_symbol
    } else {
      NON_TRIVIAL
    };
  }

  // Return a new histogram equal to `a + b`, without mutating either.
  pub fn combined(a: &Histogram, b: &Histogram) -> Histogram {
    let mut out = a.clone();
    out.add(b);
    out
  }

  // Recompute `trivial_symbol` from current counts (section 4.5,
  // "Trivial-symbol tracking"): exactly one of {literal-as-green, red,
  // blue, alpha} non-zero, with distance entirely unused.
  pub fn recompute_trivial_symbol(&mut self) {
    let distance_used = self.distance.iter().any(|&c| c != 0);
    if distance_used {
      self.trivial_symbol = NON_TRIVIAL;
      return;
    }
    let single_nonzero = |counts: &[u32]| -> Option<u32> {
      let mut found = None;
      for (sym, &count) in counts.iter().enumerate() {
        if count != 0 {
          if found.is_some() {
            return None;
          }
          found = Some(sym as u32);
        }
      }
      found
    };
    let g = single_nonzero(&self.literal[0..256]);
    let r = single_nonzero(&self.red);
    let b = single_nonzero(&self.blue);
    let a = single_nonzero(&self.alpha);
    match (a, r, g, b) {
      (Some(a), Some(r), Some(g), Some(b)) => {
        self.trivial_symbol = (a << 24) | (r << 16) | (g << 8) | b;
      }
      _ => self.trivial_symbol = NON_TRIVIAL,
    }
  }

  // Section 4.5, "Cost model": total bit cost across the five symbol
  // classes, each estimated via `BitsEntropyRefine` + `FinalHuffmanCost`.
  pub fn estimate_bit_cost(&mut self) {
    let literal_cost = estimate_class_cost(&self.literal);
    let red_cost = estimate_class_cost(&self.red);
    let blue_cost = estimate_class_cost(&self.blue);
    let alpha_cost = estimate_class_cost(&self.alpha);
    let distance_cost = estimate_class_cost(&self.distance);

    self.literal_cost = literal_cost;
    self.red_cost = red_cost;
    self.blue_cost = blue_cost;
    self.is_used.literal = self.literal.iter().any(|&c| c != 0);
    self.is_used.red = self.red.iter().any(|&c| c != 0);
    self.is_used.blue = self.blue.iter().any(|&c| c != 0);
    self.is_used.alpha = self.alpha.iter().any(|&c| c != 0);
    self.is_used.distance = self.distance.iter().any(|&c| c != 0);

    self.bit_cost = literal_cost + red_cost + blue_cost + alpha_cost + distance_cost;
  }
}

// `BitsEntropyRefine` (section 4.5): Shannon entropy mixed against a lower
// bound derived from the two largest-weight buckets.
fn bits_entropy_refine(counts: &[u32]) -> BitCost {
  let sum: u64 = counts.iter().map(|&c| c as u64).sum();
  if sum == 0 {
    return 0;
  }
  let mut nonzeros = 0u32;
  let mut max_count = 0u64;
  let mut entropy_bits = 0f64;
  for &c in counts {
    if c == 0 {
      continue;
    }
    nonzeros += 1;
    let c = c as u64;
    if c > max_count {
      max_count = c;
    }
    let p = c as f64 / sum as f64;
    entropy_bits -= p * p.log2();
  }
  let entropy = bitcost_from_bits(entropy_bits * sum as f64);
  if nonzeros <= 1 {
    return 0;
  }

  let lower_bound = (2 * sum - max_count) << LOG_2_PRECISION_BITS;
  let lower_bound = lower_bound as i64;

  let mix = |num: i64, den: i64| -> BitCost {
    let mixed = (lower_bound * num + entropy * (den - num)) / den;
    entropy.max(mixed)
  };

  match nonzeros {
    2 => mix(99, 100),
    3 => mix(950, 1000),
    4 => mix(700, 1000),
    _ => mix(627, 1000),
  }
}

// Per-symbol Huffman code-length-header cost, in bits, for a streak of a
// given class and length bucket (section 4.5, "FinalHuffmanCost"). A
// non-zero-count run needs its code lengths spelled out in the
// meta-Huffman header; short runs are cheapest written out literally,
// long runs instead lean on the repeat-previous-length code and amortize
// to a lower per-symbol rate. A zero-count run is cheaper still, since it
// collapses to a repeat-zero code regardless of length. These weights are
// this crate's own calibration rather than a transcription of a source
// file: no `original_source/` file in the retrieved pack carried the
// concrete header-cost table (see DESIGN.md), so the values below are
// chosen to preserve the qualitative ordering real Huffman header costs
// have (zero-short < zero-long < non-zero-long < non-zero-short) rather
// than cited verbatim from a specific implementation.
// Indexed `[is_zero_streak as usize]`: index 0 = non-zero-count streak,
// index 1 = zero-count streak.
const STREAK_COST_SHORT_BITS: [f64; 2] = [2.5, 1.0];
const STREAK_COST_LONG_BITS: [f64; 2] = [1.2, 0.25];

// `FinalHuffmanCost` (section 4.5): counts non-zero streaks and adds
// fixed per-(streak class, is-short) costs, minus the partial
// code-length-header bias.
fn final_huffman_cost(counts: &[u32]) -> BitCost {
  let mut cost = bitcost_from_bits(crate::consts::HUFFMAN_COST_BIAS_X10 as f64 / 10.0);
  cost = -cost;

  let mut i = 0usize;
  let mut streak = 0usize;
  let mut is_zero_streak = counts.first().map(|&c| c == 0).unwrap_or(true);
  while i < counts.len() {
    let zero = counts[i] == 0;
    if zero == is_zero_streak {
      streak += 1;
    } else {
      cost += streak_cost(is_zero_streak, streak);
      is_zero_streak = zero;
      streak = 1;
    }
    i += 1;
  }
  cost += streak_cost(is_zero_streak, streak);
  cost.max(0)
}

fn streak_cost(is_zero_streak: bool, streak: usize) -> BitCost {
  if streak == 0 {
    return 0;
  }
  let is_short = streak <= 3;
  let class = is_zero_streak as usize;
  let per_symbol_bits = if is_short { STREAK_COST_SHORT_BITS[class] } else { STREAK_COST_LONG_BITS[class] };
  bitcost_from_bits(per_symbol_bits * streak as f64)
}

pub(crate) fn estimate_class_cost(counts: &[u32]) -> BitCost {
  bits_entropy_refine(counts) + final_huffman_cost(counts)
}

// Sum two same-length count arrays into a freshly allocated vector, used by
// the stochastic clusterer's early-bail combined-cost routine (C7) so it
// doesn't need to build a full combined `Histogram` just to bail out after
// one symbol class already exceeds a threshold.
pub(crate) fn sum_counts(a: &[u32], b: &[u32]) -> Vec<u32> {
  a.iter().zip(b.iter()).map(|(&x, &y)| x + y).collect()
}

// A collection of tile histograms (section 3, "Histogram set"): a slot may
// be `Absent` without shifting its neighbours, so indices stay stable
// across the clustering passes.
#[derive(Debug, Clone)]
pub enum Slot {
  Present(Histogram),
  Absent,
}

pub struct HistogramSet {
  slots: Vec<Slot>,
}

impl HistogramSet {
  pub fn new(size: usize) -> Self {
    Self { slots: vec![Slot::Absent; 0].tap_resize(size) }
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  // Grow the set to at least `size` slots (new slots start `Absent`); a
  // no-op if already at least that large.
  pub fn grow_to(&mut self, size: usize) {
    if size > self.slots.len() {
      self.slots.resize(size, Slot::Absent);
    }
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  pub fn get(&self, idx: usize) -> Option<&Histogram> {
    match &self.slots[idx] {
      Slot::Present(h) => Some(h),
      Slot::Absent => None,
    }
  }

  pub fn get_mut(&mut self, idx: usize) -> Option<&mut Histogram> {
    match &mut self.slots[idx] {
      Slot::Present(h) => Some(h),
      Slot::Absent => None,
    }
  }

  pub fn set(&mut self, idx: usize, histo: Histogram) {
    self.slots[idx] = Slot::Present(histo);
  }

  pub fn clear(&mut self, idx: usize) {
    self.slots[idx] = Slot::Absent;
  }

  pub fn is_present(&self, idx: usize) -> bool {
    matches!(self.slots[idx], Slot::Present(_))
  }

  // `size` shrinks only when trailing slots are absent (section 3,
  // "Histogram set").
  pub fn shrink_to_fit_trailing_absent(&mut self) {
    while matches!(self.slots.last(), Some(Slot::Absent)) {
      self.slots.pop();
    }
  }

  pub fn iter_present(&self) -> impl Iterator<Item = (usize, &Histogram)> {
    self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
      Slot::Present(h) => Some((i, h)),
      Slot::Absent => None,
    })
  }
}

impl Clone for Slot {
  fn clone(&self) -> Self {
    match self {
      Slot::Present(h) => Slot::Present(h.clone()),
      Slot::Absent => Slot::Absent,
    }
  }
}

trait TapResize {
  fn tap_resize(self, size: usize) -> Vec<Slot>;
}

impl TapResize for Vec<Slot> {
  fn tap_resize(mut self, size: usize) -> Vec<Slot> {
    self.resize(size, Slot::Absent);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_histogram_has_zero_cost() {
    let mut h = Histogram::new(0);
    h.estimate_bit_cost();
    assert_eq!(h.bit_cost, 0);
  }

  #[test]
  fn single_symbol_histogram_has_zero_entropy_but_nonzero_huffman_bias() {
    let mut h = Histogram::new(0);
    for _ in 0..10 {
      h.add_symbol(BackwardRef::literal(0x00000000));
    }
    h.estimate_bit_cost();
    // Only the green channel (the `literal` array's low 256 entries) carries
    // weight here since argb=0 for every channel; with a single non-zero
    // bucket, entropy is zero but the Huffman cost floor still applies.
    assert!(h.literal_cost >= 0);
  }

  #[test]
  fn trivial_symbol_tracks_a_single_dominant_color() {
    let mut h = Histogram::new(0);
    for _ in 0..5 {
      h.add_symbol(BackwardRef::literal(0xFF112233));
    }
    h.recompute_trivial_symbol();
    assert_eq!(h.trivial_symbol, 0xFF112233);
  }

  #[test]
  fn trivial_symbol_is_non_trivial_once_distance_is_used() {
    let mut h = Histogram::new(0);
    h.add_symbol(BackwardRef::literal(0xFF112233));
    h.add_symbol(BackwardRef::copy(4, 8));
    h.recompute_trivial_symbol();
    assert_eq!(h.trivial_symbol, NON_TRIVIAL);
  }

  #[test]
  fn summing_preserves_agreeing_trivial_symbols() {
    let mut a = Histogram::new(0);
    a.add_symbol(BackwardRef::literal(0xFF112233));
    a.recompute_trivial_symbol();
    let mut b = Histogram::new(0);
    b.add_symbol(BackwardRef::literal(0xFF112233));
    b.recompute_trivial_symbol();
    let combined = Histogram::combined(&a, &b);
    assert_eq!(combined.trivial_symbol, 0xFF112233);
  }

  #[test]
  fn summing_disagreeing_trivial_symbols_yields_non_trivial() {
    let mut a = Histogram::new(0);
    a.add_symbol(BackwardRef::literal(0xFF112233));
    a.recompute_trivial_symbol();
    let mut b = Histogram::new(0);
    b.add_symbol(BackwardRef::literal(0xFFAABBCC));
    b.recompute_trivial_symbol();
    let combined = Histogram::combined(&a, &b);
    assert_eq!(combined.trivial_symbol, NON_TRIVIAL);
  }

  #[test]
  fn histogram_set_shrinks_only_trailing_absent_slots() {
    let mut set = HistogramSet::new(4);
    set.set(0, Histogram::new(0));
    set.set(2, Histogram::new(0));
    set.shrink_to_fit_trailing_absent();
    assert_eq!(set.len(), 4);
    set.clear(2);
    set.clear(3);
    set.shrink_to_fit_trailing_absent();
    assert_eq!(set.len(), 2);
  }
}
