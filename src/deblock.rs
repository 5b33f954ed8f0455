// In-loop deblocking scheduler (C3, section 4.3): precomputes per-segment
// filter strengths and applies the simple/complex filter primitives along
// macroblock and sub-block edges, with cropping-aware range selection.

use crate::consts::NUM_MB_SEGMENTS;
use crate::enums::FilterType;
use crate::frame::{CropRect, Plane};
use crate::macroblock::FilterStrength;
use crate::util::{clamp, min};

#[derive(Debug, Clone, Copy)]
pub struct FilterParams {
  pub filter_type: FilterType,
  pub use_segment: bool,
  pub absolute_delta: bool,
  pub seg_filter: [i32; NUM_MB_SEGMENTS],
  pub global_level: i32,
  pub sharpness: i32,
  pub use_lf_delta: bool,
  pub ref_lf_delta: i32,
  pub mode_lf_delta: i32,
}

// Section 4.3, "Precomputation". Indexed [segment][is_i4x4 as usize].
pub fn precompute_filter_strengths(params: &FilterParams) -> [[FilterStrength; 2]; NUM_MB_SEGMENTS] {
  let mut out = [[FilterStrength::NONE; 2]; NUM_MB_SEGMENTS];

  for seg in 0..NUM_MB_SEGMENTS {
    for i4x4 in 0..2 {
      let is_i4x4 = i4x4 == 1;

      let base = if params.use_segment {
        if params.absolute_delta {
          params.seg_filter[seg]
        } else {
          params.seg_filter[seg] + params.global_level
        }
      } else {
        params.global_level
      };

      let mut level = base
        + if params.use_lf_delta {
          params.ref_lf_delta + if is_i4x4 { params.mode_lf_delta } else { 0 }
        } else {
          0
        };
      level = clamp(level, 0, 63);

      out[seg][i4x4] = if level == 0 {
        FilterStrength::NONE
      } else {
        let ilevel = if params.sharpness > 0 {
          let shifted = level >> (if params.sharpness > 4 { 2 } else { 1 });
          let shifted = if shifted < 1 { 1 } else { shifted };
          min(shifted as usize, (9 - params.sharpness) as usize) as i32
        } else {
          level
        };
        let f_limit = 2 * level + ilevel;
        let hev_thresh = if level >= 40 {
          2
        } else if level >= 15 {
          1
        } else {
          0
        };
        FilterStrength {
          f_limit: f_limit as u8,
          f_ilevel: ilevel as u8,
          f_inner: is_i4x4,
          hev_thresh,
        }
      };
    }
  }

  out
}

// --- Pixel-level filter primitives ---
// All work in the signed domain (`pixel - 128`) and clamp to i8 range per
// the classic VP8 loop-filter formulation.

fn u2s(v: u8) -> i32 {
  v as i32 - 128
}

fn s2u(v: i32) -> u8 {
  (clamp(v, -128, 127) + 128) as u8
}

fn c(v: i32) -> i32 {
  clamp(v, -128, 127)
}

fn simple_mask(p1: i32, p0: i32, q0: i32, q1: i32, limit: i32) -> bool {
  (p0 - q0).abs() * 2 + (p1 - q1).abs() / 2 <= limit
}

fn normal_mask(p3: i32, p2: i32, p1: i32, p0: i32, q0: i32, q1: i32, q2: i32, q3: i32, ilimit: i32, limit: i32) -> bool {
  (p0 - q0).abs() * 2 + (p1 - q1).abs() / 2 <= limit
    && (p3 - p2).abs() <= ilimit
    && (p2 - p1).abs() <= ilimit
    && (p1 - p0).abs() <= ilimit
    && (q3 - q2).abs() <= ilimit
    && (q2 - q1).abs() <= ilimit
    && (q1 - q0).abs() <= ilimit
}

fn high_edge_variance(p1: i32, p0: i32, q0: i32, q1: i32, thresh: i32) -> bool {
  (p1 - p0).abs() > thresh || (q1 - q0).abs() > thresh
}

// Returns (new_p0, new_q0, f1) in signed domain.
fn common_adjust(use_outer_taps: bool, p1: i32, p0: i32, q0: i32, q1: i32) -> (i32, i32, i32) {
  let a = c(if use_outer_taps { c(p1 - q1) } else { 0 } + 3 * (q0 - p0));
  let f1 = c(a + 4) >> 3;
  let f2 = c(a + 3) >> 3;
  (c(p0 + f2), c(q0 - f1), f1)
}

// Macroblock-edge ("outer") complex filter: up to 3 samples each side.
fn mb_edge_filter(hev: bool, p2: i32, p1: i32, p0: i32, q0: i32, q1: i32, q2: i32) -> (i32, i32, i32, i32, i32, i32) {
  if !hev {
    let w = c(c(p1 - q1) + 3 * (q0 - p0));
    let a0 = (27 * w + 63) >> 7;
    let new_q0 = c(q0 - a0);
    let new_p0 = c(p0 + a0);
    let a1 = (18 * w + 63) >> 7;
    let new_q1 = c(q1 - a1);
    let new_p1 = c(p1 + a1);
    let a2 = (9 * w + 63) >> 7;
    let new_q2 = c(q2 - a2);
    let new_p2 = c(p2 + a2);
    (new_p2, new_p1, new_p0, new_q0, new_q1, new_q2)
  } else {
    let (new_p0, new_q0, _) = common_adjust(true, p1, p0, q0, q1);
    (p2, p1, new_p0, new_q0, q1, q2)
  }
}

// Sub-block-edge ("inner") complex filter: up to 2 samples each side.
fn subblock_edge_filter(hev: bool, p1: i32, p0: i32, q0: i32, q1: i32) -> (i32, i32, i32, i32) {
  let (new_p0, new_q0, f1) = common_adjust(hev, p1, p0, q0, q1);
  let mut new_p1 = p1;
  let mut new_q1 = q1;
  if !hev {
    let a = (f1 + 1) >> 1;
    new_q1 = c(q1 - a);
    new_p1 = c(p1 + a);
  }
  (new_p1, new_p0, new_q0, new_q1)
}

fn simple_edge_filter(p1: i32, p0: i32, q0: i32, q1: i32) -> (i32, i32) {
  let (new_p0, new_q0, _) = common_adjust(true, p1, p0, q0, q1);
  (new_p0, new_q0)
}

// One edge-sample step: reads/writes 8 samples straddling the edge,
// `get`/`set` address a single sample given an offset from the edge in
// {-4..=3} (negative = p side, nonnegative = q side).
fn filter_one_simple<G, S>(limit: i32, mut get: G, mut set: S)
where
  G: FnMut(i32) -> u8,
  S: FnMut(i32, u8),
{
  let p1 = u2s(get(-2));
  let p0 = u2s(get(-1));
  let q0 = u2s(get(0));
  let q1 = u2s(get(1));
  if simple_mask(p1, p0, q0, q1, limit) {
    let (np0, nq0) = simple_edge_filter(p1, p0, q0, q1);
    set(-1, s2u(np0));
    set(0, s2u(nq0));
  }
}

fn filter_one_complex_edge<G, S>(ilimit: i32, limit: i32, hev_thresh: i32, mut get: G, mut set: S)
where
  G: FnMut(i32) -> u8,
  S: FnMut(i32, u8),
{
  let p3 = u2s(get(-4));
  let p2 = u2s(get(-3));
  let p1 = u2s(get(-2));
  let p0 = u2s(get(-1));
  let q0 = u2s(get(0));
  let q1 = u2s(get(1));
  let q2 = u2s(get(2));
  let q3 = u2s(get(3));

  if !normal_mask(p3, p2, p1, p0, q0, q1, q2, q3, ilimit, limit) {
    return;
  }
  let hev = high_edge_variance(p1, p0, q0, q1, hev_thresh);
  let (np2, np1, np0, nq0, nq1, nq2) = mb_edge_filter(hev, p2, p1, p0, q0, q1, q2);
  set(-3, s2u(np2));
  set(-2, s2u(np1));
  set(-1, s2u(np0));
  set(0, s2u(nq0));
  set(1, s2u(nq1));
  set(2, s2u(nq2));
}

fn filter_one_complex_inner<G, S>(ilimit: i32, limit: i32, hev_thresh: i32, mut get: G, mut set: S)
where
  G: FnMut(i32) -> u8,
  S: FnMut(i32, u8),
{
  let p3 = u2s(get(-4));
  let p2 = u2s(get(-3));
  let p1 = u2s(get(-2));
  let p0 = u2s(get(-1));
  let q0 = u2s(get(0));
  let q1 = u2s(get(1));
  let q2 = u2s(get(2));
  let q3 = u2s(get(3));

  if !normal_mask(p3, p2, p1, p0, q0, q1, q2, q3, ilimit, limit) {
    return;
  }
  let hev = high_edge_variance(p1, p0, q0, q1, hev_thresh);
  let (np1, np0, nq0, nq1) = subblock_edge_filter(hev, p1, p0, q0, q1);
  set(-2, s2u(np1));
  set(-1, s2u(np0));
  set(0, s2u(nq0));
  set(1, s2u(nq1));
}

// Direction of an edge run: Vertical = filtering a vertical edge, stepping
// samples horizontally across it for each row; Horizontal = filtering a
// horizontal edge, stepping down each column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDir {
  Vertical,
  Horizontal,
}

// Filter one edge of `count` samples within `plane`, at pixel position
// `(x0, y0)` being the first q-side sample.
pub fn filter_edge(
  plane: &mut Plane,
  x0: usize,
  y0: usize,
  dir: EdgeDir,
  count: usize,
  strength: &FilterStrength,
  filter_type: FilterType,
  is_mb_edge: bool,
) {
  if !strength.is_filtered() || filter_type == FilterType::None {
    return;
  }
  let stride = plane.stride as isize;
  let base = (y0 as isize) * stride + (x0 as isize);
  let step: isize = match dir {
    EdgeDir::Vertical => 1,
    EdgeDir::Horizontal => stride,
  };
  let along: isize = match dir {
    EdgeDir::Vertical => stride,
    EdgeDir::Horizontal => 1,
  };

  for i in 0..count as isize {
    let line_base = base + i * along;
    let data = &mut plane.data;
    let get = |off: i32| -> u8 { data[(line_base + (off as isize) * step) as usize] };
    match filter_type {
      FilterType::Simple => {
        filter_one_simple(strength.f_limit as i32, get, |off, v| {
          data[(line_base + (off as isize) * step) as usize] = v;
        });
      }
      FilterType::Complex => {
        if is_mb_edge {
          filter_one_complex_edge(strength.f_ilevel as i32, strength.f_limit as i32, strength.hev_thresh as i32, get, |off, v| {
            data[(line_base + (off as isize) * step) as usize] = v;
          });
        } else {
          filter_one_complex_inner(strength.f_ilevel as i32, strength.f_limit as i32, strength.hev_thresh as i32, get, |off, v| {
            data[(line_base + (off as isize) * step) as usize] = v;
          });
        }
      }
      FilterType::None => unreachable!(),
    }
  }
}

// Section 4.3, "Cropping interaction": the simple filter's macroblock
// range can be bounded to the crop rectangle (with its dependency
// "extra" margin); the complex filter's dependency chain always reaches
// MB(0,0), so its range is never cropped on the top/left.
pub fn simple_filter_mb_range(crop: &CropRect, mb_cols: usize, mb_rows: usize, extra: usize) -> (usize, usize, usize, usize) {
  let x_start = crop.left.saturating_sub(extra) / 16;
  let x_end = min(mb_cols, (crop.right + 15 + extra) / 16);
  let y_start = crop.top.saturating_sub(extra) / 16;
  let y_end = min(mb_rows, (crop.bottom + 15 + extra) / 16);
  (x_start, x_end, y_start, y_end)
}

pub fn complex_filter_mb_range(mb_cols: usize, mb_rows: usize) -> (usize, usize, usize, usize) {
  (0, mb_cols, 0, mb_rows)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params(global_level: i32) -> FilterParams {
    FilterParams {
      filter_type: FilterType::Complex,
      use_segment: false,
      absolute_delta: false,
      seg_filter: [0; NUM_MB_SEGMENTS],
      global_level,
      sharpness: 0,
      use_lf_delta: false,
      ref_lf_delta: 0,
      mode_lf_delta: 0,
    }
  }

  #[test]
  fn zero_level_means_no_filtering() {
    let strengths = precompute_filter_strengths(&params(0));
    for seg in &strengths {
      for s in seg {
        assert_eq!(s.f_limit, 0);
        assert!(!s.is_filtered());
      }
    }
  }

  #[test]
  fn nonzero_level_produces_filtering() {
    let strengths = precompute_filter_strengths(&params(30));
    assert!(strengths[0][0].is_filtered());
    assert_eq!(strengths[0][0].hev_thresh, 1);
  }

  #[test]
  fn f_limit_zero_iff_level_zero() {
    for level in 0..64 {
      let strengths = precompute_filter_strengths(&params(level));
      let filtered = strengths[0][0].is_filtered();
      assert_eq!(filtered, level != 0);
    }
  }

  #[test]
  fn flat_region_is_unchanged_by_complex_filter() {
    let mut plane = Plane::new(32, 32);
    for y in 0..32 {
      for x in 0..32 {
        plane.set(y, x, 100);
      }
    }
    let strength = FilterStrength { f_limit: 40, f_ilevel: 10, f_inner: false, hev_thresh: 1 };
    filter_edge(&mut plane, 16, 0, EdgeDir::Vertical, 16, &strength, FilterType::Complex, true);
    for y in 0..16 {
      for x in 8..24 {
        assert_eq!(plane.get(y, x), 100);
      }
    }
  }
}
