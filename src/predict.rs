// Intra-prediction kernels (section 4.2; section 6 "prediction kernels").
//
// These are the concrete, pure-function reference implementations behind
// the `PredictionKernels` capability table (Design Notes: "Function-pointer
// dispatch for SIMD kernels becomes a capability table chosen once at
// init"). A SIMD backend would implement the same trait over the same
// caller-owned buffers.

use crate::enums::{DcVariant, LumaMode4, WholeBlockMode};
use crate::util::{clamp_u8, ceil_log2};

fn avg2(a: u8, b: u8) -> u8 {
  ((a as u32 + b as u32 + 1) / 2) as u8
}

fn avg3(a: u8, b: u8, c: u8) -> u8 {
  ((a as u32 + 2 * b as u32 + c as u32 + 2) / 4) as u8
}

// --- Luma 4x4 (ten modes) ---

pub struct Luma4Neighbours {
  pub top: [u8; 4],
  pub left: [u8; 4],
  pub top_left: u8,
  pub top_right: [u8; 4],
}

// `dst` is row-major 4x4 (16 entries).
pub fn predict_luma4(mode: LumaMode4, nb: &Luma4Neighbours, dst: &mut [u8; 16]) {
  let at = |r: usize, c: usize| r * 4 + c;
  match mode {
    LumaMode4::DC => {
      let sum: u32 = nb.top.iter().map(|&v| v as u32).sum::<u32>() + nb.left.iter().map(|&v| v as u32).sum::<u32>();
      let dc = ((sum + 4) >> 3) as u8;
      dst.fill(dc);
    }
    LumaMode4::TM => {
      for r in 0..4 {
        for c in 0..4 {
          let v = nb.top[c] as i32 + nb.left[r] as i32 - nb.top_left as i32;
          dst[at(r, c)] = clamp_u8(v);
        }
      }
    }
    LumaMode4::VE => {
      let ap = [
        avg3(nb.top_left, nb.top[0], nb.top[1]),
        avg3(nb.top[0], nb.top[1], nb.top[2]),
        avg3(nb.top[1], nb.top[2], nb.top[3]),
        avg3(nb.top[2], nb.top[3], nb.top_right[0]),
      ];
      for r in 0..4 {
        for c in 0..4 {
          dst[at(r, c)] = ap[c];
        }
      }
    }
    LumaMode4::HE => {
      let lp = [
        avg3(nb.top_left, nb.left[0], nb.left[1]),
        avg3(nb.left[0], nb.left[1], nb.left[2]),
        avg3(nb.left[1], nb.left[2], nb.left[3]),
        avg3(nb.left[2], nb.left[3], nb.left[3]),
      ];
      for r in 0..4 {
        for c in 0..4 {
          dst[at(r, c)] = lp[r];
        }
      }
    }
    LumaMode4::LD => {
      let e = [nb.top[0], nb.top[1], nb.top[2], nb.top[3], nb.top_right[0], nb.top_right[1], nb.top_right[2], nb.top_right[3]];
      for r in 0..4 {
        for c in 0..4 {
          let i = r + c;
          dst[at(r, c)] = if i < 6 { avg3(e[i], e[i + 1], e[i + 2]) } else { avg3(e[6], e[7], e[7]) };
        }
      }
    }
    LumaMode4::RD => {
      let pp = [nb.left[3], nb.left[2], nb.left[1], nb.left[0], nb.top_left, nb.top[0], nb.top[1], nb.top[2], nb.top[3]];
      for r in 0..4i32 {
        for c in 0..4i32 {
          let idx = (c - r + 3) as usize;
          dst[at(r as usize, c as usize)] = avg3(pp[idx], pp[idx + 1], pp[idx + 2]);
        }
      }
    }
    LumaMode4::VR => {
      let pp = [nb.left[3], nb.left[2], nb.left[1], nb.left[0], nb.top_left, nb.top[0], nb.top[1], nb.top[2], nb.top[3]];
      dst[at(0, 0)] = avg2(pp[4], pp[5]);
      dst[at(2, 1)] = dst[at(0, 0)];
      dst[at(0, 1)] = avg2(pp[5], pp[6]);
      dst[at(2, 2)] = dst[at(0, 1)];
      dst[at(0, 2)] = avg2(pp[6], pp[7]);
      dst[at(2, 3)] = dst[at(0, 2)];
      dst[at(0, 3)] = avg2(pp[7], pp[8]);
      dst[at(1, 0)] = avg3(pp[3], pp[4], pp[5]);
      dst[at(3, 1)] = dst[at(1, 0)];
      dst[at(1, 1)] = avg3(pp[4], pp[5], pp[6]);
      dst[at(3, 2)] = dst[at(1, 1)];
      dst[at(1, 2)] = avg3(pp[5], pp[6], pp[7]);
      dst[at(3, 3)] = dst[at(1, 2)];
      dst[at(1, 3)] = avg3(pp[6], pp[7], pp[8]);
      dst[at(2, 0)] = avg3(pp[2], pp[3], pp[4]);
      dst[at(3, 0)] = avg3(pp[1], pp[2], pp[3]);
    }
    LumaMode4::VL => {
      let pp = [nb.top[0], nb.top[1], nb.top[2], nb.top[3], nb.top_right[0], nb.top_right[1], nb.top_right[2], nb.top_right[3]];
      dst[at(0, 0)] = avg2(pp[0], pp[1]);
      dst[at(0, 1)] = avg2(pp[1], pp[2]);
      dst[at(2, 0)] = dst[at(0, 1)];
      dst[at(0, 2)] = avg2(pp[2], pp[3]);
      dst[at(2, 1)] = dst[at(0, 2)];
      dst[at(0, 3)] = avg2(pp[3], pp[4]);
      dst[at(2, 2)] = dst[at(0, 3)];
      dst[at(1, 0)] = avg3(pp[0], pp[1], pp[2]);
      dst[at(1, 1)] = avg3(pp[1], pp[2], pp[3]);
      dst[at(3, 0)] = dst[at(1, 1)];
      dst[at(1, 2)] = avg3(pp[2], pp[3], pp[4]);
      dst[at(3, 1)] = dst[at(1, 2)];
      dst[at(1, 3)] = avg3(pp[3], pp[4], pp[5]);
      dst[at(3, 2)] = dst[at(1, 3)];
      dst[at(2, 3)] = avg3(pp[4], pp[5], pp[6]);
      dst[at(3, 3)] = avg3(pp[5], pp[6], pp[7]);
    }
    LumaMode4::HD => {
      let pp = [nb.left[3], nb.left[2], nb.left[1], nb.left[0], nb.top_left, nb.top[0], nb.top[1], nb.top[2]];
      dst[at(3, 0)] = avg2(pp[0], pp[1]);
      dst[at(3, 1)] = avg3(pp[0], pp[1], pp[2]);
      dst[at(2, 0)] = avg2(pp[1], pp[2]);
      dst[at(3, 2)] = dst[at(2, 0)];
      dst[at(2, 1)] = avg3(pp[1], pp[2], pp[3]);
      dst[at(3, 3)] = dst[at(2, 1)];
      dst[at(2, 2)] = avg2(pp[2], pp[3]);
      dst[at(1, 0)] = dst[at(2, 2)];
      dst[at(2, 3)] = avg3(pp[2], pp[3], pp[4]);
      dst[at(1, 1)] = dst[at(2, 3)];
      dst[at(1, 2)] = avg2(pp[3], pp[4]);
      dst[at(0, 0)] = dst[at(1, 2)];
      dst[at(1, 3)] = avg3(pp[3], pp[4], pp[5]);
      dst[at(0, 1)] = dst[at(1, 3)];
      dst[at(0, 2)] = avg3(pp[4], pp[5], pp[6]);
      dst[at(0, 3)] = avg3(pp[5], pp[6], pp[7]);
    }
    LumaMode4::HU => {
      let l = nb.left;
      dst[at(0, 0)] = avg2(l[0], l[1]);
      dst[at(0, 1)] = avg3(l[0], l[1], l[2]);
      dst[at(0, 2)] = avg2(l[1], l[2]);
      dst[at(1, 0)] = dst[at(0, 2)];
      dst[at(0, 3)] = avg3(l[1], l[2], l[3]);
      dst[at(1, 1)] = dst[at(0, 3)];
      dst[at(1, 2)] = avg2(l[2], l[3]);
      dst[at(2, 0)] = dst[at(1, 2)];
      dst[at(1, 3)] = avg3(l[2], l[3], l[3]);
      dst[at(2, 1)] = dst[at(1, 3)];
      dst[at(2, 2)] = l[3];
      dst[at(2, 3)] = l[3];
      dst[at(3, 0)] = l[3];
      dst[at(3, 1)] = l[3];
      dst[at(3, 2)] = l[3];
      dst[at(3, 3)] = l[3];
    }
  }
}

// --- Luma 16x16 / chroma 8x8 whole-block prediction ---

// `size` is 16 or 8. `dst` is `size*size` row-major. `top`/`left` have
// `size` entries each.
pub fn predict_whole(
  mode: WholeBlockMode,
  variant: Option<DcVariant>,
  size: usize,
  top: &[u8],
  left: &[u8],
  top_left: u8,
  dst: &mut [u8],
) {
  assert_eq!(top.len(), size);
  assert_eq!(left.len(), size);
  assert_eq!(dst.len(), size * size);

  match mode {
    WholeBlockMode::DC => {
      let dc = match variant.unwrap_or(DcVariant::Default) {
        DcVariant::Default => {
          let sum: u32 = top.iter().chain(left.iter()).map(|&v| v as u32).sum();
          let shift = ceil_log2(2 * size) as u32;
          ((sum + size as u32) >> shift) as u8
        }
        DcVariant::NoLeft => {
          let sum: u32 = top.iter().map(|&v| v as u32).sum();
          let shift = ceil_log2(size) as u32;
          ((sum + size as u32 / 2) >> shift) as u8
        }
        DcVariant::NoTop => {
          let sum: u32 = left.iter().map(|&v| v as u32).sum();
          let shift = ceil_log2(size) as u32;
          ((sum + size as u32 / 2) >> shift) as u8
        }
        DcVariant::NoTopLeft => 128,
      };
      dst.fill(dc);
    }
    WholeBlockMode::V => {
      for r in 0..size {
        dst[r * size..r * size + size].copy_from_slice(top);
      }
    }
    WholeBlockMode::H => {
      for r in 0..size {
        for c in 0..size {
          dst[r * size + c] = left[r];
        }
      }
    }
    WholeBlockMode::TM => {
      for r in 0..size {
        for c in 0..size {
          let v = top[c] as i32 + left[r] as i32 - top_left as i32;
          dst[r * size + c] = clamp_u8(v);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dc_no_top_left_is_128() {
    let mut dst = [0u8; 64];
    predict_whole(WholeBlockMode::DC, Some(DcVariant::NoTopLeft), 8, &[0; 8], &[0; 8], 0, &mut dst);
    assert!(dst.iter().all(|&v| v == 128));
  }

  #[test]
  fn v_pred_copies_top_row() {
    let top = [10u8, 20, 30, 40, 50, 60, 70, 80];
    let mut dst = [0u8; 64];
    predict_whole(WholeBlockMode::V, None, 8, &top, &[0; 8], 0, &mut dst);
    assert_eq!(&dst[0..8], &top);
    assert_eq!(&dst[56..64], &top);
  }

  #[test]
  fn tm_pred_matches_formula() {
    let top = [100u8; 16];
    let left = [50u8; 16];
    let top_left = 60u8;
    let mut dst = [0u8; 256];
    predict_whole(WholeBlockMode::TM, None, 16, &top, &left, top_left, &mut dst);
    let expected = clamp_u8(100i32 + 50 - 60);
    assert!(dst.iter().all(|&v| v == expected));
  }

  #[test]
  fn luma4_dc_is_rounded_average() {
    let nb = Luma4Neighbours { top: [10, 20, 30, 40], left: [10, 20, 30, 40], top_left: 5, top_right: [0; 4] };
    let mut dst = [0u8; 16];
    predict_luma4(LumaMode4::DC, &nb, &mut dst);
    let expected = ((10 + 20 + 30 + 40) * 2 + 4) / 8;
    assert!(dst.iter().all(|&v| v == expected as u8));
  }
}
