// Per-macroblock reconstruction dispatch (C2, section 4.2): ties the
// sample cache (C1), the prediction kernels, and the inverse transforms
// together into "predict, then add residual" for every sub-block of a
// macroblock.

use crate::enums::{adjust_dc_mode, NzClass};
use crate::frame::Frame;
use crate::macroblock::{LumaPrediction, Macroblock};
use crate::predict::{predict_luma4, predict_whole, Luma4Neighbours};
use crate::samplecache::McScratch;
use crate::txfm::{add_residual_4x4, idct4x4_ac3, idct4x4_dc, idct4x4_full, iwht4x4};

// Dispatch a single 4x4 sub-block's inverse transform by its non-zero
// class and add the residual into `pred` (row-major, stride `stride`).
fn add_subblock_residual(class: NzClass, coeffs: &[i16], pred: &mut [u8], stride: usize) {
  match class {
    NzClass::Skip => {}
    NzClass::DcOnly => {
      let dc = idct4x4_dc(coeffs[0]);
      for r in 0..4 {
        for c in 0..4 {
          let v = pred[r * stride + c] as i32 + dc;
          pred[r * stride + c] = crate::util::clamp_u8(v);
        }
      }
    }
    NzClass::Ac3 => {
      let block: &[i16; 16] = coeffs.try_into().unwrap();
      let residual = idct4x4_ac3(block);
      add_residual_4x4(pred, stride, &residual);
    }
    NzClass::Full => {
      let block: &[i16; 16] = coeffs.try_into().unwrap();
      let residual = idct4x4_full(block);
      add_residual_4x4(pred, stride, &residual);
    }
  }
}

// Reconstruct a whole-block (16x16) luma macroblock. DC coefficients of
// the 16 sub-blocks pass through the inverse Walsh-Hadamard transform
// first (section 4.2, "Luma 16x16") before the per-sub-block DCT dispatch
// runs over the remaining AC coefficients.
fn reconstruct_luma16(mb: &Macroblock, scratch: &mut McScratch, mode: crate::enums::WholeBlockMode, have_top: bool, have_left: bool) {
  let (mode, variant) = adjust_dc_mode(mode, have_top, have_left);

  let top: Vec<u8> = (0..16).map(|c| scratch.luma_main(0, c)).collect();
  let left: Vec<u8> = (0..16).map(|r| scratch.left_luma(r + 1)).collect();
  let top_left = scratch.left_luma(0);

  let mut pred = [0u8; 256];
  predict_whole(mode, variant, 16, &top, &left, top_left, &mut pred);

  // Redistribute the 16 sub-block DC coefficients through the IWHT, if
  // any of them carry a non-zero DC term (a macroblock with `skip` true
  // has no coefficients at all, and is left as a pure prediction).
  let mut dcs = [0i16; 16];
  let mut any_dc = false;
  for i in 0..16 {
    let v = mb.luma_block(i)[0];
    dcs[i] = v;
    any_dc |= v != 0;
  }
  let redistributed_dc = if any_dc { Some(iwht4x4(&dcs)) } else { None };

  for sb in 0..16 {
    let sb_row = sb / 4;
    let sb_col = sb % 4;
    let mut class = mb.luma_nz_class(sb);
    let mut coeffs: [i16; 16] = mb.luma_block(sb).try_into().unwrap();
    if let Some(wht) = &redistributed_dc {
      coeffs[0] = crate::util::clamp(wht[sb], i16::MIN as i32, i16::MAX as i32) as i16;
      // With the DC coefficient now carrying WHT output rather than a raw
      // quantized value, a sub-block that had no AC energy is always at
      // least DC-only once any_dc is set.
      if class == NzClass::Skip {
        class = NzClass::DcOnly;
      }
    }

    let block_start = (sb_row * 4) * 16 + sb_col * 4;
    add_subblock_residual(class, &coeffs, &mut pred[block_start..], 16);
  }

  for r in 0..16 {
    for c in 0..16 {
      scratch.set_luma_main(r + 1, c, pred[r * 16 + c]);
    }
  }
}

// Reconstruct a split (i4x4) luma macroblock: each of the 16 4x4
// sub-blocks predicts from already-reconstructed neighbours (either this
// macroblock's own earlier sub-blocks, in raster order, or the persistent
// top/left cache at the macroblock's border).
fn reconstruct_luma_i4x4(mb: &Macroblock, scratch: &mut McScratch, modes: &[crate::enums::LumaMode4; 16]) {
  for sb in 0..16 {
    let sb_row = sb / 4;
    let sb_col = sb % 4;
    let base_row = sb_row * 4;
    let base_col = sb_col * 4;

    let top: [u8; 4] = core::array::from_fn(|i| scratch.luma_main(base_row, base_col + i));
    let left: [u8; 4] = core::array::from_fn(|i| {
      if sb_col == 0 {
        scratch.left_luma(base_row + 1 + i)
      } else {
        scratch.luma_main(base_row + i, base_col - 1)
      }
    });
    let top_left = if sb_col == 0 { scratch.left_luma(base_row) } else { scratch.luma_main(base_row, base_col - 1) };
    let top_right: [u8; 4] = if sb_col < 3 {
      core::array::from_fn(|i| scratch.luma_main(base_row, base_col + 4 + i))
    } else {
      core::array::from_fn(|i| scratch.top_right_luma(i))
    };

    let nb = Luma4Neighbours { top, left, top_left, top_right };
    let mut pred = [0u8; 16];
    predict_luma4(modes[sb], &nb, &mut pred);

    let class = mb.luma_nz_class(sb);
    add_subblock_residual(class, mb.luma_block(sb), &mut pred, 4);

    for r in 0..4 {
      for c in 0..4 {
        scratch.set_luma_main(base_row + 1 + r, base_col + c, pred[r * 4 + c]);
      }
    }
  }
}

// Reconstruct both chroma planes (U then V), each an independent 8x8
// whole-block prediction (section 4.2, "Chroma 8x8").
fn reconstruct_chroma(mb: &Macroblock, scratch: &mut McScratch, have_top: bool, have_left: bool) {
  let (mode, variant) = adjust_dc_mode(mb.chroma_mode, have_top, have_left);

  for plane in 0..2 {
    let plane_is_v = plane == 1;
    let top: Vec<u8> = (0..8).map(|c| scratch.top_chroma(plane_is_v, c)).collect();
    let left: Vec<u8> = (0..8).map(|r| scratch.left_chroma(plane_is_v, r + 1)).collect();
    let top_left = scratch.left_chroma(plane_is_v, 0);

    let mut pred = [0u8; 64];
    predict_whole(mode, variant, 8, &top, &left, top_left, &mut pred);

    for sb in 0..4 {
      let sb_row = sb / 2;
      let sb_col = sb % 2;
      let class = mb.chroma_nz_class(plane * 4 + sb);
      let block_start = (sb_row * 4) * 8 + sb_col * 4;
      add_subblock_residual(class, mb.chroma_block(plane + 1, sb), &mut pred[block_start..], 8);
    }

    for r in 0..8 {
      for c in 0..8 {
        scratch.set_chroma_main(plane_is_v, r + 1, c, pred[r * 8 + c]);
      }
    }
  }
}

pub fn reconstruct_macroblock(mb: &Macroblock, scratch: &mut McScratch, have_top: bool, have_left: bool) {
  match &mb.luma_pred {
    LumaPrediction::Whole(mode) => reconstruct_luma16(mb, scratch, *mode, have_top, have_left),
    LumaPrediction::Split(modes) => reconstruct_luma_i4x4(mb, scratch, modes),
  }
  reconstruct_chroma(mb, scratch, have_top, have_left);
}

// Copy a reconstructed macroblock's samples out of scratch into the
// frame's planes at macroblock coordinates (mb_x, mb_y).
pub fn copy_macroblock_to_frame(scratch: &McScratch, frame: &mut Frame, mb_x: usize, mb_y: usize) {
  let y0 = mb_y * 16;
  let x0 = mb_x * 16;
  for r in 0..16 {
    for c in 0..16 {
      frame.y_mut().set(y0 + r, x0 + c, scratch.luma_main(r + 1, c));
    }
  }
  let cy0 = mb_y * 8;
  let cx0 = mb_x * 8;
  for r in 0..8 {
    for c in 0..8 {
      frame.u_mut().set(cy0 + r, cx0 + c, scratch.chroma_main(false, r + 1, c));
      frame.v_mut().set(cy0 + r, cx0 + c, scratch.chroma_main(true, r + 1, c));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::enums::WholeBlockMode;
  use crate::samplecache::TopBand;

  #[test]
  fn skip_macroblock_is_pure_prediction() {
    let band = TopBand::new(1);
    let mut scratch = McScratch::new();
    scratch.prepare_top_left(&band, 0, 0);
    scratch.fill_left_sentinel();

    let mb = Macroblock::new_empty(0);
    reconstruct_macroblock(&mb, &mut scratch, false, false);

    // DC prediction with neither neighbour is a flat 128 field.
    for r in 0..16 {
      for c in 0..16 {
        assert_eq!(scratch.luma_main(r + 1, c), 128);
      }
    }
  }

  #[test]
  fn dc_only_luma16_adds_uniform_offset() {
    let band = TopBand::new(1);
    let mut scratch = McScratch::new();
    scratch.prepare_top_left(&band, 0, 0);
    scratch.fill_left_sentinel();

    let mut mb = Macroblock::new_empty(0);
    mb.luma_pred = LumaPrediction::Whole(WholeBlockMode::DC);
    mb.skip = false;
    for i in 0..16 {
      mb.luma_block_mut(i)[0] = 64;
      mb.set_luma_nz_class(i, NzClass::DcOnly as u32);
    }

    reconstruct_macroblock(&mb, &mut scratch, false, false);

    // After IWHT redistribution a single input DC spreads across all 16
    // sub-blocks (uniform field -> uniform WHT output), so the whole
    // 16x16 block shifts by a single offset from the 128 DC base.
    let first = scratch.luma_main(1, 0);
    for r in 0..16 {
      for c in 0..16 {
        assert_eq!(scratch.luma_main(r + 1, c), first);
      }
    }
  }
}
