// The per-macroblock data model produced by the (external) VP8 bitstream
// parser and consumed exactly once by reconstruction (section 3,
// "Macroblock (decode)").

use crate::enums::{LumaMode4, WholeBlockMode};

pub const LUMA_SUBBLOCKS: usize = 16;
pub const CHROMA_SUBBLOCKS_PER_PLANE: usize = 4;
pub const COEFFS_PER_BLOCK: usize = 16;
pub const LUMA_COEFFS: usize = LUMA_SUBBLOCKS * COEFFS_PER_BLOCK; // 256
pub const CHROMA_COEFFS: usize = 2 * CHROMA_SUBBLOCKS_PER_PLANE * COEFFS_PER_BLOCK; // 128
pub const TOTAL_COEFFS: usize = LUMA_COEFFS + CHROMA_COEFFS; // 384

#[derive(Debug, Clone, Copy)]
pub enum LumaPrediction {
  // 16x16 whole-block prediction; every sub-block shares `mode`.
  Whole(WholeBlockMode),
  // 4x4 sub-block prediction; one mode per sub-block, raster order.
  Split([LumaMode4; LUMA_SUBBLOCKS]),
}

#[derive(Debug, Clone)]
pub struct Macroblock {
  pub segment_id: u8,
  pub skip: bool,
  pub luma_pred: LumaPrediction,
  pub chroma_mode: WholeBlockMode,

  // Residual coefficients: first LUMA_COEFFS entries are the 16 luma
  // sub-blocks (raster order, 16 coefficients each in transform-domain
  // scan order); remaining CHROMA_COEFFS are 4 U sub-blocks followed by 4
  // V sub-blocks.
  pub coeffs: Box<[i16; TOTAL_COEFFS]>,

  // 2 bits per sub-block: 0=none, 1=DC-only, 2=AC3 sparse, 3=full
  // (section 4.2, "Luma 4x4"). `nz_luma` covers the 16 luma sub-blocks in
  // its low 32 bits (2 bits each); `nz_chroma` covers the 8 chroma
  // sub-blocks (4 U + 4 V) in its low 16 bits.
  pub nz_luma: u32,
  pub nz_chroma: u32,

  // Per-macroblock dither amplitude (section 3: "per-block dither
  // amplitude"; simplified to one value per macroblock here since the
  // core treats dithering as a non-normative post-process applied after
  // reconstruction - see DESIGN.md).
  pub dither_amplitude: u8,
}

impl Macroblock {
  pub fn is_i4x4(&self) -> bool {
    matches!(self.luma_pred, LumaPrediction::Split(_))
  }

  pub fn luma_block(&self, idx: usize) -> &[i16] {
    &self.coeffs[idx * COEFFS_PER_BLOCK..(idx + 1) * COEFFS_PER_BLOCK]
  }

  pub fn luma_block_mut(&mut self, idx: usize) -> &mut [i16] {
    &mut self.coeffs[idx * COEFFS_PER_BLOCK..(idx + 1) * COEFFS_PER_BLOCK]
  }

  // `plane` is 1 for U, 2 for V; `idx` is 0..4 in raster order within the
  // 8x8 chroma block.
  pub fn chroma_block(&self, plane: usize, idx: usize) -> &[i16] {
    assert!(plane == 1 || plane == 2);
    let base = LUMA_COEFFS + (plane - 1) * CHROMA_SUBBLOCKS_PER_PLANE * COEFFS_PER_BLOCK;
    let start = base + idx * COEFFS_PER_BLOCK;
    &self.coeffs[start..start + COEFFS_PER_BLOCK]
  }

  pub fn chroma_block_mut(&mut self, plane: usize, idx: usize) -> &mut [i16] {
    assert!(plane == 1 || plane == 2);
    let base = LUMA_COEFFS + (plane - 1) * CHROMA_SUBBLOCKS_PER_PLANE * COEFFS_PER_BLOCK;
    let start = base + idx * COEFFS_PER_BLOCK;
    &mut self.coeffs[start..start + COEFFS_PER_BLOCK]
  }

  // Extract the 2-bit nz class for a luma sub-block (raster order 0..16).
  pub fn luma_nz_class(&self, idx: usize) -> u32 {
    (self.nz_luma >> (idx * 2)) & 0x3
  }

  pub fn set_luma_nz_class(&mut self, idx: usize, class: u32) {
    let shift = idx * 2;
    self.nz_luma = (self.nz_luma & !(0x3 << shift)) | ((class & 0x3) << shift);
  }

  // Extract the 2-bit nz class for a chroma sub-block; `global_idx` is
  // 0..4 for U then 4..8 for V.
  pub fn chroma_nz_class(&self, global_idx: usize) -> u32 {
    (self.nz_chroma >> (global_idx * 2)) & 0x3
  }

  pub fn set_chroma_nz_class(&mut self, global_idx: usize, class: u32) {
    let shift = global_idx * 2;
    self.nz_chroma = (self.nz_chroma & !(0x3 << shift)) | ((class & 0x3) << shift);
  }

  // Any non-zero bit set across the low 8 bits of `nz_chroma`, used by the
  // chroma transform-mask dispatch in section 4.2 ("Chroma 8x8").
  pub fn chroma_any_nonzero(&self) -> bool {
    (self.nz_chroma & 0xFF) != 0
  }

  // `mask & 0xAA == 0` per section 4.2: none of the four AC-bearing high
  // bits (class >= 2, i.e. bit 1 of each 2-bit field) are set.
  pub fn chroma_dc_only(&self) -> bool {
    (self.nz_chroma & 0xAA) == 0
  }

  pub fn new_empty(segment_id: u8) -> Self {
    Self {
      segment_id,
      skip: true,
      luma_pred: LumaPrediction::Whole(WholeBlockMode::DC),
      chroma_mode: WholeBlockMode::DC,
      coeffs: Box::new([0i16; TOTAL_COEFFS]),
      nz_luma: 0,
      nz_chroma: 0,
      dither_amplitude: 0,
    }
  }
}

// Per-macroblock filter-strength record, precomputed once per
// {segment, is_i4x4} pair (section 3, "Filter-strength record"; section 4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStrength {
  pub f_limit: u8,
  pub f_ilevel: u8,
  pub f_inner: bool,
  pub hev_thresh: u8,
}

impl FilterStrength {
  pub const NONE: FilterStrength = FilterStrength { f_limit: 0, f_ilevel: 0, f_inner: false, hev_thresh: 0 };

  pub fn is_filtered(&self) -> bool {
    self.f_limit != 0
  }
}
