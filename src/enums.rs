// Copyright (c) 2024-2025, The tinyavif contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Luma 4x4 sub-block intra modes (section 4.2, "Luma 4x4").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LumaMode4 {
  DC,
  TM,
  VE,
  HE,
  LD,
  RD,
  VR,
  VL,
  HD,
  HU,
}

// Shared by luma 16x16 and chroma 8x8 whole-block intra modes
// (section 4.2, "Luma 16x16" / "Chroma 8x8").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WholeBlockMode {
  DC,
  V,
  H,
  TM,
}

// The DC mode specializes into one of four variants depending on which
// neighbours exist (section 4.2, "Mode adjustment").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcVariant {
  Default,
  NoTop,
  NoLeft,
  NoTopLeft,
}

pub fn adjust_dc_mode(mode: WholeBlockMode, have_top: bool, have_left: bool) -> (WholeBlockMode, Option<DcVariant>) {
  if mode != WholeBlockMode::DC {
    return (mode, None);
  }
  let variant = match (have_top, have_left) {
    (true, true) => DcVariant::Default,
    (false, true) => DcVariant::NoTop,
    (true, false) => DcVariant::NoLeft,
    (false, false) => DcVariant::NoTopLeft,
  };
  (mode, Some(variant))
}

// Whole-frame in-loop filter selection (section 3, "Filter-strength record";
// section 4.4, boundary scenario 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
  None,
  Simple,
  Complex,
}

// Row pipeline scheduling mode (section 4.4, "Scheduling model").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadMode {
  Serial,
  FilterParallel,
  ReconstructFilterParallel,
}

// Non-zero-coefficient pattern classification for a single 4x4 sub-block,
// derived from the top two bits of the per-sub-block shift described in
// section 4.2 ("Luma 4x4"): 3 = full transform, 2 = AC3 sparse, 1 = DC-only,
// 0 = skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NzClass {
  Skip = 0,
  DcOnly = 1,
  Ac3 = 2,
  Full = 3,
}

impl NzClass {
  pub fn from_bits(bits: u32) -> Self {
    match bits & 0x3 {
      0 => NzClass::Skip,
      1 => NzClass::DcOnly,
      2 => NzClass::Ac3,
      _ => NzClass::Full,
    }
  }
}
