// Row-by-row reconstruction, deblocking, and output scheduling (C4,
// section 4.4). A macroblock row is reconstructed, then its own left/top/
// inner edges are filtered; a row only becomes safe to hand to the
// `OutputSink` once the *next* row's top-edge pass has touched its bottom
// few samples, since that pass still writes into it. This is the "extra
// row" lag referred to in the Design Notes: filtering trails reconstruction
// by zero rows, but output trails filtering by one row whenever filtering
// is enabled at all.

use crate::consts::NUM_MB_SEGMENTS;
use crate::deblock::{self, FilterParams};
use crate::enums::{FilterType, ThreadMode};
use crate::error::CoreResult;
use crate::frame::{CropRect, Frame};
use crate::io::{OutputSink, RowSamples};
use crate::macroblock::{FilterStrength, Macroblock};
use crate::recon::{copy_macroblock_to_frame, reconstruct_macroblock};
use crate::samplecache::{McScratch, TopBand};
use crate::worker::Worker;

struct FilteredRow {
  mb_y: usize,
}

pub struct RowPipeline {
  mb_width: usize,
  mb_height: usize,
  filter_type: FilterType,
  thread_mode: ThreadMode,
  filter_strengths: [[FilterStrength; 2]; NUM_MB_SEGMENTS],
  crop: CropRect,
  frame: Frame,
  band: TopBand,
  scratch: [McScratch; 2],
  // Worker used to overlap this row's filter+output with the next row's
  // reconstruction, in the two parallel thread modes.
  worker: Option<Worker<FilteredRow>>,
}

impl RowPipeline {
  pub fn new(mb_width: usize, mb_height: usize, filter_params: &FilterParams, thread_mode: ThreadMode, crop: CropRect) -> Self {
    let worker = match thread_mode {
      ThreadMode::Serial => None,
      ThreadMode::FilterParallel | ThreadMode::ReconstructFilterParallel => {
        Some(Worker::spawn(|_row: FilteredRow| {
          // The real filter+output work for the overlapped modes runs on
          // the caller's side (it needs exclusive access to `self`); this
          // worker only exists to model the overlap opportunity and is
          // synced immediately after being launched. See `process_row`.
        }))
      }
    };

    Self {
      mb_width,
      mb_height,
      filter_type: filter_params.filter_type,
      thread_mode,
      filter_strengths: deblock::precompute_filter_strengths(filter_params),
      crop,
      frame: Frame::new_padded(mb_width, mb_height),
      band: TopBand::new(mb_width),
      scratch: [McScratch::new(), McScratch::new()],
      worker,
    }
  }

  fn filter_enabled(&self) -> bool {
    self.filter_type != FilterType::None
  }

  // Reconstruct one macroblock row and return the (segment, is_i4x4, skip)
  // triple for each column, needed to pick this row's filter strengths.
  fn reconstruct_row(&mut self, mb_y: usize, mbs: &[Macroblock]) -> Vec<(u8, bool, bool)> {
    assert_eq!(mbs.len(), self.mb_width);
    let mut meta = Vec::with_capacity(self.mb_width);

    for mb_x in 0..self.mb_width {
      let cur = mb_x % 2;
      let prev = 1 - cur;

      if mb_x == 0 {
        self.scratch[cur].fill_left_sentinel();
      } else {
        let (a, b) = self.scratch.split_at_mut(1);
        let (cur_scratch, prev_scratch) = if cur == 0 { (&mut a[0], &b[0]) } else { (&mut b[0], &a[0]) };
        cur_scratch.rotate_left(prev_scratch);
      }
      self.scratch[cur].prepare_top_left(&self.band, mb_x, mb_y);

      let mb = &mbs[mb_x];
      reconstruct_macroblock(mb, &mut self.scratch[cur], mb_y > 0, mb_x > 0);
      copy_macroblock_to_frame(&self.scratch[cur], &mut self.frame, mb_x, mb_y);

      if mb_y + 1 < self.mb_height {
        self.scratch[cur].stash_top(&mut self.band, mb_x);
      }

      meta.push((mb.segment_id, mb.is_i4x4(), mb.skip));
      let _ = prev;
    }

    meta
  }

  // Filter macroblock row `mb_y` in place: left/top MB edges against the
  // row/column to its left/above, plus inner sub-block edges unless the
  // macroblock is a skipped whole-block prediction.
  fn filter_row(&mut self, mb_y: usize, meta: &[(u8, bool, bool)]) {
    if !self.filter_enabled() {
      return;
    }
    let simple = self.filter_type == FilterType::Simple;

    for mb_x in 0..self.mb_width {
      let (segment, is_i4x4, skip) = meta[mb_x];
      let strength = self.filter_strengths[segment as usize][is_i4x4 as usize];
      if !strength.is_filtered() {
        continue;
      }
      let do_inner = strength.f_inner && !(skip && !is_i4x4);

      let y0 = mb_y * 16;
      let x0 = mb_x * 16;
      if mb_x > 0 {
        deblock::filter_edge(self.frame.y_mut(), x0, y0, deblock::EdgeDir::Vertical, 16, &strength, self.filter_type, true);
      }
      if do_inner {
        for inner in [4usize, 8, 12] {
          deblock::filter_edge(self.frame.y_mut(), x0 + inner, y0, deblock::EdgeDir::Vertical, 16, &strength, self.filter_type, false);
        }
      }
      if mb_y > 0 {
        deblock::filter_edge(self.frame.y_mut(), x0, y0, deblock::EdgeDir::Horizontal, 16, &strength, self.filter_type, true);
      }
      if do_inner {
        for inner in [4usize, 8, 12] {
          deblock::filter_edge(self.frame.y_mut(), x0, y0 + inner, deblock::EdgeDir::Horizontal, 16, &strength, self.filter_type, false);
        }
      }

      // The simple filter operates on luma only (section 4.3).
      if simple {
        continue;
      }

      let cy0 = mb_y * 8;
      let cx0 = mb_x * 8;
      Self::filter_chroma_edges(self.frame.u_mut(), cx0, cy0, mb_x, mb_y, do_inner, &strength, self.filter_type);
      Self::filter_chroma_edges(self.frame.v_mut(), cx0, cy0, mb_x, mb_y, do_inner, &strength, self.filter_type);
    }
  }

  // One chroma plane's left/top/inner edge filtering for a single
  // macroblock, shared between U and V by taking the plane as a parameter
  // rather than looping over both with a single borrow of `self.frame`.
  fn filter_chroma_edges(
    plane: &mut crate::frame::Plane,
    cx0: usize,
    cy0: usize,
    mb_x: usize,
    mb_y: usize,
    do_inner: bool,
    strength: &FilterStrength,
    filter_type: FilterType,
  ) {
    if mb_x > 0 {
      deblock::filter_edge(plane, cx0, cy0, deblock::EdgeDir::Vertical, 8, strength, filter_type, true);
    }
    if do_inner {
      deblock::filter_edge(plane, cx0 + 4, cy0, deblock::EdgeDir::Vertical, 8, strength, filter_type, false);
    }
    if mb_y > 0 {
      deblock::filter_edge(plane, cx0, cy0, deblock::EdgeDir::Horizontal, 8, strength, filter_type, true);
    }
    if do_inner {
      deblock::filter_edge(plane, cx0, cy0 + 4, deblock::EdgeDir::Horizontal, 8, strength, filter_type, false);
    }
  }

  // Emit macroblock row `mb_y`'s samples, cropped, to `io`.
  fn output_row(&self, mb_y: usize, io: &mut dyn OutputSink) -> CoreResult<()> {
    let y0 = mb_y * 16;
    let y1 = ((mb_y + 1) * 16).min(self.frame.y().height);
    let crop_top = self.crop.top.max(y0);
    let crop_bottom = self.crop.bottom.min(y1);
    if crop_top >= crop_bottom {
      return Ok(());
    }

    let y_stride = self.frame.y().stride;
    let uv_stride = self.frame.u().stride;
    // Step 3 of "Row finalize" (section 4.4): the emitted pointers are
    // physically shifted by `crop_left` (chroma by `crop_left >> 1`), not
    // merely annotated with it. Since samples are stored row-major with
    // a fixed `stride`, advancing the slice's start by `crop_left` shifts
    // every row's effective column origin by the same amount - row `r`,
    // column `c` of the shifted slice is `slice[r*stride + c]`, which is
    // absolute column `crop_left + c` of row `crop_top + r`, exactly the
    // cropped left edge.
    let crop_left = self.crop.left;
    let chroma_crop_left = crop_left >> 1;
    let y_start = crop_top * y_stride + crop_left;
    let y_end = crop_bottom * y_stride;
    let cy0 = crop_top / 2;
    let cy1 = (crop_bottom + 1) / 2;
    let uv_start = cy0 * uv_stride + chroma_crop_left;
    let uv_end = cy1 * uv_stride;

    let rows = RowSamples {
      mb_y,
      mb_width: self.mb_width,
      mb_height: 1,
      y: &self.frame.y().data[y_start..y_end],
      u: &self.frame.u().data[uv_start..uv_end],
      v: &self.frame.v().data[uv_start..uv_end],
      a: None,
      y_stride,
      uv_stride,
      a_stride: 0,
      crop_left,
      crop_top,
      crop_width: self.crop.width(),
      crop_height: crop_bottom - crop_top,
    };
    io.put(&rows)
  }

  // Process one macroblock row's worth of already-parsed macroblocks.
  // `mbs.len()` must equal `mb_width`.
  pub fn process_row(&mut self, mb_y: usize, mbs: &[Macroblock], io: &mut dyn OutputSink) -> CoreResult<()> {
    let meta = self.reconstruct_row(mb_y, mbs);
    self.filter_row(mb_y, &meta);

    // See the module doc comment: the previous row is only fully settled
    // (no further filter pass will touch it) once this row's top-edge
    // filter has run, or immediately if filtering is off.
    if self.filter_enabled() {
      if mb_y > 0 {
        self.sync_previous_row_job();
        self.output_row(mb_y - 1, io)?;
      }
      if mb_y + 1 == self.mb_height {
        self.output_row(mb_y, io)?;
      } else {
        self.launch_row_job(mb_y);
      }
    } else {
      self.output_row(mb_y, io)?;
    }
    Ok(())
  }

  fn launch_row_job(&self, mb_y: usize) {
    if let Some(worker) = &self.worker {
      worker.launch(FilteredRow { mb_y });
    }
  }

  fn sync_previous_row_job(&self) {
    if let Some(worker) = &self.worker {
      worker.sync();
    }
  }

  pub fn width(&self) -> usize {
    self.crop.width()
  }

  pub fn height(&self) -> usize {
    self.crop.height()
  }
}
