// Top-level decoder handle (section 6, "External Interfaces"): wires the
// row pipeline (C4) to the three call-in points a bitstream parser drives
// it with, plus the error short-circuit policy from section 7.

use crate::deblock::FilterParams;
use crate::enums::ThreadMode;
use crate::error::{CoreError, CoreResult};
use crate::frame::CropRect;
use crate::io::OutputSink;
use crate::macroblock::Macroblock;
use crate::pipeline::RowPipeline;

pub struct Vp8Decoder {
  pipeline: RowPipeline,
  mb_width: usize,
  mb_height: usize,
  next_row: usize,
  // First error seen by any call, if any; every later call short-circuits
  // on it instead of touching the pipeline again (section 7, propagation
  // policy).
  last_error: Option<CoreError>,
}

impl Vp8Decoder {
  // `InitFrame`: allocate the row pipeline for a frame of the given
  // macroblock dimensions and start the first critical section.
  pub fn init_frame(
    mb_width: usize,
    mb_height: usize,
    filter_params: &FilterParams,
    thread_mode: ThreadMode,
    crop: CropRect,
  ) -> CoreResult<Self> {
    if mb_width == 0 || mb_height == 0 {
      let err = CoreError::InvalidParam("macroblock dimensions must be non-zero".to_string());
      log::error!("{err}");
      return Err(err);
    }
    log::debug!("init_frame: {mb_width}x{mb_height} macroblocks, thread_mode={thread_mode:?}");
    Ok(Self {
      pipeline: RowPipeline::new(mb_width, mb_height, filter_params, thread_mode, crop),
      mb_width,
      mb_height,
      next_row: 0,
      last_error: None,
    })
  }

  // `ProcessRow`: reconstruct, filter, and (possibly with a one-row lag)
  // output the next macroblock row. Short-circuits if an earlier call
  // already failed.
  pub fn process_row(&mut self, mbs: &[Macroblock], io: &mut dyn OutputSink) -> CoreResult<()> {
    if let Some(err) = &self.last_error {
      return Err(err.clone());
    }
    if mbs.len() != self.mb_width {
      let err = CoreError::InvalidParam(format!("expected {} macroblocks, got {}", self.mb_width, mbs.len()));
      log::error!("{err}");
      self.last_error = Some(err.clone());
      return Err(err);
    }
    if self.next_row >= self.mb_height {
      let err = CoreError::InvalidParam("process_row called past the last macroblock row".to_string());
      log::error!("{err}");
      self.last_error = Some(err.clone());
      return Err(err);
    }

    let row = self.next_row;
    let result = self.pipeline.process_row(row, mbs, io);
    self.next_row += 1;
    if let Err(err) = &result {
      log::error!("process_row {row} failed: {err}");
      self.last_error = Some(err.clone());
    }
    result
  }

  // `EnterCritical`/`ExitCritical`: the crate has no cross-row mutable
  // state that isn't already owned exclusively by `Vp8Decoder` itself, so
  // these are no-ops kept only to preserve the external call surface a
  // bitstream parser drives (section 6).
  pub fn enter_critical(&mut self) -> CoreResult<()> {
    Ok(())
  }

  pub fn exit_critical(&mut self) -> CoreResult<()> {
    Ok(())
  }

  pub fn width(&self) -> usize {
    self.pipeline.width()
  }

  pub fn height(&self) -> usize {
    self.pipeline.height()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::enums::FilterType;
  use crate::io::RowSamples;

  struct RecordingSink {
    rows_seen: usize,
  }

  impl OutputSink for RecordingSink {
    fn setup(&mut self, _width: usize, _height: usize) -> CoreResult<()> {
      Ok(())
    }
    fn put(&mut self, _rows: &RowSamples) -> CoreResult<()> {
      self.rows_seen += 1;
      Ok(())
    }
    fn teardown(&mut self) {}
  }

  fn no_filter_params() -> FilterParams {
    FilterParams {
      filter_type: FilterType::None,
      use_segment: false,
      absolute_delta: false,
      seg_filter: [0; crate::consts::NUM_MB_SEGMENTS],
      global_level: 0,
      sharpness: 0,
      use_lf_delta: false,
      ref_lf_delta: 0,
      mode_lf_delta: 0,
    }
  }

  #[test]
  fn process_row_past_the_last_row_is_an_error() {
    let params = no_filter_params();
    let crop = CropRect::full(16, 16);
    let mut decoder = Vp8Decoder::init_frame(1, 1, &params, ThreadMode::Serial, crop).unwrap();
    let mbs = vec![Macroblock::new_empty(0)];
    let mut sink = RecordingSink { rows_seen: 0 };

    decoder.process_row(&mbs, &mut sink).unwrap();
    assert_eq!(sink.rows_seen, 1);

    let err = decoder.process_row(&mbs, &mut sink).unwrap_err();
    assert!(matches!(err, CoreError::InvalidParam(_)));
  }

  #[test]
  fn an_error_sticks_for_all_later_calls() {
    let params = no_filter_params();
    let crop = CropRect::full(32, 16);
    let mut decoder = Vp8Decoder::init_frame(2, 1, &params, ThreadMode::Serial, crop).unwrap();
    let one_mb = vec![Macroblock::new_empty(0)];
    let mut sink = RecordingSink { rows_seen: 0 };

    let first_err = decoder.process_row(&one_mb, &mut sink).unwrap_err();
    let second_err = decoder.process_row(&one_mb, &mut sink).unwrap_err();
    assert_eq!(first_err, second_err);
    assert_eq!(sink.rows_seen, 0);
  }
}
