// The decoder's only external output surface (section 4.4, "External
// Interfaces"). A consumer implements `OutputSink` to receive
// fully-reconstructed, deblocked, cropped rows of samples as they become
// available, without the pipeline needing to know anything about how
// those rows are ultimately stored or displayed.

use crate::error::CoreResult;

pub struct RowSamples<'a> {
  // First macroblock row covered by this call, and how many macroblock
  // rows' worth of samples it carries.
  pub mb_y: usize,
  pub mb_width: usize,
  pub mb_height: usize,

  pub y: &'a [u8],
  pub u: &'a [u8],
  pub v: &'a [u8],
  // Alpha plane samples, if the image carries one; `None` otherwise.
  pub a: Option<&'a [u8]>,

  pub y_stride: usize,
  pub uv_stride: usize,
  pub a_stride: usize,

  // Crop rectangle, in luma pixel coordinates, already intersected with
  // this call's row range. `y`/`u`/`v` above are already physically
  // shifted so that column 0 of each row is `crop_left` (chroma:
  // `crop_left >> 1`) - these fields describe the rectangle for
  // placement/bookkeeping, they do not need to be applied again to the
  // sample pointers.
  pub crop_left: usize,
  pub crop_top: usize,
  pub crop_width: usize,
  pub crop_height: usize,
}

pub trait OutputSink {
  // Called once before the first `put`, with the final (post-crop)
  // picture dimensions.
  fn setup(&mut self, width: usize, height: usize) -> CoreResult<()>;

  // Called once per available row range. Returning `Err` aborts the
  // decode (section "Error Handling Design", `UserAbort`).
  fn put(&mut self, rows: &RowSamples) -> CoreResult<()>;

  // Called once after the last `put`, even if an earlier call returned
  // `Err` (so a sink can always release resources it acquired in
  // `setup`).
  fn teardown(&mut self);
}
