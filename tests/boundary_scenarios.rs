// Integration coverage for the six decode/cluster boundary scenarios
// enumerated in the crate's specification. Each test is named after the
// scenario's own number rather than any external document.

use tinywebp::backward_ref::BackwardRef;
use tinywebp::cluster::{get_histo_image_symbols, ClusterConfig};
use tinywebp::consts::{NON_TRIVIAL, NUM_MB_SEGMENTS};
use tinywebp::deblock::FilterParams;
use tinywebp::enums::{FilterType, ThreadMode};
use tinywebp::error::CoreResult;
use tinywebp::frame::CropRect;
use tinywebp::histogram::Histogram;
use tinywebp::io::{OutputSink, RowSamples};
use tinywebp::macroblock::Macroblock;
use tinywebp::Vp8Decoder;

struct RecordedRow {
  mb_y: usize,
  y: Vec<u8>,
  crop_left: usize,
  crop_top: usize,
  crop_width: usize,
  crop_height: usize,
}

#[derive(Default)]
struct RecordingSink {
  rows: Vec<RecordedRow>,
}

impl OutputSink for RecordingSink {
  fn setup(&mut self, _width: usize, _height: usize) -> CoreResult<()> {
    Ok(())
  }

  fn put(&mut self, rows: &RowSamples) -> CoreResult<()> {
    self.rows.push(RecordedRow {
      mb_y: rows.mb_y,
      y: rows.y.to_vec(),
      crop_left: rows.crop_left,
      crop_top: rows.crop_top,
      crop_width: rows.crop_width,
      crop_height: rows.crop_height,
    });
    Ok(())
  }

  fn teardown(&mut self) {}
}

fn no_filter_params() -> FilterParams {
  FilterParams {
    filter_type: FilterType::None,
    use_segment: false,
    absolute_delta: false,
    seg_filter: [0; NUM_MB_SEGMENTS],
    global_level: 0,
    sharpness: 0,
    use_lf_delta: false,
    ref_lf_delta: 0,
    mode_lf_delta: 0,
  }
}

fn filtered_params(filter_type: FilterType) -> FilterParams {
  FilterParams {
    filter_type,
    use_segment: false,
    absolute_delta: false,
    seg_filter: [0; NUM_MB_SEGMENTS],
    global_level: 30,
    sharpness: 0,
    use_lf_delta: false,
    ref_lf_delta: 0,
    mode_lf_delta: 0,
  }
}

// Scenario 1 (scoped): a histogram built from a single literal tile keeps
// that exact ARGB value as its `trivial_symbol`, the closest in-crate
// analogue of "round-trips bit for bit" given that the pixel-level
// encode/decode path itself is out of this crate's scope (section 1).
#[test]
fn scenario1_single_literal_tile_round_trips_its_argb_value() {
  let mut histo = Histogram::new(0);
  histo.add_symbol(BackwardRef::literal(0xFFFF0000));
  histo.recompute_trivial_symbol();
  assert_eq!(histo.trivial_symbol, 0xFFFF0000);
}

// Scenario 2: a 16x16 single-segment intra frame with filtering disabled
// bypasses deblocking entirely; since the macroblock is also `skip` (no
// residual) and has neither a top nor a left neighbour, its output is the
// flat 128 DC-prediction field with no filter-induced changes.
#[test]
fn scenario2_filter_disabled_bypasses_deblocking() {
  let params = no_filter_params();
  let crop = CropRect::full(16, 16);
  let mut decoder = Vp8Decoder::init_frame(1, 1, &params, ThreadMode::Serial, crop).unwrap();
  let mut sink = RecordingSink::default();

  let row = vec![Macroblock::new_empty(0)];
  decoder.process_row(&row, &mut sink).unwrap();

  assert_eq!(sink.rows.len(), 1);
  assert!(sink.rows[0].y.iter().all(|&v| v == 128));
}

// Scenario 3: a frame wide enough to request threading (>= 512 px,
// section 4.4 / `MIN_WIDTH_FOR_THREADS`) must bit-match a single-threaded
// decode of the same macroblock content.
#[test]
fn scenario3_threaded_and_serial_decode_bit_match() {
  let mb_width = 33; // 33 * 16 = 528 >= 513
  let params = filtered_params(FilterType::Complex);
  let crop = CropRect::full(513, 16);

  let make_row = || -> Vec<Macroblock> { (0..mb_width).map(|i| Macroblock::new_empty((i % NUM_MB_SEGMENTS) as u8)).collect() };

  let mut serial = Vp8Decoder::init_frame(mb_width, 1, &params, ThreadMode::Serial, crop).unwrap();
  let mut serial_sink = RecordingSink::default();
  serial.process_row(&make_row(), &mut serial_sink).unwrap();

  let mut threaded = Vp8Decoder::init_frame(mb_width, 1, &params, ThreadMode::FilterParallel, crop).unwrap();
  let mut threaded_sink = RecordingSink::default();
  threaded.process_row(&make_row(), &mut threaded_sink).unwrap();

  assert_eq!(serial_sink.rows.len(), threaded_sink.rows.len());
  for (a, b) in serial_sink.rows.iter().zip(threaded_sink.rows.iter()) {
    assert_eq!(a.y, b.y);
    assert_eq!(a.crop_width, b.crop_width);
    assert_eq!(a.crop_height, b.crop_height);
  }
}

// Scenario 4: cropping a 16x16 frame down to (1,1)-(15,15) with the
// simple filter emits one row range covering 14 rows of 14 pixels, and
// never a row with `mb_y` that wouldn't correspond to a valid macroblock.
#[test]
fn scenario4_crop_rectangle_emits_exactly_the_cropped_region() {
  let params = filtered_params(FilterType::Simple);
  let crop = CropRect { left: 1, top: 1, right: 15, bottom: 15 };
  let mut decoder = Vp8Decoder::init_frame(1, 1, &params, ThreadMode::Serial, crop).unwrap();
  let mut sink = RecordingSink::default();

  let row = vec![Macroblock::new_empty(0)];
  decoder.process_row(&row, &mut sink).unwrap();

  assert_eq!(sink.rows.len(), 1);
  let emitted = &sink.rows[0];
  assert_eq!(emitted.crop_top, 1);
  assert_eq!(emitted.crop_left, 1);
  assert_eq!(emitted.crop_width, 14);
  assert_eq!(emitted.crop_height, 14);
}

// Scenario 5: 100 identical-content tiles collapse to a single cluster.
#[test]
fn scenario5_identical_tiles_collapse_to_one_cluster() {
  let refs: Vec<Vec<BackwardRef>> = (0..100).map(|_| vec![BackwardRef::literal(0xFF00FF00); 16]).collect();
  let config = ClusterConfig { quality: 75, low_effort: false, histogram_bits: 4, cache_bits: 0 };
  let mut symbols = Vec::new();

  let image_histo = get_histo_image_symbols(10, 10, &refs, config, &mut symbols).unwrap();

  assert!(symbols.iter().all(|&s| s == 0));
  assert_eq!(image_histo.iter_present().count(), 1);
}

// Scenario 6: tiles whose only non-zero literal is symbol 42 keep a
// non-`NON_TRIVIAL` `trivial_symbol` through every merge.
#[test]
fn scenario6_trivial_symbol_survives_clustering() {
  let refs: Vec<Vec<BackwardRef>> = (0..40).map(|_| vec![BackwardRef::literal(0x0000_2A00); 12]).collect();
  let config = ClusterConfig { quality: 75, low_effort: false, histogram_bits: 4, cache_bits: 0 };
  let mut symbols = Vec::new();

  let image_histo = get_histo_image_symbols(8, 5, &refs, config, &mut symbols).unwrap();

  for (_, histo) in image_histo.iter_present() {
    assert_ne!(histo.trivial_symbol, NON_TRIVIAL);
  }
}
