// Small CLI demo exercising both cores on synthetic fixture data (A4):
// `decode` drives the VP8 row pipeline over a flat, self-generated
// macroblock grid; `cluster` drives the histogram clusterer over
// synthetic backward-reference tiles. Neither subcommand touches a real
// bitstream or image file - that glue is out of scope (section 1).

use clap::{Parser, Subcommand};

use tinywebp::backward_ref::BackwardRef;
use tinywebp::cluster::{get_histo_image_symbols, ClusterConfig};
use tinywebp::consts::NUM_MB_SEGMENTS;
use tinywebp::deblock::FilterParams;
use tinywebp::enums::{FilterType, ThreadMode};
use tinywebp::error::CoreResult;
use tinywebp::frame::CropRect;
use tinywebp::io::{OutputSink, RowSamples};
use tinywebp::macroblock::Macroblock;
use tinywebp::Vp8Decoder;

#[derive(Parser)]
#[command(name = "tinywebp", about = "Synthetic-fixture demo for the VP8 and lossless clustering cores")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  // Decode a synthetic, flat-gray macroblock grid and report the rows
  // emitted to a counting sink.
  Decode {
    #[arg(long, default_value_t = 4)]
    mb_width: usize,
    #[arg(long, default_value_t = 4)]
    mb_height: usize,
    #[arg(long, default_value_t = false)]
    filter: bool,
  },
  // Cluster a synthetic tile grid where every tile shares one dominant
  // color, and report how many final clusters it collapses to.
  Cluster {
    #[arg(long, default_value_t = 10)]
    tiles_x: usize,
    #[arg(long, default_value_t = 10)]
    tiles_y: usize,
    #[arg(long, default_value_t = 75)]
    quality: i32,
    #[arg(long, default_value_t = false)]
    low_effort: bool,
  },
}

struct CountingSink {
  rows: usize,
}

impl OutputSink for CountingSink {
  fn setup(&mut self, width: usize, height: usize) -> CoreResult<()> {
    log::debug!("output setup: {width}x{height}");
    Ok(())
  }

  fn put(&mut self, rows: &RowSamples) -> CoreResult<()> {
    self.rows += 1;
    log::debug!("put: mb_y={} crop_width={} crop_height={}", rows.mb_y, rows.crop_width, rows.crop_height);
    Ok(())
  }

  fn teardown(&mut self) {}
}

fn run_decode(mb_width: usize, mb_height: usize, filter: bool) -> CoreResult<()> {
  let filter_params = FilterParams {
    filter_type: if filter { FilterType::Complex } else { FilterType::None },
    use_segment: false,
    absolute_delta: false,
    seg_filter: [0; NUM_MB_SEGMENTS],
    global_level: if filter { 20 } else { 0 },
    sharpness: 0,
    use_lf_delta: false,
    ref_lf_delta: 0,
    mode_lf_delta: 0,
  };
  let crop = CropRect::full(mb_width * 16, mb_height * 16);
  let mut decoder = Vp8Decoder::init_frame(mb_width, mb_height, &filter_params, ThreadMode::Serial, crop)?;

  let mut sink = CountingSink { rows: 0 };
  sink.setup(decoder.width(), decoder.height())?;

  for _ in 0..mb_height {
    let row: Vec<Macroblock> = (0..mb_width).map(|i| Macroblock::new_empty((i % NUM_MB_SEGMENTS) as u8)).collect();
    decoder.process_row(&row, &mut sink)?;
  }
  sink.teardown();

  println!("decoded {mb_width}x{mb_height} macroblocks, {} output calls", sink.rows);
  Ok(())
}

fn run_cluster(tiles_x: usize, tiles_y: usize, quality: i32, low_effort: bool) -> CoreResult<()> {
  let refs: Vec<Vec<BackwardRef>> = (0..tiles_x * tiles_y).map(|_| vec![BackwardRef::literal(0xFF336699); 16]).collect();
  let config = ClusterConfig { quality, low_effort, histogram_bits: 4, cache_bits: 0 };

  let mut symbols = Vec::new();
  let image_histo = get_histo_image_symbols(tiles_x, tiles_y, &refs, config, &mut symbols)?;

  println!(
    "clustered {} tiles into {} final histogram(s)",
    refs.len(),
    image_histo.iter_present().count()
  );
  Ok(())
}

fn main() {
  env_logger::init();
  let cli = Cli::parse();

  let result = match cli.command {
    Command::Decode { mb_width, mb_height, filter } => run_decode(mb_width, mb_height, filter),
    Command::Cluster { tiles_x, tiles_y, quality, low_effort } => run_cluster(tiles_x, tiles_y, quality, low_effort),
  };

  if let Err(err) = result {
    eprintln!("error: {err}");
    std::process::exit(1);
  }
}
