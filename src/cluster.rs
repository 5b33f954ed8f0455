// Top-level lossless clustering entry point (C5-C9, section 6,
// `GetHistoImageSymbols`): builds one histogram per tile from its
// backward-reference stream, then runs the three-stage pre-pass →
// stochastic → greedy cluster reduction and a final nearest-cluster remap.

use crate::backward_ref::BackwardRef;
use crate::cluster_greedy::{min_cluster_size, run_greedy_pass};
use crate::cluster_remap::remap;
use crate::cluster_stochastic::run_stochastic_pass;
use crate::entropy_bins::run_prepass;
use crate::error::{CoreError, CoreResult};
use crate::histogram::{Histogram, HistogramSet};

// Config knobs entering the core as a single struct (section 6,
// "Config knobs (clusterer)").
#[derive(Debug, Clone, Copy)]
pub struct ClusterConfig {
  pub quality: i32,
  pub low_effort: bool,
  pub histogram_bits: u32,
  pub cache_bits: u32,
}

impl ClusterConfig {
  // `cache_bits` sets the literal table width (`palette_code_bits`); 0
  // means no color cache.
  fn palette_code_bits(&self) -> u32 {
    self.cache_bits
  }
}

// Drive the full cluster pipeline over `xsize x ysize` tiles described by
// `refs` (one backward-reference stream per tile, `refs.len()` tiles).
// `symbols[i]` is filled with tile `i`'s final cluster index; returns the
// compacted final `HistogramSet` (`image_histo` in the external-interface
// naming).
pub fn get_histo_image_symbols(
  xsize: usize,
  ysize: usize,
  refs: &[Vec<BackwardRef>],
  config: ClusterConfig,
  symbols: &mut Vec<u32>,
) -> CoreResult<HistogramSet> {
  if xsize == 0 || ysize == 0 {
    let err = CoreError::InvalidParam("cluster grid dimensions must be non-zero".to_string());
    log::error!("{err}");
    return Err(err);
  }
  if refs.is_empty() {
    let err = CoreError::InvalidParam("at least one tile is required".to_string());
    log::error!("{err}");
    return Err(err);
  }

  log::debug!(
    "get_histo_image_symbols: {}x{} tiles, quality={}, low_effort={}",
    xsize,
    ysize,
    config.quality,
    config.low_effort
  );

  let palette_code_bits = config.palette_code_bits();
  let mut original = HistogramSet::new(refs.len());
  for (i, tile_refs) in refs.iter().enumerate() {
    if tile_refs.is_empty() {
      continue; // stays Absent, matching "tiles that contributed nothing"
    }
    let mut histo = Histogram::new(palette_code_bits);
    for &sym in tile_refs {
      histo.add_symbol(sym);
    }
    histo.estimate_bit_cost();
    histo.recompute_trivial_symbol();
    original.set(i, histo);
  }

  let mut working = original.clone_for_clustering();

  log::debug!("cluster pass: entropy-bin pre-pass");
  run_prepass(&mut working, config.quality, config.low_effort);

  if !config.low_effort {
    let target = min_cluster_size(config.quality);
    log::debug!("cluster pass: stochastic (min_cluster_size={target})");
    let go_greedy = run_stochastic_pass(&mut working, target);
    if go_greedy {
      log::debug!("cluster pass: greedy");
      run_greedy_pass(&mut working);
    }
  }

  log::debug!("cluster pass: final remap");
  let (final_symbols, image_histo) = remap(&original, &working);

  *symbols = final_symbols;
  Ok(image_histo)
}

// `HistogramSet` doesn't derive `Clone` at the public API level to avoid
// accidental duplication of the (potentially large) original-tile set;
// this is the one place clustering legitimately needs an independent
// working copy to mutate while keeping `original` intact for the remap.
trait CloneForClustering {
  fn clone_for_clustering(&self) -> HistogramSet;
}

impl CloneForClustering for HistogramSet {
  fn clone_for_clustering(&self) -> HistogramSet {
    let mut out = HistogramSet::new(0);
    out.grow_to(self.len());
    for (idx, histo) in self.iter_present() {
      out.set(idx, histo.clone());
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn solid_tile_refs(argb: u32, count: usize) -> Vec<BackwardRef> {
    (0..count).map(|_| BackwardRef::literal(argb)).collect()
  }

  #[test]
  fn a_hundred_identical_tiles_collapse_to_one_cluster() {
    let refs: Vec<Vec<BackwardRef>> = (0..100).map(|_| solid_tile_refs(0xFFAABBCC, 16)).collect();
    let config = ClusterConfig { quality: 75, low_effort: false, histogram_bits: 4, cache_bits: 0 };
    let mut symbols = Vec::new();
    let image_histo = get_histo_image_symbols(10, 10, &refs, config, &mut symbols).unwrap();

    assert_eq!(symbols.len(), 100);
    assert!(symbols.iter().all(|&s| s == 0));
    assert_eq!(image_histo.iter_present().count(), 1);
  }

  #[test]
  fn trivial_symbol_survives_merges_when_only_one_literal_is_ever_used() {
    // G=42 (the "literal" symbol 42 named in the boundary scenario), A/R/B
    // all zero, so every symbol class has exactly one non-zero bucket.
    let refs: Vec<Vec<BackwardRef>> = (0..40).map(|_| solid_tile_refs(0x0000_2A00, 12)).collect();
    let config = ClusterConfig { quality: 75, low_effort: false, histogram_bits: 4, cache_bits: 0 };
    let mut symbols = Vec::new();
    let image_histo = get_histo_image_symbols(8, 5, &refs, config, &mut symbols).unwrap();

    for (_, histo) in image_histo.iter_present() {
      assert_ne!(histo.trivial_symbol, crate::consts::NON_TRIVIAL);
    }
  }

  #[test]
  fn rejects_empty_tile_lists() {
    let config = ClusterConfig { quality: 50, low_effort: false, histogram_bits: 4, cache_bits: 0 };
    let mut symbols = Vec::new();
    let err = get_histo_image_symbols(4, 4, &[], config, &mut symbols).unwrap_err();
    assert!(matches!(err, CoreError::InvalidParam(_)));
  }
}
