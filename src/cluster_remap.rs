// Final remap (C9, section 4.9): assign every *original* tile (including
// ones the entropy-bin pre-pass already folded away) to whichever final
// cluster minimizes its added cost, then rebuild the final clusters' counts
// from scratch by re-adding exactly the tiles assigned to them.

use crate::histogram::{Histogram, HistogramSet};

// Compact a histogram set's present slots down to `0..k`, returning the
// compacted set and the old-slot -> new-slot mapping (absent entries in the
// mapping are `None`). The clusterer's internal slot indices don't need to
// be contiguous; the public `symbols[]` output does.
fn compact(set: &HistogramSet) -> (HistogramSet, Vec<Option<usize>>) {
  let mut mapping = vec![None; set.len()];
  let mut compacted = HistogramSet::new(0);
  let mut out = Vec::new();
  for (old_idx, histo) in set.iter_present() {
    mapping[old_idx] = Some(out.len());
    out.push(histo.clone());
  }
  for (new_idx, histo) in out.into_iter().enumerate() {
    compacted.grow_to(new_idx + 1);
    compacted.set(new_idx, histo);
  }
  (compacted, mapping)
}

// Assign every tile in `original` (a histogram set where absent slots mean
// "this tile contributed nothing and was never built") to the nearest
// cluster in `final_clusters`, then zero and re-populate `final_clusters`
// from that assignment. Returns `symbols[i] = final cluster index for
// tile i` and the compacted final `HistogramSet`.
pub fn remap(original: &HistogramSet, final_clusters: &HistogramSet) -> (Vec<u32>, HistogramSet) {
  let (compacted, _mapping) = compact(final_clusters);
  let n = original.len();
  let mut symbols = vec![0u32; n];
  let mut last_assignment = 0u32;

  for i in 0..n {
    match original.get(i) {
      Some(tile) => {
        let mut best_idx = 0usize;
        let mut best_added_cost = i64::MAX;
        for (cidx, cluster) in compacted.iter_present() {
          let mut combined = Histogram::combined(cluster, tile);
          combined.estimate_bit_cost();
          let added = combined.bit_cost - cluster.bit_cost;
          if added < best_added_cost {
            best_added_cost = added;
            best_idx = cidx;
          }
        }
        symbols[i] = best_idx as u32;
        last_assignment = best_idx as u32;
      }
      None => {
        // Absent tiles adopt the previous tile's assignment (section 4.9).
        symbols[i] = last_assignment;
      }
    }
  }

  // Zero every final cluster, then re-add each original tile into its
  // assigned cluster; these are the counts actually written to output.
  let mut rebuilt = HistogramSet::new(0);
  for (idx, cluster) in compacted.iter_present() {
    rebuilt.grow_to(idx + 1);
    rebuilt.set(idx, Histogram::new(cluster.palette_code_bits()));
  }

  for i in 0..n {
    if let Some(tile) = original.get(i) {
      let cidx = symbols[i] as usize;
      let mut cluster = rebuilt.get(cidx).unwrap().clone();
      cluster.add(tile);
      rebuilt.set(cidx, cluster);
    }
  }

  for (idx, _) in rebuilt.iter_present().map(|(i, h)| (i, h.clone())).collect::<Vec<_>>() {
    let mut h = rebuilt.get(idx).unwrap().clone();
    h.estimate_bit_cost();
    h.recompute_trivial_symbol();
    rebuilt.set(idx, h);
  }

  (symbols, rebuilt)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backward_ref::BackwardRef;

  fn tile(argb: u32) -> Histogram {
    let mut h = Histogram::new(0);
    for _ in 0..8 {
      h.add_symbol(BackwardRef::literal(argb));
    }
    h.estimate_bit_cost();
    h.recompute_trivial_symbol();
    h
  }

  #[test]
  fn every_tile_gets_a_valid_final_cluster_index() {
    let mut original = HistogramSet::new(5);
    for i in 0..5 {
      original.set(i, tile(0xFF102030));
    }
    let mut final_clusters = HistogramSet::new(1);
    let mut merged = Histogram::new(0);
    for i in 0..5 {
      merged.add(original.get(i).unwrap());
    }
    merged.estimate_bit_cost();
    final_clusters.set(0, merged);

    let (symbols, rebuilt) = remap(&original, &final_clusters);
    assert_eq!(symbols, vec![0, 0, 0, 0, 0]);
    assert_eq!(rebuilt.iter_present().count(), 1);
  }

  #[test]
  fn absent_tiles_inherit_the_previous_tiles_assignment() {
    let mut original = HistogramSet::new(3);
    original.set(0, tile(0xFF102030));
    // slot 1 stays absent
    original.set(2, tile(0xFF102030));

    let mut final_clusters = HistogramSet::new(1);
    final_clusters.set(0, tile(0xFF102030));

    let (symbols, _rebuilt) = remap(&original, &final_clusters);
    assert_eq!(symbols[1], symbols[0]);
  }
}
