// A single contiguous backing allocation that hands out typed sub-slices.
//
// This is the safe-Rust analogue of the C decoder's "one big malloc, carved
// up with pointer arithmetic" approach (Design Notes, section 9): instead of
// raw pointers we hand out `&mut [u8]` windows into one `Vec<u8>`, each
// caller-requested region checked for overflow and for alignment. The
// decoder's various scratch buffers (intra-mode top row, per-column top
// samples, MB info, filter-strength info, per-block scratch, row ring
// cache) are all carved from one `Arena`, reallocated only when a bigger
// frame needs more room (Design Notes, section 5 Resource ownership).

use crate::error::{CoreError, CoreResult};

// VP8/WebP scratch buffers are read in SIMD-sized chunks; round every
// region up to this so no sub-slice straddles a cache line unnecessarily.
pub const CACHE_LINE: usize = 32;

pub struct Arena {
  data: Vec<u8>,
  cursor: usize,
}

impl Arena {
  pub fn with_capacity(capacity: usize) -> Self {
    Self { data: vec![0u8; capacity], cursor: 0 }
  }

  pub fn capacity(&self) -> usize {
    self.data.len()
  }

  fn aligned_len(len: usize) -> CoreResult<usize> {
    let rem = len % CACHE_LINE;
    if rem == 0 {
      Ok(len)
    } else {
      len.checked_add(CACHE_LINE - rem)
        .ok_or_else(|| CoreError::OutOfMemory("arena region length overflow".to_string()))
    }
  }

  // Reserve `len` bytes, growing the backing allocation if required, and
  // return a zeroed mutable window. `len` is overflow-checked against the
  // arena's current cursor before any allocation is attempted.
  pub fn alloc(&mut self, len: usize) -> CoreResult<&mut [u8]> {
    let aligned = Self::aligned_len(len)?;
    let end = self
      .cursor
      .checked_add(aligned)
      .ok_or_else(|| CoreError::OutOfMemory("arena cursor overflow".to_string()))?;

    if end > self.data.len() {
      self
        .data
        .try_reserve(end - self.data.len())
        .map_err(|_| CoreError::OutOfMemory("arena backing allocation failed".to_string()))?;
      self.data.resize(end, 0);
    }

    let start = self.cursor;
    self.cursor = end;
    for b in &mut self.data[start..start + len] {
      *b = 0;
    }
    Ok(&mut self.data[start..start + len])
  }

  // Rewind the cursor so the same backing storage can be reused for the
  // next frame/decode without a fresh allocation, matching the C decoder's
  // "reallocated only when a size increase is required" lifetime.
  pub fn reset(&mut self) {
    self.cursor = 0;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn alloc_rounds_up_to_cache_line() {
    let mut arena = Arena::with_capacity(0);
    let region = arena.alloc(5).unwrap();
    assert_eq!(region.len(), 5);
    assert!(arena.capacity() >= CACHE_LINE);
  }

  #[test]
  fn alloc_overflow_is_out_of_memory() {
    let mut arena = Arena::with_capacity(16);
    let err = arena.alloc(usize::MAX).unwrap_err();
    assert_eq!(err, CoreError::OutOfMemory("arena region length overflow".to_string()));
  }

  #[test]
  fn reset_allows_reuse_without_growth() {
    let mut arena = Arena::with_capacity(0);
    arena.alloc(64).unwrap();
    let cap_after_first = arena.capacity();
    arena.reset();
    arena.alloc(64).unwrap();
    assert_eq!(arena.capacity(), cap_after_first);
  }
}
