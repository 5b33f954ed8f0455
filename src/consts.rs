// Shared constants for the VP8 reconstruction core (C1-C4) and the
// lossless histogram clusterer (C5-C9).

// --- VP8 frame reconstruction ---

pub const NUM_MB_SEGMENTS: usize = 4;

// Minimum frame width (in pixels) at which the row pipeline is allowed to
// request threading (boundary scenario 3).
pub const MIN_WIDTH_FOR_THREADS: usize = 512;

// Neutral border-fill values used by PrepareTopLeft (section 4.1).
pub const TOP_SAMPLE_FILL: u8 = 127;
pub const LEFT_SAMPLE_FILL: u8 = 129;

// --- Lossless histogram clustering ---

pub const NUM_LITERAL_CODES: usize = 256;
pub const NUM_LENGTH_CODES: usize = 24;
pub const NUM_DISTANCE_CODES: usize = 40;

// Sentinel meaning "no single ARGB value dominates this histogram"
// (section 3, Histogram, `trivial_symbol`).
pub const NON_TRIVIAL: u32 = 0xFFFF_FFFF;

// Entropy-bin pre-pass geometry (section 4.6).
pub const NUM_PARTITIONS: usize = 4;
pub const BIN_SIZE: usize = NUM_PARTITIONS * NUM_PARTITIONS * NUM_PARTITIONS;
pub const BIN_SIZE_LOW_EFFORT: usize = NUM_PARTITIONS;
pub const MAX_BIN_REJECTIONS: u32 = 32;

// Stochastic clusterer (section 4.7).
pub const STOCHASTIC_QUEUE_SIZE: usize = 9;
pub const LEHMER_MULTIPLIER: u64 = 48271;
pub const LEHMER_MODULUS: u64 = 0x7FFF_FFFF; // 2^31 - 1

// Greedy clusterer ramp cap (section 4.8).
pub const MAX_MIN_CLUSTER_SIZE: usize = 100;

// Bias subtracted from FinalHuffmanCost to account for partial code-length
// headers (section 4.5). The spec gives this as "9.1" bits; we keep one
// decimal digit of fixed point here and scale into LOG_2_PRECISION_BITS
// inside histogram.rs.
pub const HUFFMAN_COST_BIAS_X10: i64 = 91;
