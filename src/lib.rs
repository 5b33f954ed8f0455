// WebP-style codec core: lossy (VP8) frame reconstruction (Core A) and
// lossless histogram clustering (Core B). See SPEC_FULL.md for the full
// component breakdown; each module's doc comment cites the section it
// implements.

pub mod arena;
pub mod array2d;
pub mod backward_ref;
pub mod cluster;
pub mod cluster_greedy;
pub mod cluster_remap;
pub mod cluster_stochastic;
pub mod consts;
pub mod deblock;
pub mod decoder;
pub mod entropy_bins;
pub mod enums;
pub mod error;
pub mod frame;
pub mod histogram;
pub mod io;
pub mod macroblock;
pub mod pipeline;
pub mod predict;
pub mod recon;
pub mod samplecache;
pub mod txfm;
pub mod util;
pub mod worker;

pub use cluster::{get_histo_image_symbols, ClusterConfig};
pub use decoder::Vp8Decoder;
pub use error::{CoreError, CoreResult};
