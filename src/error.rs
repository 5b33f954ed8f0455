// Error taxonomy for the codec core (spec ERROR HANDLING DESIGN, section 7).
//
// Memory and bitstream errors are meant to be recorded once on the decoder
// handle and then short-circuit subsequent calls; user aborts unwind without
// ever becoming a `CoreError` (see Vp8Decoder::process_row).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
  #[error("out of memory: {0}")]
  OutOfMemory(String),

  #[error("bitstream error: {0}")]
  BitstreamError(String),

  #[error("invalid parameter: {0}")]
  InvalidParam(String),

  #[error("user aborted decode via put()")]
  UserAbort,
}

pub type CoreResult<T> = Result<T, CoreError>;
