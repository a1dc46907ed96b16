use thiserror::Error;

/// Unified failure type returned by every fallible operation in the decoder.
#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("corrupt frame: {0}")]
  CorruptFrame(String),

  #[error("unsupported bitstream: {0}")]
  UnsupportedBitstream(String),

  #[error("memory error: {0}")]
  MemoryError(String),

  #[error("internal logic error: {0}")]
  InternalLogic(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

impl DecodeError {
  pub fn corrupt(msg: impl Into<String>) -> Self {
    let err = DecodeError::CorruptFrame(msg.into());
    log::warn!("{err}");
    err
  }

  pub fn unsupported(msg: impl Into<String>) -> Self {
    let err = DecodeError::UnsupportedBitstream(msg.into());
    log::warn!("{err}");
    err
  }

  pub fn memory(msg: impl Into<String>) -> Self {
    let err = DecodeError::MemoryError(msg.into());
    log::warn!("{err}");
    err
  }

  pub fn internal(msg: impl Into<String>) -> Self {
    let err = DecodeError::InternalLogic(msg.into());
    log::warn!("{err}");
    err
  }
}
