//! A from-scratch VP8 bitstream decoder (RFC 6386).

mod array2d;
pub mod bool_decoder;
pub mod decoder;
pub mod enums;
pub mod error;
pub mod frame;
pub mod headers;
pub mod ivf;
pub mod loopfilter;
pub mod mb_info;
pub mod modemv;
pub mod predict;
pub mod tables;
pub mod tokens;
pub mod transform;
pub mod y4m;

pub use decoder::Vp8Decoder;
pub use error::{DecodeError, Result};
pub use frame::Frame;
