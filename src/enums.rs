// Enumerations mirroring the VP8 bitstream's own numeric encodings. Several
// ranges overlap on purpose (e.g. 16x16 and 4x4 prediction modes both start
// at 0) because the bitstream reuses the same small integers in different
// contexts; the overlap is preserved here rather than hidden, since several
// lookup tables are indexed directly by these discriminants.

use crate::error::{DecodeError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceFrame {
  Current = 0,
  Last = 1,
  Golden = 2,
  AltRef = 3,
}

impl ReferenceFrame {
  pub const COUNT: usize = 4;

  /// An out-of-range index here means a tree walk produced a value the
  /// bitstream can't actually encode: a decoder bug, not corrupt input, so
  /// it's reported as `DecodeError::InternalLogic` rather than panicking.
  pub fn from_index(i: usize) -> Result<Self> {
    match i {
      0 => Ok(ReferenceFrame::Current),
      1 => Ok(ReferenceFrame::Last),
      2 => Ok(ReferenceFrame::Golden),
      3 => Ok(ReferenceFrame::AltRef),
      _ => Err(DecodeError::internal(format!("reference frame index {i} out of range"))),
    }
  }
}

/// 16x16 (macroblock) prediction modes, both intra and inter. Numeric values
/// match the bitstream encoding and the order expected by the mode trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictionMode {
  DcPred = 0,
  VPred = 1,
  HPred = 2,
  TmPred = 3,
  BPred = 4,

  NearestMv = 5,
  NearMv = 6,
  ZeroMv = 7,
  NewMv = 8,
  SplitMv = 9,
}

impl PredictionMode {
  /// An out-of-range value means a mode tree was walked with a node index
  /// that doesn't correspond to a real leaf: a decoder bug, reported as
  /// `DecodeError::InternalLogic` rather than a process abort.
  pub fn from_i32(v: i32) -> Result<Self> {
    match v {
      0 => Ok(PredictionMode::DcPred),
      1 => Ok(PredictionMode::VPred),
      2 => Ok(PredictionMode::HPred),
      3 => Ok(PredictionMode::TmPred),
      4 => Ok(PredictionMode::BPred),
      5 => Ok(PredictionMode::NearestMv),
      6 => Ok(PredictionMode::NearMv),
      7 => Ok(PredictionMode::ZeroMv),
      8 => Ok(PredictionMode::NewMv),
      9 => Ok(PredictionMode::SplitMv),
      _ => Err(DecodeError::internal(format!("invalid 16x16 prediction mode {v}"))),
    }
  }

  pub fn is_inter(self) -> bool {
    matches!(
      self,
      PredictionMode::NearestMv
        | PredictionMode::NearMv
        | PredictionMode::ZeroMv
        | PredictionMode::NewMv
        | PredictionMode::SplitMv
    )
  }
}

/// 4x4 (sub-block) prediction modes. Intra sub-modes reuse 0..=9, inter
/// sub-modes reuse a disjoint small range, matching the bitstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubBlockMode {
  BDcPred = 0,
  BTmPred = 1,
  BVePred = 2,
  BHePred = 3,
  BLdPred = 4,
  BRdPred = 5,
  BVrPred = 6,
  BVlPred = 7,
  BHdPred = 8,
  BHuPred = 9,

  Left4x4 = 10,
  Above4x4 = 11,
  Zero4x4 = 12,
  New4x4 = 13,
}

impl SubBlockMode {
  /// See `PredictionMode::from_i32`: an out-of-range value is a decoder bug,
  /// not corrupt input, so it's surfaced as `DecodeError::InternalLogic`.
  pub fn from_i32(v: i32) -> Result<Self> {
    match v {
      0 => Ok(SubBlockMode::BDcPred),
      1 => Ok(SubBlockMode::BTmPred),
      2 => Ok(SubBlockMode::BVePred),
      3 => Ok(SubBlockMode::BHePred),
      4 => Ok(SubBlockMode::BLdPred),
      5 => Ok(SubBlockMode::BRdPred),
      6 => Ok(SubBlockMode::BVrPred),
      7 => Ok(SubBlockMode::BVlPred),
      8 => Ok(SubBlockMode::BHdPred),
      9 => Ok(SubBlockMode::BHuPred),
      10 => Ok(SubBlockMode::Left4x4),
      11 => Ok(SubBlockMode::Above4x4),
      12 => Ok(SubBlockMode::Zero4x4),
      13 => Ok(SubBlockMode::New4x4),
      _ => Err(DecodeError::internal(format!("invalid 4x4 prediction mode {v}"))),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitMvPartitioning {
  Split16x8 = 0,
  Split8x16 = 1,
  Split8x8 = 2,
  Split4x4 = 3,
}

impl SplitMvPartitioning {
  /// See `PredictionMode::from_i32`: an out-of-range value is a decoder bug,
  /// not corrupt input, so it's surfaced as `DecodeError::InternalLogic`.
  pub fn from_u32(v: u32) -> Result<Self> {
    match v {
      0 => Ok(SplitMvPartitioning::Split16x8),
      1 => Ok(SplitMvPartitioning::Split8x16),
      2 => Ok(SplitMvPartitioning::Split8x8),
      3 => Ok(SplitMvPartitioning::Split4x4),
      _ => Err(DecodeError::internal(format!("invalid splitmv partitioning {v}"))),
    }
  }

  pub fn num_partitions(self) -> usize {
    match self {
      SplitMvPartitioning::Split16x8 => 2,
      SplitMvPartitioning::Split8x16 => 2,
      SplitMvPartitioning::Split8x8 => 4,
      SplitMvPartitioning::Split4x4 => 16,
    }
  }
}

/// Coefficient-probability block type: indexes `coeff_probs[type]`. Matches
/// the bitstream's own numbering, which is not the same order as
/// `DequantBlockType` below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoeffBlockType {
  /// Y1 block whose DC (index 0) was supplied by the Y2 pass.
  Y1AfterY2 = 0,
  Y2 = 1,
  Uv = 2,
  /// Y1 block carrying its own DC (B_PRED / SPLITMV, no Y2 block present).
  Y1WithDc = 3,
}

/// Dequantization-factor block type: indexes `dequant_factors.factor[type]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DequantBlockType {
  Y1 = 0,
  Uv = 1,
  Y2 = 2,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn out_of_range_tree_results_report_internal_logic_instead_of_panicking() {
    assert!(matches!(ReferenceFrame::from_index(4), Err(DecodeError::InternalLogic(_))));
    assert!(matches!(PredictionMode::from_i32(10), Err(DecodeError::InternalLogic(_))));
    assert!(matches!(SubBlockMode::from_i32(14), Err(DecodeError::InternalLogic(_))));
    assert!(matches!(SplitMvPartitioning::from_u32(4), Err(DecodeError::InternalLogic(_))));
  }

  #[test]
  fn in_range_tree_results_round_trip() {
    assert_eq!(ReferenceFrame::from_index(2).unwrap(), ReferenceFrame::Golden);
    assert_eq!(PredictionMode::from_i32(9).unwrap(), PredictionMode::SplitMv);
    assert_eq!(SubBlockMode::from_i32(13).unwrap(), SubBlockMode::New4x4);
    assert_eq!(SplitMvPartitioning::from_u32(3).unwrap(), SplitMvPartitioning::Split4x4);
  }
}
