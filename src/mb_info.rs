// Macroblock info grid (§3, §9 "mutable grid with border"): a flat
// row-major buffer of `(mb_cols+1) x (mb_rows+1)` records addressed by
// integer indices, replacing the reference decoder's pointer-to-pointer
// grid. Row -1 / column -1 are synthetic border neighbors, zero-initialized
// so edge macroblocks see well-defined "above"/"left" context.

use crate::enums::{PredictionMode, ReferenceFrame, SplitMvPartitioning, SubBlockMode};

#[derive(Clone, Copy, Debug)]
pub struct MotionVector {
  pub x: i16,
  pub y: i16,
}

impl MotionVector {
  pub const ZERO: MotionVector = MotionVector { x: 0, y: 0 };

  pub fn is_zero(self) -> bool {
    self.x == 0 && self.y == 0
  }
}

impl PartialEq for MotionVector {
  fn eq(&self, other: &Self) -> bool {
    self.x == other.x && self.y == other.y
  }
}

#[derive(Clone, Copy)]
pub enum SubBlockInfo {
  Modes([SubBlockMode; 16]),
  MotionVectors([MotionVector; 16]),
}

#[derive(Clone)]
pub struct MbInfo {
  pub y_mode: PredictionMode,
  pub uv_mode: PredictionMode,
  pub segment_id: u8,
  pub ref_frame: ReferenceFrame,
  pub skip_coeff: bool,
  pub need_mc_border: bool,
  pub partitioning: SplitMvPartitioning,
  pub mv: MotionVector,
  pub eob_mask: u32,
  pub sub: SubBlockInfo,
}

impl Default for MbInfo {
  fn default() -> Self {
    MbInfo {
      y_mode: PredictionMode::DcPred,
      uv_mode: PredictionMode::DcPred,
      segment_id: 0,
      ref_frame: ReferenceFrame::Current,
      skip_coeff: false,
      need_mc_border: false,
      partitioning: SplitMvPartitioning::Split16x8,
      mv: MotionVector::ZERO,
      eob_mask: 0,
      sub: SubBlockInfo::Modes([SubBlockMode::BDcPred; 16]),
    }
  }
}

/// `(mb_cols+1) x (mb_rows+1)` grid with an implicit border row/column at
/// index -1, stored by offsetting every access by +1 (§3's invariant).
pub struct MbInfoGrid {
  cols: usize,
  rows: usize,
  cells: Vec<MbInfo>,
}

impl MbInfoGrid {
  pub fn new(mb_cols: usize, mb_rows: usize) -> Self {
    let cols = mb_cols + 1;
    let rows = mb_rows + 1;
    let cells = vec![MbInfo::default(); cols * rows];
    MbInfoGrid { cols, rows, cells }
  }

  pub fn mb_cols(&self) -> usize {
    self.cols - 1
  }

  pub fn mb_rows(&self) -> usize {
    self.rows - 1
  }

  /// Reset the border row/column to defaults; called once per frame since
  /// they must never carry state from a previous frame's edge MBs.
  pub fn reset_borders(&mut self) {
    for col in 0..self.cols {
      *self.at_mut(-1, col as isize - 1) = MbInfo::default();
    }
    for row in 0..self.rows {
      *self.at_mut(row as isize - 1, -1) = MbInfo::default();
    }
  }

  #[inline]
  fn index(&self, row: isize, col: isize) -> usize {
    let r = (row + 1) as usize;
    let c = (col + 1) as usize;
    r * self.cols + c
  }

  #[inline]
  pub fn at(&self, row: isize, col: isize) -> &MbInfo {
    &self.cells[self.index(row, col)]
  }

  #[inline]
  pub fn at_mut(&mut self, row: isize, col: isize) -> &mut MbInfo {
    let idx = self.index(row, col);
    &mut self.cells[idx]
  }
}
