// Macroblock mode and motion-vector decoding (§4.4): segment id, skip flag,
// intra/inter 16x16 mode, B_PRED/SPLITMV sub-block modes and MVs, and the
// near-MV search with sign-bias correction.

use crate::bool_decoder::BoolDecoder;
use crate::enums::{PredictionMode, ReferenceFrame, SplitMvPartitioning, SubBlockMode};
use crate::error::Result;
use crate::headers::{EntropyHeader, SegmentHeader};
use crate::mb_info::{MbInfo, MbInfoGrid, MotionVector, SubBlockInfo};
use crate::tables;

#[derive(Clone, Copy)]
pub struct MvClampRect {
  pub to_left: i32,
  pub to_right: i32,
  pub to_top: i32,
  pub to_bottom: i32,
}

fn clamp_mv(raw: MotionVector, bounds: &MvClampRect) -> MotionVector {
  let mut x = raw.x as i32;
  let mut y = raw.y as i32;
  x = x.max(bounds.to_left);
  x = x.min(bounds.to_right);
  y = y.max(bounds.to_top);
  y = y.min(bounds.to_bottom);
  MotionVector { x: x as i16, y: y as i16 }
}

fn read_segment_id(br: &mut BoolDecoder, seg: &SegmentHeader) -> u8 {
  if br.get(seg.tree_probs[0]) != 0 {
    2 + br.get(seg.tree_probs[2]) as u8
  } else {
    br.get(seg.tree_probs[1]) as u8
  }
}

fn mode_from_16x16(mode: PredictionMode) -> SubBlockMode {
  match mode {
    PredictionMode::DcPred => SubBlockMode::BDcPred,
    PredictionMode::VPred => SubBlockMode::BVePred,
    PredictionMode::HPred => SubBlockMode::BHePred,
    PredictionMode::TmPred => SubBlockMode::BTmPred,
    _ => unreachable!("non-intra y_mode has no above/left sub-block mode"),
  }
}

fn above_block_mode(this: &MbInfo, above: &MbInfo, b: usize) -> SubBlockMode {
  if b < 4 {
    if above.y_mode == PredictionMode::BPred {
      match above.sub {
        SubBlockInfo::Modes(modes) => modes[b + 12],
        SubBlockInfo::MotionVectors(_) => unreachable!("B_PRED mb must carry sub-block modes"),
      }
    } else {
      mode_from_16x16(above.y_mode)
    }
  } else {
    match this.sub {
      SubBlockInfo::Modes(modes) => modes[b - 4],
      SubBlockInfo::MotionVectors(_) => unreachable!("in-progress kf mb carries sub-block modes"),
    }
  }
}

fn left_block_mode(this: &MbInfo, left: &MbInfo, b: usize) -> SubBlockMode {
  if b & 3 == 0 {
    if left.y_mode == PredictionMode::BPred {
      match left.sub {
        SubBlockInfo::Modes(modes) => modes[b + 3],
        SubBlockInfo::MotionVectors(_) => unreachable!("B_PRED mb must carry sub-block modes"),
      }
    } else {
      mode_from_16x16(left.y_mode)
    }
  } else {
    match this.sub {
      SubBlockInfo::Modes(modes) => modes[b - 1],
      SubBlockInfo::MotionVectors(_) => unreachable!("in-progress kf mb carries sub-block modes"),
    }
  }
}

/// Decode a keyframe macroblock's 16x16/B_PRED luma mode plus chroma mode
/// (§4.4). Keyframe sub-block modes condition on the above/left neighbor's
/// own sub-block mode via `KF_B_MODE_PROBS`.
pub fn decode_kf_mb_mode(this: &mut MbInfo, left: &MbInfo, above: &MbInfo, br: &mut BoolDecoder) -> Result<()> {
  let y_mode = PredictionMode::from_i32(br.read_tree(&tables::KF_YMODE_TREE, &tables::KF_YMODE_PROBS))?;

  if y_mode == PredictionMode::BPred {
    let mut modes = [SubBlockMode::BDcPred; 16];
    for i in 0..16 {
      let a = above_block_mode(this, above, i);
      let l = left_block_mode(this, left, i);
      let probs = &tables::KF_B_MODE_PROBS[a as usize][l as usize];
      modes[i] = SubBlockMode::from_i32(br.read_tree(&tables::B_MODE_TREE, probs))?;
      this.sub = SubBlockInfo::Modes(modes);
    }
  }

  let uv_mode = PredictionMode::from_i32(br.read_tree(&tables::UV_MODE_TREE, &tables::KF_UV_MODE_PROBS))?;

  this.y_mode = y_mode;
  this.uv_mode = uv_mode;
  this.mv = MotionVector::ZERO;
  this.ref_frame = ReferenceFrame::Current;
  Ok(())
}

/// Decode an inter-frame macroblock's intra mode: like `decode_kf_mb_mode`
/// but with bitstream-transmitted probabilities and no above/left context.
pub fn decode_intra_mb_mode(this: &mut MbInfo, hdr: &EntropyHeader, br: &mut BoolDecoder) -> Result<()> {
  let y_mode = PredictionMode::from_i32(br.read_tree(&tables::YMODE_TREE, &hdr.y_mode_probs))?;

  if y_mode == PredictionMode::BPred {
    let mut modes = [SubBlockMode::BDcPred; 16];
    for m in modes.iter_mut() {
      *m = SubBlockMode::from_i32(br.read_tree(&tables::B_MODE_TREE, &tables::DEFAULT_B_MODE_PROBS))?;
    }
    this.sub = SubBlockInfo::Modes(modes);
  }

  let uv_mode = PredictionMode::from_i32(br.read_tree(&tables::UV_MODE_TREE, &hdr.uv_mode_probs))?;

  this.y_mode = y_mode;
  this.uv_mode = uv_mode;
  this.mv = MotionVector::ZERO;
  this.ref_frame = ReferenceFrame::Current;
  Ok(())
}

fn read_mv_component(br: &mut BoolDecoder, mvc: &[u8; 19]) -> i16 {
  const IS_SHORT: usize = 0;
  const SIGN: usize = 1;
  const SHORT: usize = 2;
  const BITS: usize = SHORT + 8 - 1;
  const LONG_WIDTH: i32 = 10;

  let mut x: i32 = 0;

  if br.get(mvc[IS_SHORT]) != 0 {
    for i in 0..3 {
      x += (br.get(mvc[BITS + i]) as i32) << i;
    }
    for i in (4..LONG_WIDTH as usize).rev() {
      x += (br.get(mvc[BITS + i]) as i32) << i;
    }
    if (x & 0xFFF0) == 0 || br.get(mvc[BITS + 3]) != 0 {
      x += 8;
    }
  } else {
    x = br.read_tree(&tables::SHORT_MV_TREE, &mvc[SHORT..SHORT + 7]);
  }

  if x != 0 && br.get(mvc[SIGN]) != 0 {
    x = -x;
  }

  (x << 1) as i16
}

fn read_mv(br: &mut BoolDecoder, mvc: &[[u8; 19]; 2]) -> MotionVector {
  let y = read_mv_component(br, &mvc[0]);
  let x = read_mv_component(br, &mvc[1]);
  MotionVector { x, y }
}

fn above_block_mv(this: &MbInfo, above: &MbInfo, b: usize) -> MotionVector {
  if b < 4 {
    if above.y_mode == PredictionMode::SplitMv {
      match above.sub {
        SubBlockInfo::MotionVectors(mvs) => mvs[b + 12],
        SubBlockInfo::Modes(_) => unreachable!("SPLITMV mb must carry sub-block mvs"),
      }
    } else {
      above.mv
    }
  } else {
    match this.sub {
      SubBlockInfo::MotionVectors(mvs) => mvs[b - 4],
      SubBlockInfo::Modes(_) => unreachable!("in-progress splitmv mb carries sub-block mvs"),
    }
  }
}

fn left_block_mv(this: &MbInfo, left: &MbInfo, b: usize) -> MotionVector {
  if b & 3 == 0 {
    if left.y_mode == PredictionMode::SplitMv {
      match left.sub {
        SubBlockInfo::MotionVectors(mvs) => mvs[b + 3],
        SubBlockInfo::Modes(_) => unreachable!("SPLITMV mb must carry sub-block mvs"),
      }
    } else {
      left.mv
    }
  } else {
    match this.sub {
      SubBlockInfo::MotionVectors(mvs) => mvs[b - 1],
      SubBlockInfo::Modes(_) => unreachable!("in-progress splitmv mb carries sub-block mvs"),
    }
  }
}

fn submv_ref(br: &mut BoolDecoder, l: MotionVector, a: MotionVector) -> Result<SubBlockMode> {
  let lez = l.is_zero();
  let aez = a.is_zero();
  let lea = l == a;

  let ctx = if lea && lez {
    4
  } else if lea {
    3
  } else if aez {
    2
  } else if lez {
    1
  } else {
    0
  };

  SubBlockMode::from_i32(br.read_tree(&tables::SUBMV_REF_TREE, &tables::SUBMV_REF_PROBS2[ctx]))
}

fn mv_bias(src_ref: ReferenceFrame, sign_bias: [bool; 4], dst_ref: ReferenceFrame, mv: MotionVector) -> MotionVector {
  if sign_bias[src_ref as usize] ^ sign_bias[dst_ref as usize] {
    MotionVector { x: -mv.x, y: -mv.y }
  } else {
    mv
  }
}

/// Near-MV search over above/left/above-left neighbors (§4.4's supplement):
/// returns `(near_mvs, counts)` where index 0 holds the eventual "best" MV.
fn find_near_mvs(
  this: &MbInfo,
  left: &MbInfo,
  above: &MbInfo,
  above_left: &MbInfo,
  sign_bias: [bool; 4],
) -> ([MotionVector; 4], [i32; 4]) {
  let mut mv = [MotionVector::ZERO; 4];
  let mut cnt = [0i32; 4];
  let mut slot = 0usize;

  if above.ref_frame != ReferenceFrame::Current {
    if !above.mv.is_zero() {
      slot += 1;
      mv[slot] = mv_bias(above.ref_frame, sign_bias, this.ref_frame, above.mv);
      cnt[slot] += 2;
    } else {
      cnt[0] += 2;
    }
  }

  if left.ref_frame != ReferenceFrame::Current {
    if !left.mv.is_zero() {
      let this_mv = mv_bias(left.ref_frame, sign_bias, this.ref_frame, left.mv);
      if this_mv != mv[slot] {
        slot += 1;
        mv[slot] = this_mv;
      }
      cnt[slot] += 2;
    } else {
      cnt[0] += 2;
    }
  }

  if above_left.ref_frame != ReferenceFrame::Current {
    if !above_left.mv.is_zero() {
      let this_mv = mv_bias(above_left.ref_frame, sign_bias, this.ref_frame, above_left.mv);
      if this_mv != mv[slot] {
        slot += 1;
        mv[slot] = this_mv;
      }
      cnt[slot] += 1;
    } else {
      cnt[0] += 1;
    }
  }

  if cnt[3] != 0 && mv[slot] == mv[1] {
    cnt[1] += 1;
  }

  cnt[3] = (above.y_mode == PredictionMode::SplitMv) as i32 * 2
    + (left.y_mode == PredictionMode::SplitMv) as i32 * 2
    + (above_left.y_mode == PredictionMode::SplitMv) as i32;

  if cnt[2] > cnt[1] {
    cnt.swap(1, 2);
    mv.swap(1, 2);
  }

  if cnt[1] >= cnt[0] {
    mv[0] = mv[1];
  }

  (mv, cnt)
}

#[allow(clippy::too_many_arguments)]
fn decode_split_mv(
  this: &mut MbInfo,
  left: &MbInfo,
  above: &MbInfo,
  mv_probs: &[[u8; 19]; 2],
  best_mv: MotionVector,
  br: &mut BoolDecoder,
) -> Result<()> {
  let partitioning = SplitMvPartitioning::from_u32(
    br.read_tree(&tables::SPLIT_MV_PARTITIONING_TREE, &tables::SPLIT_MV_PARTITIONING_PROBS) as u32,
  )?;
  this.partitioning = partitioning;
  let partition = &tables::MV_PARTITIONS[partitioning as usize];

  let mut mvs = [MotionVector::ZERO; 16];
  this.sub = SubBlockInfo::MotionVectors(mvs);

  for part in 0..partitioning.num_partitions() as u8 {
    let k = partition.iter().position(|&p| p == part).unwrap();

    let left_mv = left_block_mv(this, left, k);
    let above_mv = above_block_mv(this, above, k);
    let mode = submv_ref(br, left_mv, above_mv)?;

    let mv = match mode {
      SubBlockMode::Left4x4 => left_mv,
      SubBlockMode::Above4x4 => above_mv,
      SubBlockMode::Zero4x4 => MotionVector::ZERO,
      SubBlockMode::New4x4 => {
        let delta = read_mv(br, mv_probs);
        MotionVector { x: delta.x + best_mv.x, y: delta.y + best_mv.y }
      }
      _ => return Err(crate::error::DecodeError::internal("invalid sub-block mv mode")),
    };

    for (k2, &p2) in partition.iter().enumerate() {
      if p2 == part {
        mvs[k2] = mv;
      }
    }
    this.sub = SubBlockInfo::MotionVectors(mvs);
  }

  Ok(())
}

fn need_mc_border(mv: MotionVector, l: i32, t: i32, b_w: i32, w: i32, h: i32) -> bool {
  let l = l + (mv.x as i32 >> 3);
  let t = t + (mv.y as i32 >> 3);
  let r = w - (l + b_w);
  let b = h - (t + b_w);

  l >> 1 < 2 || r >> 1 < 3 || t >> 1 < 2 || b >> 1 < 3
}

#[allow(clippy::too_many_arguments)]
fn decode_mvs(
  this: &mut MbInfo,
  left: &MbInfo,
  above: &MbInfo,
  above_left: &MbInfo,
  entropy_hdr: &EntropyHeader,
  sign_bias: [bool; 4],
  bounds: &MvClampRect,
  mb_cols: usize,
  mb_rows: usize,
  br: &mut BoolDecoder,
) -> Result<()> {
  this.ref_frame = if br.get(entropy_hdr.prob_last) != 0 {
    if br.get(entropy_hdr.prob_gf) != 0 {
      ReferenceFrame::AltRef
    } else {
      ReferenceFrame::Golden
    }
  } else {
    ReferenceFrame::Last
  };

  let (near_mvs, cnt) = find_near_mvs(this, left, above, above_left, sign_bias);
  let probs = [
    tables::MV_COUNTS_TO_PROBS[cnt[0] as usize][0],
    tables::MV_COUNTS_TO_PROBS[cnt[1] as usize][1],
    tables::MV_COUNTS_TO_PROBS[cnt[2] as usize][2],
    tables::MV_COUNTS_TO_PROBS[cnt[3] as usize][3],
  ];

  this.y_mode = PredictionMode::from_i32(br.read_tree(&tables::MV_REF_TREE, &probs))?;
  this.uv_mode = this.y_mode;
  this.need_mc_border = false;

  let x = (-bounds.to_left - 128) >> 3;
  let y = (-bounds.to_top - 128) >> 3;
  let w = (mb_cols * 16) as i32;
  let h = (mb_rows * 16) as i32;

  match this.y_mode {
    PredictionMode::NearestMv => {
      this.mv = clamp_mv(near_mvs[1], bounds);
    }
    PredictionMode::NearMv => {
      this.mv = clamp_mv(near_mvs[2], bounds);
    }
    PredictionMode::ZeroMv => {
      this.mv = MotionVector::ZERO;
      return Ok(());
    }
    PredictionMode::NewMv => {
      let clamped_best = clamp_mv(near_mvs[0], bounds);
      let delta = read_mv(br, &entropy_hdr.mv_probs);
      this.mv = MotionVector { x: delta.x + clamped_best.x, y: delta.y + clamped_best.y };
    }
    PredictionMode::SplitMv => {
      let clamped_best = clamp_mv(near_mvs[0], bounds);
      decode_split_mv(this, left, above, &entropy_hdr.mv_probs, clamped_best, br)?;
      let mvs = match this.sub {
        SubBlockInfo::MotionVectors(mvs) => mvs,
        _ => unreachable!(),
      };
      this.mv = mvs[15];

      let mut chroma_mv = [MotionVector::ZERO; 4];
      for b in 0..16 {
        let slot = ((b >> 1) & 1) + ((b >> 2) & 2);
        chroma_mv[slot].x += mvs[b].x;
        chroma_mv[slot].y += mvs[b].y;

        if need_mc_border(mvs[b], x + (b as i32 & 3) * 4, y + (b as i32 & !3), 4, w, h) {
          this.need_mc_border = true;
        }
      }

      for (b, c) in chroma_mv.iter_mut().enumerate() {
        c.x += 4 + 8 * ((c.x as i32) >> 31) as i16;
        c.y += 4 + 8 * ((c.y as i32) >> 31) as i16;
        c.x /= 4;
        c.y /= 4;

        if need_mc_border(*c, x + (b as i32 & 1) * 8, y + (b as i32 >> 1) * 8, 16, w, h) {
          this.need_mc_border = true;
        }
      }
      return Ok(());
    }
    _ => return Err(crate::error::DecodeError::internal("invalid inter mv_ref mode")),
  }

  if need_mc_border(this.mv, x, y, 16, w, h) {
    this.need_mc_border = true;
  }
  Ok(())
}

/// Decode one macroblock row's modes/MVs (§4.4), mirroring
/// `vp8_dixie_modemv_process_row`'s column loop and per-row clamp bounds.
#[allow(clippy::too_many_arguments)]
pub fn decode_mode_row(
  grid: &mut MbInfoGrid,
  row: usize,
  segment_hdr: &SegmentHeader,
  entropy_hdr: &EntropyHeader,
  sign_bias: [bool; 4],
  is_keyframe: bool,
  br: &mut BoolDecoder,
) -> Result<()> {
  let mb_cols = grid.mb_cols();
  let mb_rows = grid.mb_rows();
  let mut bounds = MvClampRect {
    to_left: -(1 << 7),
    to_right: (mb_cols as i32) << 7,
    to_top: -((row as i32 + 1) << 7),
    to_bottom: (mb_rows as i32 - row as i32) << 7,
  };

  for col in 0..mb_cols {
    let left = grid.at(row as isize, col as isize - 1).clone();
    let above = grid.at(row as isize - 1, col as isize).clone();
    let above_left = grid.at(row as isize - 1, col as isize - 1).clone();

    let this = grid.at_mut(row as isize, col as isize);

    if segment_hdr.update_map {
      this.segment_id = read_segment_id(br, segment_hdr);
    }

    if entropy_hdr.coeff_skip_enabled {
      this.skip_coeff = br.get(entropy_hdr.coeff_skip_prob) != 0;
    }

    if is_keyframe {
      if !segment_hdr.update_map {
        this.segment_id = 0;
      }
      decode_kf_mb_mode(this, &left, &above, br)?;
    } else if br.get(entropy_hdr.prob_inter) != 0 {
      decode_mvs(this, &left, &above, &above_left, entropy_hdr, sign_bias, &bounds, mb_cols, mb_rows, br)?;
      bounds.to_left -= 16 << 3;
      bounds.to_right -= 16 << 3;
    } else {
      decode_intra_mb_mode(this, entropy_hdr, br)?;
      bounds.to_left -= 16 << 3;
      bounds.to_right -= 16 << 3;
    }
  }

  Ok(())
}
