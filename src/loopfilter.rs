// In-loop deblocking filter (§4.8): normal and simple variants, applied to
// already-reconstructed macroblock edges in raster order. Filter strength is
// derived per macroblock from the loop filter header, segmentation and
// per-reference/per-mode deltas; the sub-block edges are only filtered when
// the macroblock actually produced nonzero residual -- that decision reads
// `MbInfo::eob_mask`, not the bitstream's `skip_coeff` flag, since `skip_coeff`
// can be false while every token still decodes to end-of-block.

use crate::enums::{PredictionMode, ReferenceFrame};
use crate::frame::{Frame, Plane};
use crate::headers::{LoopfilterHeader, SegmentHeader};
use crate::mb_info::MbInfo;

fn saturate_i8(x: i32) -> i32 {
  x.clamp(-128, 127)
}

fn saturate_u8(x: i32) -> u8 {
  x.clamp(0, 255) as u8
}

struct EdgeParams {
  edge_limit: i32,
  interior_limit: i32,
  hev_threshold: i32,
}

/// Filter level, interior limit and high-edge-variance threshold for one
/// macroblock (§4.8), folding in segmentation and reference/mode deltas.
fn calculate_filter_parameters(lf: &LoopfilterHeader, seg: &SegmentHeader, mbi: &MbInfo, is_keyframe: bool) -> EdgeParams {
  let mut level = lf.level as i32;

  if seg.enabled {
    if seg.abs_values {
      level = seg.lf_level[mbi.segment_id as usize];
    } else {
      level += seg.lf_level[mbi.segment_id as usize];
    }
  }

  if lf.delta_enabled {
    level += lf.ref_delta[mbi.ref_frame as usize];

    if mbi.ref_frame == ReferenceFrame::Current {
      if mbi.y_mode == PredictionMode::BPred {
        level += lf.mode_delta[0];
      }
    } else if mbi.y_mode == PredictionMode::ZeroMv {
      level += lf.mode_delta[1];
    } else if mbi.y_mode == PredictionMode::SplitMv {
      level += lf.mode_delta[3];
    } else {
      level += lf.mode_delta[2];
    }
  }

  level = level.clamp(0, 63);

  let mut interior_limit = level;
  if lf.sharpness != 0 {
    interior_limit >>= if lf.sharpness > 4 { 2 } else { 1 };
    interior_limit = interior_limit.min(9 - lf.sharpness as i32);
  }
  interior_limit = interior_limit.max(1);

  let mut hev_threshold = (level >= 15) as i32;
  if level >= 40 {
    hev_threshold += 1;
  }
  if level >= 20 && !is_keyframe {
    hev_threshold += 1;
  }

  EdgeParams { edge_limit: level, interior_limit, hev_threshold }
}

fn high_edge_variance(plane: &Plane, row: isize, col: isize, dr: isize, dc: isize, hev_threshold: i32) -> bool {
  let p1 = plane.get(row - 2 * dr, col - 2 * dc) as i32;
  let p0 = plane.get(row - dr, col - dc) as i32;
  let q0 = plane.get(row, col) as i32;
  let q1 = plane.get(row + dr, col + dc) as i32;
  (p1 - p0).abs() > hev_threshold || (q1 - q0).abs() > hev_threshold
}

fn simple_threshold(plane: &Plane, row: isize, col: isize, dr: isize, dc: isize, filter_limit: i32) -> bool {
  let p1 = plane.get(row - 2 * dr, col - 2 * dc) as i32;
  let p0 = plane.get(row - dr, col - dc) as i32;
  let q0 = plane.get(row, col) as i32;
  let q1 = plane.get(row + dr, col + dc) as i32;
  (p0 - q0).abs() * 2 + ((p1 - q1).abs() >> 1) <= filter_limit
}

fn normal_threshold(plane: &Plane, row: isize, col: isize, dr: isize, dc: isize, edge_limit: i32, interior_limit: i32) -> bool {
  let p3 = plane.get(row - 4 * dr, col - 4 * dc) as i32;
  let p2 = plane.get(row - 3 * dr, col - 3 * dc) as i32;
  let p1 = plane.get(row - 2 * dr, col - 2 * dc) as i32;
  let q1 = plane.get(row + dr, col + dc) as i32;
  let q2 = plane.get(row + 2 * dr, col + 2 * dc) as i32;
  let q3 = plane.get(row + 3 * dr, col + 3 * dc) as i32;

  simple_threshold(plane, row, col, dr, dc, 2 * edge_limit + interior_limit)
    && (p3 - p2).abs() <= interior_limit
    && (p2 - p1).abs() <= interior_limit
    && (q3 - q2).abs() <= interior_limit
    && (q2 - q1).abs() <= interior_limit
}

fn filter_common(plane: &mut Plane, row: isize, col: isize, dr: isize, dc: isize, use_outer_taps: bool) {
  let p1 = plane.get(row - 2 * dr, col - 2 * dc) as i32;
  let p0 = plane.get(row - dr, col - dc) as i32;
  let q0 = plane.get(row, col) as i32;
  let q1 = plane.get(row + dr, col + dc) as i32;

  let mut a = 3 * (q0 - p0);
  if use_outer_taps {
    a += saturate_i8(p1 - q1);
  }
  a = saturate_i8(a);

  let f1 = (if a + 4 > 127 { 127 } else { a + 4 }) >> 3;
  let f2 = (if a + 3 > 127 { 127 } else { a + 3 }) >> 3;

  plane.set(row - dr, col - dc, saturate_u8(p0 + f2));
  plane.set(row, col, saturate_u8(q0 - f1));

  if !use_outer_taps {
    let a = (f1 + 1) >> 1;
    plane.set(row - 2 * dr, col - 2 * dc, saturate_u8(p1 + a));
    plane.set(row + dr, col + dc, saturate_u8(q1 - a));
  }
}

fn filter_mb_edge(plane: &mut Plane, row: isize, col: isize, dr: isize, dc: isize) {
  let p2 = plane.get(row - 3 * dr, col - 3 * dc) as i32;
  let p1 = plane.get(row - 2 * dr, col - 2 * dc) as i32;
  let p0 = plane.get(row - dr, col - dc) as i32;
  let q0 = plane.get(row, col) as i32;
  let q1 = plane.get(row + dr, col + dc) as i32;
  let q2 = plane.get(row + 2 * dr, col + 2 * dc) as i32;

  let w = saturate_i8(saturate_i8(p1 - q1) + 3 * (q0 - p0));

  let a = (27 * w + 63) >> 7;
  plane.set(row - dr, col - dc, saturate_u8(p0 + a));
  plane.set(row, col, saturate_u8(q0 - a));

  let a = (18 * w + 63) >> 7;
  plane.set(row - 2 * dr, col - 2 * dc, saturate_u8(p1 + a));
  plane.set(row + dr, col + dc, saturate_u8(q1 - a));

  let a = (9 * w + 63) >> 7;
  plane.set(row - 3 * dr, col - 3 * dc, saturate_u8(p2 + a));
  plane.set(row + 2 * dr, col + 2 * dc, saturate_u8(q2 - a));
}

#[allow(clippy::too_many_arguments)]
fn filter_mb_edge_line(plane: &mut Plane, row: isize, col: isize, dr: isize, dc: isize, len: isize, edge_limit: i32, interior_limit: i32, hev_threshold: i32) {
  let (sr, sc) = (dc, dr); // step along the edge is perpendicular to the filtered direction
  for i in 0..len {
    let (r, c) = (row + sr * i, col + sc * i);
    if normal_threshold(plane, r, c, dr, dc, edge_limit, interior_limit) {
      if high_edge_variance(plane, r, c, dr, dc, hev_threshold) {
        filter_common(plane, r, c, dr, dc, true);
      } else {
        filter_mb_edge(plane, r, c, dr, dc);
      }
    }
  }
}

#[allow(clippy::too_many_arguments)]
fn filter_subblock_edge_line(plane: &mut Plane, row: isize, col: isize, dr: isize, dc: isize, len: isize, edge_limit: i32, interior_limit: i32, hev_threshold: i32) {
  let (sr, sc) = (dc, dr);
  for i in 0..len {
    let (r, c) = (row + sr * i, col + sc * i);
    if normal_threshold(plane, r, c, dr, dc, edge_limit, interior_limit) {
      let outer = high_edge_variance(plane, r, c, dr, dc, hev_threshold);
      filter_common(plane, r, c, dr, dc, outer);
    }
  }
}

fn filter_edge_simple(plane: &mut Plane, row: isize, col: isize, dr: isize, dc: isize, len: isize, filter_limit: i32) {
  let (sr, sc) = (dc, dr);
  for i in 0..len {
    let (r, c) = (row + sr * i, col + sc * i);
    if simple_threshold(plane, r, c, dr, dc, filter_limit) {
      filter_common(plane, r, c, dr, dc, true);
    }
  }
}

fn needs_subblock_filtering(mbi: &MbInfo) -> bool {
  mbi.eob_mask != 0 || mbi.y_mode == PredictionMode::SplitMv || mbi.y_mode == PredictionMode::BPred
}

fn filter_mb_normal(current: &mut Frame, mbi: &MbInfo, mb_row: usize, mb_col: usize, params: &EdgeParams) {
  let y_row = (mb_row * 16) as isize;
  let y_col = (mb_col * 16) as isize;
  let uv_row = (mb_row * 8) as isize;
  let uv_col = (mb_col * 8) as isize;
  let EdgeParams { edge_limit, interior_limit, hev_threshold } = *params;
  let subblocks = needs_subblock_filtering(mbi);

  if mb_col > 0 {
    filter_mb_edge_line(current.y_mut(), y_row, y_col, 0, 1, 16, edge_limit + 2, interior_limit, hev_threshold);
    filter_mb_edge_line(current.u_mut(), uv_row, uv_col, 0, 1, 8, edge_limit + 2, interior_limit, hev_threshold);
    filter_mb_edge_line(current.v_mut(), uv_row, uv_col, 0, 1, 8, edge_limit + 2, interior_limit, hev_threshold);
  }

  if subblocks {
    for c in [4, 8, 12] {
      filter_subblock_edge_line(current.y_mut(), y_row, y_col + c, 0, 1, 16, edge_limit, interior_limit, hev_threshold);
    }
    filter_subblock_edge_line(current.u_mut(), uv_row, uv_col + 4, 0, 1, 8, edge_limit, interior_limit, hev_threshold);
    filter_subblock_edge_line(current.v_mut(), uv_row, uv_col + 4, 0, 1, 8, edge_limit, interior_limit, hev_threshold);
  }

  if mb_row > 0 {
    filter_mb_edge_line(current.y_mut(), y_row, y_col, 1, 0, 16, edge_limit + 2, interior_limit, hev_threshold);
    filter_mb_edge_line(current.u_mut(), uv_row, uv_col, 1, 0, 8, edge_limit + 2, interior_limit, hev_threshold);
    filter_mb_edge_line(current.v_mut(), uv_row, uv_col, 1, 0, 8, edge_limit + 2, interior_limit, hev_threshold);
  }

  if subblocks {
    for r in [4, 8, 12] {
      filter_subblock_edge_line(current.y_mut(), y_row + r, y_col, 1, 0, 16, edge_limit, interior_limit, hev_threshold);
    }
    filter_subblock_edge_line(current.u_mut(), uv_row + 4, uv_col, 1, 0, 8, edge_limit, interior_limit, hev_threshold);
    filter_subblock_edge_line(current.v_mut(), uv_row + 4, uv_col, 1, 0, 8, edge_limit, interior_limit, hev_threshold);
  }
}

fn filter_mb_simple(current: &mut Frame, mbi: &MbInfo, mb_row: usize, mb_col: usize, params: &EdgeParams) {
  let y_row = (mb_row * 16) as isize;
  let y_col = (mb_col * 16) as isize;
  let EdgeParams { edge_limit, interior_limit, .. } = *params;
  let subblocks = needs_subblock_filtering(mbi);
  let mb_limit = (edge_limit + 2) * 2 + interior_limit;
  let b_limit = edge_limit * 2 + interior_limit;

  if mb_col > 0 {
    filter_edge_simple(current.y_mut(), y_row, y_col, 0, 1, 16, mb_limit);
  }
  if subblocks {
    for c in [4, 8, 12] {
      filter_edge_simple(current.y_mut(), y_row, y_col + c, 0, 1, 16, b_limit);
    }
  }
  if mb_row > 0 {
    filter_edge_simple(current.y_mut(), y_row, y_col, 1, 0, 16, mb_limit);
  }
  if subblocks {
    for r in [4, 8, 12] {
      filter_edge_simple(current.y_mut(), y_row + r, y_col, 1, 0, 16, b_limit);
    }
  }
}

/// Deblock one row of already-reconstructed macroblocks in place (§4.8).
/// Must run after every macroblock in the row (and the row above it) has
/// been fully predicted and IDCT-added, since the filter reads pixels that
/// later macroblocks in the same row would otherwise still be modifying.
pub fn filter_row(current: &mut Frame, mbi_row: &[MbInfo], mb_row: usize, lf: &LoopfilterHeader, seg: &SegmentHeader, is_keyframe: bool) {
  for (mb_col, mbi) in mbi_row.iter().enumerate() {
    let params = calculate_filter_parameters(lf, seg, mbi, is_keyframe);
    if params.edge_limit == 0 {
      continue;
    }
    if lf.use_simple {
      filter_mb_simple(current, mbi, mb_row, mb_col, &params);
    } else {
      filter_mb_normal(current, mbi, mb_row, mb_col, &params);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_filter_level_disables_filtering() {
    let lf = LoopfilterHeader { level: 0, ..Default::default() };
    let seg = SegmentHeader::new();
    let mbi = MbInfo::default();
    let params = calculate_filter_parameters(&lf, &seg, &mbi, true);
    assert_eq!(params.edge_limit, 0);
  }

  #[test]
  fn high_filter_level_raises_hev_threshold_on_interframe() {
    let lf = LoopfilterHeader { level: 40, ..Default::default() };
    let seg = SegmentHeader::new();
    let mbi = MbInfo::default();
    let kf = calculate_filter_parameters(&lf, &seg, &mbi, true);
    let inter = calculate_filter_parameters(&lf, &seg, &mbi, false);
    assert_eq!(kf.hev_threshold, 2);
    assert_eq!(inter.hev_threshold, 3);
  }
}
