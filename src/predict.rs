// Intra prediction, motion compensation and the per-macroblock
// predict+reconstruct pipeline (§4.6). Ported from the reference decoder's
// pointer-offset predictors onto `Plane`'s bounds-checked border access;
// the `need_mc_border`/emulated-edge split in the reference implementation
// exists to avoid a buffer overrun on plain pointer arithmetic. `Plane`
// already carries a border sized to the maximum clamped motion vector
// range, so both paths collapse to one sampler here: in-bounds reads go
// straight through, reads that could stray past the border edge clamp to
// the nearest visible pixel (§4.6 supplement; `need_mc_border` is kept on
// `MbInfo` purely to pick the cheaper of the two at this call site).

use crate::enums::PredictionMode;
use crate::frame::{Frame, Plane};
use crate::mb_info::{MbInfo, MotionVector, SubBlockInfo};
use crate::transform::{self, idct_add, inverse_walsh_hadamard};

fn block_get(plane: &Plane, row: isize, col: isize) -> [u8; 16] {
  let mut out = [0u8; 16];
  for i in 0..4 {
    for j in 0..4 {
      out[i * 4 + j] = plane.get(row + i as isize, col + j as isize);
    }
  }
  out
}

fn block_set(plane: &mut Plane, row: isize, col: isize, data: &[u8; 16]) {
  for i in 0..4 {
    for j in 0..4 {
      plane.set(row + i as isize, col + j as isize, data[i * 4 + j]);
    }
  }
}

fn idct_add_block(plane: &mut Plane, row: isize, col: isize, coeffs: &[i16; 16]) {
  let predict = block_get(plane, row, col);
  let mut recon = [0u8; 16];
  idct_add(&predict, 4, coeffs, &mut recon, 4);
  block_set(plane, row, col, &recon);
}

// ---------------------------------------------------------------------
// Whole-block (nxn) intra predictors, shared by the 16x16 luma and 8x8
// chroma modes.
// ---------------------------------------------------------------------

fn predict_dc_nxn(plane: &mut Plane, row: isize, col: isize, n: isize) {
  let mut dc = 0i32;
  for i in 0..n {
    dc += plane.get(row + i, col - 1) as i32 + plane.get(row - 1, col + i) as i32;
  }
  let shift = match n {
    16 => 5,
    8 => 4,
    4 => 3,
    _ => unreachable!(),
  };
  let round = 1i32 << (shift - 1);
  dc = (dc + round) >> shift;
  for i in 0..n {
    for j in 0..n {
      plane.set(row + i, col + j, dc as u8);
    }
  }
}

fn predict_v_nxn(plane: &mut Plane, row: isize, col: isize, n: isize) {
  for i in 0..n {
    for j in 0..n {
      plane.set(row + i, col + j, plane.get(row - 1, col + j));
    }
  }
}

fn predict_h_nxn(plane: &mut Plane, row: isize, col: isize, n: isize) {
  for i in 0..n {
    let v = plane.get(row + i, col - 1);
    for j in 0..n {
      plane.set(row + i, col + j, v);
    }
  }
}

fn predict_tm_nxn(plane: &mut Plane, row: isize, col: isize, n: isize) {
  let corner = plane.get(row - 1, col - 1) as i32;
  for i in 0..n {
    let left = plane.get(row + i, col - 1) as i32;
    for j in 0..n {
      let above = plane.get(row - 1, col + j) as i32;
      plane.set(row + i, col + j, transform::clamp_255(left + above - corner));
    }
  }
}

// ---------------------------------------------------------------------
// 4x4 intra sub-block predictors (B_PRED modes).
// ---------------------------------------------------------------------

fn predict_b_ve(plane: &mut Plane, row: isize, col: isize) {
  let a = |i: isize| plane.get(row - 1, col + i);
  let mut out = [0u8; 4];
  for (j, slot) in out.iter_mut().enumerate() {
    let j = j as isize;
    *slot = ((a(j - 1) as i32 + 2 * a(j) as i32 + a(j + 1) as i32 + 2) >> 2) as u8;
  }
  for i in 0..4 {
    for j in 0..4 {
      plane.set(row + i, col + j, out[j as usize]);
    }
  }
}

fn predict_b_he(plane: &mut Plane, row: isize, col: isize) {
  fn l(plane: &Plane, row: isize, col: isize, i: isize) -> u8 {
    plane.get(row + i, col - 1)
  }
  for i in 0..4isize {
    let above = if i == 0 { plane.get(row - 1, col - 1) } else { l(plane, row, col, i - 1) };
    let below = if i == 3 { l(plane, row, col, i) } else { l(plane, row, col, i + 1) };
    let v = ((above as i32 + 2 * l(plane, row, col, i) as i32 + below as i32 + 2) >> 2) as u8;
    for j in 0..4 {
      plane.set(row + i, col + j, v);
    }
  }
}

fn predict_b_ld(plane: &mut Plane, row: isize, col: isize) {
  let a = |i: isize| plane.get(row - 1, col + i);
  let mut avg = [0u8; 7];
  for (k, slot) in avg.iter_mut().enumerate() {
    let k = k as isize;
    let c = if k == 6 { a(7) } else { a(k + 2) };
    *slot = ((a(k) as i32 + 2 * a(k + 1) as i32 + c as i32 + 2) >> 2) as u8;
  }
  for i in 0..4usize {
    for j in 0..4usize {
      plane.set(row + i as isize, col + j as isize, avg[i + j]);
    }
  }
}

fn predict_b_rd(plane: &mut Plane, row: isize, col: isize) {
  let a = |i: isize| plane.get(row - 1, col + i);
  let l = |i: isize| plane.get(row + i, col - 1);
  let mut diag = [0u8; 7];
  diag[0] = ((l(3) as i32 + 2 * l(2) as i32 + l(1) as i32 + 2) >> 2) as u8;
  diag[1] = ((l(2) as i32 + 2 * l(1) as i32 + l(0) as i32 + 2) >> 2) as u8;
  diag[2] = ((l(1) as i32 + 2 * l(0) as i32 + a(-1) as i32 + 2) >> 2) as u8;
  diag[3] = ((l(0) as i32 + 2 * a(-1) as i32 + a(0) as i32 + 2) >> 2) as u8;
  diag[4] = ((a(-1) as i32 + 2 * a(0) as i32 + a(1) as i32 + 2) >> 2) as u8;
  diag[5] = ((a(0) as i32 + 2 * a(1) as i32 + a(2) as i32 + 2) >> 2) as u8;
  diag[6] = ((a(1) as i32 + 2 * a(2) as i32 + a(3) as i32 + 2) >> 2) as u8;
  for i in 0..4usize {
    for j in 0..4usize {
      plane.set(row + i as isize, col + j as isize, diag[3 - i + j]);
    }
  }
}

fn predict_b_vr(plane: &mut Plane, row: isize, col: isize) {
  let a = |i: isize| plane.get(row - 1, col + i);
  let l = |i: isize| plane.get(row + i, col - 1);

  let e0 = ((a(-1) as i32 + a(0) as i32 + 1) >> 1) as u8;
  let e1 = ((a(0) as i32 + a(1) as i32 + 1) >> 1) as u8;
  let e2 = ((a(1) as i32 + a(2) as i32 + 1) >> 1) as u8;
  let e3 = ((a(2) as i32 + a(3) as i32 + 1) >> 1) as u8;

  let f0 = ((l(0) as i32 + 2 * a(-1) as i32 + a(0) as i32 + 2) >> 2) as u8;
  let f1 = ((a(-1) as i32 + 2 * a(0) as i32 + a(1) as i32 + 2) >> 2) as u8;
  let f2 = ((a(0) as i32 + 2 * a(1) as i32 + a(2) as i32 + 2) >> 2) as u8;
  let f3 = ((a(1) as i32 + 2 * a(2) as i32 + a(3) as i32 + 2) >> 2) as u8;

  let g0 = ((l(1) as i32 + 2 * l(0) as i32 + a(-1) as i32 + 2) >> 2) as u8;
  let g1 = ((l(2) as i32 + 2 * l(1) as i32 + l(0) as i32 + 2) >> 2) as u8;

  let rows = [[e0, e1, e2, e3], [f0, f1, f2, f3], [g0, e0, e1, e2], [g1, f0, f1, f2]];
  for (i, r) in rows.iter().enumerate() {
    for (j, &v) in r.iter().enumerate() {
      plane.set(row + i as isize, col + j as isize, v);
    }
  }
}

fn predict_b_vl(plane: &mut Plane, row: isize, col: isize) {
  let a = |i: isize| plane.get(row - 1, col + i);

  let e0 = ((a(0) as i32 + a(1) as i32 + 1) >> 1) as u8;
  let e1 = ((a(1) as i32 + a(2) as i32 + 1) >> 1) as u8;
  let e2 = ((a(2) as i32 + a(3) as i32 + 1) >> 1) as u8;
  let e3 = ((a(3) as i32 + a(4) as i32 + 1) >> 1) as u8;

  let f0 = ((a(0) as i32 + 2 * a(1) as i32 + a(2) as i32 + 2) >> 2) as u8;
  let f1 = ((a(1) as i32 + 2 * a(2) as i32 + a(3) as i32 + 2) >> 2) as u8;
  let f2 = ((a(2) as i32 + 2 * a(3) as i32 + a(4) as i32 + 2) >> 2) as u8;
  let f3 = ((a(3) as i32 + 2 * a(4) as i32 + a(5) as i32 + 2) >> 2) as u8;

  let g0 = ((a(4) as i32 + 2 * a(5) as i32 + a(6) as i32 + 2) >> 2) as u8;
  let g1 = ((a(5) as i32 + 2 * a(6) as i32 + a(7) as i32 + 2) >> 2) as u8;

  let rows = [[e0, e1, e2, e3], [f0, f1, f2, f3], [e1, e2, e3, g0], [f1, f2, f3, g1]];
  for (i, r) in rows.iter().enumerate() {
    for (j, &v) in r.iter().enumerate() {
      plane.set(row + i as isize, col + j as isize, v);
    }
  }
}

fn predict_b_hd(plane: &mut Plane, row: isize, col: isize) {
  let a = |i: isize| plane.get(row - 1, col + i);
  let l = |i: isize| plane.get(row + i, col - 1);

  let p0 = ((l(0) as i32 + a(-1) as i32 + 1) >> 1) as u8;
  let p1 = ((l(0) as i32 + 2 * a(-1) as i32 + a(0) as i32 + 2) >> 2) as u8;
  let p2 = ((a(-1) as i32 + 2 * a(0) as i32 + a(1) as i32 + 2) >> 2) as u8;
  let p3 = ((a(0) as i32 + 2 * a(1) as i32 + a(2) as i32 + 2) >> 2) as u8;

  let p4 = ((l(1) as i32 + l(0) as i32 + 1) >> 1) as u8;
  let p5 = ((l(1) as i32 + 2 * l(0) as i32 + a(-1) as i32 + 2) >> 2) as u8;

  let p6 = ((l(2) as i32 + l(1) as i32 + 1) >> 1) as u8;
  let p7 = ((l(2) as i32 + 2 * l(1) as i32 + l(0) as i32 + 2) >> 2) as u8;

  let p8 = ((l(3) as i32 + l(2) as i32 + 1) >> 1) as u8;
  let p9 = ((l(3) as i32 + 2 * l(2) as i32 + l(1) as i32 + 2) >> 2) as u8;

  let rows = [[p0, p1, p2, p3], [p4, p5, p0, p1], [p6, p7, p4, p5], [p8, p9, p6, p7]];
  for (i, r) in rows.iter().enumerate() {
    for (j, &v) in r.iter().enumerate() {
      plane.set(row + i as isize, col + j as isize, v);
    }
  }
}

fn predict_b_hu(plane: &mut Plane, row: isize, col: isize) {
  let l = |i: isize| plane.get(row + i, col - 1);

  let p0 = ((l(0) as i32 + l(1) as i32 + 1) >> 1) as u8;
  let p1 = ((l(0) as i32 + 2 * l(1) as i32 + l(2) as i32 + 2) >> 2) as u8;
  let p2 = ((l(1) as i32 + l(2) as i32 + 1) >> 1) as u8;
  let p3 = ((l(1) as i32 + 2 * l(2) as i32 + l(3) as i32 + 2) >> 2) as u8;
  let p4 = ((l(2) as i32 + l(3) as i32 + 1) >> 1) as u8;
  let p5 = ((l(2) as i32 + 2 * l(3) as i32 + l(3) as i32 + 2) >> 2) as u8;
  let p6 = l(3);

  let rows = [[p0, p1, p2, p3], [p2, p3, p4, p5], [p4, p5, p6, p6], [p6, p6, p6, p6]];
  for (i, r) in rows.iter().enumerate() {
    for (j, &v) in r.iter().enumerate() {
      plane.set(row + i as isize, col + j as isize, v);
    }
  }
}

/// Replicates the above-right 4 pixels of sub-block 3 into the virtual
/// above-right position of sub-blocks 7, 11 and 15, which otherwise have no
/// real neighbor there (§4.6 supplement, grounded on `predict.c`'s
/// `copy_down`).
fn copy_down(plane: &mut Plane, row: isize, col: isize) {
  let mut src = [0u8; 4];
  for (i, s) in src.iter_mut().enumerate() {
    *s = plane.get(row - 1, col + 16 + i as isize);
  }
  for target_row in [row + 3, row + 7, row + 11] {
    for (i, &v) in src.iter().enumerate() {
      plane.set(target_row, col + 16 + i as isize, v);
    }
  }
}

fn b_pred(plane: &mut Plane, row: isize, col: isize, modes: &[crate::enums::SubBlockMode; 16], coeffs: &[[i16; 16]; 25]) {
  use crate::enums::SubBlockMode::*;

  copy_down(plane, row, col);

  for i in 0..16 {
    let br = row + 4 * (i / 4) as isize;
    let bc = col + 4 * (i % 4) as isize;

    match modes[i] {
      BDcPred => predict_dc_nxn(plane, br, bc, 4),
      BTmPred => predict_tm_nxn(plane, br, bc, 4),
      BVePred => predict_b_ve(plane, br, bc),
      BHePred => predict_b_he(plane, br, bc),
      BLdPred => predict_b_ld(plane, br, bc),
      BRdPred => predict_b_rd(plane, br, bc),
      BVrPred => predict_b_vr(plane, br, bc),
      BVlPred => predict_b_vl(plane, br, bc),
      BHdPred => predict_b_hd(plane, br, bc),
      BHuPred => predict_b_hu(plane, br, bc),
      _ => unreachable!("non-intra sub-block mode in b_pred"),
    }

    idct_add_block(plane, br, bc, &coeffs[i]);
  }
}

/// Injects the Y2 block's inverse-Walsh-Hadamard output as the DC term of
/// each of the 16 Y1 blocks (§4.6/§4.7).
pub fn fixup_dc_coeffs(coeffs: &mut [[i16; 16]; 25]) {
  let y2 = inverse_walsh_hadamard(&coeffs[24]);
  for i in 0..16 {
    coeffs[i][0] = y2[i];
  }
}

/// Predict and reconstruct one intra macroblock's luma plane (§4.6). The
/// caller is responsible for running `fixup_dc_coeffs` first when the
/// macroblock carries a Y2 block (every intra mode except B_PRED).
pub fn predict_intra_luma(plane: &mut Plane, row: isize, col: isize, mbi: &MbInfo, coeffs: &[[i16; 16]; 25]) {
  if mbi.y_mode == PredictionMode::BPred {
    let modes = match mbi.sub {
      SubBlockInfo::Modes(m) => m,
      SubBlockInfo::MotionVectors(_) => unreachable!("B_PRED mb must carry sub-block modes"),
    };
    b_pred(plane, row, col, &modes, coeffs);
    return;
  }

  match mbi.y_mode {
    PredictionMode::DcPred => predict_dc_nxn(plane, row, col, 16),
    PredictionMode::VPred => predict_v_nxn(plane, row, col, 16),
    PredictionMode::HPred => predict_h_nxn(plane, row, col, 16),
    PredictionMode::TmPred => predict_tm_nxn(plane, row, col, 16),
    _ => unreachable!("non-intra y_mode in predict_intra_luma"),
  }

  for i in 0..16 {
    let br = row + 4 * (i / 4) as isize;
    let bc = col + 4 * (i % 4) as isize;
    idct_add_block(plane, br, bc, &coeffs[i]);
  }
}

pub fn predict_intra_chroma(u: &mut Plane, v: &mut Plane, row: isize, col: isize, mbi: &MbInfo, coeffs: &[[i16; 16]; 25]) {
  match mbi.uv_mode {
    PredictionMode::DcPred => {
      predict_dc_nxn(u, row, col, 8);
      predict_dc_nxn(v, row, col, 8);
    }
    PredictionMode::VPred => {
      predict_v_nxn(u, row, col, 8);
      predict_v_nxn(v, row, col, 8);
    }
    PredictionMode::HPred => {
      predict_h_nxn(u, row, col, 8);
      predict_h_nxn(v, row, col, 8);
    }
    PredictionMode::TmPred => {
      predict_tm_nxn(u, row, col, 8);
      predict_tm_nxn(v, row, col, 8);
    }
    _ => unreachable!("non-intra uv_mode"),
  }

  for i in 0..4 {
    let br = row + 4 * (i / 2) as isize;
    let bc = col + 4 * (i % 2) as isize;
    idct_add_block(u, br, bc, &coeffs[16 + i]);
    idct_add_block(v, br, bc, &coeffs[20 + i]);
  }
}

// ---------------------------------------------------------------------
// Inter prediction / motion compensation.
// ---------------------------------------------------------------------

fn sample(plane: &Plane, row: isize, col: isize, clamp: bool) -> i32 {
  if clamp {
    let r = row.clamp(0, plane.height as isize - 1);
    let c = col.clamp(0, plane.width as isize - 1);
    plane.get(r, c) as i32
  } else {
    plane.get(row, col) as i32
  }
}

fn filter_block(plane: &Plane, row: isize, col: isize, mv: MotionVector, filters: &[[i32; 6]; 8], clamp: bool) -> [u8; 16] {
  let mx = (mv.x & 7) as usize;
  let my = (mv.y & 7) as usize;
  let ref_row = row + (mv.y as isize >> 3);
  let ref_col = col + (mv.x as isize >> 3);

  let mut temp = [[0u8; 4]; 9];
  for r in 0..9isize {
    for c in 0..4isize {
      let mut acc = 64i32;
      for k in 0..6isize {
        acc += sample(plane, ref_row - 2 + r, ref_col - 2 + c + k, clamp) * filters[mx][k as usize];
      }
      temp[r as usize][c as usize] = transform::clamp_255(acc >> 7);
    }
  }

  let mut out = [0u8; 16];
  for r in 0..4usize {
    for c in 0..4usize {
      let mut acc = 64i32;
      for k in 0..6usize {
        acc += temp[r + k][c] as i32 * filters[my][k];
      }
      out[r * 4 + c] = transform::clamp_255(acc >> 7);
    }
  }
  out
}

fn recon_block(
  current: &mut Plane,
  reference: &Plane,
  row: isize,
  col: isize,
  mv: MotionVector,
  filters: &[[i32; 6]; 8],
  coeffs: &[i16; 16],
  clamp: bool,
) {
  let predict = filter_block(reference, row, col, mv, filters, clamp);
  let mut recon = [0u8; 16];
  idct_add(&predict, 4, coeffs, &mut recon, 4);
  block_set(current, row, col, &recon);
}

fn round_half(x: i32) -> i32 {
  let bias = if x < 0 { -2 } else { 0 };
  (x + 1 + bias) / 2
}

fn chroma_mv_from_luma(mv: MotionVector, full_pixel: bool) -> MotionVector {
  let mut x = round_half(mv.x as i32) as i16;
  let mut y = round_half(mv.y as i32) as i16;
  if full_pixel {
    x &= !7;
    y &= !7;
  }
  MotionVector { x, y }
}

fn round_sum(x: i32) -> i32 {
  let bias = if x < 0 { -4 } else { 4 };
  (x + bias) / 8
}

fn calculate_chroma_splitmv(mvs: &[MotionVector; 16], b: usize, full_pixel: bool) -> MotionVector {
  let sum_x = mvs[b].x as i32 + mvs[b + 1].x as i32 + mvs[b + 4].x as i32 + mvs[b + 5].x as i32;
  let sum_y = mvs[b].y as i32 + mvs[b + 1].y as i32 + mvs[b + 4].y as i32 + mvs[b + 5].y as i32;
  let mut x = round_sum(sum_x) as i16;
  let mut y = round_sum(sum_y) as i16;
  if full_pixel {
    x &= !7;
    y &= !7;
  }
  MotionVector { x, y }
}

/// Reconstruct one inter macroblock (§4.6): compute per-sub-block motion
/// vectors (whole-MB or SPLITMV), derive chroma MVs, and motion-compensate
/// plus IDCT-add all 24 sub-blocks.
pub fn predict_inter(current: &mut Frame, reference: &Frame, mbi: &MbInfo, coeffs: &[[i16; 16]; 25], mb_row: usize, mb_col: usize, filters: &[[i32; 6]; 8], full_pixel: bool) {
  let y_row = (mb_row * 16) as isize;
  let y_col = (mb_col * 16) as isize;
  let uv_row = (mb_row * 8) as isize;
  let uv_col = (mb_col * 8) as isize;
  let clamp = mbi.need_mc_border;

  let split_mvs = match mbi.sub {
    SubBlockInfo::MotionVectors(mvs) if mbi.y_mode == PredictionMode::SplitMv => Some(mvs),
    _ => None,
  };

  let chroma_mv = if let Some(mvs) = split_mvs {
    [
      calculate_chroma_splitmv(&mvs, 0, full_pixel),
      calculate_chroma_splitmv(&mvs, 2, full_pixel),
      calculate_chroma_splitmv(&mvs, 8, full_pixel),
      calculate_chroma_splitmv(&mvs, 10, full_pixel),
    ]
  } else {
    let uvmv = chroma_mv_from_luma(mbi.mv, full_pixel);
    [uvmv; 4]
  };

  for b in 0..16 {
    let mv = split_mvs.map(|mvs| mvs[b]).unwrap_or(mbi.mv);
    let br = y_row + 4 * (b / 4) as isize;
    let bc = y_col + 4 * (b % 4) as isize;
    recon_block(current.y_mut(), reference.y(), br, bc, mv, filters, &coeffs[b], clamp);
  }

  for b in 0..4 {
    let br = uv_row + 4 * (b / 2) as isize;
    let bc = uv_col + 4 * (b % 2) as isize;
    recon_block(current.u_mut(), reference.u(), br, bc, chroma_mv[b], filters, &coeffs[16 + b], clamp);
    recon_block(current.v_mut(), reference.v(), br, bc, chroma_mv[b], filters, &coeffs[20 + b], clamp);
  }
}

/// Extend the out-of-frame border pixels immediately above and left of the
/// frame so row/column-0 macroblocks' intra predictors see defined values
/// (§4.6 supplement, grounded on `predict.c`'s `fixup_left`/`fixup_above`).
pub fn fixup_left_edge(plane: &mut Plane, mb_row: usize, height: isize, mode: PredictionMode) {
  let origin_row = (mb_row * height as usize) as isize;
  if mode == PredictionMode::DcPred && mb_row > 0 {
    for i in 0..height {
      let v = plane.get(origin_row - 1, i);
      plane.set(origin_row + i, -1, v);
    }
  } else {
    for i in -1..height {
      plane.set(origin_row + i, -1, 129);
    }
  }
}

pub fn fixup_above_edge(plane: &mut Plane, mb_col: usize, width: isize, mode: PredictionMode) {
  let origin_col = (mb_col * width as usize) as isize;
  if mode == PredictionMode::DcPred && mb_col > 0 {
    for i in 0..width {
      let v = plane.get(i, origin_col - 1);
      plane.set(-1, origin_col + i, v);
    }
  } else {
    for i in -1..width {
      plane.set(-1, origin_col + i, 127);
    }
  }
  for i in 0..4 {
    plane.set(-1, origin_col + width + i, 127);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::Frame;

  #[test]
  fn dc_prediction_of_flat_neighbors_is_flat() {
    let mut frame = Frame::new(16, 16);
    for c in 0..16isize {
      frame.y_mut().set(-1, c, 100);
    }
    for r in 0..16isize {
      frame.y_mut().set(r, -1, 100);
    }
    predict_dc_nxn(frame.y_mut(), 0, 0, 16);
    assert_eq!(frame.y().get(5, 5), 100);
  }

  #[test]
  fn vertical_prediction_copies_above_row() {
    let mut frame = Frame::new(8, 8);
    for c in 0..8isize {
      frame.y_mut().set(-1, c, c as u8);
    }
    predict_v_nxn(frame.y_mut(), 0, 0, 8);
    for c in 0..8isize {
      assert_eq!(frame.y().get(3, c), c as u8);
    }
  }
}
