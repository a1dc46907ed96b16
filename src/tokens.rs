// Token (residual coefficient) decoder (§4.5). The reference decoder uses
// goto-threaded state transitions through its decode loop; this follows the
// design note in §9 and expresses the same state machine as a plain
// `loop` + early `break`, with no loss of fidelity to the decoded result.

use crate::bool_decoder::BoolDecoder;
use crate::enums::CoeffBlockType;
use crate::headers::CoeffProbs;
use crate::tables::{self, ABOVE_CONTEXT_INDEX, COEFF_BANDS, COEFF_TREE, LEFT_CONTEXT_INDEX, TOKEN_CAT_BASE, TOKEN_EOB, ZIGZAG};

/// 9-entry token-entropy context: 4 Y, 2 U, 2 V, 1 Y2, shared between the
/// "above" row (persists across MB rows) and "left" column (reset per row).
pub type TokenEntropyContext = [u8; 9];

pub struct TokenDecoderState {
  /// One context row per macroblock column; persists across rows, zeroed
  /// only at the start of the frame (§4.5: "above contexts zeroed on the
  /// first row").
  pub above: Vec<TokenEntropyContext>,
}

impl TokenDecoderState {
  pub fn new(mb_cols: usize) -> Self {
    TokenDecoderState { above: vec![[0u8; 9]; mb_cols] }
  }

  pub fn reset(&mut self) {
    for ctx in self.above.iter_mut() {
      *ctx = [0u8; 9];
    }
  }
}

/// Decode one 4x4 block's coefficients into `out` (natural raster order,
/// via the zigzag table), returning whether any coefficient was non-zero.
#[allow(clippy::too_many_arguments)]
fn decode_block(
  br: &mut BoolDecoder,
  coeff_probs: &CoeffProbs,
  block_type: CoeffBlockType,
  first_coeff: usize,
  dc_factor: i32,
  ac_factor: i32,
  initial_ctx: usize,
  out: &mut [i16; 16],
) -> bool {
  let type_idx = block_type as usize;
  let mut c = first_coeff;
  let mut ctx = initial_ctx;
  let mut nonzero = false;
  // The encoder never signals EOB right after a zero token, so on re-entry
  // the tree walk starts at node 2 (ZERO_CONTEXT_NODE), skipping the EOB leaf.
  let mut tree_start = 0usize;

  while c < 16 {
    let band = COEFF_BANDS[c];
    let probs = &coeff_probs[type_idx][band][ctx];
    let token = br.read_tree_from(&COEFF_TREE, probs, tree_start);

    if token == TOKEN_EOB {
      break;
    }

    let magnitude = if token < TOKEN_CAT_BASE {
      token
    } else {
      let cat = &tables::EXTRA_BITS[(token - TOKEN_CAT_BASE) as usize];
      let mut extra = 0i32;
      for &p in cat.probs {
        extra = (extra << 1) | br.get(p) as i32;
      }
      cat.min_val + extra
    };

    let value = if magnitude != 0 && br.get_bit() != 0 { -magnitude } else { magnitude };

    if value != 0 {
      nonzero = true;
    }

    let factor = if c == 0 { dc_factor } else { ac_factor };
    out[ZIGZAG[c]] = (value * factor) as i16;

    ctx = match value {
      0 => 0,
      1 | -1 => 1,
      _ => 2,
    };
    tree_start = if value == 0 { 2 } else { 0 };
    c += 1;
  }

  nonzero
}

pub struct MbTokenInput {
  pub has_y2: bool,
  /// Per-segment dequant factors, [Y1, UV, Y2][DC, AC].
  pub dequant: [[i32; 2]; 3],
  pub skip_coeff: bool,
}

pub struct MbTokenOutput {
  /// 25 blocks x 16 coefficients, natural raster order within each block.
  /// Block 24 is Y2 when `has_y2` is set.
  pub coeffs: [[i16; 16]; 25],
  pub eob_mask: u32,
}

/// Decode all coefficient blocks for one macroblock (§4.5), updating the
/// above/left token-entropy context in place.
pub fn decode_mb_tokens(
  br: &mut BoolDecoder,
  coeff_probs: &CoeffProbs,
  input: &MbTokenInput,
  above: &mut TokenEntropyContext,
  left: &mut TokenEntropyContext,
) -> MbTokenOutput {
  let mut out = MbTokenOutput { coeffs: [[0i16; 16]; 25], eob_mask: 0 };

  if input.skip_coeff {
    above[0..8].fill(0);
    left[0..8].fill(0);
    if input.has_y2 {
      above[8] = 0;
      left[8] = 0;
    }
    return out;
  }

  let y1_type = if input.has_y2 { CoeffBlockType::Y1AfterY2 } else { CoeffBlockType::Y1WithDc };
  let y1_first = if input.has_y2 { 1 } else { 0 };

  for b in 0..16 {
    let ai = ABOVE_CONTEXT_INDEX[b];
    let li = LEFT_CONTEXT_INDEX[b];
    let ctx = above[ai] as usize + left[li] as usize;
    let nonzero_beyond_dc = decode_block(
      br,
      coeff_probs,
      y1_type,
      y1_first,
      input.dequant[0][0],
      input.dequant[0][1],
      ctx,
      &mut out.coeffs[b],
    );
    let nonzero = nonzero_beyond_dc || (y1_first == 0 && out.coeffs[b][0] != 0);
    above[ai] = nonzero as u8;
    left[li] = nonzero as u8;
    if nonzero_beyond_dc {
      out.eob_mask |= 1 << b;
    }
    if nonzero {
      out.eob_mask |= 1 << 31;
    }
  }

  for b in 16..24 {
    let ai = ABOVE_CONTEXT_INDEX[b];
    let li = LEFT_CONTEXT_INDEX[b];
    let ctx = above[ai] as usize + left[li] as usize;
    let nonzero = decode_block(
      br,
      coeff_probs,
      CoeffBlockType::Uv,
      0,
      input.dequant[1][0],
      input.dequant[1][1],
      ctx,
      &mut out.coeffs[b],
    );
    above[ai] = nonzero as u8;
    left[li] = nonzero as u8;
    if nonzero {
      out.eob_mask |= 1 << b;
      out.eob_mask |= 1 << 31;
    }
  }

  if input.has_y2 {
    let ai = ABOVE_CONTEXT_INDEX[24];
    let li = LEFT_CONTEXT_INDEX[24];
    let ctx = above[ai] as usize + left[li] as usize;
    let nonzero = decode_block(
      br,
      coeff_probs,
      CoeffBlockType::Y2,
      0,
      input.dequant[2][0],
      input.dequant[2][1],
      ctx,
      &mut out.coeffs[24],
    );
    above[ai] = nonzero as u8;
    left[li] = nonzero as u8;
    if nonzero {
      out.eob_mask |= 1 << 31;
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tables::default_entropy_header;

  #[test]
  fn skip_coeff_leaves_buffer_zero() {
    let hdr = default_entropy_header();
    let mut br = BoolDecoder::new(&[]);
    let input = MbTokenInput { has_y2: true, dequant: [[4, 4]; 3], skip_coeff: true };
    let mut above = [0u8; 9];
    let mut left = [0u8; 9];
    let out = decode_mb_tokens(&mut br, &hdr.coeff_probs, &input, &mut above, &mut left);
    assert_eq!(out.eob_mask, 0);
    assert!(out.coeffs.iter().all(|b| b.iter().all(|&c| c == 0)));
  }
}
