// Frame-level header structures (§3, §4.2, §4.3) and the compressed-header
// decode that fills them in from partition 0.

use crate::bool_decoder::BoolDecoder;
use crate::error::{DecodeError, Result};
use crate::tables;

pub const MAX_MB_SEGMENTS: usize = 4;
pub const MB_FEATURE_TREE_PROBS: usize = 3;
pub const BLOCK_CONTEXTS: usize = 4;
pub const MAX_PARTITIONS: usize = 8;
pub const BLOCK_TYPES: usize = 4;
pub const PREV_COEF_CONTEXTS: usize = 3;
pub const COEF_BANDS: usize = 8;
pub const ENTROPY_NODES: usize = 11;
pub const MV_PROB_CNT: usize = 19;

#[derive(Clone, Debug, Default)]
pub struct FrameHeader {
  pub is_keyframe: bool,
  pub is_experimental: bool,
  pub version: u32,
  pub is_shown: bool,
  pub part0_sz: usize,

  pub width: usize,
  pub height: usize,
  pub scale_w: u32,
  pub scale_h: u32,

  pub frame_size_updated: bool,
}

/// Decode the three-byte uncompressed header, plus the seven-byte keyframe
/// header when present (§4.2). `prev` is the previous frame's header, used
/// only to compute `frame_size_updated`.
pub fn parse_frame_header(data: &[u8], prev: Option<&FrameHeader>) -> Result<FrameHeader> {
  if data.len() < 3 {
    return Err(DecodeError::corrupt("frame shorter than the 3-byte uncompressed header"));
  }

  let tag = (data[0] as u32) | (data[1] as u32) << 8 | (data[2] as u32) << 16;
  let is_keyframe = (tag & 1) == 0;
  let version = (tag >> 1) & 0x7;
  let is_experimental = ((tag >> 3) & 1) != 0;
  let is_shown = ((tag >> 4) & 1) != 0;
  let part0_sz = (tag >> 5) as usize;

  if is_experimental {
    return Err(DecodeError::unsupported("experimental bit set"));
  }

  let mut hdr = FrameHeader {
    is_keyframe,
    is_experimental,
    version,
    is_shown,
    part0_sz,
    ..Default::default()
  };

  let mut offset = 3;

  if is_keyframe {
    if data.len() < 10 {
      return Err(DecodeError::corrupt("truncated keyframe header"));
    }
    if &data[3..6] != [0x9D, 0x01, 0x2A] {
      return Err(DecodeError::unsupported("bad keyframe sync code"));
    }
    let wbits = (data[6] as u32) | (data[7] as u32) << 8;
    let hbits = (data[8] as u32) | (data[9] as u32) << 8;
    hdr.width = (wbits & 0x3FFF) as usize;
    hdr.scale_w = wbits >> 14;
    hdr.height = (hbits & 0x3FFF) as usize;
    hdr.scale_h = hbits >> 14;
    offset = 10;

    if hdr.width == 0 || hdr.height == 0 {
      return Err(DecodeError::unsupported("zero-sized frame"));
    }
  } else if let Some(prev) = prev {
    hdr.width = prev.width;
    hdr.height = prev.height;
    hdr.scale_w = prev.scale_w;
    hdr.scale_h = prev.scale_h;
  } else {
    return Err(DecodeError::corrupt("first frame in stream is not a keyframe"));
  }

  if data.len() < offset + part0_sz {
    return Err(DecodeError::corrupt("partition 0 extends past end of frame data"));
  }

  hdr.frame_size_updated = match prev {
    Some(prev) => {
      hdr.width != prev.width
        || hdr.height != prev.height
        || hdr.scale_w != prev.scale_w
        || hdr.scale_h != prev.scale_h
    }
    None => true,
  };

  Ok(hdr)
}

#[derive(Clone, Debug, Default)]
pub struct SegmentHeader {
  pub enabled: bool,
  pub update_map: bool,
  pub update_data: bool,
  pub abs_values: bool,
  pub tree_probs: [u8; MB_FEATURE_TREE_PROBS],
  pub quant_idx: [i32; MAX_MB_SEGMENTS],
  pub lf_level: [i32; MAX_MB_SEGMENTS],
}

impl SegmentHeader {
  pub fn new() -> Self {
    SegmentHeader { tree_probs: [255; MB_FEATURE_TREE_PROBS], ..Default::default() }
  }
}

pub fn decode_segmentation_header(br: &mut BoolDecoder, hdr: &mut SegmentHeader) {
  hdr.enabled = br.get_bit() != 0;
  if !hdr.enabled {
    hdr.update_map = false;
    hdr.update_data = false;
    return;
  }

  hdr.update_map = br.get_bit() != 0;
  hdr.update_data = br.get_bit() != 0;

  if hdr.update_data {
    hdr.abs_values = br.get_bit() != 0;
    for i in 0..MAX_MB_SEGMENTS {
      hdr.quant_idx[i] = br.maybe_get_int(7);
    }
    for i in 0..MAX_MB_SEGMENTS {
      hdr.lf_level[i] = br.maybe_get_int(6);
    }
  }

  if hdr.update_map {
    for i in 0..MB_FEATURE_TREE_PROBS {
      hdr.tree_probs[i] = if br.get_bit() != 0 { br.get_uint(8) as u8 } else { 255 };
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct LoopfilterHeader {
  pub use_simple: bool,
  pub level: u32,
  pub sharpness: u32,
  pub delta_enabled: bool,
  pub ref_delta: [i32; BLOCK_CONTEXTS],
  pub mode_delta: [i32; BLOCK_CONTEXTS],
}

pub fn decode_loopfilter_header(br: &mut BoolDecoder, hdr: &mut LoopfilterHeader) {
  hdr.use_simple = br.get_bit() != 0;
  hdr.level = br.get_uint(6);
  hdr.sharpness = br.get_uint(3);
  hdr.delta_enabled = br.get_bit() != 0;

  if hdr.delta_enabled && br.get_bit() != 0 {
    for i in 0..BLOCK_CONTEXTS {
      hdr.ref_delta[i] = br.maybe_get_int(6);
    }
    for i in 0..BLOCK_CONTEXTS {
      hdr.mode_delta[i] = br.maybe_get_int(6);
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct TokenHeader {
  pub partitions: usize,
  pub partition_sz: [usize; MAX_PARTITIONS],
}

/// Parses the partition-count field and the (partitions-1) trailing 3-byte
/// size fields, returning the header plus the byte ranges (relative to
/// `data`, which begins right after the uncompressed frame tag) of each
/// token partition's payload.
pub fn decode_token_partitions(
  br: &mut BoolDecoder,
  data: &[u8],
  part0_end: usize,
) -> Result<(TokenHeader, Vec<(usize, usize)>)> {
  let log2_partitions = br.get_uint(2);
  let partitions = 1usize << log2_partitions;

  let sizes_bytes = (partitions - 1) * 3;
  if data.len() < part0_end + sizes_bytes {
    return Err(DecodeError::corrupt("truncated token partition size table"));
  }

  let mut hdr = TokenHeader { partitions, ..Default::default() };
  let mut ranges = Vec::with_capacity(partitions);
  let mut cursor = part0_end + sizes_bytes;

  for i in 0..partitions - 1 {
    let off = part0_end + i * 3;
    let sz = data[off] as usize | (data[off + 1] as usize) << 8 | (data[off + 2] as usize) << 16;
    hdr.partition_sz[i] = sz;
    if cursor + sz > data.len() {
      return Err(DecodeError::corrupt("token partition size exceeds remaining data"));
    }
    ranges.push((cursor, cursor + sz));
    cursor += sz;
  }

  // The final partition takes whatever remains.
  hdr.partition_sz[partitions - 1] = data.len() - cursor;
  ranges.push((cursor, data.len()));

  Ok((hdr, ranges))
}

#[derive(Clone, Debug, Default)]
pub struct QuantHeader {
  pub q_index: u32,
  pub delta_update: bool,
  pub y1_dc_delta_q: i32,
  pub y2_dc_delta_q: i32,
  pub y2_ac_delta_q: i32,
  pub uv_dc_delta_q: i32,
  pub uv_ac_delta_q: i32,
}

pub fn decode_quantizer_header(br: &mut BoolDecoder, hdr: &mut QuantHeader) {
  let prev = hdr.clone();

  hdr.q_index = br.get_uint(7);
  hdr.y1_dc_delta_q = br.maybe_get_int(4);
  hdr.y2_dc_delta_q = br.maybe_get_int(4);
  hdr.y2_ac_delta_q = br.maybe_get_int(4);
  hdr.uv_dc_delta_q = br.maybe_get_int(4);
  hdr.uv_ac_delta_q = br.maybe_get_int(4);

  hdr.delta_update = hdr.q_index != prev.q_index
    || hdr.y1_dc_delta_q != prev.y1_dc_delta_q
    || hdr.y2_dc_delta_q != prev.y2_dc_delta_q
    || hdr.y2_ac_delta_q != prev.y2_ac_delta_q
    || hdr.uv_dc_delta_q != prev.uv_dc_delta_q
    || hdr.uv_ac_delta_q != prev.uv_ac_delta_q;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CopyAction {
  #[default]
  None,
  FromLast,
  FromCross,
}

impl CopyAction {
  fn from_bits(bits: u32) -> Self {
    match bits {
      0 => CopyAction::None,
      1 => CopyAction::FromLast,
      2 => CopyAction::FromCross,
      _ => CopyAction::None,
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct ReferenceHeader {
  pub refresh_last: bool,
  pub refresh_gf: bool,
  pub refresh_arf: bool,
  pub copy_gf: CopyAction,
  pub copy_arf: CopyAction,
  pub sign_bias_golden: bool,
  pub sign_bias_altref: bool,
  pub refresh_entropy: bool,
}

pub fn decode_reference_header(br: &mut BoolDecoder, is_keyframe: bool, hdr: &mut ReferenceHeader) {
  if is_keyframe {
    hdr.refresh_gf = true;
    hdr.refresh_arf = true;
    hdr.refresh_last = true;
    hdr.copy_gf = CopyAction::None;
    hdr.copy_arf = CopyAction::None;
    hdr.sign_bias_golden = false;
    hdr.sign_bias_altref = false;
    hdr.refresh_entropy = br.get_bit() != 0;
    return;
  }

  hdr.refresh_gf = br.get_bit() != 0;
  hdr.refresh_arf = br.get_bit() != 0;

  hdr.copy_gf = if !hdr.refresh_gf { CopyAction::from_bits(br.get_uint(2)) } else { CopyAction::None };
  hdr.copy_arf = if !hdr.refresh_arf { CopyAction::from_bits(br.get_uint(2)) } else { CopyAction::None };

  hdr.sign_bias_golden = br.get_bit() != 0;
  hdr.sign_bias_altref = br.get_bit() != 0;
  hdr.refresh_entropy = br.get_bit() != 0;
  hdr.refresh_last = br.get_bit() != 0;
}

pub type CoeffProbs = [[[[u8; ENTROPY_NODES]; PREV_COEF_CONTEXTS]; COEF_BANDS]; BLOCK_TYPES];

#[derive(Clone, Debug)]
pub struct EntropyHeader {
  pub coeff_probs: CoeffProbs,
  pub mv_probs: [[u8; MV_PROB_CNT]; 2],
  pub coeff_skip_enabled: bool,
  pub coeff_skip_prob: u8,
  pub y_mode_probs: [u8; 4],
  pub uv_mode_probs: [u8; 3],
  pub prob_inter: u8,
  pub prob_last: u8,
  pub prob_gf: u8,
}

impl Default for EntropyHeader {
  fn default() -> Self {
    tables::default_entropy_header()
  }
}

pub fn decode_entropy_header(br: &mut BoolDecoder, is_keyframe: bool, hdr: &mut EntropyHeader) {
  for t in 0..BLOCK_TYPES {
    for b in 0..COEF_BANDS {
      for c in 0..PREV_COEF_CONTEXTS {
        for n in 0..ENTROPY_NODES {
          let update_prob = tables::COEFF_UPDATE_PROBS[t][b][c][n];
          if br.get(update_prob) != 0 {
            hdr.coeff_probs[t][b][c][n] = br.get_uint(8) as u8;
          }
        }
      }
    }
  }

  hdr.coeff_skip_enabled = br.get_bit() != 0;
  if hdr.coeff_skip_enabled {
    hdr.coeff_skip_prob = br.get_uint(8) as u8;
  }

  if !is_keyframe {
    hdr.prob_inter = br.get_uint(8) as u8;
    hdr.prob_last = br.get_uint(8) as u8;
    hdr.prob_gf = br.get_uint(8) as u8;

    if br.get_bit() != 0 {
      for p in hdr.y_mode_probs.iter_mut() {
        *p = br.get_uint(8) as u8;
      }
    }
    if br.get_bit() != 0 {
      for p in hdr.uv_mode_probs.iter_mut() {
        *p = br.get_uint(8) as u8;
      }
    }

    for comp in 0..2 {
      for i in 0..MV_PROB_CNT {
        let update_prob = tables::MV_UPDATE_PROBS[comp][i];
        if br.get(update_prob) != 0 {
          let x = br.get_uint(7) as u8;
          hdr.mv_probs[comp][i] = if x != 0 { x << 1 } else { 1 };
        }
      }
    }
  }
}
