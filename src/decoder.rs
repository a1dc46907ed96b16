// Top-level frame decode orchestration (§3, §4.2-§4.9): parses the
// uncompressed and compressed headers, drives the per-row
// mode/MV -> token -> predict -> loopfilter pipeline, and manages the
// reference frame pool's refresh/copy bookkeeping at the end of every frame.

use crate::bool_decoder::BoolDecoder;
use crate::enums::{PredictionMode, ReferenceFrame};
use crate::error::{DecodeError, Result};
use crate::frame::{Frame, FramePool};
use crate::headers::{
  self, CopyAction, EntropyHeader, FrameHeader, LoopfilterHeader, QuantHeader, ReferenceHeader, SegmentHeader,
};
use crate::mb_info::MbInfoGrid;
use crate::modemv;
use crate::predict;
use crate::tables;
use crate::tokens::{self, TokenDecoderState};

/// Per-segment dequantization factors (§4.3/§4.9): `[Y1, UV, Y2][DC, AC]`.
#[derive(Clone, Copy, Default)]
struct DequantFactors {
  factor: [[i32; 2]; 3],
}

fn clamp_q(q: i32) -> usize {
  q.clamp(0, 127) as usize
}

fn dc_q(q: i32) -> i32 {
  tables::DC_QLOOKUP[clamp_q(q)]
}

fn ac_q(q: i32) -> i32 {
  tables::AC_QLOOKUP[clamp_q(q)]
}

fn compute_dequant_factors(seg: &SegmentHeader, quant: &QuantHeader) -> [DequantFactors; 4] {
  let mut out = [DequantFactors::default(); 4];
  let count = if seg.enabled { 4 } else { 1 };

  for (i, dqf) in out.iter_mut().enumerate().take(count) {
    let q = if seg.enabled {
      if seg.abs_values {
        seg.quant_idx[i]
      } else {
        quant.q_index as i32 + seg.quant_idx[i]
      }
    } else {
      quant.q_index as i32
    };

    dqf.factor[0][0] = dc_q(q + quant.y1_dc_delta_q);
    dqf.factor[0][1] = ac_q(q);
    dqf.factor[1][0] = dc_q(q + quant.uv_dc_delta_q).min(132);
    dqf.factor[1][1] = ac_q(q + quant.uv_ac_delta_q);
    dqf.factor[2][0] = dc_q(q + quant.y2_dc_delta_q) * 2;
    dqf.factor[2][1] = (ac_q(q + quant.y2_ac_delta_q) * 155 / 100).max(8);
  }

  out
}

/// Result of decoding a frame's uncompressed tag plus compressed header
/// (partition 0, steps 1-9), with no mode/MV, token, prediction, or loop
/// filter work done. Exposed as its own entry point so a caller that only
/// wants per-frame metadata (reference frame dependencies, quantizer, frame
/// size) can get it without paying for a full reconstruction.
pub struct DecodedHeaders {
  pub frame: FrameHeader,
  pub segment: SegmentHeader,
  pub loopfilter: LoopfilterHeader,
  pub quant: QuantHeader,
  pub reference: ReferenceHeader,
  pub entropy: EntropyHeader,
  pub token_header: headers::TokenHeader,
  pub token_ranges: Vec<(usize, usize)>,
}

/// Parses everything up to but not including the per-row mode/MV and token
/// passes. Takes the previous frame's header and the segmentation/loopfilter/
/// entropy state carried into this frame (a keyframe ignores all three and
/// resets to defaults); does not touch any `Vp8Decoder` state itself, so
/// repeated calls with the same inputs are side-effect free.
///
/// Also returns the boolean decoder positioned right after the compressed
/// header, still open over the rest of partition 0, so `decode_frame` can
/// keep reading from it for the per-row mode/MV pass without re-deriving
/// arithmetic-coder state. A caller that only wants `DecodedHeaders` can
/// simply drop it.
pub fn decode_frame_header<'a>(
  data: &'a [u8],
  prev_frame: Option<&FrameHeader>,
  prev_segment: &SegmentHeader,
  prev_loopfilter: &LoopfilterHeader,
  prev_entropy: &EntropyHeader,
) -> Result<(DecodedHeaders, BoolDecoder<'a>)> {
  let frame = headers::parse_frame_header(data, prev_frame)?;
  if frame.version > 3 {
    return Err(DecodeError::unsupported("reserved bitstream version"));
  }

  let tag_len = if frame.is_keyframe { 10 } else { 3 };
  let payload = &data[tag_len..];
  if payload.len() < frame.part0_sz {
    return Err(DecodeError::corrupt("partition 0 extends past end of frame data"));
  }
  let mut br = BoolDecoder::new(&payload[..frame.part0_sz]);

  if frame.is_keyframe && br.get_uint(2) != 0 {
    return Err(DecodeError::unsupported("reserved colorspace/clamping bits set"));
  }

  let mut segment = if frame.is_keyframe { SegmentHeader::new() } else { prev_segment.clone() };
  headers::decode_segmentation_header(&mut br, &mut segment);

  let mut loopfilter = if frame.is_keyframe { LoopfilterHeader::default() } else { prev_loopfilter.clone() };
  headers::decode_loopfilter_header(&mut br, &mut loopfilter);

  let (token_header, token_ranges) = headers::decode_token_partitions(&mut br, payload, frame.part0_sz)?;

  let mut quant = QuantHeader::default();
  headers::decode_quantizer_header(&mut br, &mut quant);

  let mut reference = ReferenceHeader::default();
  headers::decode_reference_header(&mut br, frame.is_keyframe, &mut reference);

  let mut entropy = if frame.is_keyframe { tables::default_entropy_header() } else { prev_entropy.clone() };
  headers::decode_entropy_header(&mut br, frame.is_keyframe, &mut entropy);

  let headers = DecodedHeaders { frame, segment, loopfilter, quant, reference, entropy, token_header, token_ranges };
  Ok((headers, br))
}

/// Decodes a sequence of VP8 frames, tracking all persistent decoder state:
/// headers carried between frames, the macroblock info grid, and the
/// reference frame pool (§3, §4.9).
pub struct Vp8Decoder {
  frame_hdr: Option<FrameHeader>,
  segment_hdr: SegmentHeader,
  loopfilter_hdr: LoopfilterHeader,
  entropy_hdr: EntropyHeader,
  mb_info: Option<MbInfoGrid>,
  pool: FramePool,
  ref_frames: [Option<usize>; 4],
  current_image: Option<Frame>,
  frame_cnt: u64,
}

impl Vp8Decoder {
  pub fn new() -> Self {
    Vp8Decoder {
      frame_hdr: None,
      segment_hdr: SegmentHeader::new(),
      loopfilter_hdr: LoopfilterHeader::default(),
      entropy_hdr: tables::default_entropy_header(),
      mb_info: None,
      pool: FramePool::new(),
      ref_frames: [None; 4],
      current_image: None,
      frame_cnt: 0,
    }
  }

  pub fn get_current_image(&self) -> Option<&Frame> {
    self.current_image.as_ref()
  }

  /// Decode one frame's worth of compressed data (§3-§4.9). `data` is the
  /// complete payload of a single VP8 frame, as delivered by the container
  /// (IVF or similar), including the 3-byte uncompressed header.
  pub fn decode_frame(&mut self, data: &[u8]) -> Result<()> {
    let (decoded, mut br) =
      decode_frame_header(data, self.frame_hdr.as_ref(), &self.segment_hdr, &self.loopfilter_hdr, &self.entropy_hdr)?;
    let hdr = decoded.frame;
    let tag_len = if hdr.is_keyframe { 10 } else { 3 };
    let payload = &data[tag_len..];

    let mb_cols = hdr.width.div_ceil(16);
    let mb_rows = hdr.height.div_ceil(16);

    if hdr.is_keyframe {
      self.mb_info = Some(MbInfoGrid::new(mb_cols, mb_rows));
    }

    {
      let mb_info = self.mb_info.as_mut().ok_or_else(|| DecodeError::corrupt("first frame in stream is not a keyframe"))?;
      if mb_info.mb_cols() != mb_cols || mb_info.mb_rows() != mb_rows {
        return Err(DecodeError::unsupported("mid-stream frame size change is not supported"));
      }
      mb_info.reset_borders();
    }

    self.segment_hdr = decoded.segment;
    self.loopfilter_hdr = decoded.loopfilter;
    let quant_hdr = decoded.quant;
    let reference_hdr = decoded.reference;
    let token_hdr = decoded.token_header;
    let token_ranges = decoded.token_ranges;

    // decode_frame_header computed the entropy header from last frame's
    // value; the save/restore around it is this call's responsibility, not
    // the header parser's, so it captures the pre-update state itself.
    let saved_entropy = if !reference_hdr.refresh_entropy { Some(self.entropy_hdr.clone()) } else { None };
    self.entropy_hdr = decoded.entropy;

    let dequant_factors = compute_dequant_factors(&self.segment_hdr, &quant_hdr);
    let filters = if hdr.version == 0 { &tables::SIXTAP_FILTERS } else { &tables::BILINEAR_FILTERS };
    let full_pixel = hdr.version == 3;
    let sign_bias = [false, false, reference_hdr.sign_bias_golden, reference_hdr.sign_bias_altref];

    let mut token_state = TokenDecoderState::new(mb_cols);
    let mut token_brs: Vec<BoolDecoder> = token_ranges.iter().map(|&(s, e)| BoolDecoder::new(&payload[s..e])).collect();

    let current_idx = self.pool.acquire(hdr.width, hdr.height)?;
    let mut partition = 0usize;

    for row in 0..mb_rows {
      modemv::decode_mode_row(
        self.mb_info.as_mut().unwrap(),
        row,
        &self.segment_hdr,
        &self.entropy_hdr,
        sign_bias,
        hdr.is_keyframe,
        &mut br,
      )?;

      let mut left_ctx = [0u8; 9];
      for col in 0..mb_cols {
        let skip_coeff;
        let segment_id;
        let y_mode;
        {
          let mbi = self.mb_info.as_ref().unwrap().at(row as isize, col as isize);
          skip_coeff = mbi.skip_coeff;
          segment_id = if self.segment_hdr.enabled { mbi.segment_id as usize } else { 0 };
          y_mode = mbi.y_mode;
        }
        let has_y2 = y_mode != PredictionMode::BPred && y_mode != PredictionMode::SplitMv;

        let input = tokens::MbTokenInput { has_y2, dequant: dequant_factors[segment_id].factor, skip_coeff };
        let token_br = &mut token_brs[partition];
        let above_ctx = &mut token_state.above[col];
        let out = tokens::decode_mb_tokens(token_br, &self.entropy_hdr.coeff_probs, &input, above_ctx, &mut left_ctx);

        let mut coeffs = out.coeffs;
        if has_y2 {
          predict::fixup_dc_coeffs(&mut coeffs);
        }

        self.mb_info.as_mut().unwrap().at_mut(row as isize, col as isize).eob_mask = out.eob_mask;
        let mbi = self.mb_info.as_ref().unwrap().at(row as isize, col as isize).clone();

        if mbi.ref_frame == ReferenceFrame::Current {
          let current = self.pool.frame_mut(current_idx);
          predict::predict_intra_luma(current.y_mut(), (row * 16) as isize, (col * 16) as isize, &mbi, &coeffs);
          let (u, v) = current.uv_mut();
          predict::predict_intra_chroma(u, v, (row * 8) as isize, (col * 8) as isize, &mbi, &coeffs);
        } else {
          let reference_idx = self.ref_frames[mbi.ref_frame as usize]
            .ok_or_else(|| DecodeError::internal("inter macroblock references an unset reference frame"))?;
          let (current, reference) = self.pool.split_mut(current_idx, reference_idx);
          predict::predict_inter(current, reference, &mbi, &coeffs, row, col, filters, full_pixel);
        }
      }

      let current = self.pool.frame_mut(current_idx);
      current.y_mut().extend_row_right((row * 16 + 15) as isize);
      current.u_mut().extend_row_right((row * 8 + 7) as isize);
      current.v_mut().extend_row_right((row * 8 + 7) as isize);

      if self.loopfilter_hdr.level != 0 && row > 0 {
        self.filter_row(current_idx, row - 1, mb_cols, hdr.is_keyframe);
      }

      partition += 1;
      if partition == token_hdr.partitions {
        partition = 0;
      }
    }

    if self.loopfilter_hdr.level != 0 {
      self.filter_row(current_idx, mb_rows - 1, mb_cols, hdr.is_keyframe);
    }

    self.frame_cnt += 1;

    if let Some(saved) = saved_entropy {
      self.entropy_hdr = saved;
    }

    self.update_reference_frames(current_idx, &reference_hdr)?;

    self.current_image = if hdr.is_shown { Some(self.pool.frame(current_idx).clone()) } else { None };

    self.frame_hdr = Some(hdr);
    Ok(())
  }

  fn filter_row(&mut self, current_idx: usize, row: usize, mb_cols: usize, is_keyframe: bool) {
    let mb_info = self.mb_info.as_ref().unwrap();
    let mbi_row: Vec<_> = (0..mb_cols).map(|col| mb_info.at(row as isize, col as isize).clone()).collect();
    let current = self.pool.frame_mut(current_idx);
    crate::loopfilter::filter_row(current, &mbi_row, row, &self.loopfilter_hdr, &self.segment_hdr, is_keyframe);
  }

  /// Apply the copy/refresh actions from the reference header (§4.2's
  /// supplement), in the fixed order the bitstream assumes: ALTREF copy,
  /// GOLDEN copy, then GOLDEN/ALTREF/LAST refresh from CURRENT.
  fn update_reference_frames(&mut self, current_idx: usize, hdr: &ReferenceHeader) -> Result<()> {
    let last = self.ref_frames[ReferenceFrame::Last as usize];
    let golden = self.ref_frames[ReferenceFrame::Golden as usize];

    match hdr.copy_arf {
      CopyAction::FromLast => self.retarget(ReferenceFrame::AltRef, last)?,
      CopyAction::FromCross => self.retarget(ReferenceFrame::AltRef, golden)?,
      CopyAction::None => {}
    }

    let altref_after = self.ref_frames[ReferenceFrame::AltRef as usize];
    match hdr.copy_gf {
      CopyAction::FromLast => self.retarget(ReferenceFrame::Golden, last)?,
      CopyAction::FromCross => self.retarget(ReferenceFrame::Golden, altref_after)?,
      CopyAction::None => {}
    }

    if hdr.refresh_gf {
      self.retarget(ReferenceFrame::Golden, Some(current_idx))?;
    }
    if hdr.refresh_arf {
      self.retarget(ReferenceFrame::AltRef, Some(current_idx))?;
    }
    if hdr.refresh_last {
      self.retarget(ReferenceFrame::Last, Some(current_idx))?;
    }

    self.pool.release(current_idx);
    Ok(())
  }

  fn retarget(&mut self, slot: ReferenceFrame, new_idx: Option<usize>) -> Result<()> {
    let new_idx = new_idx.ok_or_else(|| DecodeError::internal("retarget from an unset reference slot"))?;
    if let Some(old) = self.ref_frames[slot as usize] {
      self.pool.release(old);
    }
    self.pool.retain(new_idx);
    self.ref_frames[slot as usize] = Some(new_idx);
    Ok(())
  }
}

impl Default for Vp8Decoder {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_decoder_has_no_current_image() {
    let decoder = Vp8Decoder::new();
    assert!(decoder.get_current_image().is_none());
  }

  #[test]
  fn decode_frame_before_any_keyframe_is_rejected() {
    let mut decoder = Vp8Decoder::new();
    let err = decoder.decode_frame(&[0x01, 0x00, 0x00]).unwrap_err();
    assert!(matches!(err, DecodeError::CorruptFrame(_)));
  }

  #[test]
  fn dequant_factors_respect_the_three_clamping_rules() {
    let seg = SegmentHeader::new();
    let mut quant = QuantHeader::default();
    // Push UV-DC past 132 and Y2-AC below the floor of 8 to exercise both ends.
    quant.q_index = 127;
    quant.uv_dc_delta_q = 0;
    quant.y2_ac_delta_q = -127;

    let dqf = compute_dequant_factors(&seg, &quant)[0];
    assert!(dqf.factor[1][0] <= 132, "UV DC factor must clamp to at most 132");
    assert_eq!(dqf.factor[2][0], dc_q(quant.q_index as i32 + quant.y2_dc_delta_q) * 2, "Y2 DC factor is 2x the table value");
    assert!(dqf.factor[2][1] >= 8, "Y2 AC factor has a floor of 8");
  }
}
