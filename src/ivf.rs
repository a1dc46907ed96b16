// IVF container (§4a): the thin framing format test vectors and command
// line tools around VP8 actually ship in. A 32-byte file header followed by
// a `(size, timestamp, payload)` record per frame.

use std::io::prelude::*;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{DecodeError, Result};

const FILE_HEADER_LEN: usize = 32;
const FRAME_HEADER_LEN: usize = 12;
const SIGNATURE: &[u8; 4] = b"DKIF";

fn io_err(context: &str, e: std::io::Error) -> DecodeError {
  DecodeError::corrupt(format!("{context}: {e}"))
}

/// Reads one VP8 frame's compressed payload at a time out of an IVF stream.
pub struct IvfReader<R> {
  inner: R,
  pub width: u16,
  pub height: u16,
  pub frame_count: u32,
  pub timebase_num: u32,
  pub timebase_den: u32,
}

impl<R: Read> IvfReader<R> {
  pub fn new(mut inner: R) -> Result<Self> {
    let mut signature = [0u8; 4];
    inner.read_exact(&mut signature).map_err(|e| io_err("reading IVF signature", e))?;
    if &signature != SIGNATURE {
      return Err(DecodeError::corrupt("not an IVF file"));
    }

    let _version = inner.read_u16::<LittleEndian>().map_err(|e| io_err("reading IVF version", e))?;
    let header_len = inner.read_u16::<LittleEndian>().map_err(|e| io_err("reading IVF header length", e))?;

    let mut fourcc = [0u8; 4];
    inner.read_exact(&mut fourcc).map_err(|e| io_err("reading IVF fourcc", e))?;
    if &fourcc != b"VP80" {
      return Err(DecodeError::unsupported(format!("IVF fourcc {fourcc:?} is not VP80")));
    }

    let width = inner.read_u16::<LittleEndian>().map_err(|e| io_err("reading IVF width", e))?;
    let height = inner.read_u16::<LittleEndian>().map_err(|e| io_err("reading IVF height", e))?;
    let timebase_num = inner.read_u32::<LittleEndian>().map_err(|e| io_err("reading IVF timebase num", e))?;
    let timebase_den = inner.read_u32::<LittleEndian>().map_err(|e| io_err("reading IVF timebase den", e))?;
    let frame_count = inner.read_u32::<LittleEndian>().map_err(|e| io_err("reading IVF frame count", e))?;
    let _unused = inner.read_u32::<LittleEndian>().map_err(|e| io_err("reading IVF reserved field", e))?;

    // Headers longer than the one we understand just get the extra bytes
    // skipped; shorter ones (from a truncated or corrupt file) are an error.
    if (header_len as usize) < FILE_HEADER_LEN {
      return Err(DecodeError::corrupt("IVF header shorter than expected"));
    }
    let extra = header_len as usize - FILE_HEADER_LEN;
    if extra > 0 {
      std::io::copy(&mut (&mut inner).take(extra as u64), &mut std::io::sink())
        .map_err(|e| io_err("skipping IVF header extension", e))?;
    }

    Ok(IvfReader { inner, width, height, frame_count, timebase_num, timebase_den })
  }

  /// Reads the next frame's `(timestamp, payload)`, or `None` at end of stream.
  pub fn read_frame(&mut self) -> Result<Option<(u64, Vec<u8>)>> {
    let size = match self.inner.read_u32::<LittleEndian>() {
      Ok(v) => v,
      Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
      Err(e) => return Err(io_err("reading IVF frame size", e)),
    };
    let timestamp = self.inner.read_u64::<LittleEndian>().map_err(|e| io_err("reading IVF frame timestamp", e))?;

    let mut payload = vec![0u8; size as usize];
    self.inner.read_exact(&mut payload).map_err(|e| io_err("reading IVF frame payload", e))?;
    Ok(Some((timestamp, payload)))
  }
}

/// Writes an IVF container, used by the demo CLI to re-mux a decoded
/// bitstream's frame sizes for inspection tools that expect one.
pub struct IvfWriter<W> {
  inner: W,
}

impl<W: Write> IvfWriter<W> {
  pub fn new(mut inner: W, width: u16, height: u16, frame_count: u32, timebase_num: u32, timebase_den: u32) -> Result<Self> {
    inner.write_all(SIGNATURE).map_err(|e| io_err("writing IVF signature", e))?;
    inner.write_u16::<LittleEndian>(0).map_err(|e| io_err("writing IVF version", e))?;
    inner.write_u16::<LittleEndian>(FILE_HEADER_LEN as u16).map_err(|e| io_err("writing IVF header length", e))?;
    inner.write_all(b"VP80").map_err(|e| io_err("writing IVF fourcc", e))?;
    inner.write_u16::<LittleEndian>(width).map_err(|e| io_err("writing IVF width", e))?;
    inner.write_u16::<LittleEndian>(height).map_err(|e| io_err("writing IVF height", e))?;
    inner.write_u32::<LittleEndian>(timebase_num).map_err(|e| io_err("writing IVF timebase num", e))?;
    inner.write_u32::<LittleEndian>(timebase_den).map_err(|e| io_err("writing IVF timebase den", e))?;
    inner.write_u32::<LittleEndian>(frame_count).map_err(|e| io_err("writing IVF frame count", e))?;
    inner.write_u32::<LittleEndian>(0).map_err(|e| io_err("writing IVF reserved field", e))?;
    Ok(IvfWriter { inner })
  }

  pub fn write_frame(&mut self, timestamp: u64, payload: &[u8]) -> Result<()> {
    self.inner.write_u32::<LittleEndian>(payload.len() as u32).map_err(|e| io_err("writing IVF frame size", e))?;
    self.inner.write_u64::<LittleEndian>(timestamp).map_err(|e| io_err("writing IVF frame timestamp", e))?;
    self.inner.write_all(payload).map_err(|e| io_err("writing IVF frame payload", e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_file() -> Vec<u8> {
    let mut buf = Vec::new();
    {
      let mut w = IvfWriter::new(&mut buf, 16, 16, 2, 1, 30).unwrap();
      w.write_frame(0, &[1, 2, 3]).unwrap();
      w.write_frame(1, &[4, 5]).unwrap();
    }
    buf
  }

  #[test]
  fn round_trips_header_and_frames() {
    let buf = sample_file();
    let mut r = IvfReader::new(std::io::Cursor::new(buf)).unwrap();
    assert_eq!(r.width, 16);
    assert_eq!(r.height, 16);
    assert_eq!(r.frame_count, 2);

    let (ts0, payload0) = r.read_frame().unwrap().unwrap();
    assert_eq!(ts0, 0);
    assert_eq!(payload0, vec![1, 2, 3]);

    let (ts1, payload1) = r.read_frame().unwrap().unwrap();
    assert_eq!(ts1, 1);
    assert_eq!(payload1, vec![4, 5]);

    assert!(r.read_frame().unwrap().is_none());
  }

  #[test]
  fn rejects_wrong_signature() {
    let mut buf = sample_file();
    buf[0] = b'X';
    assert!(IvfReader::new(std::io::Cursor::new(buf)).is_err());
  }
}
