// Y4M writer: dumps decoded frames as raw planar YUV 4:2:0 for pixel
// comparison against a reference decoder. Parsing style mirrors IVF's.

use std::io::prelude::*;

use crate::error::{DecodeError, Result};
use crate::frame::Frame;

const Y4M_FILE_MAGIC: &str = "YUV4MPEG2 ";
const Y4M_FRAME_MAGIC: &str = "FRAME";

fn io_err(context: &str, e: std::io::Error) -> DecodeError {
  DecodeError::corrupt(format!("{context}: {e}"))
}

pub struct Y4MWriter<W> {
  inner: W,
  width: usize,
  height: usize,
}

impl<W: Write> Y4MWriter<W> {
  pub fn new(mut inner: W, width: usize, height: usize) -> Result<Self> {
    inner.write_all(Y4M_FILE_MAGIC.as_bytes()).map_err(|e| io_err("writing Y4M file header", e))?;
    write!(inner, "W{width} H{height} F30:1 Ip A1:1 C420jpeg\n").map_err(|e| io_err("writing Y4M file header", e))?;
    Ok(Y4MWriter { inner, width, height })
  }

  pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
    assert_eq!(frame.y().width, self.width);
    assert_eq!(frame.y().height, self.height);

    self.inner.write_all(Y4M_FRAME_MAGIC.as_bytes()).map_err(|e| io_err("writing Y4M frame header", e))?;
    self.inner.write_all(b"\n").map_err(|e| io_err("writing Y4M frame header", e))?;

    for plane in [frame.y(), frame.u(), frame.v()] {
      self.inner.write_all(&plane.visible_bytes()).map_err(|e| io_err("writing Y4M frame data", e))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn writes_expected_header() {
    let mut buf = Vec::new();
    let _w = Y4MWriter::new(&mut buf, 4, 2).unwrap();
    let header = String::from_utf8(buf).unwrap();
    assert!(header.starts_with("YUV4MPEG2 W4 H2"));
  }

  #[test]
  fn writes_one_frame_worth_of_bytes() {
    let mut buf = Vec::new();
    let mut w = Y4MWriter::new(&mut buf, 4, 4).unwrap();
    let frame = Frame::new(4, 4);
    w.write_frame(&frame).unwrap();
    // header + "FRAME\n" + 4*4 luma + 2*2 u + 2*2 v
    assert_eq!(buf.len(), 20 + 6 + 16 + 4 + 4);
  }
}
