// Demo CLI: decodes an IVF/VP8 file to a Y4M raw-YUV dump, one frame at a
// time, using the library crate.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tinyvp8::decoder::Vp8Decoder;
use tinyvp8::ivf::IvfReader;
use tinyvp8::y4m::Y4MWriter;

/// Decode a VP8 elementary stream (in an IVF container) to Y4M.
#[derive(Parser)]
#[command(version, about)]
struct Opt {
  /// Input .ivf file containing a VP8 bitstream
  input: PathBuf,

  /// Output .y4m file; defaults to stdout
  output: Option<PathBuf>,

  /// Stop after decoding this many frames
  #[arg(long)]
  limit: Option<usize>,
}

fn run(opt: Opt) -> tinyvp8::Result<()> {
  let input = File::open(&opt.input)
    .map_err(|e| tinyvp8::DecodeError::corrupt(format!("opening {}: {e}", opt.input.display())))?;
  let mut ivf = IvfReader::new(input)?;
  log::info!("decoding {} ({}x{}, {} frames)", opt.input.display(), ivf.width, ivf.height, ivf.frame_count);

  let mut decoder = Vp8Decoder::new();
  let mut writer: Option<Y4MWriter<Box<dyn std::io::Write>>> = None;

  let limit = opt.limit.unwrap_or(usize::MAX);
  let mut decoded = 0;
  while decoded < limit {
    let Some((timestamp, payload)) = ivf.read_frame()? else { break };
    log::debug!("frame {decoded} at timestamp {timestamp}, {} bytes", payload.len());

    decoder.decode_frame(&payload)?;
    decoded += 1;

    let Some(image) = decoder.get_current_image() else { continue };
    if writer.is_none() {
      let out: Box<dyn std::io::Write> = match &opt.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
          tinyvp8::DecodeError::corrupt(format!("creating {}: {e}", path.display()))
        })?)),
        None => Box::new(std::io::stdout()),
      };
      writer = Some(Y4MWriter::new(out, image.y().width, image.y().height)?);
    }
    writer.as_mut().unwrap().write_frame(image)?;
  }

  log::info!("decoded {decoded} frame(s)");
  Ok(())
}

fn main() -> ExitCode {
  env_logger::init();
  let opt = Opt::parse();
  match run(opt) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("error: {e}");
      ExitCode::FAILURE
    }
  }
}
