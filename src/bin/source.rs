//! Where the input GIF comes from

use crate::BinResult;
use gifspeed::{CatResult, FrameSequence};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub enum SrcPath<'a> {
    Path(&'a Path),
    Stdin,
}

impl<'a> SrcPath<'a> {
    pub fn new(path: &'a OsStr) -> Self {
        if path == "-" {
            Self::Stdin
        } else {
            Self::Path(Path::new(path))
        }
    }

    /// Checks the GIF signature, then decodes all frames
    pub fn extract(&self, max_frames: Option<usize>) -> BinResult<CatResult<FrameSequence>> {
        match *self {
            Self::Path(path) => {
                let mut file = File::open(path)
                    .map_err(|e| format!("Unable to open the input file \"{}\": {}", path.display(), e))?;
                let mut magic = [0; 6];
                file.read_exact(&mut magic).map_err(|_| format!("\"{}\" is too short to be a GIF", path.display()))?;
                check_signature(&magic)?;
                drop(file);
                Ok(gifspeed::extract_file(path, max_frames))
            },
            Self::Stdin => {
                let mut buf = Vec::new();
                io::stdin().lock().read_to_end(&mut buf)?;
                check_signature(&buf)?;
                Ok(gifspeed::extract(&buf[..], max_frames))
            },
        }
    }
}

fn check_signature(data: &[u8]) -> BinResult<()> {
    match data.get(..6) {
        Some(b"GIF87a" | b"GIF89a") => Ok(()),
        Some(m) if m.starts_with(b"\x89PNG") => Err("The input is a PNG file, not a GIF animation".into()),
        _ => Err("The input is not a GIF file".into()),
    }
}
