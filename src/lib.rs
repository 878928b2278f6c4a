/*
 gifspeed: speed up or slow down animated GIFs

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as
 published by the Free Software Foundation, either version 3 of the
 License, or (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
//! Changes playback speed of GIF animations.
//!
//! Frames are decoded with [`extract()`], retimed (and for slow motion, optionally
//! cross-faded) with [`resample()`], and written back with [`encode()`].
//! [`retime()`] does all three.
//!
//! ```rust,no_run
//! # fn main() -> gifspeed::CatResult<()> {
//! let input = std::fs::read("in.gif")?;
//! let policy = gifspeed::ResamplePolicy::new(-10., true);
//! let out = gifspeed::retime(&input[..], Vec::new(), &policy, &Default::default(), &mut gifspeed::progress::NoProgress {})?;
//! std::fs::write("out.gif", out)?;
//! # Ok(()) }
//! ```

mod error;
pub use crate::error::*;
pub mod blend;
pub mod frame;
pub use crate::frame::{ColorMode, Frame, FrameSequence, TimedFrame};
pub mod extract;
pub use crate::extract::{extract, extract_file, GifExtractor};
pub mod resample;
pub use crate::resample::{multiplier, resample, ResamplePolicy};
pub mod encode;
pub use crate::encode::{encode, encode_frames};
pub mod progress;
use crate::progress::ProgressReporter;

use std::io::prelude::*;

/// Encoder and input limits
#[derive(Copy, Clone, Debug)]
pub struct Settings {
    /// 1-100. Lower values let the palette quantizer be less precise.
    pub quality: u8,
    /// Lower quality, but faster encode
    pub fast: bool,
    /// Refuse to decode animations with more frames than this
    pub max_frames: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: 100,
            fast: false,
            max_frames: None,
        }
    }
}

/// Decode a GIF, change its speed and encode it again.
///
/// Nothing is written to `output` if decoding or resampling fails.
pub fn retime<R: Read, W: Write>(input: R, output: W, policy: &ResamplePolicy, settings: &Settings, reporter: &mut dyn ProgressReporter) -> CatResult<W> {
    let frames = extract(input, settings.max_frames)?;
    let frames = resample(frames, policy)?;
    encode(&frames, output, settings, reporter)
}
