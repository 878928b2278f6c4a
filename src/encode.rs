//! Writing frames back to an animated GIF

use crate::error::{CatResult, Error};
use crate::frame::{FrameSequence, TimedFrame};
use crate::progress::ProgressReporter;
use crate::Settings;
use imagequant::Attributes;
use imgref::{ImgRef, ImgVec};
use rgb::{RGB8, RGBA8};
use std::borrow::Cow;
use std::io::Write;

pub(crate) struct RustEncoder<W: Write> {
    writer: Option<W>,
    gif_enc: Option<gif::Encoder<W>>,
    frames_written: usize,
}

impl<W: Write> RustEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            gif_enc: None,
            frames_written: 0,
        }
    }

    /// Pixels to palette. The quantizer is the same for every frame,
    /// so identical frames get identical palettes.
    fn quantize(image: ImgRef<'_, RGBA8>, settings: &Settings) -> CatResult<(ImgVec<u8>, Vec<RGBA8>)> {
        let mut liq = Attributes::new();
        if settings.fast {
            liq.set_speed(10)?;
        }
        liq.set_quality(0, settings.quality.clamp(1, 100))?;
        let mut img = liq.new_image(*image.buf(), image.width(), image.height(), 0.)?;
        if image.pixels().any(|px| px.a == 0) {
            img.add_fixed_color(RGBA8::new(0, 0, 0, 0))?;
        }
        let mut res = liq.quantize(&mut img)?;
        res.set_dithering_level(0.5)?;

        let (pal, pal_img) = res.remapped(&mut img)?;
        debug_assert_eq!(img.width() * img.height(), pal_img.len());

        Ok((ImgVec::new(pal_img, image.width(), image.height()), pal))
    }

    #[inline(never)]
    fn compress_frame(index: usize, frame: &TimedFrame, settings: &Settings) -> CatResult<gif::Frame<'static>> {
        let rgba = frame.frame.to_rgba();
        let (image, pal) = Self::quantize(rgba.as_ref(), settings)?;
        let transparent = pal.iter().position(|p| p.a == 0).map(|i| i as u8);

        let pal_rgb: Vec<RGB8> = pal.iter().map(|p| RGB8::new(p.r, p.g, p.b)).collect();
        let mut pal_bytes = rgb::bytemuck::cast_slice::<RGB8, u8>(&pal_rgb).to_vec();
        // Palette should be power-of-two sized
        let needed_size = 3 * pal.len().max(2).next_power_of_two();
        pal_bytes.resize(needed_size, 0);

        let (buffer, width, height) = image.into_contiguous_buf();
        let err = |_| Error::WrongSize(index, format!("{}×{} is too large for GIF", width, height));
        Ok(gif::Frame {
            delay: delay_centiseconds(frame.duration_ms),
            // Every frame covers the whole canvas
            dispose: gif::DisposalMethod::Background,
            transparent,
            width: u16::try_from(width).map_err(err)?,
            height: u16::try_from(height).map_err(err)?,
            palette: Some(pal_bytes),
            buffer: Cow::Owned(buffer),
            ..gif::Frame::default()
        })
    }

    pub fn write_frame(&mut self, index: usize, frame: &TimedFrame, settings: &Settings) -> CatResult<()> {
        let gif_frame = Self::compress_frame(index, frame, settings)?;

        let writer = &mut self.writer;
        let enc = match self.gif_enc {
            None => {
                let w = writer.take().ok_or(Error::Aborted)?;
                let mut enc = gif::Encoder::new(w, gif_frame.width, gif_frame.height, &[])?;
                enc.set_repeat(gif::Repeat::Infinite)?;
                self.gif_enc.get_or_insert(enc)
            },
            Some(ref mut enc) => enc,
        };

        enc.write_frame(&gif_frame)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Writes the trailer and gives the writer back
    pub fn finish(self) -> CatResult<W> {
        match self.gif_enc {
            Some(enc) => Ok(enc.into_inner()?),
            None => Err(Error::EmptySequence),
        }
    }
}

/// GIF delays are in 1/100s
#[must_use]
pub fn delay_centiseconds(duration_ms: u32) -> u16 {
    (duration_ms.saturating_add(5) / 10).clamp(1, u32::from(u16::MAX)) as u16
}

/// Every frame must match the first one's size
fn check_sizes(frames: &[TimedFrame]) -> CatResult<()> {
    let Some(first) = frames.first() else {
        return Err(Error::EmptySequence);
    };
    let expected = (first.frame.width(), first.frame.height());
    for (i, f) in frames.iter().enumerate().skip(1) {
        let size = (f.frame.width(), f.frame.height());
        if size != expected {
            return Err(Error::WrongSize(i, format!("{}×{}, expected {}×{}", size.0, size.1, expected.0, expected.1)));
        }
    }
    Ok(())
}

/// Encode frames as a GIF that loops forever.
///
/// Frame sizes are checked before anything is written.
/// `ProgressReporter::increase()` is called after each frame is written,
/// and returning `false` from it aborts encoding.
pub fn encode_frames<W: Write>(frames: &[TimedFrame], writer: W, settings: &Settings, reporter: &mut dyn ProgressReporter) -> CatResult<W> {
    check_sizes(frames)?;

    let mut enc = RustEncoder::new(writer);
    for (i, frame) in frames.iter().enumerate() {
        enc.write_frame(i, frame, settings)?;
        log::debug!("wrote frame {i}");
        if !reporter.increase() {
            return Err(Error::Aborted);
        }
    }
    log::info!("encoded {} frames", enc.frames_written);
    enc.finish()
}

/// Same as [`encode_frames`]
pub fn encode<W: Write>(frames: &FrameSequence, writer: W, settings: &Settings, reporter: &mut dyn ProgressReporter) -> CatResult<W> {
    encode_frames(frames.frames(), writer, settings, reporter)
}

#[cfg(test)]
use crate::frame::Frame;
#[cfg(test)]
use crate::progress::NoProgress;
#[cfg(test)]
use crate::Stage;

#[cfg(test)]
fn solid(color: RGB8, w: usize, h: usize) -> Frame {
    Frame::from_rgb(ImgVec::new(vec![color; w * h], w, h))
}

#[test]
fn delays() {
    assert_eq!(delay_centiseconds(0), 1);
    assert_eq!(delay_centiseconds(20), 2);
    assert_eq!(delay_centiseconds(53), 5);
    assert_eq!(delay_centiseconds(55), 6);
    assert_eq!(delay_centiseconds(200), 20);
    assert_eq!(delay_centiseconds(u32::MAX), u16::MAX);
}

#[test]
fn empty() {
    let err = encode_frames(&[], Vec::new(), &Settings::default(), &mut NoProgress {}).unwrap_err();
    assert!(matches!(err, Error::EmptySequence));
    assert_eq!(err.stage(), Stage::Encode);
}

#[test]
fn wrong_size() {
    let frames = [
        TimedFrame::new(solid(RGB8::new(1, 2, 3), 4, 4), 100),
        TimedFrame::new(solid(RGB8::new(1, 2, 3), 4, 4), 100),
        TimedFrame::new(solid(RGB8::new(1, 2, 3), 5, 4), 100),
    ];
    let mut out = Vec::new();
    let err = encode_frames(&frames, &mut out, &Settings::default(), &mut NoProgress {}).unwrap_err();
    assert!(matches!(err, Error::WrongSize(2, _)), "{err}");
    assert_eq!(err.stage(), Stage::Encode);
    // rejected before the header is written
    assert!(out.is_empty());
}

#[test]
fn aborted() {
    struct StopAfter(usize);
    impl ProgressReporter for StopAfter {
        fn increase(&mut self) -> bool {
            self.0 -= 1;
            self.0 > 0
        }
    }

    let frames = vec![TimedFrame::new(solid(RGB8::new(9, 9, 9), 2, 2), 100); 5];
    let err = encode_frames(&frames, Vec::new(), &Settings::default(), &mut StopAfter(2)).unwrap_err();
    assert!(matches!(err, Error::Aborted));
}

#[test]
fn header_and_loop() {
    let frames = [TimedFrame::new(solid(RGB8::new(200, 10, 10), 3, 2), 70)];
    let out = encode_frames(&frames, Vec::new(), &Settings::default(), &mut NoProgress {}).unwrap();
    assert_eq!(&out[..6], b"GIF89a");
    assert!(out.windows(11).any(|w| w == b"NETSCAPE2.0"));
    assert_eq!(out.last(), Some(&0x3B));
}
