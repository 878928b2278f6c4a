//! Reading GIF animations into a [`FrameSequence`]

use crate::error::{CatResult, Error};
use crate::frame::{Frame, FrameSequence, TimedFrame};
use gif::Decoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Duration of frames that don't specify one
pub const DEFAULT_DURATION_MS: u32 = 100;

/// Decodes every frame of a GIF, composited on the full canvas.
///
/// The decoder (and the reader it owns) is dropped when extraction finishes or fails.
pub struct GifExtractor<R: Read> {
    decoder: Decoder<R>,
    screen: gif_dispose::Screen,
    max_frames: Option<usize>,
}

impl<R: Read> GifExtractor<R> {
    /// Reads the GIF header. Fails if the input is not a GIF.
    pub fn new(input: R) -> CatResult<Self> {
        let mut gif_opts = gif::DecodeOptions::new();
        // Important:
        gif_opts.set_color_output(gif::ColorOutput::Indexed);

        let decoder = gif_opts.read_info(input)?;
        let screen = gif_dispose::Screen::new_decoder(&decoder);
        log::debug!("GIF canvas is {}×{}", decoder.width(), decoder.height());

        Ok(Self {
            decoder,
            screen,
            max_frames: None,
        })
    }

    /// Fail with [`Error::TooManyFrames`] instead of decoding more than `limit` frames
    #[must_use]
    pub fn max_frames(mut self, limit: Option<usize>) -> Self {
        self.max_frames = limit;
        self
    }

    pub fn extract(mut self) -> CatResult<FrameSequence> {
        let mut frames = Vec::new();
        loop {
            let idx = frames.len();
            let frame = match self.decoder.read_next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => return Err(Error::DecodeFrame(idx, err)),
            };
            if self.max_frames.is_some_and(|limit| idx >= limit) {
                return Err(Error::TooManyFrames(idx));
            }

            let duration_ms = if frame.delay > 0 { u32::from(frame.delay) * 10 } else { DEFAULT_DURATION_MS };
            self.screen.blit_frame(frame).map_err(|err| Error::Dispose(idx, err))?;
            // The screen is overwritten by the next frame, so the pixels have to be copied
            let pixels = self.screen.pixels_rgba().map_buf(|b| b.to_owned());
            log::debug!("frame {idx}: {}×{} {duration_ms}ms", pixels.width(), pixels.height());
            frames.push(TimedFrame::new(Frame::from_rgba(pixels), duration_ms));
        }

        let frames = FrameSequence::new(frames).ok_or(Error::NoFrames)?;
        log::info!("decoded {} frames, {}ms total", frames.len(), frames.total_duration_ms());
        Ok(frames)
    }
}

/// Decode all frames from a GIF in memory or any other reader
pub fn extract<R: Read>(input: R, max_frames: Option<usize>) -> CatResult<FrameSequence> {
    GifExtractor::new(input)?.max_frames(max_frames).extract()
}

/// Decode all frames of a GIF file
pub fn extract_file(path: &Path, max_frames: Option<usize>) -> CatResult<FrameSequence> {
    let file = File::open(path).map_err(|err| Error::Decode(err.into()))?;
    extract(BufReader::new(file), max_frames)
}

#[cfg(test)]
use crate::frame::RGBA8;
#[cfg(test)]
use crate::Stage;
#[cfg(test)]
use std::borrow::Cow;

#[cfg(test)]
const PALETTE: [u8; 12] = [0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255];

/// Single-color 4×4 frames, `(palette index, delay in 1/100s)`
#[cfg(test)]
fn make_gif(frames: &[(u8, u16)]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = gif::Encoder::new(&mut out, 4, 4, &PALETTE).unwrap();
        for &(color, delay) in frames {
            let frame = gif::Frame {
                width: 4,
                height: 4,
                delay,
                buffer: Cow::Owned(vec![color; 16]),
                ..gif::Frame::default()
            };
            enc.write_frame(&frame).unwrap();
        }
    }
    out
}

#[test]
fn durations() {
    let gif = make_gif(&[(1, 5), (2, 0), (3, 12)]);
    let seq = extract(&gif[..], None).unwrap();
    assert_eq!(seq.durations().collect::<Vec<_>>(), [50, DEFAULT_DURATION_MS, 120]);
    assert_eq!(seq.first().frame.width(), 4);
    assert_eq!(seq.first().frame.height(), 4);
}

#[test]
fn pixels_are_copied_per_frame() {
    let gif = make_gif(&[(1, 10), (2, 10), (3, 10)]);
    let seq = extract(&gif[..], None).unwrap();
    let colors: Vec<RGBA8> = seq.frames().iter().map(|f| f.frame.to_rgba().buf()[0]).collect();
    assert_eq!(colors, [
        RGBA8::new(255, 0, 0, 255),
        RGBA8::new(0, 255, 0, 255),
        RGBA8::new(0, 0, 255, 255),
    ]);
}

#[test]
fn partial_frames_are_composited() {
    let mut out = Vec::new();
    {
        let mut enc = gif::Encoder::new(&mut out, 4, 4, &PALETTE).unwrap();
        enc.write_frame(&gif::Frame {
            width: 4, height: 4, delay: 10,
            dispose: gif::DisposalMethod::Keep,
            buffer: Cow::Owned(vec![1; 16]),
            ..gif::Frame::default()
        }).unwrap();
        enc.write_frame(&gif::Frame {
            left: 2, top: 2, width: 2, height: 2, delay: 10,
            buffer: Cow::Owned(vec![2; 4]),
            ..gif::Frame::default()
        }).unwrap();
    }
    let seq = extract(&out[..], None).unwrap();
    let second = seq.frames()[1].frame.to_rgba();
    assert_eq!(second.width(), 4);
    assert_eq!(second[(0usize, 0usize)], RGBA8::new(255, 0, 0, 255));
    assert_eq!(second[(3usize, 3usize)], RGBA8::new(0, 255, 0, 255));
}

#[test]
fn no_frames() {
    let gif = make_gif(&[]);
    let err = extract(&gif[..], None).unwrap_err();
    assert!(matches!(err, Error::NoFrames), "{err}");
    assert_eq!(err.stage(), Stage::Decode);
}

#[test]
fn not_a_gif() {
    let err = extract(&b"\x89PNG\r\n\x1a\n not really"[..], None).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err}");
    assert_eq!(err.stage(), Stage::Decode);
}

#[test]
fn truncated() {
    let gif = make_gif(&[(1, 10), (2, 10)]);
    let err = extract(&gif[..gif.len() - 12], None).unwrap_err();
    assert_eq!(err.stage(), Stage::Decode);
    assert_eq!(err.frame_index(), Some(1));
}

#[test]
fn frame_limit() {
    let gif = make_gif(&[(1, 10); 5]);
    assert_eq!(extract(&gif[..], Some(5)).unwrap().len(), 5);
    let err = extract(&gif[..], Some(4)).unwrap_err();
    assert!(matches!(err, Error::TooManyFrames(4)), "{err}");
}

#[test]
fn missing_file() {
    let err = extract_file(Path::new("/nonexistent/anim.gif"), None).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err}");
}
