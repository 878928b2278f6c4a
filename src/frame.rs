//! Frames and frame sequences passed between decoding, resampling and encoding

pub use imgref::{ImgRef, ImgVec};
pub use rgb::{RGB8, RGBA8};

use crate::blend::{self, GeometryMismatch};

/// How the pixels of a [`Frame`] are stored
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
}

#[derive(Debug, Clone)]
enum Pixels {
    Rgb(ImgVec<RGB8>),
    Rgba(ImgVec<RGBA8>),
}

/// One still image of an animation
///
/// Frames are never modified. Conversions make new buffers.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Pixels,
}

/// Same color mode, same size, same pixels. Stride doesn't matter.
impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        match (&self.pixels, &other.pixels) {
            (Pixels::Rgb(a), Pixels::Rgb(b)) => same_pixels(a.as_ref(), b.as_ref()),
            (Pixels::Rgba(a), Pixels::Rgba(b)) => same_pixels(a.as_ref(), b.as_ref()),
            _ => false,
        }
    }
}

fn same_pixels<T: Copy + PartialEq>(a: ImgRef<'_, T>, b: ImgRef<'_, T>) -> bool {
    a.width() == b.width() && a.height() == b.height() && a.pixels().eq(b.pixels())
}

impl Frame {
    #[inline]
    #[must_use]
    pub fn from_rgb(image: ImgVec<RGB8>) -> Self {
        Self { pixels: Pixels::Rgb(image) }
    }

    #[inline]
    #[must_use]
    pub fn from_rgba(image: ImgVec<RGBA8>) -> Self {
        Self { pixels: Pixels::Rgba(image) }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        match &self.pixels {
            Pixels::Rgb(img) => img.width(),
            Pixels::Rgba(img) => img.width(),
        }
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        match &self.pixels {
            Pixels::Rgb(img) => img.height(),
            Pixels::Rgba(img) => img.height(),
        }
    }

    #[inline]
    #[must_use]
    pub fn color_mode(&self) -> ColorMode {
        match self.pixels {
            Pixels::Rgb(_) => ColorMode::Rgb,
            Pixels::Rgba(_) => ColorMode::Rgba,
        }
    }

    /// Pixels without the alpha channel. Alpha is dropped, not composited.
    #[must_use]
    pub fn to_rgb(&self) -> ImgVec<RGB8> {
        match &self.pixels {
            Pixels::Rgb(img) => contiguous(img.as_ref()),
            Pixels::Rgba(img) => ImgVec::new(
                img.pixels().map(|px| RGB8::new(px.r, px.g, px.b)).collect(),
                img.width(),
                img.height(),
            ),
        }
    }

    /// RGB frames become fully opaque
    #[must_use]
    pub fn to_rgba(&self) -> ImgVec<RGBA8> {
        match &self.pixels {
            Pixels::Rgb(img) => ImgVec::new(
                img.pixels().map(|px| RGBA8::new(px.r, px.g, px.b, 255)).collect(),
                img.width(),
                img.height(),
            ),
            Pixels::Rgba(img) => contiguous(img.as_ref()),
        }
    }

    /// Cross-fade between `self` (`alpha` = 0) and `other` (`alpha` = 1).
    ///
    /// Both frames are converted to RGB first, so mixing RGB and RGBA frames is fine.
    pub fn blend(&self, other: &Self, alpha: f32) -> Result<Self, GeometryMismatch> {
        let a = self.to_rgb();
        let b = other.to_rgb();
        blend::blend(a.as_ref(), b.as_ref(), alpha).map(Self::from_rgb)
    }
}

fn contiguous<T: Copy>(img: ImgRef<'_, T>) -> ImgVec<T> {
    ImgVec::new(img.pixels().collect(), img.width(), img.height())
}

/// A frame and how long it's displayed, in milliseconds
#[derive(Debug, Clone, PartialEq)]
pub struct TimedFrame {
    pub frame: Frame,
    pub duration_ms: u32,
}

impl TimedFrame {
    #[inline]
    #[must_use]
    pub fn new(frame: Frame, duration_ms: u32) -> Self {
        Self { frame, duration_ms }
    }
}

/// Frames in playback order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    frames: Vec<TimedFrame>,
}

impl FrameSequence {
    /// `None` if there are no frames
    #[must_use]
    pub fn new(frames: Vec<TimedFrame>) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        Some(Self { frames })
    }

    /// For outputs built from a non-empty input
    pub(crate) fn from_nonempty(frames: Vec<TimedFrame>) -> Self {
        debug_assert!(!frames.is_empty());
        Self { frames }
    }

    #[inline]
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub fn first(&self) -> &TimedFrame {
        &self.frames[0]
    }

    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[TimedFrame] {
        &self.frames
    }

    pub fn durations(&self) -> impl Iterator<Item = u32> + '_ {
        self.frames.iter().map(|f| f.duration_ms)
    }

    /// Sum of all durations in milliseconds
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.durations().map(u64::from).sum()
    }

    #[inline]
    #[must_use]
    pub fn into_frames(self) -> Vec<TimedFrame> {
        self.frames
    }

    /// The first frame, and an iterator over the rest
    #[must_use]
    pub fn split_first(self) -> (TimedFrame, std::vec::IntoIter<TimedFrame>) {
        let mut frames = self.frames;
        // never empty
        let first = frames.remove(0);
        (first, frames.into_iter())
    }
}

impl IntoIterator for FrameSequence {
    type Item = TimedFrame;
    type IntoIter = std::vec::IntoIter<TimedFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a TimedFrame;
    type IntoIter = std::slice::Iter<'a, TimedFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[test]
fn empty_sequence() {
    assert!(FrameSequence::new(vec![]).is_none());
}

#[test]
fn color_mode_conversions() {
    let rgba = Frame::from_rgba(ImgVec::new(vec![RGBA8::new(10, 20, 30, 0), RGBA8::new(1, 2, 3, 255)], 2, 1));
    assert_eq!(rgba.color_mode(), ColorMode::Rgba);
    let rgb = rgba.to_rgb();
    assert_eq!(rgb.buf(), &[RGB8::new(10, 20, 30), RGB8::new(1, 2, 3)]);

    let back = Frame::from_rgb(rgb).to_rgba();
    assert_eq!(back.buf(), &[RGBA8::new(10, 20, 30, 255), RGBA8::new(1, 2, 3, 255)]);
}

#[test]
fn strided_frame() {
    let buf = vec![RGB8::new(1, 1, 1), RGB8::new(2, 2, 2), RGB8::new(9, 9, 9), RGB8::new(3, 3, 3), RGB8::new(4, 4, 4)];
    let img = ImgVec::new_stride(buf, 2, 2, 3);
    let f = Frame::from_rgb(img);
    let out = f.to_rgb();
    assert_eq!(out.stride(), 2);
    assert_eq!(out.buf(), &[RGB8::new(1, 1, 1), RGB8::new(2, 2, 2), RGB8::new(3, 3, 3), RGB8::new(4, 4, 4)]);
}

#[test]
fn sequence_totals() {
    let f = Frame::from_rgb(ImgVec::new(vec![RGB8::default()], 1, 1));
    let seq = FrameSequence::new(vec![TimedFrame::new(f.clone(), 100), TimedFrame::new(f, 40)]).unwrap();
    assert_eq!(seq.len(), 2);
    assert_eq!(seq.total_duration_ms(), 140);
    assert_eq!(seq.durations().collect::<Vec<_>>(), [100, 40]);
}

#[test]
fn split_first() {
    let f = Frame::from_rgb(ImgVec::new(vec![RGB8::default()], 1, 1));
    let one = FrameSequence::new(vec![TimedFrame::new(f.clone(), 30)]).unwrap();
    let (first, rest) = one.split_first();
    assert_eq!(first.duration_ms, 30);
    assert_eq!(rest.len(), 0);

    let seq = FrameSequence::new(vec![TimedFrame::new(f.clone(), 10), TimedFrame::new(f.clone(), 20), TimedFrame::new(f, 30)]).unwrap();
    let (first, rest) = seq.split_first();
    assert_eq!(first.duration_ms, 10);
    assert_eq!(rest.map(|f| f.duration_ms).collect::<Vec<_>>(), [20, 30]);
}
