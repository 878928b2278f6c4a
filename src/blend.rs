//! Linear cross-fade of two RGB images

use imgref::{ImgRef, ImgVec};
use rgb::RGB8;
use std::fmt;

/// The two images don't have the same width and height
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GeometryMismatch {
    pub first: (usize, usize),
    pub second: (usize, usize),
}

impl fmt::Display for GeometryMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} can't be blended with {}×{}", self.first.0, self.first.1, self.second.0, self.second.1)
    }
}

impl std::error::Error for GeometryMismatch {}

/// `(1 - alpha) * a + alpha * b` for every channel of every pixel.
///
/// `alpha` is clamped to 0..=1. At 0 the result is exactly `a`, at 1 exactly `b`.
pub fn blend(a: ImgRef<'_, RGB8>, b: ImgRef<'_, RGB8>, alpha: f32) -> Result<ImgVec<RGB8>, GeometryMismatch> {
    if a.width() != b.width() || a.height() != b.height() {
        return Err(GeometryMismatch {
            first: (a.width(), a.height()),
            second: (b.width(), b.height()),
        });
    }

    let alpha = if alpha.is_nan() { 0. } else { alpha.clamp(0., 1.) };
    let buf = a.pixels().zip(b.pixels()).map(|(a, b)| RGB8 {
        r: mix(a.r, b.r, alpha),
        g: mix(a.g, b.g, alpha),
        b: mix(a.b, b.b, alpha),
    }).collect();
    Ok(ImgVec::new(buf, a.width(), a.height()))
}

#[inline(always)]
fn mix(a: u8, b: u8, alpha: f32) -> u8 {
    let a = f32::from(a);
    // stays within a..=b, so the cast can't truncate
    (a + (f32::from(b) - a) * alpha).round() as u8
}

#[cfg(test)]
fn img(px: &[(u8, u8, u8)], width: usize) -> ImgVec<RGB8> {
    ImgVec::new(px.iter().map(|&(r, g, b)| RGB8::new(r, g, b)).collect(), width, px.len() / width)
}

#[test]
fn endpoints() {
    let a = img(&[(0, 100, 255), (7, 8, 9)], 2);
    let b = img(&[(255, 0, 1), (200, 8, 0)], 2);
    assert_eq!(blend(a.as_ref(), b.as_ref(), 0.).unwrap().buf(), a.buf());
    assert_eq!(blend(a.as_ref(), b.as_ref(), 1.).unwrap().buf(), b.buf());
    // out of range alpha is clamped
    assert_eq!(blend(a.as_ref(), b.as_ref(), -3.).unwrap().buf(), a.buf());
    assert_eq!(blend(a.as_ref(), b.as_ref(), 7.).unwrap().buf(), b.buf());
}

#[test]
fn midpoint() {
    let a = img(&[(0, 100, 255)], 1);
    let b = img(&[(255, 0, 1)], 1);
    let m = blend(a.as_ref(), b.as_ref(), 0.5).unwrap();
    assert_eq!(m.buf(), &[RGB8::new(128, 50, 128)]);
}

#[test]
fn monotonic() {
    let a = img(&[(0, 250, 30)], 1);
    let b = img(&[(255, 3, 31)], 1);
    let mut prev = a.buf()[0];
    for step in 1..=64 {
        let px = blend(a.as_ref(), b.as_ref(), step as f32 / 64.).unwrap().buf()[0];
        assert!(px.r >= prev.r);
        assert!(px.g <= prev.g);
        assert!(px.b >= prev.b);
        prev = px;
    }
    assert_eq!(prev, b.buf()[0]);
}

#[test]
fn mismatch() {
    let a = img(&[(0, 0, 0); 4], 2);
    let b = img(&[(0, 0, 0); 4], 4);
    let err = blend(a.as_ref(), b.as_ref(), 0.5).unwrap_err();
    assert_eq!(err.first, (2, 2));
    assert_eq!(err.second, (4, 1));
}
