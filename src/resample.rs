//! Changing playback speed of a decoded animation
//!
//! Speeding up only shortens frame durations. Slowing down lengthens them,
//! and with interpolation enabled, also inserts cross-faded frames between
//! every pair of original frames, so that motion doesn't look held.

use crate::blend::blend;
use crate::error::{CatResult, Error};
use crate::frame::{Frame, FrameSequence, TimedFrame};

/// Speed is clamped to `-MAX_SPEED..=MAX_SPEED`
pub const MAX_SPEED: f64 = 10.;

/// No resampled frame is displayed for less than this many milliseconds
pub const MIN_DURATION_MS: u32 = 20;

const MIN_MULTIPLIER: f64 = 0.1;

/// How to resample an animation
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ResamplePolicy {
    /// 0 keeps the speed, positive is faster, negative is slower. -10 to 10.
    pub speed: f64,
    /// Synthesize in-between frames when slowing down
    pub interpolate: bool,
}

impl ResamplePolicy {
    #[must_use]
    pub fn new(speed: f64, interpolate: bool) -> Self {
        Self {
            speed: clamp_speed(speed),
            interpolate,
        }
    }

    /// Number of frames inserted between each pair of original frames.
    ///
    /// 0 unless interpolating a slow-down.
    #[must_use]
    pub fn inserted_frames(&self) -> usize {
        let speed = clamp_speed(self.speed);
        if self.interpolate && speed < 0. {
            (speed.abs() / 5.).floor() as usize + 1
        } else {
            0
        }
    }

    /// How many frames `resample` will output for `input_frames` frames
    #[must_use]
    pub fn output_len(&self, input_frames: usize) -> usize {
        match input_frames {
            0 => 0,
            k => (k - 1) * (self.inserted_frames() + 1) + 1,
        }
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return 0.;
    }
    speed.clamp(-MAX_SPEED, MAX_SPEED)
}

/// Factor applied to frame durations for the given speed
#[must_use]
pub fn multiplier(speed: f64) -> f64 {
    let speed = clamp_speed(speed);
    if speed > 0. {
        1. / (1. + 0.09 * speed)
    } else if speed < 0. {
        (1. - speed / 10.).max(MIN_MULTIPLIER)
    } else {
        1.
    }
}

/// `duration_ms * multiplier`, rounded (half to even), but never below [`MIN_DURATION_MS`]
#[must_use]
pub fn scaled_duration(duration_ms: u32, multiplier: f64) -> u32 {
    let scaled = (f64::from(duration_ms) * multiplier).round_ties_even();
    // float to int casts saturate
    (scaled as u32).max(MIN_DURATION_MS)
}

/// Make a new sequence that plays at the speed set in the policy.
///
/// Fails only when interpolating between frames of different sizes,
/// and then nothing is returned.
pub fn resample(input: FrameSequence, policy: &ResamplePolicy) -> CatResult<FrameSequence> {
    let speed = clamp_speed(policy.speed);
    if speed == 0. {
        log::debug!("speed 0, keeping all {} frames as they are", input.len());
        return Ok(input);
    }

    let output = if policy.interpolate && speed < 0. {
        interpolated(input, speed, policy.inserted_frames())?
    } else {
        retimed(input, multiplier(speed))
    };

    log::info!("resampled at speed {speed}: {} frames, {}ms total", output.len(), output.total_duration_ms());
    Ok(output)
}

fn retimed(input: FrameSequence, multiplier: f64) -> FrameSequence {
    log::debug!("duration multiplier {multiplier:.3}");
    let frames = input.into_iter().map(|TimedFrame { frame, duration_ms }| {
        TimedFrame::new(frame, scaled_duration(duration_ms, multiplier))
    }).collect();
    FrameSequence::from_nonempty(frames)
}

fn interpolated(input: FrameSequence, speed: f64, inserted: usize) -> CatResult<FrameSequence> {
    if input.len() < 2 {
        log::debug!("single frame, nothing to interpolate");
        return Ok(input);
    }

    // Every frame gets the first frame's duration, stretched
    let base_duration = input.first().duration_ms;
    let stretch = 1. + speed.abs() / 10.;

    let mut out = Vec::with_capacity((input.len() - 1) * (inserted + 1) + 1);
    let (mut current, frames) = input.split_first();
    let mut current_rgb = current.frame.to_rgb();
    let mut new_duration = current.duration_ms;

    for (i, next) in frames.enumerate() {
        new_duration = scaled_duration(base_duration, stretch);

        let next_rgb = next.frame.to_rgb();
        let mut blended = Vec::with_capacity(inserted);
        for j in 0..inserted {
            let alpha = (j + 1) as f32 / (inserted + 1) as f32;
            let frame = blend(current_rgb.as_ref(), next_rgb.as_ref(), alpha)
                .map_err(|e| Error::Blend(i + 1, e.to_string()))?;
            blended.push(TimedFrame::new(Frame::from_rgb(frame), new_duration));
        }
        log::debug!("frame {i}: {} in-between frames, {new_duration}ms each", blended.len());

        out.push(TimedFrame::new(current.frame, new_duration));
        out.append(&mut blended);
        current = next;
        current_rgb = next_rgb;
    }

    // The last frame keeps the duration assigned in the last iteration
    out.push(TimedFrame::new(current.frame, new_duration));
    Ok(FrameSequence::from_nonempty(out))
}

#[cfg(test)]
use crate::frame::{ColorMode, ImgVec, RGB8, RGBA8};

#[cfg(test)]
fn solid(v: u8) -> Frame {
    Frame::from_rgb(ImgVec::new(vec![RGB8::new(v, v, v); 4], 2, 2))
}

#[cfg(test)]
fn seq(durations: &[u32]) -> FrameSequence {
    let frames = durations.iter().enumerate()
        .map(|(i, &d)| TimedFrame::new(solid((i * 60) as u8), d))
        .collect();
    FrameSequence::new(frames).unwrap()
}

#[cfg(test)]
fn durations(seq: &FrameSequence) -> Vec<u32> {
    seq.durations().collect()
}

#[test]
fn multipliers() {
    assert_eq!(multiplier(0.), 1.);
    assert!((multiplier(10.) - 1. / 1.9).abs() < 1e-12);
    assert_eq!(multiplier(-10.), 2.);
    assert_eq!(multiplier(-5.), 1.5);
    // clamped to the documented range
    assert_eq!(multiplier(100.), multiplier(10.));
    assert_eq!(multiplier(-100.), 2.);
    assert_eq!(multiplier(f64::NAN), 1.);
}

#[test]
fn multiplier_is_monotonic() {
    let mut prev = f64::INFINITY;
    for s in -100..=100 {
        let m = multiplier(f64::from(s) / 10.);
        assert!(m > 0.);
        assert!(m <= prev);
        prev = m;
    }
}

#[test]
fn scaled_duration_floor_and_rounding() {
    assert_eq!(scaled_duration(100, 1. / 1.9), 53);
    assert_eq!(scaled_duration(10, 0.6), MIN_DURATION_MS);
    assert_eq!(scaled_duration(0, 2.), MIN_DURATION_MS);
    // half to even
    assert_eq!(scaled_duration(45, 0.5), 22);
    assert_eq!(scaled_duration(47, 0.5), 24);
    assert_eq!(scaled_duration(u32::MAX, 2.), u32::MAX);
}

#[test]
fn identity_at_zero() {
    let input = seq(&[100, 10, 70]);
    for interpolate in [false, true] {
        let out = resample(input.clone(), &ResamplePolicy::new(0., interpolate)).unwrap();
        assert_eq!(out, input);
    }
}

#[test]
fn speed_up_shortens() {
    let input = seq(&[100, 30, 250, 20, 10]);
    for s in 1..=20 {
        for interpolate in [false, true] {
            let out = resample(input.clone(), &ResamplePolicy::new(f64::from(s) / 2., interpolate)).unwrap();
            assert_eq!(out.len(), input.len());
            for (o, i) in out.durations().zip(input.durations()) {
                assert!(o >= MIN_DURATION_MS);
                assert!(o <= i.max(MIN_DURATION_MS));
            }
        }
    }
}

#[test]
fn slow_down_without_interpolation_lengthens() {
    let input = seq(&[100, 30, 250, 10]);
    for s in 1..=20 {
        let out = resample(input.clone(), &ResamplePolicy::new(-f64::from(s) / 2., false)).unwrap();
        assert_eq!(out.len(), input.len());
        for ((o, i), (of, inf)) in out.durations().zip(input.durations()).zip(out.frames().iter().zip(input.frames())) {
            assert!(o >= i);
            assert!(o >= MIN_DURATION_MS);
            assert_eq!(of.frame, inf.frame);
        }
    }
}

#[test]
fn interpolated_frame_counts() {
    for k in 1..=6 {
        let input = seq(&vec![100; k]);
        for s in 0..=20 {
            let speed = -f64::from(s) / 2.;
            let policy = ResamplePolicy::new(speed, true);
            let out = resample(input.clone(), &policy).unwrap();
            let n = if speed < 0. { (speed.abs() / 5.).floor() as usize + 1 } else { 0 };
            assert_eq!(out.len(), (k - 1) * (n + 1) + 1, "k={k} speed={speed}");
            assert_eq!(out.len(), policy.output_len(k));
        }
    }
}

#[test]
fn inserted_frames_steps() {
    assert_eq!(ResamplePolicy::new(-0.5, true).inserted_frames(), 1);
    assert_eq!(ResamplePolicy::new(-4.9, true).inserted_frames(), 1);
    assert_eq!(ResamplePolicy::new(-5., true).inserted_frames(), 2);
    assert_eq!(ResamplePolicy::new(-9.9, true).inserted_frames(), 2);
    assert_eq!(ResamplePolicy::new(-10., true).inserted_frames(), 3);
    assert_eq!(ResamplePolicy::new(-50., true).inserted_frames(), 3);
    assert_eq!(ResamplePolicy::new(-10., false).inserted_frames(), 0);
    assert_eq!(ResamplePolicy::new(10., true).inserted_frames(), 0);
}

#[test]
fn single_frame_is_kept() {
    let input = seq(&[70]);
    let out = resample(input.clone(), &ResamplePolicy::new(-10., true)).unwrap();
    assert_eq!(out, input);
}

#[test]
fn scenario_fast_forward() {
    let out = resample(seq(&[100, 100, 100]), &ResamplePolicy::new(10., false)).unwrap();
    assert_eq!(durations(&out), [53, 53, 53]);
}

#[test]
fn scenario_slow_motion_interpolated() {
    let input = seq(&[100, 100]);
    let out = resample(input.clone(), &ResamplePolicy::new(-10., true)).unwrap();
    assert_eq!(out.len(), 5);
    assert_eq!(durations(&out), [200; 5]);

    let frames = out.frames();
    assert_eq!(frames[0].frame, input.frames()[0].frame);
    assert_eq!(frames[4].frame, input.frames()[1].frame);
    // 0 → 60 in quarters
    let levels: Vec<u8> = frames[1..4].iter().map(|f| f.frame.to_rgb().buf()[0].r).collect();
    assert_eq!(levels, [15, 30, 45]);
    assert!(frames[1..4].iter().all(|f| f.frame.color_mode() == ColorMode::Rgb));
}

#[test]
fn scenario_slow_motion_plain() {
    let out = resample(seq(&[100, 100]), &ResamplePolicy::new(-10., false)).unwrap();
    assert_eq!(durations(&out), [200, 200]);
}

#[test]
fn interpolation_uses_first_frame_duration() {
    let out = resample(seq(&[40, 100, 300]), &ResamplePolicy::new(-5., true)).unwrap();
    // n = 2, every frame 40 * 1.5
    assert_eq!(durations(&out), [60; 7]);
}

#[test]
fn interpolation_duration_floor() {
    let out = resample(seq(&[10, 10]), &ResamplePolicy::new(-1., true)).unwrap();
    assert_eq!(durations(&out), [MIN_DURATION_MS; 3]);
}

#[test]
fn interpolation_normalizes_color_mode() {
    let a = Frame::from_rgba(ImgVec::new(vec![RGBA8::new(0, 0, 0, 0); 4], 2, 2));
    let b = solid(200);
    let input = FrameSequence::new(vec![TimedFrame::new(a, 100), TimedFrame::new(b, 100)]).unwrap();
    let out = resample(input, &ResamplePolicy::new(-1., true)).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out.frames()[1].frame.to_rgb().buf(), &[RGB8::new(100, 100, 100); 4]);
}

#[test]
fn interpolation_size_mismatch() {
    let big = Frame::from_rgb(ImgVec::new(vec![RGB8::default(); 9], 3, 3));
    let input = FrameSequence::new(vec![
        TimedFrame::new(solid(0), 100),
        TimedFrame::new(solid(1), 100),
        TimedFrame::new(big, 100),
    ]).unwrap();
    let err = resample(input.clone(), &ResamplePolicy::new(-3., true)).unwrap_err();
    assert!(matches!(err, Error::Blend(2, _)), "{err}");
    assert_eq!(err.frame_index(), Some(2));
    assert_eq!(err.stage(), crate::Stage::Resample);

    // a mismatch right after the first frame is also a resample error
    let input = FrameSequence::new(vec![
        TimedFrame::new(solid(0), 100),
        TimedFrame::new(Frame::from_rgb(ImgVec::new(vec![RGB8::default(); 9], 3, 3)), 100),
    ]).unwrap();
    let err = resample(input.clone(), &ResamplePolicy::new(-10., true)).unwrap_err();
    assert!(matches!(err, Error::Blend(1, _)), "{err}");
    assert_eq!(err.stage(), crate::Stage::Resample);

    // without blending sizes don't matter
    assert_eq!(resample(input, &ResamplePolicy::new(-3., false)).unwrap().len(), 3);
}
