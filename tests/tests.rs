use gifspeed::progress::NoProgress;
use gifspeed::*;
use imgref::{ImgRef, ImgVec};
use rgb::{RGB8, RGBA8};
use std::borrow::Cow;

const PALETTE: [u8; 12] = [0, 0, 0, 250, 250, 250, 200, 20, 20, 20, 20, 200];

/// 8×8 animation of a 2×2 block moving diagonally; `delays` in 1/100s
fn moving_block(delays: &[u16]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = gif::Encoder::new(&mut out, 8, 8, &PALETTE).unwrap();
        enc.set_repeat(gif::Repeat::Infinite).unwrap();
        for (n, &delay) in delays.iter().enumerate() {
            let mut buffer = vec![1; 64];
            for y in 0..2 {
                for x in 0..2 {
                    buffer[(n * 2 + y) % 8 * 8 + (n * 2 + x) % 8] = 2;
                }
            }
            enc.write_frame(&gif::Frame {
                width: 8,
                height: 8,
                delay,
                buffer: Cow::Owned(buffer),
                ..gif::Frame::default()
            }).unwrap();
        }
    }
    out
}

fn for_each_frame(mut gif_data: &[u8], mut cb: impl FnMut(&gif::Frame, ImgRef<RGBA8>)) {
    let mut gif_opts = gif::DecodeOptions::new();
    gif_opts.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = gif_opts.read_info(&mut gif_data).unwrap();
    let mut screen = gif_dispose::Screen::new_decoder(&decoder);

    while let Some(frame) = decoder.read_next_frame().unwrap() {
        screen.blit_frame(frame).unwrap();
        cb(frame, screen.pixels_rgba());
    }
}

fn delays_of(gif_data: &[u8]) -> Vec<u16> {
    let mut delays = vec![];
    for_each_frame(gif_data, |frame, _| delays.push(frame.delay));
    delays
}

#[track_caller]
fn assert_images_eq(a: ImgRef<RGBA8>, b: ImgRef<RGBA8>, max_diff: f64) {
    assert_eq!((a.width(), a.height()), (b.width(), b.height()));
    let diff = a.pixels().zip(b.pixels()).map(|(a, b)| {
        let d = |x: u8, y: u8| (i32::from(x) - i32::from(y)).pow(2) as u64;
        d(a.r, b.r) + d(a.g, b.g) + d(a.b, b.b)
    }).sum::<u64>() as f64 / (a.width() * a.height()) as f64;
    assert!(diff <= max_diff, "{} diff > {}", diff, max_diff);
}

fn retimed(gif_data: &[u8], speed: f64, interpolate: bool) -> Vec<u8> {
    retime(gif_data, Vec::new(), &ResamplePolicy::new(speed, interpolate), &Settings::default(), &mut NoProgress {}).unwrap()
}

#[test]
fn unchanged_speed() {
    let input = moving_block(&[10, 4, 25, 10]);
    let out = retimed(&input, 0., true);
    assert_eq!(delays_of(&out), [10, 4, 25, 10]);

    let expected = extract(&input[..], None).unwrap();
    let mut n = 0;
    for_each_frame(&out, |_, actual| {
        assert_images_eq(expected.frames()[n].frame.to_rgba().as_ref(), actual, 1.);
        n += 1;
    });
    assert_eq!(n, 4);
}

#[test]
fn fast_forward() {
    // 100ms at speed 10 is 53ms, stored as 5/100s
    let out = retimed(&moving_block(&[10, 10, 10]), 10., false);
    assert_eq!(delays_of(&out), [5, 5, 5]);
}

#[test]
fn fast_forward_keeps_minimum_duration() {
    let out = retimed(&moving_block(&[3, 2, 30]), 10., false);
    assert_eq!(delays_of(&out), [2, 2, 16]);
}

#[test]
fn slow_motion() {
    let out = retimed(&moving_block(&[10, 10]), -10., false);
    assert_eq!(delays_of(&out), [20, 20]);
}

#[test]
fn slow_motion_interpolated() {
    let input = moving_block(&[10, 10]);
    let out = retimed(&input, -10., true);
    assert_eq!(delays_of(&out), [20; 5]);

    let originals = extract(&input[..], None).unwrap();
    let first = originals.frames()[0].frame.to_rgb();
    let second = originals.frames()[1].frame.to_rgb();
    let mut n = 0;
    for_each_frame(&out, |_, actual| {
        let alpha = n as f32 / 4.;
        let expected = blend::blend(first.as_ref(), second.as_ref(), alpha).unwrap();
        let expected = Frame::from_rgb(expected).to_rgba();
        // in-between frames are quantized, so allow a bit of error
        assert_images_eq(expected.as_ref(), actual, 8.);
        n += 1;
    });
    assert_eq!(n, 5);
}

#[test]
fn interpolated_frame_count() {
    let input = moving_block(&[8, 8, 8, 8]);
    for (speed, n) in [(-1., 1), (-5., 2), (-9.5, 2), (-10., 3)] {
        let out = retimed(&input, speed, true);
        let delays = delays_of(&out);
        assert_eq!(delays.len(), 3 * (n + 1) + 1, "speed {speed}");
        let expected = ((80. * (1. + f64::abs(speed) / 10.)).round_ties_even() as u32 + 5) / 10;
        assert!(delays.iter().all(|&d| u32::from(d) == expected), "{delays:?}");
    }
}

#[test]
fn round_trip() {
    let frames: Vec<_> = [40, 200, 20, 130].iter().enumerate().map(|(i, &d)| {
        let v = (i * 70) as u8;
        TimedFrame::new(Frame::from_rgb(ImgVec::new(vec![RGB8::new(v, 255 - v, 100); 12], 4, 3)), d)
    }).collect();
    let seq = FrameSequence::new(frames).unwrap();

    let gif = encode(&seq, Vec::new(), &Settings::default(), &mut NoProgress {}).unwrap();
    let decoded = extract(&gif[..], None).unwrap();
    assert_eq!(decoded.len(), seq.len());
    assert_eq!(decoded.durations().collect::<Vec<_>>(), [40, 200, 20, 130]);
    for (a, b) in seq.frames().iter().zip(decoded.frames()) {
        assert_images_eq(a.frame.to_rgba().as_ref(), b.frame.to_rgba().as_ref(), 1.);
    }
}

#[test]
fn transparency_survives() {
    let mut px = vec![RGBA8::new(10, 200, 30, 255); 16];
    px[5] = RGBA8::new(0, 0, 0, 0);
    let seq = FrameSequence::new(vec![TimedFrame::new(Frame::from_rgba(ImgVec::new(px, 4, 4)), 100)]).unwrap();
    let gif = encode(&seq, Vec::new(), &Settings::default(), &mut NoProgress {}).unwrap();
    let decoded = extract(&gif[..], None).unwrap();
    let out = decoded.first().frame.to_rgba();
    assert_eq!(out.buf()[5].a, 0);
    let opaque = out.buf()[0];
    assert_eq!(opaque.a, 255);
    assert!(opaque.r.abs_diff(10) <= 1 && opaque.g.abs_diff(200) <= 1 && opaque.b.abs_diff(30) <= 1, "{opaque:?}");
}

#[test]
fn malformed_input_writes_nothing() {
    let mut out = Vec::new();
    let err = retime(&b"GIF89a\x08\x00"[..], &mut out, &ResamplePolicy::new(-10., true), &Settings::default(), &mut NoProgress {}).unwrap_err();
    assert_eq!(err.stage(), Stage::Decode);
    assert!(out.is_empty());
}

#[test]
fn frame_limit() {
    let input = moving_block(&[10; 6]);
    let settings = Settings { max_frames: Some(3), ..Settings::default() };
    let err = retime(&input[..], Vec::new(), &ResamplePolicy::default(), &settings, &mut NoProgress {}).unwrap_err();
    assert!(matches!(err, Error::TooManyFrames(3)), "{err}");
}

#[test]
fn progress_is_reported() {
    struct Count(usize);
    impl progress::ProgressReporter for Count {
        fn increase(&mut self) -> bool {
            self.0 += 1;
            true
        }
    }

    let mut count = Count(0);
    let policy = ResamplePolicy::new(-5., true);
    retime(&moving_block(&[10; 3])[..], Vec::new(), &policy, &Settings::default(), &mut count).unwrap();
    assert_eq!(count.0, policy.output_len(3));
    assert_eq!(count.0, 7);
}
