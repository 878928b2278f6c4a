use std::fmt;
use std::io;
use quick_error::quick_error;

/// Part of the pipeline that failed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Resample,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decode => "decode",
            Self::Resample => "resample",
            Self::Encode => "encode",
        })
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// The input isn't a GIF, or its header is broken
        Decode(err: gif::DecodingError) {
            display("GIF decoding error: {}", err)
            source(err)
        }
        DecodeFrame(frame: usize, err: gif::DecodingError) {
            display("Can't decode frame {}: {}", frame, err)
            source(err)
        }
        Dispose(frame: usize, err: gif_dispose::Error) {
            display("Can't composite frame {}: {}", frame, err)
            source(err)
        }
        NoFrames {
            display("Found no frames to decode")
        }
        TooManyFrames(limit: usize) {
            display("The animation has more than {} frames", limit)
        }
        Blend(frame: usize, msg: String) {
            display("Can't interpolate into frame {}: {}", frame, msg)
        }
        EmptySequence {
            display("Found no frames to encode")
        }
        WrongSize(frame: usize, msg: String) {
            display("Frame {} has wrong size ({})", frame, msg)
        }
        Encode(err: gif::EncodingError) {
            display("GIF encoding error: {}", err)
            source(err)
        }
        Quant(liq: imagequant::Error) {
            from()
            display("pngquant error: {}", liq)
        }
        Io(err: io::Error) {
            from()
            from(_oom: std::collections::TryReserveError) -> (io::ErrorKind::OutOfMemory.into())
            display("I/O: {}", err)
            source(err)
        }
        Aborted {
            display("aborted")
        }
    }
}

pub type CatResult<T, E = Error> = Result<T, E>;

impl Error {
    /// Which step of decode → resample → encode produced this error
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Decode(_) | Self::DecodeFrame(..) | Self::Dispose(..) |
            Self::NoFrames | Self::TooManyFrames(_) => Stage::Decode,
            Self::Blend(..) => Stage::Resample,
            Self::EmptySequence | Self::WrongSize(..) | Self::Encode(_) |
            Self::Quant(_) | Self::Io(_) | Self::Aborted => Stage::Encode,
        }
    }

    /// Index (from 0) of the frame that caused the error, if any
    #[must_use]
    pub fn frame_index(&self) -> Option<usize> {
        match *self {
            Self::DecodeFrame(frame, _) | Self::Dispose(frame, _) |
            Self::Blend(frame, _) | Self::WrongSize(frame, _) => Some(frame),
            _ => None,
        }
    }
}

impl From<gif::EncodingError> for Error {
    #[cold]
    fn from(err: gif::EncodingError) -> Self {
        match err {
            gif::EncodingError::Io(err) => err.into(),
            other => Error::Encode(other),
        }
    }
}

impl From<gif::DecodingError> for Error {
    #[cold]
    fn from(err: gif::DecodingError) -> Self {
        Error::Decode(err)
    }
}

#[test]
fn stages() {
    assert_eq!(Error::NoFrames.stage(), Stage::Decode);
    assert_eq!(Error::Blend(3, String::new()).stage(), Stage::Resample);
    assert_eq!(Error::Blend(3, String::new()).frame_index(), Some(3));
    assert_eq!(Error::EmptySequence.stage(), Stage::Encode);
    assert_eq!(Error::Aborted.frame_index(), None);
    assert_eq!(Stage::Resample.to_string(), "resample");
}

#[test]
fn sources() {
    use std::error::Error as _;
    assert!(Error::Dispose(2, gif_dispose::Error::NoPalette).source().is_some());
    assert!(Error::NoFrames.source().is_none());
}
