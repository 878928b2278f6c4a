use clap::{crate_name, crate_version, value_parser, Arg, ArgAction, Command};
use gifspeed::progress::{NoProgress, ProgressReporter};
use gifspeed::{FrameSequence, ResamplePolicy, Settings};

mod source;
use crate::source::SrcPath;

pub type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

use std::ffi::OsStr;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = bin_main() {
        eprintln!("error: {e}");
        if let Some(e) = e.source() {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}

fn bin_main() -> BinResult<()> {
    let matches = Command::new(crate_name!())
        .version(crate_version!())
        .about("Speeds up or slows down GIF animations")
        .arg_required_else_help(true)
        .arg(Arg::new("output")
            .long("output")
            .short('o')
            .help("Destination file to write to; \"-\" means stdout")
            .value_parser(value_parser!(OsString))
            .value_name("out.gif")
            .required(true))
        .arg(Arg::new("speed")
            .long("speed")
            .short('s')
            .help("Positive values play faster, negative slower. 0 keeps the speed")
            .allow_negative_numbers(true)
            .value_parser(value_parser!(f64))
            .value_name("-10..10")
            .default_value("0"))
        .arg(Arg::new("interpolate")
            .long("interpolate")
            .short('i')
            .action(ArgAction::SetTrue)
            .help("When slowing down, add cross-faded frames between original frames"))
        .arg(Arg::new("quality")
            .long("quality")
            .short('Q')
            .value_name("1-100")
            .value_parser(value_parser!(u8).range(1..=100))
            .default_value("100")
            .help("Lower quality may give smaller file"))
        .arg(Arg::new("fast")
            .long("fast")
            .action(ArgAction::SetTrue)
            .help("Faster encoding, but worse colors"))
        .arg(Arg::new("max-frames")
            .long("max-frames")
            .value_name("num")
            .value_parser(value_parser!(usize))
            .default_value("5000")
            .help("Refuse inputs with more frames than this"))
        .arg(Arg::new("quiet")
            .long("quiet")
            .short('q')
            .action(ArgAction::SetTrue)
            .help("Do not display anything on standard output/console"))
        .arg(Arg::new("FILE")
            .help("GIF animation to read; \"-\" means stdin")
            .value_parser(value_parser!(OsString))
            .required(true))
        .get_matches_from(wild::args_os());

    let input = SrcPath::new(matches.get_one::<OsString>("FILE").ok_or("Missing input")?);
    let output_path = DestPath::new(matches.get_one::<OsString>("output").ok_or("Missing output")?);
    let speed = *matches.get_one::<f64>("speed").ok_or("Missing speed")?;
    if !(-10. ..=10.).contains(&speed) {
        return Err("Speed must be between -10 and 10".into());
    }
    let policy = ResamplePolicy::new(speed, matches.get_flag("interpolate"));
    let settings = Settings {
        quality: *matches.get_one::<u8>("quality").ok_or("Missing quality")?,
        fast: matches.get_flag("fast"),
        max_frames: matches.get_one::<usize>("max-frames").copied(),
    };
    let quiet = matches.get_flag("quiet") || output_path == DestPath::Stdout;

    if !quiet && policy.interpolate && speed >= 0. {
        eprintln!("warning: --interpolate only has an effect when slowing down (negative speed)");
    }

    let frames = input.extract(settings.max_frames)?.map_err(|e| format!("{} failed: {e}", e.stage()))?;
    let total_frames = policy.output_len(frames.len());
    let frames = gifspeed::resample(frames, &policy).map_err(|e| format!("{} failed: {e}", e.stage()))?;
    debug_assert_eq!(total_frames, frames.len());

    let mut pb;
    let mut nopb = NoProgress {};
    let progress: &mut dyn ProgressReporter = if quiet {
        &mut nopb
    } else {
        pb = ProgressBar::new(total_frames as u64);
        &mut pb
    };

    // Encoded in memory, so that a failure doesn't leave a half-written file
    let gif = encode(&frames, &settings, progress)?;
    match output_path {
        DestPath::Path(p) => {
            fs::write(p, &gif).map_err(|e| format!("Can't write to {}: {}", p.display(), e))?;
        },
        DestPath::Stdout => {
            let mut out = io::stdout().lock();
            out.write_all(&gif)?;
            out.flush()?;
        },
    };
    progress.done(&format!("gifspeed created {output_path}"));

    Ok(())
}

fn encode(frames: &FrameSequence, settings: &Settings, progress: &mut dyn ProgressReporter) -> BinResult<Vec<u8>> {
    let gif = gifspeed::encode(frames, Vec::new(), settings, progress)
        .map_err(|e| format!("{} failed: {e}", e.stage()))?;
    Ok(gif)
}

struct ProgressBar(pbr::ProgressBar<io::Stdout>);

impl ProgressBar {
    fn new(total: u64) -> Self {
        let mut pb = pbr::ProgressBar::new(total);
        pb.show_speed = false;
        pb.show_percent = false;
        pb.format(" #_. ");
        pb.message("Frame ");
        pb.set_max_refresh_rate(Some(Duration::from_millis(250)));
        Self(pb)
    }
}

impl ProgressReporter for ProgressBar {
    fn increase(&mut self) -> bool {
        self.0.inc();
        true
    }

    fn done(&mut self, msg: &str) {
        self.0.finish_print(msg);
    }
}

#[derive(PartialEq)]
enum DestPath<'a> {
    Path(&'a Path),
    Stdout,
}

impl<'a> DestPath<'a> {
    pub fn new(path: &'a OsStr) -> Self {
        if path == "-" {
            Self::Stdout
        } else {
            Self::Path(Path::new(path))
        }
    }
}

impl fmt::Display for DestPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Path(orig_path) => {
                let abs_path = dunce::canonicalize(orig_path);
                abs_path.as_ref().map(|p| p.as_path()).unwrap_or(orig_path).display().fmt(f)
            },
            Self::Stdout => f.write_str("stdout"),
        }
    }
}
