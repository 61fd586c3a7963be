//! `xgdump`: a thin CLI over [`xg_archive_reader`]. Argument parsing,
//! segment filtering, and writing decoded segments to a destination
//! directory live here and nowhere else - the core crate never touches the
//! filesystem on a caller's behalf beyond materializing its own scoped
//! temporaries.

use std::{
    io::Write,
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use xg_archive_reader::{
    orchestrator::{Segment, SegmentKind, XgArchive},
    streams,
};

/// Extracts the embedded segments (and, optionally, a per-record summary)
/// out of ExtremeGammon (XG) match archive files.
#[derive(Parser)]
#[command(name = "xgdump", version, about)]
struct Cli {
    /// One or more .xg files to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory to write extracted segments into.
    #[arg(short, long, default_value = ".")]
    outdir: PathBuf,

    /// Which segments to extract (comma-separated). `all` extracts every
    /// segment the archive carries.
    #[arg(long, value_enum, value_delimiter = ',', default_value = "all")]
    segments: Vec<SegmentArg>,

    /// Walk the gamefile/rollout streams and print one line per record kind
    /// with its count. Never pretty-prints individual record fields - that
    /// is explicitly out of scope for this tool.
    #[arg(long)]
    summarize: bool,

    /// Print one diagnostic line per segment/failed file.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum SegmentArg {
    All,
    Gdf,
    Image,
    Gamehdr,
    Gamefile,
    Rollouts,
    Comment,
}

impl SegmentArg {
    fn matches(self, kind: SegmentKind) -> bool {
        match (self, kind) {
            (Self::All, _) => true,
            (Self::Gdf, SegmentKind::GdfHeader) => true,
            (Self::Image, SegmentKind::GdfImage) => true,
            (Self::Gamehdr, SegmentKind::GameHdr) => true,
            (Self::Gamefile, SegmentKind::Gamefile) => true,
            (Self::Rollouts, SegmentKind::Rollouts) => true,
            (Self::Comment, SegmentKind::Comment) => true,
            _ => false,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = std::fs::create_dir_all(&cli.outdir) {
        eprintln!("xgdump: can't create outdir {}: {e}", cli.outdir.display());
        return ExitCode::FAILURE;
    }

    let mut had_failure = false;
    for path in &cli.files {
        if let Err(e) = process_file(&cli, path) {
            had_failure = true;
            eprintln!("xgdump: {}: {e}", path.display());
        }
    }

    if had_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn process_file(cli: &Cli, path: &PathBuf) -> xg_archive_reader::Result<()> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "xg".into());

    let mut archive = XgArchive::open_with_verbose(path, cli.verbose)?;

    while let Some(segment) = archive.next_segment()? {
        let wanted = cli.segments.iter().any(|s| s.matches(segment.kind));
        if wanted {
            write_segment(&cli.outdir, &stem, &segment)?;
        }
        if cli.summarize {
            summarize_segment(&segment)?;
        }
    }

    Ok(())
}

fn write_segment(outdir: &std::path::Path, stem: &str, segment: &Segment) -> xg_archive_reader::Result<()> {
    let dest = outdir.join(format!("{stem}{}", segment.extension()));
    let mut src = segment.open()?;
    let mut out = std::fs::File::create(&dest)?;
    std::io::copy(&mut src, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Prints one line per record kind with its count. Never interprets or
/// pretty-prints individual record fields - that's backgammon semantics,
/// explicitly out of scope for the core and this thin CLI alike.
fn summarize_segment(segment: &Segment) -> xg_archive_reader::Result<()> {
    match segment.kind {
        SegmentKind::Gamefile => {
            let handle = segment.open()?;
            let mut counts = [0u64; 8];
            for record in streams::decode_gamefile(handle) {
                let record = record?;
                counts[record_tag_index(&record)] += 1;
            }
            println!(
                "gamefile: headermatch={} headergame={} cube={} move={} footergame={} footermatch={} missing={} unimplemented={}",
                counts[0], counts[1], counts[2], counts[3], counts[4], counts[5], counts[6], counts[7]
            );
        }
        SegmentKind::Rollouts => {
            let handle = segment.open()?;
            let count = streams::decode_rollouts(handle).count();
            println!("rollouts: rolloutcontext={count}");
        }
        _ => {}
    }
    Ok(())
}

fn record_tag_index(record: &xg_archive_defs::gamefile::GamefileRecord) -> usize {
    use xg_archive_defs::gamefile::GamefileRecord::*;
    match record {
        HeaderMatch(_) => 0,
        HeaderGame(_) => 1,
        Cube(_) => 2,
        Move(_) => 3,
        FooterGame(_) => 4,
        FooterMatch(_) => 5,
        Missing(_) => 6,
        Unimplemented => 7,
    }
}
