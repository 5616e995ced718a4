//! Command-line driver: run the icon pipeline over one job directory or
//! over every subdirectory of a skills root.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, error, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use vmatrix_icons::{DirStore, Pipeline, Result, clean, load_dir};

#[derive(Parser)]
#[command(
    name = "vmatrix-icons",
    about = "Build composite matrix icons from per-skill source images"
)]
struct Args {
    /// Root directory with one subdirectory of skill icons per job
    root: PathBuf,

    /// Process only this job subdirectory instead of all of them
    #[arg(long)]
    job: Option<String>,

    /// Directory containing the mask template, hexagon, frame and lock assets
    #[arg(long, default_value = "img/VMatrixUI")]
    assets: PathBuf,

    /// Only delete leftover scratch directories, do not process
    #[arg(long)]
    clean: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger already initialized");

    match run(&args) {
        Ok(failed) if failed == 0 => ExitCode::SUCCESS,
        Ok(failed) => {
            error!("{failed} job(s) failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Runs over all selected jobs; returns how many of them failed.
/// Job directories are independent, so one failing job never stops the
/// others.
fn run(args: &Args) -> Result<usize> {
    let jobs = select_jobs(args)?;

    if args.clean {
        let mut failed = 0;
        for job in &jobs {
            if let Err(err) = clean(&DirStore::new(job)) {
                error!("cleaning {}: {err}", job.display());
                failed += 1;
            }
        }
        return Ok(failed);
    }

    let pipeline = Pipeline::load(&args.assets)?;

    let mut failed = 0;
    for job in &jobs {
        info!("processing {}", job.display());
        if let Err(err) = process_job(&pipeline, job) {
            error!("{}: {err}", job.display());
            failed += 1;
        }
    }
    Ok(failed)
}

fn process_job(pipeline: &Pipeline, job: &Path) -> Result<()> {
    let icons = load_dir(job)?;
    pipeline.process(&DirStore::new(job), &icons)
}

/// One named job, or every subdirectory of the root in sorted order.
fn select_jobs(args: &Args) -> Result<Vec<PathBuf>> {
    if let Some(name) = &args.job {
        return Ok(vec![args.root.join(name)]);
    }

    let mut jobs: Vec<PathBuf> = std::fs::read_dir(&args.root)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    jobs.sort();
    Ok(jobs)
}
