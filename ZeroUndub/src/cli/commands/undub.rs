//! CLI command for building an undubbed image

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{PACKAGE, print_done, print_step, stage_bar, update_stage_bar};
use crate::formats::text::load_subtitles;
use crate::repack::{RepackOptions, Repacker};

pub fn execute(
    recipient: &Path,
    donor: &Path,
    output: &Path,
    options: RepackOptions,
    subtitles: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("Output already exists: {}", output.display());
    }
    let started = Instant::now();

    let mut repacker = Repacker::new(recipient, donor, output).with_options(options);
    if let Some(path) = subtitles {
        repacker = repacker.with_subtitles(load_subtitles(path)?);
    }

    if !quiet {
        print_step(
            1,
            1,
            PACKAGE,
            &format!("Undubbing {} into {}...", recipient.display(), output.display()),
        );
    }

    let pb = stage_bar(quiet);
    let summary = repacker.run(&|progress| update_stage_bar(&pb, progress))?;
    pb.finish_and_clear();

    if !quiet {
        println!(
            "  {} of {} entries replaced, {} of {} payload bytes used (alignment {})",
            summary.replaced,
            summary.entries,
            summary.payload_size,
            summary.capacity,
            summary.alignment
        );
        print_done(started.elapsed());
    }
    Ok(())
}
