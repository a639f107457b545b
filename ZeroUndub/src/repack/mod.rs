//! Undub repacking
//!
//! A run merges a recipient (European) and a donor (Japanese) game image
//! into a copy of the recipient:
//!
//! 1. open both containers and pick the source of every recipient entry
//! 2. plan a payload layout that fits the recipient's capacity
//! 3. copy the recipient image to the output path
//! 4. rewrite the output's offset table and payload in place
//!
//! Everything that can fail on bad input happens before the output is
//! created. A failure after that leaves an unusable output behind.
//!
//! ```no_run
//! use zeroundub::repack::{RepackOptions, Repacker};
//!
//! let summary = Repacker::new("eu.iso", "jp.iso", "undub.iso")
//!     .with_options(RepackOptions::default().with_effects(true))
//!     .run(&|progress| {
//!         println!("{} {}/{}", progress.phase.as_str(), progress.current, progress.total);
//!     })?;
//! println!("{} entries replaced", summary.replaced);
//! # Ok::<(), zeroundub::Error>(())
//! ```

mod entry;
mod layout;
mod select;
mod types;
mod writer;

use std::path::{Path, PathBuf};

use crate::container::ContainerIndex;
use crate::error::Result;
use crate::formats::text::SubtitleMap;
use crate::storage::open_source;

pub use entry::UndubEntry;
pub use layout::{ALIGNMENTS, Layout, layout_with_alignment, plan_layout};
pub use types::{ProgressCallback, RepackOptions, RepackPhase, RepackProgress, RepackSummary};
pub use writer::{
    CHUNK_SIZE, COPY_BLOCK_SIZE, ContainerWriter, copy_file, copy_source, slot_sizes,
};

use select::EntrySelector;

/// One undub run
#[derive(Debug, Clone)]
pub struct Repacker {
    recipient: PathBuf,
    donor: PathBuf,
    output: PathBuf,
    options: RepackOptions,
    subtitles: Option<SubtitleMap>,
}

impl Repacker {
    pub fn new(
        recipient: impl Into<PathBuf>,
        donor: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            donor: donor.into(),
            output: output.into(),
            options: RepackOptions::default(),
            subtitles: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RepackOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the subtitle table with these messages
    #[must_use]
    pub fn with_subtitles(mut self, subtitles: SubtitleMap) -> Self {
        self.subtitles = Some(subtitles);
        self
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run the whole undub.
    ///
    /// # Errors
    /// Fails on the first invalid input; see [`crate::Error`].
    pub fn run(&self, progress: ProgressCallback) -> Result<RepackSummary> {
        let recipient = ContainerIndex::open_path(&self.recipient)?;
        let donor = ContainerIndex::open_path(&self.donor)?;

        progress(&RepackProgress::new(RepackPhase::Preparing, 0, 1));
        let entries =
            EntrySelector::new(&recipient, &donor, self.options, self.subtitles.as_ref())
                .select()?;
        let layout = plan_layout(&slot_sizes(&entries), recipient.capacity())?;
        progress(&RepackProgress::new(RepackPhase::Preparing, 1, 1));

        copy_source(&self.recipient, &self.output, progress)?;

        let output = open_source(&self.output)?;
        ContainerWriter::new(&*output)?.write(&entries, &layout, progress)?;

        let summary = RepackSummary {
            entries: entries.len(),
            replaced: entries
                .iter()
                .filter(|entry| !entry.is_unchanged(&recipient))
                .count(),
            alignment: layout.alignment,
            payload_size: layout.total,
            capacity: recipient.capacity(),
        };
        progress(&RepackProgress::new(
            RepackPhase::Complete,
            summary.entries,
            summary.entries,
        ));
        tracing::info!(
            "Undub written to {} ({} of {} entries replaced)",
            self.output.display(),
            summary.replaced,
            summary.entries
        );
        Ok(summary)
    }
}

/// Undub `recipient` with `donor` into a new image at `output`.
///
/// The in-game message file is re-encoded unchanged; use [`Repacker`] to
/// supply subtitles.
pub fn repack(
    recipient: impl AsRef<Path>,
    donor: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: RepackOptions,
    progress: ProgressCallback,
) -> Result<RepackSummary> {
    Repacker::new(recipient.as_ref(), donor.as_ref(), output.as_ref())
        .with_options(options)
        .run(progress)
}
