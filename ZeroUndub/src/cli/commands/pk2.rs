//! CLI command for dumping PK2 sub-archives

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{DISK, LOOKING_GLASS, print_done, print_step};
use crate::container::ContainerIndex;
use crate::formats::pk2::parse_pk2;

pub fn execute(source: &Path, name: &str, destination: &Path) -> anyhow::Result<()> {
    let started = Instant::now();

    print_step(1, 2, LOOKING_GLASS, &format!("Reading {name}..."));
    let index = ContainerIndex::open_path(source)?;
    let archive = parse_pk2(index.read_entry(name)?)?;

    print_step(
        2,
        2,
        DISK,
        &format!("Writing {} slots to {}...", archive.len(), destination.display()),
    );
    let written = archive.extract(destination)?;
    for path in &written {
        tracing::debug!("Wrote {}", path.display());
    }

    print_done(started.elapsed());
    Ok(())
}
