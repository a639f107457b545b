//! CLI command for TIM2 texture export

use std::path::Path;

use crate::cli::progress::PICTURE;
use crate::formats::tim2::Tim2Image;

pub fn execute(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let image = Tim2Image::read(source)?;
    image.save_png(destination)?;

    println!(
        "{PICTURE}{} ({}x{}) -> {}",
        source.display(),
        image.width(),
        image.height(),
        destination.display()
    );
    Ok(())
}
