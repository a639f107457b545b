use clap::Subcommand;
use std::path::PathBuf;

use crate::repack::RepackOptions;

pub mod list;
pub mod pk2;
pub mod texture;
pub mod undub;

#[derive(Subcommand)]
pub enum Commands {
    /// Build an undubbed image from a European and a Japanese image
    Undub {
        /// European image (.iso or extracted directory)
        recipient: PathBuf,

        /// Japanese image (.iso or extracted directory)
        donor: PathBuf,

        /// Output image; must not exist yet
        output: PathBuf,

        /// Use the Japanese title screen
        #[arg(long)]
        title_screen: bool,

        /// Use the Japanese player models and stage titles
        #[arg(long)]
        models: bool,

        /// Use the Japanese sound effects
        #[arg(long)]
        effects: bool,

        /// JSON object of subtitle index to text
        #[arg(long, value_name = "FILE")]
        subtitles: Option<PathBuf>,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the container entries of an image
    List {
        /// Image (.iso or extracted directory)
        source: PathBuf,

        /// Only show entries matching this glob (e.g. "*.STR")
        #[arg(short, long)]
        filter: Option<String>,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,

        /// Only show count of entries
        #[arg(short, long)]
        count: bool,
    },

    /// Dump the slots of a PK2 container entry
    Pk2 {
        /// Image (.iso or extracted directory)
        source: PathBuf,

        /// Entry name, e.g. TITLE_E.PK2
        name: String,

        /// Output directory
        destination: PathBuf,
    },

    /// Export a TIM2 texture to PNG
    Texture {
        /// TIM2 file
        source: PathBuf,

        /// PNG file to write
        destination: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Undub {
                recipient,
                donor,
                output,
                title_screen,
                models,
                effects,
                subtitles,
                quiet,
            } => undub::execute(
                recipient,
                donor,
                output,
                RepackOptions::default()
                    .with_title_screen(*title_screen)
                    .with_models(*models)
                    .with_effects(*effects),
                subtitles.as_deref(),
                *quiet,
            ),
            Commands::List {
                source,
                filter,
                json,
                count,
            } => list::execute(source, filter.as_deref(), *json, *count),
            Commands::Pk2 {
                source,
                name,
                destination,
            } => pk2::execute(source, name, destination),
            Commands::Texture {
                source,
                destination,
            } => texture::execute(source, destination),
        }
    }
}
