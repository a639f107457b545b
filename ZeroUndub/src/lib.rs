#![allow(non_snake_case)]
//! # ZeroUndub
//!
//! A pure-Rust library for undubbing the PS2 release of Project Zero: it
//! moves the Japanese voices (and optionally the title screen, models and
//! sound effects) into the European release while keeping its subtitles.
//!
//! ## Supported Formats
//!
//! - **IMG_BD container** - The game's flat resource payload, indexed by the
//!   directory embedded in the executable and the `IMG_HD.BIN` offset table
//! - **PK2** - Nested archives of fixed-size texture and binary slots
//! - **TIM2** - Indexed textures, palette merging and PNG export
//! - **Message files** - The offset-table tree of encoded in-game text
//!
//! ## Quick Start
//!
//! ### Listing a Container
//!
//! ```no_run
//! use zeroundub::container::ContainerIndex;
//!
//! // An .iso image or a directory holding the extracted root files
//! let index = ContainerIndex::open_path("Project Zero.iso")?;
//! for entry in index.entries() {
//!     println!("{} @ {:#x} ({} bytes)", entry.name, entry.offset, entry.size);
//! }
//! # Ok::<(), zeroundub::Error>(())
//! ```
//!
//! ### Undubbing
//!
//! ```no_run
//! use zeroundub::repack::{RepackOptions, repack};
//!
//! repack("eu.iso", "jp.iso", "undub.iso", RepackOptions::all(), &|_| {})?;
//! # Ok::<(), zeroundub::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `zeroundub` command-line binary

pub mod container;
pub mod error;
pub mod formats;
pub mod repack;
pub mod storage;

// Re-exports for convenience
pub use error::{Error, ErrorKind, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};

    pub use crate::container::{ContainerIndex, TocEntry};
    pub use crate::storage::{BoundedStream, StorageAdapter, open_source};

    pub use crate::formats::pk2::{SubArchive, parse_pk2, read_pk2};
    pub use crate::formats::text::{CharacterTables, MessageTree, SubtitleMap};
    pub use crate::formats::tim2::{PaletteRecolorer, Tim2Image};

    pub use crate::repack::{
        ProgressCallback, RepackOptions, RepackPhase, RepackProgress, RepackSummary, Repacker,
        repack,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
