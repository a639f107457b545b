//! Repack options and progress reporting

use serde::{Deserialize, Serialize};

/// Optional substitutions on top of the audio and subtitle undub
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepackOptions {
    /// Use the donor's title screen pictures
    pub replace_title_screen: bool,
    /// Use the donor's player models, menu portrait and stage titles
    pub replace_models: bool,
    /// Use the donor's sound effects as well as its voices
    pub replace_effects: bool,
}

impl RepackOptions {
    /// Options with every optional substitution enabled
    #[must_use]
    pub fn all() -> Self {
        Self {
            replace_title_screen: true,
            replace_models: true,
            replace_effects: true,
        }
    }

    #[must_use]
    pub fn with_title_screen(mut self, enabled: bool) -> Self {
        self.replace_title_screen = enabled;
        self
    }

    #[must_use]
    pub fn with_models(mut self, enabled: bool) -> Self {
        self.replace_models = enabled;
        self
    }

    #[must_use]
    pub fn with_effects(mut self, enabled: bool) -> Self {
        self.replace_effects = enabled;
        self
    }
}

/// Progress information for repack operations
#[derive(Debug, Clone)]
pub struct RepackProgress {
    /// Current operation phase
    pub phase: RepackPhase,
    /// Completed units within the current stage
    pub current: usize,
    /// Total units of the current stage
    pub total: usize,
    /// Entry or file being processed (if applicable)
    pub current_file: Option<String>,
}

impl RepackProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: RepackPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with a file/entry name
    #[must_use]
    pub fn with_file(
        phase: RepackPhase,
        current: usize,
        total: usize,
        file: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of a repack run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepackPhase {
    /// Copying the recipient image to the output path
    Copying,
    /// Building replacement entries
    Preparing,
    /// Rewriting the offset table
    WritingTable,
    /// Streaming entries into the payload
    WritingEntries,
    /// Run complete
    Complete,
}

impl RepackPhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copying => "Copying image",
            Self::Preparing => "Preparing entries",
            Self::WritingTable => "Writing offset table",
            Self::WritingEntries => "Writing entries",
            Self::Complete => "Complete",
        }
    }
}

/// Progress callback type for repack operations
pub type ProgressCallback<'a> = &'a dyn Fn(&RepackProgress);

/// What a finished run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepackSummary {
    /// Entries written
    pub entries: usize,
    /// Entries whose content differs from the recipient's
    pub replaced: usize,
    /// Slot granularity in sectors, 0 for byte packing
    pub alignment: u64,
    /// Bytes used by the new layout
    pub payload_size: u64,
    /// Bytes available in the payload
    pub capacity: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_options_builder() {
        let options = RepackOptions::default().with_models(true);
        assert!(!options.replace_title_screen);
        assert!(options.replace_models);
        assert!(!options.replace_effects);
        assert!(!RepackOptions::all().with_effects(false).replace_effects);
    }

    #[test]
    fn test_options_from_partial_json() {
        let options: RepackOptions =
            serde_json::from_str(r#"{"replace_effects": true}"#).unwrap();
        assert_eq!(options, RepackOptions::default().with_effects(true));
    }

    #[test]
    fn test_percentage() {
        let quarter = RepackProgress::new(RepackPhase::WritingEntries, 1, 4).percentage();
        assert!((quarter - 0.25).abs() < f32::EPSILON);
        let empty = RepackProgress::new(RepackPhase::Complete, 0, 0).percentage();
        assert!((empty - 1.0).abs() < f32::EPSILON);
    }
}
