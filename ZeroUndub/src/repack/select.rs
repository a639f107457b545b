//! Per-entry substitution rules
//!
//! Every recipient entry is matched against the rules below in order; the
//! first rule that applies decides where its bytes come from:
//!
//! 1. the in-game message file is re-encoded with the subtitle map
//! 2. cutscene voices come from the donor
//! 3. sound banks and effect streams come from the donor (optional)
//! 4. title screen pictures are copied over the recipient's (optional)
//! 5. player models, the menu portrait and stage titles (optional)
//! 6. anything else is kept

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::entry::UndubEntry;
use super::types::RepackOptions;
use crate::container::{ContainerIndex, TocEntry};
use crate::error::{Error, Result};
use crate::formats::pk2::{SubArchive, parse_pk2};
use crate::formats::text::{CharacterTables, SUBTITLE_ENTRY, SubtitleMap, inject_subtitles};
use crate::formats::tim2::PaletteRecolorer;

static SCENE_AUDIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SCENE.*\.STR").expect("valid scene audio pattern"));
static STREAM_AUDIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^..*\.STR").expect("valid stream audio pattern"));
static SOUND_BANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*\.BD").expect("valid sound bank pattern"));
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TITLE_[EFGSI]\.PK2").expect("valid title pattern"));
static MENU_PORTRAIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PL_MTOP_[EFGSI]\.PK2").expect("valid portrait pattern"));
static STAGE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^MSN0[1-4]TTL\.PK2").expect("valid stage title pattern"));
static LOCALIZED_STAGE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^MSN0[1-4]TTL_[EFGSI]\.PK2").expect("valid stage title pattern")
});

const DONOR_TITLE: &str = "TITLE.PK2";
const DONOR_PORTRAIT: &str = "PL_MTOP.PK2";
/// Sub-archive slot holding the portrait picture
const PORTRAIT_SLOT: usize = 1;
/// Leading sub-archive slots that hold title pictures
const TITLE_PICTURES: usize = 11;
/// Release languages, one localized copy each
const LANGUAGES: [char; 5] = ['E', 'F', 'G', 'S', 'I'];

/// Models replaced as whole entries
const MODELS: [&str; 8] = [
    "M000_MIKU.MDL",
    "M000_MIKU.MPK",
    "M000_MIKU.PK2",
    "M000_SPE1.PK2",
    "M000_SPE2.PK2",
    "M000_SPE3.PK2",
    "REL11_MIKU.TM2",
    "TX_BTL_RES.PK2",
];

fn is_effect_audio(name: &str) -> bool {
    !name.starts_with("SCENE") && STREAM_AUDIO.is_match(name)
}

fn require<'c>(index: &'c ContainerIndex, name: &str) -> Result<&'c TocEntry> {
    index
        .find(name)
        .ok_or_else(|| Error::MissingResource(name.to_string()))
}

/// Entries of `index` matching `pattern`; there must be exactly `expected`.
fn localized<'c>(
    index: &'c ContainerIndex,
    pattern: &Regex,
    expected: usize,
) -> Result<Vec<&'c TocEntry>> {
    let found: Vec<&TocEntry> = index
        .entries()
        .iter()
        .filter(|toc| pattern.is_match(&toc.name))
        .collect();

    if found.len() != expected {
        return Err(Error::MissingResource(format!(
            "expected {expected} entries matching {}, found {}",
            pattern.as_str(),
            found.len()
        )));
    }
    Ok(found)
}

fn read_archive(index: &ContainerIndex, name: &str) -> Result<SubArchive> {
    parse_pk2(index.read_entry(name)?)
}

/// Replacement entries by upper-case recipient name
type Replacements<'a> = HashMap<String, UndubEntry<'a>>;

/// Builds the output entry list of one run.
pub(crate) struct EntrySelector<'a> {
    recipient: &'a ContainerIndex,
    donor: &'a ContainerIndex,
    options: RepackOptions,
    subtitles: Option<&'a SubtitleMap>,
}

impl<'a> EntrySelector<'a> {
    pub(crate) fn new(
        recipient: &'a ContainerIndex,
        donor: &'a ContainerIndex,
        options: RepackOptions,
        subtitles: Option<&'a SubtitleMap>,
    ) -> Self {
        Self {
            recipient,
            donor,
            options,
            subtitles,
        }
    }

    /// Output entries in recipient directory order.
    pub(crate) fn select(&self) -> Result<Vec<UndubEntry<'a>>> {
        let subtitle_target = require(self.recipient, SUBTITLE_ENTRY)?;
        let mut subtitle_entry = Some(self.subtitles_entry(subtitle_target)?);

        let mut scene_audio = self.donor_audio(|name| SCENE_AUDIO.is_match(name));
        let (mut sound_banks, mut effect_audio) = if self.options.replace_effects {
            (
                self.donor_audio(|name| SOUND_BANK.is_match(name)),
                self.donor_audio(is_effect_audio),
            )
        } else {
            (Replacements::new(), Replacements::new())
        };
        let mut titles = if self.options.replace_title_screen {
            self.title_entries()?
        } else {
            Replacements::new()
        };
        let mut models = Replacements::new();
        if self.options.replace_models {
            models.extend(self.portrait_entries()?);
            models.extend(self.model_entries()?);
            models.extend(self.stage_title_entries()?);
        }

        let mut entries = Vec::with_capacity(self.recipient.len());
        for toc in self.recipient.entries() {
            let key = toc.name.to_ascii_uppercase();

            let subtitles = if toc.name == subtitle_target.name {
                subtitle_entry.take()
            } else {
                None
            };
            let entry = subtitles
                .or_else(|| scene_audio.remove(&key))
                .or_else(|| sound_banks.remove(&key))
                .or_else(|| effect_audio.remove(&key))
                .or_else(|| titles.remove(&key))
                .or_else(|| models.remove(&key))
                .unwrap_or_else(|| UndubEntry::unchanged(self.recipient, toc));
            entries.push(entry);
        }

        let replaced = entries
            .iter()
            .filter(|entry| !entry.is_unchanged(self.recipient))
            .count();
        tracing::info!(
            "Selected {} entries, {} replaced",
            entries.len(),
            replaced
        );
        Ok(entries)
    }

    fn subtitles_entry(&self, target: &TocEntry) -> Result<UndubEntry<'a>> {
        let data = self.recipient.read_entry(&target.name)?;
        let patched = inject_subtitles(&data, self.subtitles, CharacterTables::european())?;
        Ok(UndubEntry::synthesized(target, patched))
    }

    /// Donor entries matching `matches` that the recipient also has, each
    /// in a slot no smaller than the recipient's.
    fn donor_audio(&self, matches: impl Fn(&str) -> bool) -> Replacements<'a> {
        let replacements: Replacements<'a> = self
            .donor
            .entries()
            .iter()
            .filter(|toc| matches(&toc.name))
            .filter_map(|source| {
                let target = self.recipient.find(&source.name)?;
                Some((
                    target.name.to_ascii_uppercase(),
                    UndubEntry::container_backed(self.donor, source, target, target.size),
                ))
            })
            .collect();

        tracing::debug!("{} donor audio entries matched", replacements.len());
        replacements
    }

    /// Copy the donor title pictures over every localized title archive.
    fn title_entries(&self) -> Result<Replacements<'a>> {
        let donor = read_archive(self.donor, &require(self.donor, DONOR_TITLE)?.name)?;
        let mut replacements = Replacements::new();

        for target in localized(self.recipient, &TITLE, LANGUAGES.len())? {
            let mut archive = read_archive(self.recipient, &target.name)?;
            archive.copy_slots_from(&donor, TITLE_PICTURES)?;
            tracing::info!("Replacing title pictures in {}", target.name);
            replacements.insert(
                target.name.to_ascii_uppercase(),
                UndubEntry::synthesized(target, archive.into_bytes()),
            );
        }
        Ok(replacements)
    }

    /// Recolor the donor portrait into every localized menu archive.
    fn portrait_entries(&self) -> Result<Replacements<'a>> {
        let donor = read_archive(self.donor, &require(self.donor, DONOR_PORTRAIT)?.name)?;
        let donor_picture = donor.get(PORTRAIT_SLOT)?;
        let recolorer = PaletteRecolorer::default();
        let mut replacements = Replacements::new();

        for target in localized(self.recipient, &MENU_PORTRAIT, LANGUAGES.len())? {
            let mut archive = read_archive(self.recipient, &target.name)?;
            let picture = recolorer.recolor_bytes(archive.get(PORTRAIT_SLOT)?, donor_picture)?;
            archive.set(PORTRAIT_SLOT, &picture)?;
            tracing::info!("Recolored portrait in {}", target.name);
            replacements.insert(
                target.name.to_ascii_uppercase(),
                UndubEntry::synthesized(target, archive.into_bytes()),
            );
        }
        Ok(replacements)
    }

    /// Whole-entry model replacements, each in a slot of the donor's size.
    fn model_entries(&self) -> Result<Replacements<'a>> {
        let mut replacements = Replacements::new();

        for name in MODELS {
            let source = require(self.donor, name)?;
            let target = require(self.recipient, name)?;
            replacements.insert(
                target.name.to_ascii_uppercase(),
                UndubEntry::container_backed(self.donor, source, target, source.size),
            );
        }
        tracing::info!("Replacing {} model entries", replacements.len());
        Ok(replacements)
    }

    /// Copy each donor stage title over its localized copies.
    fn stage_title_entries(&self) -> Result<Replacements<'a>> {
        let sources = localized(self.donor, &STAGE_TITLE, 4)?;
        let mut by_target: HashMap<String, &TocEntry> = HashMap::new();
        for source in &sources {
            let (stem, extension) = source
                .name
                .split_once('.')
                .unwrap_or((source.name.as_str(), ""));
            for language in LANGUAGES {
                by_target.insert(format!("{stem}_{language}.{extension}"), *source);
            }
        }

        let mut replacements = Replacements::new();
        for target in localized(self.recipient, &LOCALIZED_STAGE_TITLE, 4 * LANGUAGES.len())? {
            let key = target.name.to_ascii_uppercase();
            let source = by_target
                .get(&key)
                .ok_or_else(|| Error::MissingResource(format!("donor stage title for {key}")))?;

            let donor = read_archive(self.donor, &source.name)?;
            let mut archive = read_archive(self.recipient, &target.name)?;
            archive.copy_slots_from(&donor, TITLE_PICTURES)?;
            replacements.insert(key, UndubEntry::synthesized(target, archive.into_bytes()));
        }
        tracing::info!("Replacing {} stage titles", replacements.len());
        Ok(replacements)
    }
}
