//! CLI command for listing container entries

use std::path::Path;

use crate::container::ContainerIndex;

/// Simple glob pattern matching (supports * and ?)
fn matches_glob(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();
    matches_glob_recursive(&pattern_chars, &text_chars, 0, 0)
}

fn matches_glob_recursive(pattern: &[char], text: &[char], pi: usize, ti: usize) -> bool {
    if pi == pattern.len() {
        return ti == text.len();
    }

    match pattern[pi] {
        '*' => (ti..=text.len()).any(|i| matches_glob_recursive(pattern, text, pi + 1, i)),
        '?' => ti < text.len() && matches_glob_recursive(pattern, text, pi + 1, ti + 1),
        c => {
            ti < text.len()
                && text[ti].eq_ignore_ascii_case(&c)
                && matches_glob_recursive(pattern, text, pi + 1, ti + 1)
        }
    }
}

/// Format byte size for human-readable output
fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{bytes}")
    }
}

pub fn execute(source: &Path, filter: Option<&str>, json: bool, count: bool) -> anyhow::Result<()> {
    let index = ContainerIndex::open_path(source)?;

    let entries: Vec<_> = index
        .entries()
        .iter()
        .filter(|entry| filter.is_none_or(|pattern| matches_glob(pattern, &entry.name)))
        .collect();

    if count {
        println!("{}", entries.len());
    } else if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{} ({} entries)", index.executable(), index.len());
        println!("{:>5}  {:>12}  {:>8}  NAME", "SEQ", "OFFSET", "SIZE");
        for entry in &entries {
            println!(
                "{:>5}  {:>#12x}  {:>8}  {}",
                entry.sequence,
                entry.offset,
                format_size(entry.size),
                entry.name
            );
        }
        let used: u64 = index.entries().iter().map(|entry| entry.size).sum();
        println!(
            "\n{} used of {} capacity",
            format_size(used),
            format_size(index.capacity())
        );
    }

    Ok(())
}
