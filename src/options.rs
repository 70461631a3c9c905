//! Options page: edit the block duration.

use anyhow::{anyhow, Result};

use crate::store::{KeyValueStore, Preferences};

pub const SAVED_STATUS: &str = "Saved!";

pub struct OptionsPage<S> {
    prefs: Preferences<S>,
}

impl<S: KeyValueStore> OptionsPage<S> {
    pub fn new(prefs: Preferences<S>) -> Self {
        Self { prefs }
    }

    pub async fn load_duration(&self) -> u32 {
        self.prefs.block_duration().await
    }

    /// Parses the form value, clamps it to 1..=60 and stores it. Returns the
    /// stored minutes alongside the status line.
    pub async fn save_duration(&self, input: &str) -> Result<(u32, &'static str)> {
        let minutes = parse_leading_int(input)
            .ok_or_else(|| anyhow!("'{}' is not a number of minutes", input.trim()))?;
        let stored = self.prefs.set_block_duration(minutes).await;
        Ok((stored, SAVED_STATUS))
    }
}

/// Leading base-10 integer of the trimmed input, with an optional sign.
/// Trailing garbage is ignored (`"7min"` reads as 7).
fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    if digits.is_empty() {
        return None;
    }
    // Anything too long to fit clamps the same way as a huge value.
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
