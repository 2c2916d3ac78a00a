//! Case-folding normalizers used for comparison keys.

use crate::vocab::{CLUB_NOISE_PHRASES, CLUB_NOISE_WORDS};

/// Lower-case, turn punctuation into spaces, collapse whitespace.
pub fn normalize_team_name(s: &str) -> String {
  s.to_lowercase()
    .replace('&', " and ")
    .chars()
    .map(|c| if c.is_alphanumeric() { c } else { ' ' })
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Comparison key for a club: [`normalize_team_name`] with common club
/// suffixes and prefixes ("SC", "FC", "Soccer Club", ...) removed.
///
/// Falls back to the plain normalized name when stripping would leave
/// nothing.
pub fn normalize_club(s: &str) -> String {
  let plain = normalize_team_name(s);
  let mut padded = format!(" {plain} ");
  for phrase in CLUB_NOISE_PHRASES {
    padded = padded.replace(&format!(" {phrase} "), " ");
  }
  let stripped: Vec<&str> = padded
    .split_whitespace()
    .filter(|word| !CLUB_NOISE_WORDS.contains(word))
    .collect();
  if stripped.is_empty() {
    plain
  } else {
    stripped.join(" ")
  }
}

/// Whitespace tokens of an already-normalized string.
pub fn tokens(normalized: &str) -> std::collections::BTreeSet<&str> {
  normalized.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn club_suffixes_are_stripped() {
    assert_eq!(normalize_club("FC Dallas"), "dallas");
    assert_eq!(normalize_club("Dallas Texans Soccer Club"), "dallas texans");
    assert_eq!(normalize_club("Solar S.C."), "solar s c");
    assert_eq!(normalize_club("Solar SC"), "solar");
    assert_eq!(normalize_club("Sting Soccer Club, Inc"), "sting inc");
  }

  #[test]
  fn club_of_only_noise_keeps_plain_name() {
    assert_eq!(normalize_club("Soccer Club"), "soccer club");
  }

  #[test]
  fn team_name_keeps_suffixes() {
    assert_eq!(normalize_team_name("Solar SC - Red"), "solar sc red");
    assert_eq!(normalize_team_name("Boys & Girls"), "boys and girls");
  }
}
