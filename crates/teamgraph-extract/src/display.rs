//! Render extracted fields back into a canonical team string.
//!
//! The output re-extracts to the same structured fields:
//! `extract(display(extract(s))) == extract(s)` for well-formed input.

use teamgraph_core::record::{Ambiguity, ExtractedFields, Gender};

/// Canonical display string, e.g. `"FC Dallas 2012B u13 (North) ECNL"`.
pub fn display(fields: &ExtractedFields) -> String {
  let mut parts: Vec<String> = Vec::new();
  if !fields.normalized_name.is_empty() {
    parts.push(fields.normalized_name.clone());
  }

  let gender_conflict = fields.ambiguities.contains(&Ambiguity::ConflictingGender);
  let mut gender_written = false;

  if let Some(year) = fields.birth_year {
    match fields.gender {
      Some(gender) => {
        parts.push(format!("{year}{}", gender.letter()));
        gender_written = true;
      }
      None => parts.push(year.to_string()),
    }
  }

  if let Some(age_group) = &fields.age_group {
    parts.push(age_group.to_uppercase());
  }

  if gender_conflict {
    parts.push("Boys Girls".to_owned());
  } else if let Some(gender) = fields.gender
    && !gender_written
  {
    parts.push(
      match gender {
        Gender::Male => "Boys",
        Gender::Female => "Girls",
      }
      .to_owned(),
    );
  }

  if let Some(branch) = &fields.branch {
    parts.push(format!("({branch})"));
  }
  if let Some(tier) = &fields.tier {
    parts.push(tier.clone());
  }

  parts.join(" ")
}

#[cfg(test)]
mod tests {
  use teamgraph_core::season::Season;

  use super::*;
  use crate::extract;

  fn round_trips(raw: &str) {
    let season = Season::ending(2025);
    let first = extract(season, raw, None);
    let rendered = display(&first);
    let second = extract(season, &rendered, None);
    assert_eq!(first, second, "{raw:?} rendered as {rendered:?}");
  }

  #[test]
  fn display_is_stable_under_extraction() {
    for raw in [
      "FC Dallas 2012B ECNL",
      "Solar SC G14 Premier",
      "Sting '11 Girls",
      "Solar SC (plano) 2011B NPL",
      "FC Dallas North U12 MLS Next",
      "Rush 2012B Girls",
      "Rush 2012 U15 Boys",
      "Texans 13U",
      "Legends",
    ] {
      round_trips(raw);
    }
  }

  #[test]
  fn display_layout() {
    let season = Season::ending(2025);
    let fields = extract(season, "FC Dallas 2012B ECNL", None);
    assert_eq!(display(&fields), "FC Dallas 2012B ECNL");
    let fields = extract(season, "Solar SC G14 Premier", None);
    assert_eq!(display(&fields), "Solar SC U14 Girls Premier");
  }
}
