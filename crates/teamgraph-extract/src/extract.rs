//! The token passes behind [`Extractor::extract`].

use std::{ops::Range, sync::LazyLock};

use regex::{Captures, Regex};
use teamgraph_core::{
  record::{
    Ambiguity, ExtractedFields, Gender, RawRecord, format_age_group, parse_age_group,
  },
  season::{MAX_AGE, MIN_AGE, Season},
};

use crate::vocab::{DIRECTIONS, TIERS};

// ─── Patterns ────────────────────────────────────────────────────────────────

fn compile(pattern: &str) -> Regex {
  Regex::new(pattern).expect("token pattern is a valid regex")
}

/// `2012`, `2012B`, `G2012`.
static FOUR_DIGIT_YEAR: LazyLock<Regex> =
  LazyLock::new(|| compile(r"(?i)\b([bg])?((?:19|20)\d{2})([bg])?\b"));

/// `'12`, or `12B` / `12G` (digits first; letter-first is an age group).
static TWO_DIGIT_YEAR: LazyLock<Regex> =
  LazyLock::new(|| compile(r"(?i)(?:'(\d{2})\b|\b(\d{2})([bg])\b)"));

/// `U13`, `U-13`, `BU13`, `U13G`.
static AGE_U_PREFIX: LazyLock<Regex> =
  LazyLock::new(|| compile(r"(?i)\b([bg])?u-?(\d{1,2})([bg])?\b"));

/// `13U`.
static AGE_U_SUFFIX: LazyLock<Regex> =
  LazyLock::new(|| compile(r"(?i)\b(\d{1,2})u\b"));

/// `G14`, `B09`.
static AGE_SHORTHAND: LazyLock<Regex> =
  LazyLock::new(|| compile(r"(?i)\b([bg])(\d{1,2})\b"));

static GENDER_WORD: LazyLock<Regex> = LazyLock::new(|| {
  compile(r"(?i)\b(boys|boy|girls|girl|male|female|men|women|b|g)\b")
});

static TIER_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
  TIERS
    .iter()
    .map(|(canonical, pattern)| (*canonical, compile(pattern)))
    .collect()
});

static PAREN_BRANCH: LazyLock<Regex> =
  LazyLock::new(|| compile(r"\(([^()]*)\)"));

static DIRECTION_WORD: LazyLock<Regex> = LazyLock::new(|| {
  compile(&format!(r"(?i)\b({})\b", DIRECTIONS.join("|")))
});

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Gender tokens seen so far in one string.
#[derive(Default)]
struct GenderVotes {
  male:   bool,
  female: bool,
}

impl GenderVotes {
  fn vote(&mut self, gender: Gender) {
    match gender {
      Gender::Male => self.male = true,
      Gender::Female => self.female = true,
    }
  }

  fn vote_letters(&mut self, caps: &Captures<'_>, groups: &[usize]) {
    for &group in groups {
      if let Some(letter) = caps.get(group)
        && let Some(gender) = parse_gender(letter.as_str())
      {
        self.vote(gender);
      }
    }
  }

  fn resolve(&self, ambiguities: &mut Vec<Ambiguity>) -> Option<Gender> {
    match (self.male, self.female) {
      (true, false) => Some(Gender::Male),
      (false, true) => Some(Gender::Female),
      (true, true) => {
        ambiguities.push(Ambiguity::ConflictingGender);
        None
      }
      (false, false) => None,
    }
  }
}

/// Blank out a matched span so later passes cannot see it.
fn consume(text: &mut String, range: Range<usize>) { text.replace_range(range, " "); }

fn title_case(s: &str) -> String {
  s.split_whitespace()
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        Some(first) => {
          first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        None => String::new(),
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

/// Collapse whitespace and drop tokens left with no letters or digits.
fn residual(text: &str) -> String {
  text
    .split_whitespace()
    .filter(|token| *token == "&" || token.chars().any(char::is_alphanumeric))
    .collect::<Vec<_>>()
    .join(" ")
}

/// Map a gender word or letter to [`Gender`].
pub fn parse_gender(token: &str) -> Option<Gender> {
  match token.trim().to_ascii_lowercase().as_str() {
    "b" | "boy" | "boys" | "m" | "male" | "men" => Some(Gender::Male),
    "g" | "girl" | "girls" | "f" | "female" | "women" => Some(Gender::Female),
    _ => None,
  }
}

fn age_in_range(age: u32) -> Option<u8> {
  u8::try_from(age)
    .ok()
    .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
}

struct Hit<T> {
  range: Range<usize>,
  value: T,
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// Parses raw team strings relative to a fixed season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extractor {
  season: Season,
}

impl Extractor {
  pub fn new(season: Season) -> Self { Self { season } }

  pub fn season(&self) -> Season { self.season }

  /// Parse `raw_name` into structured fields. When nothing but tokens is
  /// left, the club name becomes the normalized name.
  pub fn extract(&self, raw_name: &str, raw_club_name: Option<&str>) -> ExtractedFields {
    let mut text = raw_name.to_owned();
    let mut votes = GenderVotes::default();

    let birth_year = self.take_birth_year(&mut text, &mut votes);
    let age_group = take_age_group(&mut text, &mut votes).map(format_age_group);
    take_gender_words(&mut text, &mut votes);
    let tier = take_tier(&mut text);
    let branch = take_branch(&mut text);

    let mut normalized_name = residual(&text);
    if normalized_name.is_empty()
      && let Some(club) = raw_club_name
    {
      normalized_name = residual(club);
    }

    let mut ambiguities = Vec::new();
    let gender = votes.resolve(&mut ambiguities);

    let mut fields = ExtractedFields {
      birth_year,
      age_group,
      gender,
      tier,
      branch,
      normalized_name,
      ambiguities,
    };
    self.check_age_consistency(&mut fields);
    fields
  }

  /// Extract from a provider record. The provider's age and gender columns
  /// fill gaps in the name; disagreements become ambiguities.
  pub fn extract_record(&self, record: &RawRecord) -> ExtractedFields {
    let mut fields = self.extract(&record.raw_name, record.raw_club_name.as_deref());

    if let Some(source) = record.source_gender_field.as_deref()
      && let Some(source_gender) = parse_gender(source)
      && !fields.ambiguities.contains(&Ambiguity::ConflictingGender)
    {
      match fields.gender {
        None => fields.gender = Some(source_gender),
        Some(gender) if gender != source_gender => {
          fields.gender = None;
          fields.ambiguities.push(Ambiguity::ConflictingGender);
        }
        Some(_) => {}
      }
    }

    if let Some(source) = record.source_age_field.as_deref() {
      let parsed = self.extract(source, None);
      let name_age = fields.age_in(self.season);
      let source_age = parsed.age_in(self.season);
      match (name_age, source_age) {
        (None, Some(_)) => {
          fields.birth_year = parsed.birth_year;
          fields.age_group = parsed.age_group;
          self.check_age_consistency(&mut fields);
        }
        (Some(name_age), Some(source_age)) if name_age != source_age => {
          fields.ambiguities.push(Ambiguity::ConflictingSourceAge {
            name_value:   format_age_group(name_age),
            source_value: format_age_group(source_age),
          });
        }
        _ => {}
      }
    }

    fields
  }

  fn take_birth_year(&self, text: &mut String, votes: &mut GenderVotes) -> Option<i32> {
    let hit = self
      .find_four_digit_year(text, votes)
      .or_else(|| self.find_two_digit_year(text, votes))?;
    consume(text, hit.range);
    Some(hit.value)
  }

  fn find_four_digit_year(&self, text: &str, votes: &mut GenderVotes) -> Option<Hit<i32>> {
    for caps in FOUR_DIGIT_YEAR.captures_iter(text) {
      let Ok(year) = caps[2].parse::<i32>() else { continue };
      if !self.season.is_plausible_birth_year(year) {
        continue;
      }
      votes.vote_letters(&caps, &[1, 3]);
      return Some(Hit { range: caps.get(0)?.range(), value: year });
    }
    None
  }

  fn find_two_digit_year(&self, text: &str, votes: &mut GenderVotes) -> Option<Hit<i32>> {
    for caps in TWO_DIGIT_YEAR.captures_iter(text) {
      let Some(digits) = caps.get(1).or_else(|| caps.get(2)) else { continue };
      let Ok(yy) = digits.as_str().parse::<i32>() else { continue };
      let year = if 2000 + yy <= self.season.end_year() { 2000 + yy } else { 1900 + yy };
      if !self.season.is_plausible_birth_year(year) {
        continue;
      }
      votes.vote_letters(&caps, &[3]);
      return Some(Hit { range: caps.get(0)?.range(), value: year });
    }
    None
  }

  /// Record a mismatch between an explicit age group and a birth year.
  fn check_age_consistency(&self, fields: &mut ExtractedFields) {
    let (Some(birth_year), Some(age_group)) = (fields.birth_year, fields.age_group.as_ref())
    else {
      return;
    };
    let Some(age) = parse_age_group(age_group) else { return };
    if self.season.age_of(birth_year) != i32::from(age) {
      let ambiguity = Ambiguity::AgeBirthYearMismatch {
        age_group: age_group.clone(),
        birth_year,
      };
      if !fields.ambiguities.contains(&ambiguity) {
        fields.ambiguities.push(ambiguity);
      }
    }
  }
}

fn take_age_group(text: &mut String, votes: &mut GenderVotes) -> Option<u8> {
  let hit = find_age(&AGE_U_PREFIX, 2, &[1, 3], text, votes)
    .or_else(|| find_age(&AGE_U_SUFFIX, 1, &[], text, votes))
    .or_else(|| find_age(&AGE_SHORTHAND, 2, &[1], text, votes))?;
  consume(text, hit.range);
  Some(hit.value)
}

/// First in-range age matched by `pattern`; its letters vote for a gender.
fn find_age(
  pattern: &Regex,
  number_group: usize,
  letter_groups: &[usize],
  text: &str,
  votes: &mut GenderVotes,
) -> Option<Hit<u8>> {
  for caps in pattern.captures_iter(text) {
    let Some(age) = caps[number_group].parse::<u32>().ok().and_then(age_in_range) else {
      continue;
    };
    votes.vote_letters(&caps, letter_groups);
    return caps.get(0).map(|m| Hit { range: m.range(), value: age });
  }
  None
}

fn take_gender_words(text: &mut String, votes: &mut GenderVotes) {
  let ranges: Vec<Range<usize>> = GENDER_WORD
    .find_iter(text)
    .filter_map(|m| {
      let gender = parse_gender(m.as_str())?;
      votes.vote(gender);
      Some(m.range())
    })
    .collect();
  // Back to front so earlier ranges stay valid.
  for range in ranges.into_iter().rev() {
    consume(text, range);
  }
}

fn take_tier(text: &mut String) -> Option<String> {
  for (canonical, pattern) in TIER_PATTERNS.iter() {
    if let Some(m) = pattern.find(text) {
      let range = m.range();
      consume(text, range);
      return Some((*canonical).to_owned());
    }
  }
  None
}

fn take_branch(text: &mut String) -> Option<String> {
  let paren = PAREN_BRANCH.captures(text).and_then(|caps| {
    let whole = caps.get(0)?.range();
    let inner = residual(caps.get(1)?.as_str());
    (!inner.is_empty()).then(|| Hit { range: whole, value: inner })
  });
  if let Some(hit) = paren {
    consume(text, hit.range);
    return Some(title_case(&hit.value));
  }

  // A leading direction is part of the club name ("North Texas SC").
  let direction = DIRECTION_WORD
    .find_iter(text)
    .find(|m| text[..m.start()].chars().any(char::is_alphanumeric))
    .map(|m| Hit { range: m.range(), value: m.as_str().to_owned() });
  let hit = direction?;
  consume(text, hit.range);
  Some(title_case(&hit.value))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn extractor() -> Extractor { Extractor::new(Season::ending(2025)) }

  #[test]
  fn birth_year_with_attached_gender() {
    let f = extractor().extract("FC Dallas 2012B ECNL", None);
    assert_eq!(f.birth_year, Some(2012));
    assert_eq!(f.gender, Some(Gender::Male));
    assert_eq!(f.tier.as_deref(), Some("ECNL"));
    assert_eq!(f.age_group, None);
    assert_eq!(f.normalized_name, "FC Dallas");
    assert!(f.ambiguities.is_empty());
  }

  #[test]
  fn shorthand_age_group_with_gender_letter() {
    let f = extractor().extract("Solar SC G14 Premier", None);
    assert_eq!(f.age_group.as_deref(), Some("u14"));
    assert_eq!(f.gender, Some(Gender::Female));
    assert_eq!(f.tier.as_deref(), Some("Premier"));
    assert_eq!(f.birth_year, None);
    assert_eq!(f.normalized_name, "Solar SC");
  }

  #[test]
  fn age_group_forms_normalize() {
    for raw in ["Texans U13 Boys", "Texans 13U Boys", "Texans U-13 Boys", "Texans BU13"] {
      let f = extractor().extract(raw, None);
      assert_eq!(f.age_group.as_deref(), Some("u13"), "{raw}");
      assert_eq!(f.gender, Some(Gender::Male), "{raw}");
      assert_eq!(f.normalized_name, "Texans", "{raw}");
    }
  }

  #[test]
  fn two_digit_years_use_century_window() {
    let f = extractor().extract("Sting '11 Girls", None);
    assert_eq!(f.birth_year, Some(2011));
    assert_eq!(f.gender, Some(Gender::Female));

    let f = extractor().extract("Sting 12G", None);
    assert_eq!(f.birth_year, Some(2012));
    assert_eq!(f.gender, Some(Gender::Female));
  }

  #[test]
  fn implausible_years_pass_through() {
    let f = extractor().extract("Club Atletico 1987", None);
    assert_eq!(f.birth_year, None);
    assert_eq!(f.normalized_name, "Club Atletico 1987");
  }

  #[test]
  fn conflicting_gender_is_left_unset() {
    let f = extractor().extract("Rush 2012B Girls", None);
    assert_eq!(f.gender, None);
    assert_eq!(f.ambiguities, vec![Ambiguity::ConflictingGender]);
  }

  #[test]
  fn age_and_birth_year_mismatch_keeps_both() {
    let f = extractor().extract("Rush 2012 U15 Boys", None);
    assert_eq!(f.birth_year, Some(2012));
    assert_eq!(f.age_group.as_deref(), Some("u15"));
    assert_eq!(
      f.ambiguities,
      vec![Ambiguity::AgeBirthYearMismatch { age_group: "u15".into(), birth_year: 2012 }]
    );
  }

  #[test]
  fn first_tier_in_vocabulary_order_wins() {
    let f = extractor().extract("Legends 2010G ECNL RL Premier", None);
    assert_eq!(f.tier.as_deref(), Some("ECNL RL"));
    assert_eq!(f.normalized_name, "Legends Premier");

    let f = extractor().extract("Legends 2010G Pre-ECNL", None);
    assert_eq!(f.tier.as_deref(), Some("Pre-ECNL"));
  }

  #[test]
  fn branch_from_parens_or_direction() {
    let f = extractor().extract("Solar SC (plano) 2011B", None);
    assert_eq!(f.branch.as_deref(), Some("Plano"));
    assert_eq!(f.normalized_name, "Solar SC");

    let f = extractor().extract("FC Dallas North 2011B", None);
    assert_eq!(f.branch.as_deref(), Some("North"));

    let f = extractor().extract("North Texas SC 2011B", None);
    assert_eq!(f.branch, None);
    assert_eq!(f.normalized_name, "North Texas SC");
  }

  #[test]
  fn empty_parens_are_not_a_branch() {
    let f = extractor().extract("Solar SC ( - ) 2011B", None);
    assert_eq!(f.branch, None);
    assert_eq!(f.birth_year, Some(2011));
  }

  #[test]
  fn club_name_fills_empty_residual() {
    let f = extractor().extract("U12 Girls", Some("Solar SC"));
    assert_eq!(f.normalized_name, "Solar SC");
    assert_eq!(f.age_group.as_deref(), Some("u12"));
  }

  #[test]
  fn record_columns_fill_gaps() {
    let mut record = RawRecord::new("gotsport", "77", "Solar SC Red");
    record.source_age_field = Some("2012".into());
    record.source_gender_field = Some("Girls".into());
    let f = extractor().extract_record(&record);
    assert_eq!(f.birth_year, Some(2012));
    assert_eq!(f.gender, Some(Gender::Female));
    assert!(f.ambiguities.is_empty());
  }

  #[test]
  fn record_columns_conflicting_with_name() {
    let mut record = RawRecord::new("gotsport", "78", "Solar SC 2012B");
    record.source_gender_field = Some("Female".into());
    record.source_age_field = Some("U11".into());
    let f = extractor().extract_record(&record);
    assert_eq!(f.gender, None);
    assert!(f.ambiguities.contains(&Ambiguity::ConflictingGender));
    assert!(f.ambiguities.contains(&Ambiguity::ConflictingSourceAge {
      name_value:   "u13".into(),
      source_value: "u11".into(),
    }));
  }
}
