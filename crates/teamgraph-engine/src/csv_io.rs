//! CSV surfaces: batch input, batch output, review export and game import.

use std::io;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use teamgraph_core::{
  record::{ExtractedFields, Gender, RawRecord},
  review::ReviewItem,
};
use teamgraph_extract::{display, normalize_club};
use uuid::Uuid;

use crate::{Result, pipeline::Outcome};

// ─── Input ───────────────────────────────────────────────────────────────────

/// One row of the batch input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRow {
  pub provider_id:         String,
  pub provider_record_id:  String,
  pub raw_name:            String,
  #[serde(default)]
  pub raw_club_name:       Option<String>,
  #[serde(default)]
  pub source_age_field:    Option<String>,
  #[serde(default)]
  pub source_gender_field: Option<String>,
  #[serde(default)]
  pub state_code:          Option<String>,
}

impl From<InputRow> for RawRecord {
  fn from(row: InputRow) -> Self {
    Self {
      provider_id:         row.provider_id,
      provider_record_id:  row.provider_record_id,
      raw_name:            row.raw_name,
      raw_club_name:       row.raw_club_name,
      source_age_field:    row.source_age_field,
      source_gender_field: row.source_gender_field,
      state_code:          row.state_code,
    }
  }
}

impl From<&RawRecord> for InputRow {
  fn from(record: &RawRecord) -> Self {
    Self {
      provider_id:         record.provider_id.clone(),
      provider_record_id:  record.provider_record_id.clone(),
      raw_name:            record.raw_name.clone(),
      raw_club_name:       record.raw_club_name.clone(),
      source_age_field:    record.source_age_field.clone(),
      source_gender_field: record.source_gender_field.clone(),
      state_code:          record.state_code.clone(),
    }
  }
}

fn reader<R: io::Read>(input: R) -> csv::Reader<R> {
  csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .flexible(true)
    .from_reader(input)
}

/// Read raw records, failing on the first malformed row.
pub fn read_records<R: io::Read>(input: R) -> Result<Vec<RawRecord>> {
  reader(input)
    .deserialize::<InputRow>()
    .map(|row| Ok(row?.into()))
    .collect()
}

/// Write records in the input schema, e.g. the requeue file of a batch run.
pub fn write_records<'a, W: io::Write>(
  output: W,
  records: impl IntoIterator<Item = &'a RawRecord>,
) -> Result<()> {
  let mut writer = csv::Writer::from_writer(output);
  for record in records {
    writer.serialize(InputRow::from(record))?;
  }
  writer.flush()?;
  Ok(())
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// One row of the batch output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
  pub original:        String,
  pub club_normalized: String,
  pub team_normalized: String,
  pub club_id:         Option<Uuid>,
  pub birth_year:      Option<i32>,
  pub gender:          Option<Gender>,
  pub tier:            Option<String>,
  pub branch:          Option<String>,
  pub confidence:      Option<f64>,
  pub action:          &'static str,
  pub notes:           Option<String>,
}

impl OutputRow {
  fn new(record: &RawRecord, fields: &ExtractedFields) -> Self {
    let club = record
      .raw_club_name
      .as_deref()
      .filter(|club| !club.trim().is_empty())
      .unwrap_or(&fields.normalized_name);
    Self {
      original:        record.raw_name.clone(),
      club_normalized: normalize_club(club),
      team_normalized: display(fields),
      club_id:         None,
      birth_year:      fields.birth_year,
      gender:          fields.gender,
      tier:            fields.tier.clone(),
      branch:          fields.branch.clone(),
      confidence:      None,
      action:          "needs-review",
      notes:           None,
    }
  }
}

impl From<&Outcome> for OutputRow {
  fn from(outcome: &Outcome) -> Self {
    Self {
      club_id: outcome.club_id,
      confidence: outcome.confidence,
      action: outcome.action.label(),
      notes: outcome.notes(),
      ..Self::new(&outcome.record, &outcome.fields)
    }
  }
}

pub fn write_outcomes<W: io::Write>(output: W, outcomes: &[Outcome]) -> Result<()> {
  let mut writer = csv::Writer::from_writer(output);
  for outcome in outcomes {
    writer.serialize(OutputRow::from(outcome))?;
  }
  writer.flush()?;
  Ok(())
}

/// The review-queue file of a batch run: the output schema restricted to
/// `needs-review` rows.
pub fn write_review_queue<W: io::Write>(output: W, outcomes: &[Outcome]) -> Result<()> {
  let mut writer = csv::Writer::from_writer(output);
  for outcome in outcomes.iter().filter(|o| o.action.is_review()) {
    writer.serialize(OutputRow::from(outcome))?;
  }
  writer.flush()?;
  Ok(())
}

// ─── Persisted review queue ──────────────────────────────────────────────────

/// A persisted review item in the output schema, keyed by `review_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRow {
  pub review_id:       Uuid,
  pub status:          String,
  pub original:        String,
  pub club_normalized: String,
  pub team_normalized: String,
  pub club_id:         Option<Uuid>,
  pub birth_year:      Option<i32>,
  pub gender:          Option<Gender>,
  pub tier:            Option<String>,
  pub branch:          Option<String>,
  pub confidence:      Option<f64>,
  pub action:          &'static str,
  pub notes:           String,
  /// `team_id:confidence` pairs separated by `;`, best first.
  pub candidates:      String,
}

impl From<&ReviewItem> for ReviewRow {
  fn from(item: &ReviewItem) -> Self {
    let base = OutputRow::new(&item.record, &item.fields);
    Self {
      review_id:       item.review_id,
      status:          item.status.to_string(),
      original:        base.original,
      club_normalized: base.club_normalized,
      team_normalized: base.team_normalized,
      club_id:         None,
      birth_year:      base.birth_year,
      gender:          base.gender,
      tier:            base.tier,
      branch:          base.branch,
      confidence:      item.candidate_matches.first().map(|m| m.confidence),
      action:          base.action,
      notes:           item.notes.clone(),
      candidates:      item
        .candidate_matches
        .iter()
        .map(|m| format!("{}:{:.4}", m.team_id_master, m.confidence))
        .collect::<Vec<_>>()
        .join(";"),
    }
  }
}

pub fn write_review_items<W: io::Write>(output: W, items: &[ReviewItem]) -> Result<()> {
  let mut writer = csv::Writer::from_writer(output);
  for item in items {
    writer.serialize(ReviewRow::from(item))?;
  }
  writer.flush()?;
  Ok(())
}

// ─── Games ───────────────────────────────────────────────────────────────────

/// A game reported by a provider, with both teams given as provider ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameRow {
  pub game_uid:         String,
  pub provider_id:      String,
  pub home_provider_id: String,
  pub away_provider_id: String,
  #[serde(default)]
  pub played_on:        Option<NaiveDate>,
  #[serde(default)]
  pub home_score:       Option<u16>,
  #[serde(default)]
  pub away_score:       Option<u16>,
}

pub fn read_games<R: io::Read>(input: R) -> Result<Vec<GameRow>> {
  reader(input)
    .deserialize::<GameRow>()
    .map(|row| Ok(row?))
    .collect()
}
