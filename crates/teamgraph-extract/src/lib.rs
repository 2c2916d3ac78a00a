//! Tokenizer/extractor for raw team and club strings.
//!
//! Pipeline (each pass consumes what it matched before the next one runs):
//!
//! ```text
//! raw name
//!   └─ birth year   (2012B, G2012, '12, 12G)
//!        └─ age group  (U13, 13U, BU13, G14)
//!             └─ gender words (Boys, Girls, B, G, ...)
//!                  └─ competition tier (ECNL, MLS NEXT, Premier, ...)
//!                       └─ branch ((Plano), North, ...)
//!                            └─ residual → normalized_name
//! ```
//!
//! Extraction is total and never guesses: unparseable tokens stay in the
//! residual and conflicting tokens are reported as
//! [`Ambiguity`](teamgraph_core::record::Ambiguity)s.

mod display;
mod extract;
mod normalize;
mod vocab;

pub use display::display;
pub use extract::{Extractor, parse_gender};
pub use normalize::{normalize_club, normalize_team_name, tokens};
pub use vocab::TIERS;

use teamgraph_core::{
  record::{ExtractedFields, RawRecord},
  season::Season,
};

/// Extract fields from a raw name for `season`.
pub fn extract(
  season: Season,
  raw_name: &str,
  raw_club_name: Option<&str>,
) -> ExtractedFields {
  Extractor::new(season).extract(raw_name, raw_club_name)
}

/// Extract fields from a full provider record, consulting its age and gender
/// columns when the name is silent.
pub fn extract_record(season: Season, record: &RawRecord) -> ExtractedFields {
  Extractor::new(season).extract_record(record)
}
