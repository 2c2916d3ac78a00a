//! String similarity over normalized names.

use teamgraph_extract::tokens;

/// Token-set Jaccard index of two normalized strings.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
  let (a, b) = (tokens(a), tokens(b));
  let union = a.union(&b).count();
  if union == 0 {
    return 0.0;
  }
  a.intersection(&b).count() as f64 / union as f64
}

/// Similarity in `[0, 1]`: the larger of token Jaccard and normalized
/// Levenshtein, so both reordered and misspelled names score well.
pub fn name_similarity(a: &str, b: &str) -> f64 {
  if a == b {
    return 1.0;
  }
  token_jaccard(a, b).max(strsim::normalized_levenshtein(a, b))
}

pub fn round4(x: f64) -> f64 { (x * 10_000.0).round() / 10_000.0 }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_names_score_one() {
    assert_eq!(name_similarity("fc dallas", "fc dallas"), 1.0);
  }

  #[test]
  fn reordered_tokens_score_high() {
    assert_eq!(token_jaccard("dallas fc", "fc dallas"), 1.0);
  }

  #[test]
  fn typo_scores_by_edit_distance() {
    let score = name_similarity("solar", "solars");
    assert!(score > 0.8 && score < 1.0, "{score}");
  }

  #[test]
  fn unrelated_names_score_low() {
    assert!(name_similarity("solar", "sting") < 0.5);
    assert_eq!(token_jaccard("", ""), 0.0);
  }

  #[test]
  fn rounding_keeps_four_decimals() {
    assert_eq!(round4(0.123_456), 0.1235);
  }
}
