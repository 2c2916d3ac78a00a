//! Fixed token vocabularies.

/// Recognised competition tiers as `(canonical spelling, pattern)`.
///
/// Scanned in order and the first hit wins, so longer phrases precede the
/// tags they contain.
pub const TIERS: &[(&str, &str)] = &[
  ("ECNL RL", r"(?i)\becnl[\s-]*rl\b"),
  ("Pre-ECNL", r"(?i)\bpre[\s-]*ecnl\b"),
  ("MLS NEXT", r"(?i)\bmls[\s-]*next\b"),
  ("ECNL", r"(?i)\becnl\b"),
  ("ECRL", r"(?i)\becrl\b"),
  ("GA", r"(?i)\bga\b"),
  ("NPL", r"(?i)\bnpl\b"),
  ("DPL", r"(?i)\bdpl\b"),
  ("EDP", r"(?i)\bedp\b"),
  ("Premier", r"(?i)\bpremier\b"),
  ("Elite", r"(?i)\belite\b"),
  ("Select", r"(?i)\bselect\b"),
  ("Academy", r"(?i)\bacademy\b"),
  ("Classic", r"(?i)\bclassic\b"),
  ("Gold", r"(?i)\bgold\b"),
  ("Silver", r"(?i)\bsilver\b"),
  ("Bronze", r"(?i)\bbronze\b"),
];

/// Words that name a club branch when they are not the first word.
pub const DIRECTIONS: &[&str] = &[
  "north",
  "south",
  "east",
  "west",
  "central",
  "northeast",
  "northwest",
  "southeast",
  "southwest",
];

/// Club-name noise removed before club comparison. Multi-word phrases go
/// first.
pub const CLUB_NOISE_PHRASES: &[&str] = &[
  "soccer club",
  "futbol club",
  "football club",
  "soccer academy",
  "youth soccer",
];

pub const CLUB_NOISE_WORDS: &[&str] = &[
  "sc", "fc", "cf", "sa", "ysc", "ysa", "afc", "soccer", "futbol", "football",
  "club", "youth",
];
