//! Fixed-regex text classification
//!
//! Maps raw message text to a (vehicle kind, canonical name) key. The
//! tables are deliberately static: a bus is a 3-4 digit fleet number, a
//! train station is one of the known Trentino station names, and the
//! Trento-Sardagna ropeway has exactly two endpoints.

use codibot_common::db::VehicleKind;
use once_cell::sync::Lazy;
use regex::Regex;

static BUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d){3,4}$").unwrap());

static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^TT\d{3,4}$").unwrap());

static TRAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(ora|primolano|ala|avio|borghetto|borgo est|borgo|calceranica|caldonazzo|grigno|lavis|levico|mezzocorona borgata|mori|pergine|povo|rovereto|cristoforo|serravalle|scrigno|trento nord|trento bartolameo|trento chiara|villazzano|trento|gardolo|zona industriale|lamar|zambana|nave|grumo|mezzocorona|mezzolombardo|masi|crescino|denno|mollaro|segno|taio|dermulo|tassullo|cles polo|cles|mostizzolo|bozzana|tozzaga|cassana|cavizzana|caldes|terzolas|malè|croviana|monclassico|dimaro|mastellina|daolasa|piano|marileva|mezzana)$",
    )
    .unwrap()
});

static ROPEWAY_TRENTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^funivia trento$").unwrap());

static ROPEWAY_SARDAGNA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^funivia sardagna$").unwrap());

/// Normalize a submitted ticketing code: uppercase, then validate the
/// "TT" + 3-4 digits format. Returns None on malformed input.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    CODE_RE.is_match(&code).then_some(code)
}

/// Classify the vehicle-name step of the feed dialogue.
///
/// Train stations are tried before bus numbers; unclassifiable text
/// returns None and the dialogue is abandoned.
pub fn classify_feed_name(text: &str) -> Option<(VehicleKind, String)> {
    let text = text.trim();
    if let Some(m) = TRAIN_RE.find(text) {
        return Some((VehicleKind::Train, m.as_str().to_string()));
    }
    if let Some(m) = BUS_RE.find(text) {
        return Some((VehicleKind::Bus, m.as_str().to_string()));
    }
    None
}

/// Classify free text on the query path.
///
/// Ropeway endpoints are tried first, then bus numbers, then train
/// stations. Ropeway names are canonicalized to lowercase.
pub fn classify_query(text: &str) -> Option<(VehicleKind, String)> {
    let text = text.trim();
    if let Some(m) = ROPEWAY_TRENTO_RE.find(text) {
        return Some((VehicleKind::Ropeway, m.as_str().to_lowercase()));
    }
    if let Some(m) = ROPEWAY_SARDAGNA_RE.find(text) {
        return Some((VehicleKind::Ropeway, m.as_str().to_lowercase()));
    }
    if let Some(m) = BUS_RE.find(text) {
        return Some((VehicleKind::Bus, m.as_str().to_string()));
    }
    if let Some(m) = TRAIN_RE.find(text) {
        return Some((VehicleKind::Train, m.as_str().to_string()));
    }
    None
}
