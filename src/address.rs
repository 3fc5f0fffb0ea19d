use std::sync::OnceLock;

use regex::Regex;

/// A free-text street address split into the lookup form's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetAddress {
    pub number: String,
    /// Directional prefix (N, S, E, W, NE, NW, SE, SW), uppercased.
    pub directional: Option<String>,
    pub street: String,
    pub zip: String,
}

fn street_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(\d+[A-Z]?)\s+(?:(NORTH|SOUTH|EAST|WEST|NE|NW|SE|SW|N|S|E|W)\.?\s+)?(\S.*?)\s*$",
        )
        .unwrap()
    })
}

/// Street-type suffixes dropped from the street-name field. The form matches
/// on the bare name ("Main", not "Main St").
const STREET_TYPES: &[&str] = &[
    "ST", "STREET", "AVE", "AVENUE", "RD", "ROAD", "DR", "DRIVE", "BLVD", "BOULEVARD", "LN",
    "LANE", "CT", "COURT", "CIR", "CIRCLE", "PL", "PLACE", "WAY", "TER", "TERRACE", "TRL",
    "TRAIL", "PKWY", "PARKWAY", "HWY", "HIGHWAY", "LOOP",
];

impl StreetAddress {
    /// Splits `"123 N Main St"` plus a zip code into the form's fields.
    ///
    /// Returns `None` when no street number and street name can be identified,
    /// in which case the address must not be submitted at all.
    pub fn parse(street_text: &str, zip: &str) -> Option<Self> {
        let caps = street_re().captures(street_text)?;
        let street = strip_street_type(caps[3].trim()).to_owned();
        if street.is_empty() {
            return None;
        }
        Some(Self {
            number: caps[1].to_owned(),
            directional: caps.get(2).map(|m| abbreviate(m.as_str())),
            street,
            zip: zip.trim().to_owned(),
        })
    }
}

/// Drops a trailing street-type token, unless it is the only token left.
fn strip_street_type(street: &str) -> &str {
    let Some((head, last)) = street.rsplit_once(' ') else {
        return street;
    };
    let token = last.trim_end_matches('.').to_ascii_uppercase();
    if STREET_TYPES.contains(&token.as_str()) {
        head.trim_end()
    } else {
        street
    }
}

/// Uppercase and shorten spelled-out directionals to the form's one-letter codes.
fn abbreviate(directional: &str) -> String {
    match directional.to_ascii_uppercase().as_str() {
        "NORTH" => "N".to_owned(),
        "SOUTH" => "S".to_owned(),
        "EAST" => "E".to_owned(),
        "WEST" => "W".to_owned(),
        other => other.to_owned(),
    }
}
