use geo::Polygon;
use serde::{Deserialize, Serialize};

use crate::address::StreetAddress;
use crate::error::FetchError;
use crate::geocode::ReverseGeocode;
use crate::lookup::CenterLookup;
use crate::sample::random_point_in;

/// Outcome for one precinct. Serializes as the center name or an explicit null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum CenterResult {
    Resolved(String),
    Unresolved,
}

impl From<Option<String>> for CenterResult {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(name) => Self::Resolved(name),
            None => Self::Unresolved,
        }
    }
}

impl From<CenterResult> for Option<String> {
    fn from(value: CenterResult) -> Self {
        match value {
            CenterResult::Resolved(name) => Some(name),
            CenterResult::Unresolved => None,
        }
    }
}

/// Default shared retry budget per precinct. One budget covers geocode
/// misses, lookup misses, parse failures, and transient transport errors, so
/// resolution always terminates.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Resolves one precinct polygon to a voting center.
///
/// Repeatedly samples an interior point, reverse-geocodes it, and submits the
/// resulting address to the lookup form. Every per-attempt failure converts
/// into a retry with a fresh point; only a connectivity-class failure escapes,
/// so a single stubborn precinct can never fail a batch.
pub struct CenterResolver<G, L> {
    geocoder: G,
    lookup: L,
    max_attempts: u32,
    pub(crate) verbose: u8,
}

impl<G: ReverseGeocode, L: CenterLookup> CenterResolver<G, L> {
    pub fn new(geocoder: G, lookup: L) -> Self {
        Self {
            geocoder,
            lookup,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            verbose: 0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a single precinct. Always terminates with a `CenterResult`;
    /// only `FetchError::Unreachable` is returned as an error, so the caller
    /// can halt a batch while keeping partial progress.
    pub fn resolve(&mut self, polygon: &Polygon<f64>) -> Result<CenterResult, FetchError> {
        let mut rng = rand::rng();

        for attempt in 1..=self.max_attempts {
            // SAMPLING: geometry errors are fatal for this precinct only.
            let point = match random_point_in(polygon, &mut rng) {
                Ok(point) => point,
                Err(err) => {
                    if self.verbose > 0 {
                        eprintln!("[resolve] geometry rejected ({err}), marking unresolved");
                    }
                    return Ok(CenterResult::Unresolved);
                }
            };

            // GEOCODING: GeoJSON coordinates are (lon, lat).
            let (lon, lat) = (point.x(), point.y());
            let address = match self.geocoder.reverse(lat, lon) {
                Ok(Some(address)) if address.usable() => address,
                Ok(_) => continue,
                Err(err @ FetchError::Unreachable(_)) => return Err(err),
                Err(FetchError::Transient(msg)) => {
                    if self.verbose > 1 {
                        eprintln!("[resolve] geocode attempt {attempt} failed: {msg}");
                    }
                    continue;
                }
            };

            // usable() guarantees all three fragments are present
            let street_text = format!(
                "{} {}",
                address.house_number.as_deref().unwrap_or_default(),
                address.road.as_deref().unwrap_or_default()
            );
            let zip = address.postcode.as_deref().unwrap_or_default();
            let Some(street) = StreetAddress::parse(&street_text, zip) else {
                // Unparseable address: never submitted, treated as a miss.
                continue;
            };
            if self.verbose > 1 {
                eprintln!("[resolve] trying address {street_text} {zip}");
            }

            // LOOKING_UP: a definitive miss means a different point may land
            // in a lookup-resolvable area, so resample.
            match self.lookup.lookup(&street) {
                Ok(Some(center)) => {
                    if self.verbose > 0 {
                        eprintln!("[resolve] got center: {center}");
                    }
                    return Ok(CenterResult::Resolved(center));
                }
                Ok(None) => continue,
                Err(err @ FetchError::Unreachable(_)) => return Err(err),
                Err(FetchError::Transient(msg)) => {
                    if self.verbose > 1 {
                        eprintln!("[resolve] lookup attempt {attempt} failed: {msg}");
                    }
                    continue;
                }
            }
        }

        Ok(CenterResult::Unresolved)
    }
}
