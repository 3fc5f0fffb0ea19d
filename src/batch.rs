use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::feature::PrecinctFeature;
use crate::geocode::ReverseGeocode;
use crate::lookup::CenterLookup;
use crate::resolve::{CenterResolver, CenterResult};

/// Precinct id to outcome, the unit of output for a batch run.
///
/// Serializes as a flat JSON object; unresolved precincts are explicit nulls,
/// never silent omissions. Grows monotonically over a run and is partial on
/// early termination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CenterMapping(BTreeMap<String, CenterResult>);

impl CenterMapping {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, precinct: &str) -> Option<&CenterResult> {
        self.0.get(precinct)
    }

    pub fn insert(&mut self, precinct: String, result: CenterResult) {
        self.0.insert(precinct, result);
    }

    /// True when the precinct already has a resolved (non-null) center.
    pub fn is_resolved(&self, precinct: &str) -> bool {
        matches!(self.0.get(precinct), Some(CenterResult::Resolved(_)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CenterResult)> {
        self.0.iter()
    }
}

/// Result of a batch run. `halted` carries the connectivity failure when the
/// run stopped early; the mapping then holds everything gathered so far, so a
/// rerun need only cover the remaining precincts.
#[derive(Debug)]
pub struct BatchReport {
    pub mapping: CenterMapping,
    pub halted: Option<FetchError>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Resolves a whole collection of precinct features, one at a time.
///
/// Sequential by design: both upstream services are rate-limited and the
/// lookup form is session-stateful, so concurrent requests would violate rate
/// limits or corrupt per-session tokens.
pub struct BatchResolver<G, L> {
    resolver: CenterResolver<G, L>,
}

impl<G: ReverseGeocode, L: CenterLookup> BatchResolver<G, L> {
    pub fn new(resolver: CenterResolver<G, L>) -> Self {
        Self { resolver }
    }

    /// Resolve every feature in input order, seeding from a previous run's
    /// mapping. Precincts already resolved in the seed are skipped, since
    /// rate-limited upstreams make redundant lookups expensive; unresolved
    /// seed entries are retried. Connectivity loss halts the run and the
    /// partial mapping is returned rather than discarded.
    pub fn resolve_all(&mut self, features: &[PrecinctFeature], seed: CenterMapping) -> BatchReport {
        let verbose = self.resolver.verbose;
        let mut mapping = seed;

        for feature in features {
            if mapping.is_resolved(&feature.precinct) {
                if verbose > 0 {
                    eprintln!("[resolve] precinct {} already resolved, skipping", feature.precinct);
                }
                continue;
            }
            if verbose > 0 {
                eprintln!("[resolve] precinct {}", feature.precinct);
            }
            match self.resolver.resolve(&feature.polygon) {
                Ok(result) => {
                    mapping.insert(feature.precinct.clone(), result);
                }
                Err(err) => {
                    eprintln!("[resolve] halting after connectivity loss: {err}");
                    return BatchReport {
                        mapping,
                        halted: Some(err),
                    };
                }
            }
        }

        BatchReport {
            mapping,
            halted: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::StreetAddress;
    use crate::geocode::PartialAddress;
    use geo::{Coord, LineString, Polygon};
    use std::collections::VecDeque;

    fn unit_square() -> Polygon<f64> {
        Polygon::new(
            LineString(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: 0.0, y: 1.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        )
    }

    fn precinct(id: &str) -> PrecinctFeature {
        PrecinctFeature {
            precinct: id.to_owned(),
            polygon: unit_square(),
        }
    }

    fn usable_address() -> PartialAddress {
        PartialAddress {
            house_number: Some("123".into()),
            road: Some("Main St".into()),
            postcode: Some("32801".into()),
        }
    }

    /// Replays scripted responses in order; misses once the script runs out.
    struct SeqGeocoder {
        script: VecDeque<Result<Option<PartialAddress>, FetchError>>,
    }

    impl ReverseGeocode for SeqGeocoder {
        fn reverse(&mut self, _lat: f64, _lon: f64) -> Result<Option<PartialAddress>, FetchError> {
            self.script.pop_front().unwrap_or(Ok(None))
        }
    }

    struct ConstLookup {
        center: String,
        calls: u32,
    }

    impl CenterLookup for ConstLookup {
        fn lookup(&mut self, _address: &StreetAddress) -> Result<Option<String>, FetchError> {
            self.calls += 1;
            Ok(Some(self.center.clone()))
        }
    }

    #[test]
    fn connectivity_loss_preserves_partial_mapping() {
        let geocoder = SeqGeocoder {
            script: VecDeque::from([
                Ok(Some(usable_address())),
                Err(FetchError::Unreachable("network down".into())),
            ]),
        };
        let lookup = ConstLookup {
            center: "Center A".into(),
            calls: 0,
        };
        let features = [precinct("101"), precinct("102"), precinct("103")];

        let report = BatchResolver::new(CenterResolver::new(geocoder, lookup))
            .resolve_all(&features, CenterMapping::default());

        assert!(!report.is_complete());
        assert_eq!(report.mapping.len(), 1);
        assert_eq!(
            report.mapping.get("101"),
            Some(&CenterResult::Resolved("Center A".into()))
        );
        assert_eq!(report.mapping.get("102"), None);
        assert_eq!(report.mapping.get("103"), None);
    }

    #[test]
    fn seed_skips_resolved_precincts_and_retries_unresolved() {
        let mut seed = CenterMapping::default();
        seed.insert("101".into(), CenterResult::Resolved("Old Center".into()));
        seed.insert("102".into(), CenterResult::Unresolved);

        // Script covers exactly the two precincts that still need work.
        let geocoder = SeqGeocoder {
            script: VecDeque::from([Ok(Some(usable_address())), Ok(Some(usable_address()))]),
        };
        let lookup = ConstLookup {
            center: "New Center".into(),
            calls: 0,
        };
        let features = [precinct("101"), precinct("102"), precinct("103")];

        let report = BatchResolver::new(
            CenterResolver::new(geocoder, lookup).with_max_attempts(1),
        )
        .resolve_all(&features, seed);

        assert!(report.is_complete());
        assert_eq!(
            report.mapping.get("101"),
            Some(&CenterResult::Resolved("Old Center".into()))
        );
        assert_eq!(
            report.mapping.get("102"),
            Some(&CenterResult::Resolved("New Center".into()))
        );
        assert_eq!(
            report.mapping.get("103"),
            Some(&CenterResult::Resolved("New Center".into()))
        );
    }

    #[test]
    fn mapping_round_trips_through_json() {
        let mut mapping = CenterMapping::default();
        mapping.insert("101".into(), CenterResult::Resolved("Center A".into()));
        mapping.insert("102".into(), CenterResult::Unresolved);
        mapping.insert("99".into(), CenterResult::Resolved("Center B".into()));

        let json = serde_json::to_string(&mapping).unwrap();
        let back: CenterMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(mapping, back);

        // Unresolved precincts are explicit nulls, not omissions.
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["102"].is_null());
        assert_eq!(value["101"], "Center A");
    }
}
