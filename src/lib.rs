#![doc = "Pollmap public API"]
mod address;
mod batch;
mod common;
mod error;
mod feature;
mod geocode;
mod lookup;
mod resolve;
mod sample;
pub mod service;

#[doc(inline)]
pub use address::StreetAddress;

#[doc(inline)]
pub use batch::{BatchReport, BatchResolver, CenterMapping};

#[doc(inline)]
pub use error::{FetchError, SampleError};

#[doc(inline)]
pub use feature::{PrecinctFeature, read_precinct_features};

#[doc(inline)]
pub use geocode::{NOMINATIM_URL, Nominatim, PartialAddress, ReverseGeocode};

#[doc(inline)]
pub use lookup::{CenterLookup, CenterLookupClient, FormTransport, HttpForm, LookupConfig};

#[doc(inline)]
pub use resolve::{CenterResolver, CenterResult, DEFAULT_MAX_ATTEMPTS};

#[doc(inline)]
pub use sample::random_point_in;

pub use common::fs::write_atomic;
