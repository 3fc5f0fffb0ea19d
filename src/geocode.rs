use std::{thread, time::Duration};

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::FetchError;

/// Default public Nominatim instance.
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Street-address fragments recovered from one reverse-geocode call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialAddress {
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub postcode: Option<String>,
}

impl PartialAddress {
    /// An address is usable only when all three fragments are present and
    /// non-empty; anything less is discarded and a fresh point is sampled.
    pub fn usable(&self) -> bool {
        [&self.house_number, &self.road, &self.postcode]
            .iter()
            .all(|field| field.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

/// Coordinate to partial address. `Ok(None)` means the upstream had no
/// address for that point, an ordinary signal to resample.
pub trait ReverseGeocode {
    fn reverse(&mut self, lat: f64, lon: f64) -> Result<Option<PartialAddress>, FetchError>;
}

impl<T: ReverseGeocode + ?Sized> ReverseGeocode for &mut T {
    fn reverse(&mut self, lat: f64, lon: f64) -> Result<Option<PartialAddress>, FetchError> {
        (**self).reverse(lat, lon)
    }
}

/// OpenStreetMap Nominatim reverse geocoder.
///
/// Nominatim rate-limits aggressively (one request per second for the public
/// instance), so every request is preceded by a pause.
pub struct Nominatim {
    client: Client,
    base_url: String,
    pause: Duration,
}

impl Nominatim {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("pollmap/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            pause: Duration::from_secs(1),
        })
    }

    /// Override the inter-request pause (e.g. for a self-hosted instance).
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

impl ReverseGeocode for Nominatim {
    fn reverse(&mut self, lat: f64, lon: f64) -> Result<Option<PartialAddress>, FetchError> {
        thread::sleep(self.pause);
        let url = format!(
            "{}/reverse.php?format=json&lat={lat}&lon={lon}",
            self.base_url
        );
        let resp = self.client.get(&url).send()?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let Ok(body) = resp.json::<Value>() else {
            return Ok(None);
        };
        Ok(parse_reverse_body(&body))
    }
}

/// Reads `address.house_number`, `address.road`, `address.postcode` out of a
/// Nominatim reverse response. `None` when the body has no address block.
fn parse_reverse_body(body: &Value) -> Option<PartialAddress> {
    let addr = body.get("address")?;
    let field = |key: &str| addr.get(key).and_then(Value::as_str).map(str::to_owned);
    Some(PartialAddress {
        house_number: field("house_number"),
        road: field("road"),
        postcode: field("postcode"),
    })
}
