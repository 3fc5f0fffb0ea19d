//! Near-real-time civic record pipeline: fetch a JSON feed, filter and
//! validate records, and export a Citygram-compliant FeatureCollection.
//!
//! The supported sources are a small fixed set, so they are a closed enum
//! dispatched by match rather than open-ended subclassing.

use std::time::Duration;

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Explicit pipeline configuration, passed in at construction. The exclusion
/// list is supplied by the caller instead of being read from a file at import
/// time.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Dispatch reasons that must not be exported (e.g. routine calls).
    pub excluded_reasons: Vec<String>,
    /// How far back the upstream query reaches, in minutes.
    pub time_window_minutes: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            excluded_reasons: Vec::new(),
            time_window_minutes: 60,
        }
    }
}

/// A record that is malformed rather than merely filtered out.
///
/// These are surfaced per record and logged; they are never silently
/// converted into "filtered", since that would hide programming errors and
/// upstream schema drift alike.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("field {field} is not a string")]
    NotAString { field: &'static str },
    #[error("unparseable timestamp {value:?}")]
    BadTimestamp { value: String },
    #[error("geometry is not an object")]
    BadGeometry,
}

/// Why a whole pipeline run failed, mirroring the upstream API boundary
/// (invalid request vs. service unavailable).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not a valid service: {0}")]
    UnknownService(String),
    #[error("data fetch error: {0}")]
    FetchFailed(String),
}

/// A supported upstream data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Orlando Police dispatch report feed.
    PoliceReport,
}

impl Service {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "police" => Some(Self::PoliceReport),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::PoliceReport => "police",
        }
    }

    /// Keys that must be present and non-null for a record to be exported.
    fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::PoliceReport => &["address", "location", "when", "reason"],
        }
    }

    /// Upstream query URL bounded to the configured time window.
    pub fn url(self, config: &ServiceConfig) -> String {
        match self {
            Self::PoliceReport => {
                let since = Local::now() - chrono::Duration::minutes(config.time_window_minutes);
                format!(
                    "http://brigades.opendatanetwork.com/resource/sm4t-sjt5.json?$where=when > \"{}\"",
                    since.format("%Y-%m-%dT%H:%M:%S")
                )
            }
        }
    }

    /// Converts one upstream record into an exported feature.
    ///
    /// `Ok(None)` means the record was filtered (missing required keys or an
    /// excluded reason); `Err` means it was malformed.
    pub fn process_record(
        self,
        config: &ServiceConfig,
        record: &Value,
    ) -> Result<Option<Value>, RecordError> {
        let props = record.as_object().ok_or(RecordError::NotAnObject)?;
        if !self.has_required_keys(props) {
            return Ok(None);
        }
        if !self.passes_filter(config, record)? {
            return Ok(None);
        }

        let title = self.make_title(record)?;
        let geometry = self.make_geometry(record)?;
        let mut properties = record.clone();
        properties["title"] = Value::String(title.clone());

        Ok(Some(json!({
            "id": record_id(&title),
            "type": "Feature",
            "geometry": geometry,
            "properties": properties,
        })))
    }

    fn has_required_keys(self, props: &Map<String, Value>) -> bool {
        self.required_keys().iter().all(|key| match props.get(*key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty() && s != "NULL",
            Some(_) => true,
        })
    }

    fn passes_filter(self, config: &ServiceConfig, record: &Value) -> Result<bool, RecordError> {
        match self {
            Self::PoliceReport => {
                let reason = str_field(record, "reason")?;
                Ok(!config.excluded_reasons.iter().any(|r| r == reason))
            }
        }
    }

    /// A string fully describing the alert/event.
    fn make_title(self, record: &Value) -> Result<String, RecordError> {
        match self {
            Self::PoliceReport => {
                let reason = str_field(record, "reason")?;
                let address = str_field(record, "address")?;
                let when = str_field(record, "when")?;
                let time = NaiveDateTime::parse_from_str(when, "%Y-%m-%dT%H:%M:%S").map_err(
                    |_| RecordError::BadTimestamp {
                        value: when.to_owned(),
                    },
                )?;
                let place = address.split(',').next().unwrap_or(address);
                Ok(format!(
                    "{} has been reported near {} on {}",
                    capitalize(reason),
                    place,
                    time.format("%-m/%-d at %-I:%M%p")
                ))
            }
        }
    }

    /// The Citygram-compliant geometry for the record.
    fn make_geometry(self, record: &Value) -> Result<Value, RecordError> {
        match self {
            Self::PoliceReport => {
                let location = record.get("location").filter(|v| v.is_object());
                location.cloned().ok_or(RecordError::BadGeometry)
            }
        }
    }
}

/// Fetch the upstream feed and export a FeatureCollection. Unknown tags map
/// to the invalid-request boundary, fetch failures to service-unavailable.
pub fn build_feature_collection(
    tag: &str,
    config: &ServiceConfig,
    verbose: u8,
) -> Result<Value, PipelineError> {
    let service =
        Service::from_tag(tag).ok_or_else(|| PipelineError::UnknownService(tag.to_owned()))?;
    let url = service.url(config);
    if verbose > 0 {
        eprintln!("[fetch] GET {url}");
    }
    let records = fetch_records(&url).map_err(|err| PipelineError::FetchFailed(err.to_string()))?;
    Ok(collect_features(service, config, &records, verbose))
}

fn fetch_records(url: &str) -> anyhow::Result<Vec<Value>> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pollmap/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(10))
        .build()?;
    let body: Value = client.get(url).send()?.error_for_status()?.json()?;
    body.as_array()
        .cloned()
        .context("upstream feed is not a JSON array")
}

/// Convert fetched records into exported features, separating filtered
/// records from malformed ones.
pub fn collect_features(
    service: Service,
    config: &ServiceConfig,
    records: &[Value],
    verbose: u8,
) -> Value {
    let mut features = Vec::new();
    for record in records {
        match service.process_record(config, record) {
            Ok(Some(feature)) => features.push(feature),
            Ok(None) => {}
            Err(err) => eprintln!("[fetch] dropped malformed record: {err}"),
        }
    }
    if verbose > 0 {
        eprintln!("[fetch] {} of {} records exported", features.len(), records.len());
    }
    json!({"type": "FeatureCollection", "features": features})
}

fn str_field<'a>(record: &'a Value, field: &'static str) -> Result<&'a str, RecordError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or(RecordError::NotAString { field })
}

/// Stable record id: hex digest of the ascii-stripped title.
fn record_id(title: &str) -> String {
    let ascii: String = title.chars().filter(char::is_ascii).collect();
    hex::encode(Sha256::digest(ascii.as_bytes()))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn police_record() -> Value {
        json!({
            "address": "400 S Orange Ave, Orlando, FL",
            "location": {"type": "Point", "coordinates": [-81.379, 28.538]},
            "when": "2016-04-17T21:15:00",
            "reason": "ACCIDENT"
        })
    }

    fn config() -> ServiceConfig {
        ServiceConfig {
            excluded_reasons: vec!["TRAFFIC STOP".into()],
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn exports_a_valid_feature() {
        let feature = Service::PoliceReport
            .process_record(&config(), &police_record())
            .unwrap()
            .unwrap();
        assert_eq!(feature["type"], "Feature");
        assert_eq!(
            feature["properties"]["title"],
            "Accident has been reported near 400 S Orange Ave on 4/17 at 9:15PM"
        );
        // id is a hex digest, non-empty and stable
        let id = feature["id"].as_str().unwrap();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(feature["geometry"]["type"], "Point");
    }

    #[test]
    fn excluded_reason_is_filtered() {
        let mut record = police_record();
        record["reason"] = "TRAFFIC STOP".into();
        let result = Service::PoliceReport.process_record(&config(), &record);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn missing_or_null_required_key_is_filtered() {
        for bad in [Value::Null, "".into(), "NULL".into()] {
            let mut record = police_record();
            record["address"] = bad;
            assert_eq!(
                Service::PoliceReport.process_record(&config(), &record),
                Ok(None)
            );
        }
        let mut record = police_record();
        record.as_object_mut().unwrap().remove("when");
        assert_eq!(
            Service::PoliceReport.process_record(&config(), &record),
            Ok(None)
        );
    }

    #[test]
    fn malformed_timestamp_is_an_error_not_a_filter() {
        let mut record = police_record();
        record["when"] = "yesterday-ish".into();
        let result = Service::PoliceReport.process_record(&config(), &record);
        assert_eq!(
            result,
            Err(RecordError::BadTimestamp {
                value: "yesterday-ish".into()
            })
        );
    }

    #[test]
    fn non_string_required_field_is_an_error() {
        let mut record = police_record();
        record["reason"] = json!(5);
        let result = Service::PoliceReport.process_record(&config(), &record);
        assert_eq!(result, Err(RecordError::NotAString { field: "reason" }));
    }

    #[test]
    fn non_object_geometry_is_an_error() {
        let mut record = police_record();
        record["location"] = json!([0.0, 1.0]);
        let result = Service::PoliceReport.process_record(&config(), &record);
        assert_eq!(result, Err(RecordError::BadGeometry));
    }

    #[test]
    fn collect_features_drops_malformed_and_filtered() {
        let mut filtered = police_record();
        filtered["reason"] = "TRAFFIC STOP".into();
        let mut malformed = police_record();
        malformed["when"] = "???".into();
        let records = [police_record(), filtered, malformed];

        let collection = collect_features(Service::PoliceReport, &config(), &records, 0);
        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(collection["features"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn url_is_bounded_to_the_time_window() {
        let url = Service::PoliceReport.url(&ServiceConfig::default());
        assert!(url.starts_with("http://brigades.opendatanetwork.com/resource/sm4t-sjt5.json"));
        assert!(url.contains("$where=when >"));
    }

    #[test]
    fn unknown_tag_maps_to_invalid_request() {
        assert_eq!(Service::from_tag("police"), Some(Service::PoliceReport));
        assert_eq!(Service::from_tag("fire"), None);
        assert_eq!(Service::PoliceReport.tag(), "police");
    }
}
