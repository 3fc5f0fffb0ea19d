use anyhow::{Context, Result, bail};
use geo::{Area, Coord, LineString, Polygon};
use serde_json::Value;

/// One precinct: its id and planar polygon, parsed from a GeoJSON feature.
#[derive(Debug, Clone)]
pub struct PrecinctFeature {
    pub precinct: String,
    pub polygon: Polygon<f64>,
}

/// Parse a GeoJSON FeatureCollection of precinct polygons.
///
/// Each feature needs `properties.precinct` (string or number) and a
/// `Polygon` or `MultiPolygon` geometry; for a MultiPolygon the largest part
/// is used. Malformed features are errors, not silent skips.
pub fn read_precinct_features(bytes: &[u8]) -> Result<Vec<PrecinctFeature>> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    let Some(features) = value["features"].as_array() else {
        bail!("Not a GeoJSON FeatureCollection: missing features array");
    };

    let mut out = Vec::with_capacity(features.len());
    for (idx, feature) in features.iter().enumerate() {
        let id_value = &feature["properties"]["precinct"];
        let precinct = id_value
            .as_str()
            .map(str::to_owned)
            .or_else(|| id_value.as_i64().map(|n| n.to_string()))
            .with_context(|| format!("Feature {idx} missing properties.precinct"))?;
        let polygon = parse_polygon(&feature["geometry"])
            .with_context(|| format!("Feature {idx} (precinct {precinct}) has no usable polygon"))?;
        out.push(PrecinctFeature { precinct, polygon });
    }
    Ok(out)
}

fn parse_polygon(geometry: &Value) -> Result<Polygon<f64>> {
    match geometry["type"].as_str() {
        Some("Polygon") => {
            let rings = geometry["coordinates"]
                .as_array()
                .context("Polygon missing coordinates")?;
            polygon_from_rings(rings)
        }
        Some("MultiPolygon") => {
            let parts = geometry["coordinates"]
                .as_array()
                .context("MultiPolygon missing coordinates")?;
            let polygons = parts
                .iter()
                .map(|part| {
                    polygon_from_rings(part.as_array().context("MultiPolygon part is not an array")?)
                })
                .collect::<Result<Vec<_>>>()?;
            polygons
                .into_iter()
                .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
                .context("MultiPolygon has no parts")
        }
        other => bail!("Unsupported geometry type: {:?}", other),
    }
}

/// First ring is the exterior, any following rings are holes.
fn polygon_from_rings(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut iter = rings.iter();
    let exterior = parse_ring(iter.next().context("Polygon has no rings")?)?;
    let interiors = iter.map(parse_ring).collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let coords = value.as_array().context("Ring is not an array")?;
    let points = coords
        .iter()
        .map(|pair| {
            let xy = pair.as_array().context("Coordinate is not a pair")?;
            match (
                xy.first().and_then(Value::as_f64),
                xy.get(1).and_then(Value::as_f64),
            ) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => bail!("Coordinate is not numeric"),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString(points))
}
