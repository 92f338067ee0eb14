use chrono::Utc;
use serde::Deserialize;
use serde_json::{Number, Value};

use crate::errors::IngestError;
use crate::services::broadcast_service::Hub;
use crate::state::store::{Reading, SpotId};

pub const DISTANCE_ERROR: &str = "distance_cm must be a number";

/// Raw body a sensor posts to `/api/reading`.
///
/// Fields stay untyped so the credential can be checked before anything
/// about the payload shape is interpreted.
#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    pub token: Option<Value>,
    pub spot_id: Option<Value>,
    pub distance_cm: Option<Value>,
}

impl IngestRequest {
    /// Decode a request body. Anything that is not a JSON object decodes to
    /// an empty request, which then fails the credential check.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

/// `true` iff the spot is occupied: inclusive at the threshold.
pub fn classify(distance_cm: f64, threshold_cm: f64) -> bool {
    distance_cm <= threshold_cm
}

/// Check the credential, then extract spot and distance.
pub fn validate(
    req: &IngestRequest,
    api_key: &str,
    default_spot: &str,
) -> Result<(SpotId, f64), IngestError> {
    match req.token.as_ref().and_then(Value::as_str) {
        Some(token) if tokens_match(token, api_key) => {}
        _ => return Err(IngestError::Unauthorized),
    }

    let distance = parse_distance(req.distance_cm.as_ref())?;
    let spot = parse_spot(req.spot_id.as_ref(), default_spot)?;
    Ok((spot, distance))
}

/// Compare credentials without stopping at the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

fn parse_distance(raw: Option<&Value>) -> Result<f64, IngestError> {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|d| d.is_finite())
        .ok_or_else(|| IngestError::InvalidPayload(DISTANCE_ERROR.to_string()))
}

fn parse_spot(raw: Option<&Value>, default_spot: &str) -> Result<SpotId, IngestError> {
    match raw {
        None => Ok(default_spot.to_string()),
        Some(Value::String(s)) if s.is_empty() => Ok(default_spot.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(number_spot(n).unwrap_or_else(|| default_spot.to_string())),
        Some(_) => Err(IngestError::InvalidPayload(
            "spot_id must be a string".to_string(),
        )),
    }
}

/// Render a numeric spot id the way sensors print it: `7.0` is `"7"`,
/// and zero means "no spot given".
fn number_spot(n: &Number) -> Option<SpotId> {
    if let Some(i) = n.as_i64() {
        (i != 0).then(|| i.to_string())
    } else if let Some(u) = n.as_u64() {
        Some(u.to_string())
    } else {
        n.as_f64().filter(|f| *f != 0.0).map(|f| f.to_string())
    }
}

/// Validate, classify, store and broadcast one reading.
///
/// Nothing shared is touched unless validation passes.
pub fn ingest(
    hub: &Hub,
    req: &IngestRequest,
    api_key: &str,
    default_spot: &str,
) -> Result<Reading, IngestError> {
    let (spot, distance_cm) = validate(req, api_key, default_spot)?;

    let reading = Reading::classified(spot, distance_cm, hub.threshold_cm(), Utc::now());
    hub.commit(reading.clone());

    tracing::debug!(
        spot = %reading.spot_id,
        distance_cm = reading.distance_cm,
        occupied = reading.occupied,
        "Reading accepted"
    );

    Ok(reading)
}
