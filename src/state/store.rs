use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque token naming a sensor station.
pub type SpotId = String;

/// One occupancy measurement for a spot.
///
/// `occupied` is derived from the distance when the reading is built and the
/// value is never edited afterwards: a newer reading replaces it whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub spot_id: SpotId,
    pub distance_cm: f64,
    pub occupied: bool,
    pub updated_at: DateTime<Utc>,
}

impl Reading {
    /// Build a reading, classifying `distance_cm` against `threshold_cm`.
    pub fn classified(
        spot_id: SpotId,
        distance_cm: f64,
        threshold_cm: f64,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            occupied: crate::services::ingest_service::classify(distance_cm, threshold_cm),
            spot_id,
            distance_cm,
            updated_at,
        }
    }
}

/// Internal HashMap type.
pub type InnerMap = HashMap<SpotId, Reading>;

/// Latest reading per spot, shared across the app.
///
/// Cloning is cheap; all clones see the same map. Each `put` swaps in a
/// complete `Reading` under the write lock, so readers observe either the
/// old record or the new one.
#[derive(Clone, Default)]
pub struct LatestStore {
    inner: Arc<RwLock<InnerMap>>,
}

impl LatestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite whatever is stored for `reading.spot_id`.
    pub fn put(&self, reading: Reading) {
        // A panic elsewhere cannot leave a half-written entry behind, so a
        // poisoned lock still guards a consistent map.
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(reading.spot_id.clone(), reading);
    }

    /// Current reading for `spot`, or `None` if it never reported.
    pub fn get(&self, spot: &str) -> Option<Reading> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(spot).cloned()
    }

    /// Point-in-time copy of every entry.
    pub fn snapshot(&self) -> InnerMap {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.clone()
    }

    /// Number of spots that have reported at least once.
    pub fn len(&self) -> usize {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
