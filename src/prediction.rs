use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Won,
    Lost,
    Pending,
}

impl PredictionStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, PredictionStatus::Pending)
    }
}

/// One betting proposition tied to a single game.
///
/// Anything upstream attaches beyond id/odds/status/start time (teams,
/// league, kickoff venue...) is kept in `extra` and never inspected here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionCandidate {
    pub id: String,
    pub odds: f64,
    pub status: PredictionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PredictionCandidate {
    pub fn new(id: impl Into<String>, odds: f64, start_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            odds,
            status: PredictionStatus::Pending,
            start_time,
            extra: Map::new(),
        }
    }

    pub fn with_status(mut self, status: PredictionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.odds.is_finite() && self.odds > 0.0 {
            Ok(())
        } else {
            Err(EngineError::InvalidOdds {
                id: self.id.clone(),
                odds: self.odds,
            })
        }
    }
}

/// Validate a whole snapshot, stopping at the first bad record.
pub fn validate_all(candidates: &[PredictionCandidate]) -> EngineResult<()> {
    candidates.iter().try_for_each(PredictionCandidate::validate)
}
