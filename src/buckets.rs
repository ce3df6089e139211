use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One score band. `low` is inclusive; `high` is exclusive except for the last
/// band of a scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub low: f64,
    pub high: f64,
    pub label: String,
}

impl ScoreBucket {
    pub fn new(low: f64, high: f64, label: &str) -> Self {
        Self {
            low,
            high,
            label: label.to_string(),
        }
    }
}

/// Ordered, contiguous list of score bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScoreBucket>", into = "Vec<ScoreBucket>")]
pub struct BucketScheme {
    buckets: Vec<ScoreBucket>,
}

impl Default for BucketScheme {
    fn default() -> Self {
        Self {
            buckets: vec![
                ScoreBucket::new(0.0, 60.0, "fail"),
                ScoreBucket::new(60.0, 70.0, "pass"),
                ScoreBucket::new(70.0, 80.0, "average"),
                ScoreBucket::new(80.0, 90.0, "good"),
                ScoreBucket::new(90.0, 100.0, "excellent"),
            ],
        }
    }
}

impl BucketScheme {
    pub fn new(buckets: Vec<ScoreBucket>) -> Result<Self, ConfigError> {
        if buckets.is_empty() {
            return Err(ConfigError::InvalidBuckets(
                "at least one bucket is required".to_string(),
            ));
        }
        for (i, b) in buckets.iter().enumerate() {
            if !b.low.is_finite() || !b.high.is_finite() || b.low >= b.high {
                return Err(ConfigError::InvalidBuckets(format!(
                    "bucket '{}' has an empty or invalid range [{}, {})",
                    b.label, b.low, b.high
                )));
            }
            if b.label.trim().is_empty() {
                return Err(ConfigError::InvalidBuckets(format!(
                    "bucket {} has no label",
                    i
                )));
            }
            if let Some(next) = buckets.get(i + 1) {
                if next.low != b.high {
                    return Err(ConfigError::InvalidBuckets(format!(
                        "buckets '{}' and '{}' are not contiguous ({} != {})",
                        b.label, next.label, b.high, next.low
                    )));
                }
            }
        }
        Ok(Self { buckets })
    }

    pub fn buckets(&self) -> &[ScoreBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.label.as_str()).collect()
    }

    /// Index of the bucket holding `score`. The top bucket is closed so the
    /// scheme's maximum (100 by default) still lands in a band.
    pub fn index_of(&self, score: f64) -> Option<usize> {
        let last = self.buckets.len().checked_sub(1)?;
        self.buckets.iter().enumerate().find_map(|(i, b)| {
            let below_high = if i == last {
                score <= b.high
            } else {
                score < b.high
            };
            (score >= b.low && below_high).then_some(i)
        })
    }
}

impl TryFrom<Vec<ScoreBucket>> for BucketScheme {
    type Error = ConfigError;

    fn try_from(buckets: Vec<ScoreBucket>) -> Result<Self, Self::Error> {
        BucketScheme::new(buckets)
    }
}

impl From<BucketScheme> for Vec<ScoreBucket> {
    fn from(scheme: BucketScheme) -> Self {
        scheme.buckets
    }
}
