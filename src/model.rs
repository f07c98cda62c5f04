//! Wire model for the charts-data payload.
//!
//! The backend emits one flat record shape per chart category, with a few
//! fields duplicated under legacy names (`score`, `date`, `name`). Decoding goes
//! through [`RawRecord`] so every optional field gets exactly one default here
//! instead of at each use site.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(RiskLevel::Low),
            "Medium" => Some(RiskLevel::Medium),
            "High" => Some(RiskLevel::High),
            "Critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
            RiskLevel::Unknown => "Unknown",
        }
    }

    /// High and Critical both count toward high-risk tallies.
    pub fn is_high(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Null and absent both decode to the type's default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Anything that is not a list of strings counts as no flags.
fn lenient_flags<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Strings as-is, numbers and booleans as their text, anything else as absent.
fn lenient_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        v @ (Value::Number(_) | Value::Bool(_)) => Some(v.to_string()),
        _ => None,
    })
}

/// Numbers, or numeric strings. Anything else is absent.
fn lenient_score<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

/// Whole day counts. Integral floats are accepted, fractional ones are absent.
fn lenient_days<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Number(n) = Value::deserialize(d)? else {
        return Ok(None);
    };
    if let Some(days) = n.as_i64() {
        return Ok(Some(days));
    }
    Ok(n
        .as_f64()
        .filter(|v| v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64)
        .map(|v| v as i64))
}

/// Exact level names; any other value is `Unknown`.
fn lenient_risk<'de, D>(d: D) -> Result<RiskLevel, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => RiskLevel::parse(&s).unwrap_or_default(),
        _ => RiskLevel::Unknown,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    claim_number: Value,
    #[serde(default, deserialize_with = "lenient_score")]
    fraud_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score")]
    score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_risk")]
    risk_level: RiskLevel,
    #[serde(default, deserialize_with = "lenient_text")]
    date_of_loss: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    claimant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_flags")]
    red_flags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    injury_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_days")]
    days_to_report: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    state: Option<String>,
}

/// One claim as seen by a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct ClaimRecord {
    pub claim_number: String,
    pub fraud_score: f64,
    pub risk_level: RiskLevel,
    pub date_of_loss: Option<String>,
    pub claimant_name: Option<String>,
    pub red_flags: Vec<String>,
    pub injury_type: Option<String>,
    pub days_to_report: Option<i64>,
    pub state: Option<String>,
}

impl From<RawRecord> for ClaimRecord {
    fn from(raw: RawRecord) -> Self {
        let claim_number = match raw.claim_number {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            claim_number,
            fraud_score: raw.fraud_score.or(raw.score).unwrap_or(0.0),
            risk_level: raw.risk_level,
            date_of_loss: raw.date_of_loss.or(raw.date),
            claimant_name: raw.claimant_name.or(raw.name),
            red_flags: raw.red_flags,
            injury_type: raw.injury_type,
            days_to_report: raw.days_to_report,
            state: raw.state,
        }
    }
}

impl ClaimRecord {
    /// Parsed loss date. Accepts `YYYY-MM-DD` or any ISO datetime by its date prefix.
    pub fn loss_date(&self) -> Option<NaiveDate> {
        let raw = self.date_of_loss.as_deref()?.trim();
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartCategory {
    FraudScores,
    Timeline,
    Claimants,
    Indicators,
    Injuries,
    TimeLag,
    Geographic,
}

impl ChartCategory {
    pub const ALL: [ChartCategory; 7] = [
        ChartCategory::FraudScores,
        ChartCategory::Timeline,
        ChartCategory::Claimants,
        ChartCategory::Indicators,
        ChartCategory::Injuries,
        ChartCategory::TimeLag,
        ChartCategory::Geographic,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ChartCategory::FraudScores => "fraudScores",
            ChartCategory::Timeline => "timeline",
            ChartCategory::Claimants => "claimants",
            ChartCategory::Indicators => "indicators",
            ChartCategory::Injuries => "injuries",
            ChartCategory::TimeLag => "timeLag",
            ChartCategory::Geographic => "geographic",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

/// Records per chart category, as fetched for one analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartsPayload {
    categories: BTreeMap<ChartCategory, Vec<ClaimRecord>>,
}

impl ChartsPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: ChartCategory, records: Vec<ClaimRecord>) -> Self {
        self.categories.insert(category, records);
        self
    }

    /// Absent categories read as empty.
    pub fn records(&self, category: ChartCategory) -> &[ClaimRecord] {
        self.categories.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        ChartCategory::ALL
            .into_iter()
            .map(|c| (c.key(), self.records(c).len()))
            .collect()
    }

    /// Decode a response body. Unknown keys are ignored; a category that is not
    /// a list is empty, and list items that are not objects are dropped, so one
    /// malformed category never costs the other charts.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(map) = value else {
            return Err(serde::de::Error::custom("charts payload must be a JSON object"));
        };
        let mut payload = ChartsPayload::new();
        for (key, records) in map {
            let Some(category) = ChartCategory::from_key(&key) else {
                continue;
            };
            let records = match records {
                Value::Array(items) => items
                    .into_iter()
                    .filter(Value::is_object)
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<ClaimRecord>, _>>()?,
                _ => Vec::new(),
            };
            payload.categories.insert(category, records);
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fraud_scores_accepts_both_score_keys() {
        let rec: ClaimRecord = serde_json::from_value(json!({
            "score": 7.5, "fraud_score": 7.5, "risk_level": "High", "claim_number": "C-1"
        }))
        .unwrap();
        assert_eq!(rec.fraud_score, 7.5);
        assert_eq!(rec.risk_level, RiskLevel::High);

        let rec: ClaimRecord = serde_json::from_value(json!({"score": 3.0})).unwrap();
        assert_eq!(rec.fraud_score, 3.0);
    }

    #[test]
    fn test_nulls_and_unknowns_default() {
        let rec: ClaimRecord = serde_json::from_value(json!({
            "claim_number": null,
            "risk_level": "Severe",
            "days_to_report": null,
            "red_flags": "not a list",
            "state": null
        }))
        .unwrap();
        assert_eq!(rec.claim_number, "");
        assert_eq!(rec.fraud_score, 0.0);
        assert_eq!(rec.risk_level, RiskLevel::Unknown);
        assert_eq!(rec.days_to_report, None);
        assert!(rec.red_flags.is_empty());
        assert_eq!(rec.state, None);
    }

    #[test]
    fn test_wrong_typed_optional_fields_default() {
        let rec: ClaimRecord = serde_json::from_value(json!({
            "fraud_score": "6.5",
            "risk_level": 3,
            "claimant_name": 42,
            "injury_type": {"code": 7},
            "state": true,
            "date_of_loss": ["2024-01-01"],
            "days_to_report": 3.0
        }))
        .unwrap();
        assert_eq!(rec.fraud_score, 6.5);
        assert_eq!(rec.risk_level, RiskLevel::Unknown);
        assert_eq!(rec.claimant_name.as_deref(), Some("42"));
        assert_eq!(rec.injury_type, None);
        assert_eq!(rec.state.as_deref(), Some("true"));
        assert_eq!(rec.date_of_loss, None);
        assert_eq!(rec.days_to_report, Some(3));

        let rec: ClaimRecord = serde_json::from_value(json!({"days_to_report": 2.5, "fraud_score": "high"})).unwrap();
        assert_eq!(rec.days_to_report, None);
        assert_eq!(rec.fraud_score, 0.0);

        let rec: ClaimRecord = serde_json::from_value(json!({"days_to_report": "12"})).unwrap();
        assert_eq!(rec.days_to_report, None);
    }

    #[test]
    fn test_one_bad_category_keeps_the_rest() {
        let payload = ChartsPayload::from_json(json!({
            "fraudScores": [{"fraud_score": 1.0}],
            "claimants": [{"claimant_name": 42, "fraud_score": 1.0}, "garbage", 7],
            "timeLag": {"not": "a list"}
        }))
        .unwrap();
        assert_eq!(payload.records(ChartCategory::FraudScores).len(), 1);
        let claimants = payload.records(ChartCategory::Claimants);
        assert_eq!(claimants.len(), 1);
        assert_eq!(claimants[0].claimant_name.as_deref(), Some("42"));
        assert!(payload.records(ChartCategory::TimeLag).is_empty());
    }

    #[test]
    fn test_numeric_claim_number_kept_as_text() {
        let rec: ClaimRecord = serde_json::from_value(json!({"claim_number": 1042})).unwrap();
        assert_eq!(rec.claim_number, "1042");
    }

    #[test]
    fn test_loss_date_parsing() {
        let mut rec = ClaimRecord {
            date_of_loss: Some("2024-03-05".into()),
            ..Default::default()
        };
        assert_eq!(rec.loss_date(), NaiveDate::from_ymd_opt(2024, 3, 5));
        rec.date_of_loss = Some("2024-03-05T10:00:00Z".into());
        assert_eq!(rec.loss_date(), NaiveDate::from_ymd_opt(2024, 3, 5));
        rec.date_of_loss = Some("March 5".into());
        assert_eq!(rec.loss_date(), None);
    }

    #[test]
    fn test_payload_missing_categories_are_empty() {
        let payload = ChartsPayload::from_json(json!({
            "timeline": [{"date": "2024-01-01", "fraud_score": 2.0}],
            "geographic": null,
            "somethingElse": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(payload.records(ChartCategory::Timeline).len(), 1);
        assert_eq!(
            payload.records(ChartCategory::Timeline)[0].date_of_loss.as_deref(),
            Some("2024-01-01")
        );
        assert!(payload.records(ChartCategory::Geographic).is_empty());
        assert!(payload.records(ChartCategory::Claimants).is_empty());
    }

    #[test]
    fn test_payload_rejects_non_object() {
        assert!(ChartsPayload::from_json(json!([1, 2])).is_err());
    }
}
