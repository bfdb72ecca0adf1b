//! Record definitions for the persisted document.
//!
//! The whole store is one [`Document`] holding four append-only collections:
//! citizens ([`User`]), pickup requests ([`Request`]), collected hardware
//! ([`HardwareItem`]) and ad-hoc aggregate snapshots ([`Report`]). Every
//! entity carries a numeric `id` assigned by [`next_id`].
//!
//! References between collections (`user_id`, `request_id`, `generated_by`)
//! are [`LooseId`] values. They are never checked against their parent
//! collection; a request may point at a user that does not exist.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;

pub const DEFAULT_ROLE: &str = "citizen";
pub const DEFAULT_STATUS: &str = "pending";
pub const REPORT_KIND_AD_HOC: &str = "ad_hoc";

/// Anything stored in a collection with a numeric id.
pub trait Identified {
    fn id(&self) -> u64;
}

/// Returns `1` for an empty collection, otherwise one past the largest id.
///
/// The result depends only on the ids present, never on their order, so ids
/// stay unique even if a collection was written out of order by hand.
/// A collection already holding `u64::MAX` has no id left to give.
pub fn next_id<T: Identified>(collection: &[T]) -> Result<u64, AppResponse> {
    match collection.iter().map(Identified::id).max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            AppResponse::ValidationError(format!("Id space exhausted: collection already holds id {}", max))
        }),
    }
}

/// A reference id as found in persisted data: usually a JSON number or a
/// JSON string such as `"3"`, but any JSON value (`null`, `2.0`, ...) is
/// accepted and kept.
///
/// Matching is intentionally lenient. Both sides are normalized to an integer
/// with [`LooseId::canonical`] and compared; anything that does not normalize
/// never matches. The stored representation is kept so a document
/// serializes back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseId {
    Number(i64),
    Text(String),
    Other(JsonValue),
}

impl LooseId {
    pub fn canonical(&self) -> Option<i64> {
        match self {
            LooseId::Number(n) => Some(*n),
            LooseId::Text(s) => s.trim().parse().ok(),
            LooseId::Other(JsonValue::Number(n)) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64),
            LooseId::Other(_) => None,
        }
    }

    pub fn matches(&self, other: &LooseId) -> bool {
        match (self.canonical(), other.canonical()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Builds an id from host input, preferring the numeric form.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => LooseId::Number(n),
            Err(_) => LooseId::Text(raw.to_string()),
        }
    }
}

impl From<i64> for LooseId {
    fn from(value: i64) -> Self {
        LooseId::Number(value)
    }
}

impl From<u64> for LooseId {
    fn from(value: u64) -> Self {
        // Ids beyond i64::MAX cannot be produced by `next_id` in practice.
        i64::try_from(value)
            .map(LooseId::Number)
            .unwrap_or_else(|_| LooseId::Text(value.to_string()))
    }
}

impl From<&str> for LooseId {
    fn from(value: &str) -> Self {
        LooseId::Text(value.to_string())
    }
}

impl From<String> for LooseId {
    fn from(value: String) -> Self {
        LooseId::Text(value)
    }
}

/// Physical state of a collected item.
///
/// Persisted as its tag string. Tags outside the known three are kept as
/// `Unrecognized` so documents written by other hosts survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HardwareCondition {
    #[default]
    NonFunctional,
    Reusable,
    Functional,
    Unrecognized(String),
}

impl HardwareCondition {
    pub fn as_str(&self) -> &str {
        match self {
            HardwareCondition::NonFunctional => "non_functional",
            HardwareCondition::Reusable => "reusable",
            HardwareCondition::Functional => "functional",
            HardwareCondition::Unrecognized(tag) => tag,
        }
    }
}

impl From<String> for HardwareCondition {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "non_functional" => HardwareCondition::NonFunctional,
            "reusable" => HardwareCondition::Reusable,
            "functional" => HardwareCondition::Functional,
            _ => HardwareCondition::Unrecognized(tag),
        }
    }
}

impl From<HardwareCondition> for String {
    fn from(condition: HardwareCondition) -> Self {
        match condition {
            HardwareCondition::Unrecognized(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Strict parse used for host input: only the three known tags are accepted.
impl FromStr for HardwareCondition {
    type Err = AppResponse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "non_functional" => Ok(HardwareCondition::NonFunctional),
            "reusable" => Ok(HardwareCondition::Reusable),
            "functional" => Ok(HardwareCondition::Functional),
            other => Err(AppResponse::ValidationError(format!(
                "Unknown hardware condition '{}'; expected non_functional, reusable or functional",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// A pickup request at an address. `status` is free text and is never
/// transitioned by the store itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub user_id: LooseId,
    pub address: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// A request together with the number of hardware items that reference it.
/// `items_count` is computed on every read and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    #[serde(flatten)]
    pub request: Request,
    pub items_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareItem {
    pub id: u64,
    pub request_id: LooseId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub condition: HardwareCondition,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub recyclable: bool,
    pub created_at: DateTime<Utc>,
}

/// Aggregate captured by an ad-hoc report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContent {
    pub hardwares_by_condition: BTreeMap<String, u64>,
    pub total_requests: u64,
}

/// A point-in-time snapshot. `content` is frozen at generation and is not
/// recomputed when the underlying collections change.
///
/// `content` is kept as free-form JSON: reports generated here hold a
/// [`ReportContent`], but a persisted document may carry any payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: u64,
    pub kind: String,
    pub content: JsonValue,
    #[serde(default)]
    pub generated_by: Option<LooseId>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Reads `content` as an ad-hoc aggregate, if it has that shape.
    pub fn summary(&self) -> Option<ReportContent> {
        serde_json::from_value(self.content.clone()).ok()
    }
}

/// The single persisted value. `Document::default()` is the empty store.
/// A collection missing from persisted JSON reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub users: Vec<User>,
    pub requests: Vec<Request>,
    pub hardwares: Vec<HardwareItem>,
    pub reports: Vec<Report>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.requests.is_empty()
            && self.hardwares.is_empty()
            && self.reports.is_empty()
    }

    /// Number of hardware items whose `request_id` resolves to `request_id`.
    pub fn items_for_request(&self, request_id: u64) -> usize {
        let target = LooseId::from(request_id);
        self.hardwares
            .iter()
            .filter(|h| h.request_id.matches(&target))
            .count()
    }

    pub fn summarize(&self, request: &Request) -> RequestSummary {
        RequestSummary {
            request: request.clone(),
            items_count: self.items_for_request(request.id),
        }
    }
}

macro_rules! impl_identified {
    ($($ty:ty),*) => {
        $(impl Identified for $ty {
            fn id(&self) -> u64 {
                self.id
            }
        })*
    };
}

impl_identified!(User, Request, HardwareItem, Report);

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}
