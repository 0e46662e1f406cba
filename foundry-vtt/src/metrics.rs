//! Metric extractors
//!
//! Five pure functions derive display values from the latest payload. None of
//! them fails: a missing or malformed field yields the metric's documented
//! default, and a malformed one is logged at error level.
//!
//! | Metric | Source | Default |
//! |---|---|---|
//! | Current HP | `data.hp.value` | `0` |
//! | Max HP | `data.hp.max` | `0` |
//! | Armor Class | `data.ac` | `0` |
//! | Combat Status | `combat/event` + `data.event` | `"No Combat"` / `"Unknown"` |
//! | Current Turn | `combat/event` + `combat_turn` + `data.current` | `"No active turn"` |

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::error;

use crate::model::SubscriptionId;
use crate::payload::{json_kind, EndpointKind, Payload};

pub const NO_COMBAT: &str = "No Combat";
pub const IN_COMBAT: &str = "In Combat";
pub const UNKNOWN_STATUS: &str = "Unknown";
pub const NO_ACTIVE_TURN: &str = "No active turn";

/// A derived metric value
///
/// Numbers found in the payload are passed through unmodified. A non-numeric
/// value at a numeric path is passed through as `Raw`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(Number),
    Text(String),
    Raw(Value),
}

impl MetricValue {
    /// Integer zero, the default for numeric metrics
    pub fn zero() -> Self {
        MetricValue::Number(Number::from(0))
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => MetricValue::Number(n.clone()),
            other => MetricValue::Raw(other.clone()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            MetricValue::Raw(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{n}"),
            MetricValue::Text(s) | MetricValue::Raw(Value::String(s)) => f.write_str(s),
            MetricValue::Raw(other) => write!(f, "{other}"),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(n: i64) -> Self {
        MetricValue::Number(Number::from(n))
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(s: String) -> Self {
        MetricValue::Text(s)
    }
}

/// The five exposed metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    CurrentHp,
    MaxHp,
    ArmorClass,
    CombatStatus,
    CurrentTurn,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::CurrentHp,
        Metric::MaxHp,
        Metric::ArmorClass,
        Metric::CombatStatus,
        Metric::CurrentTurn,
    ];

    /// Watch keys of all metrics, in `ALL` order
    pub const KEYS: [&'static str; 5] = [
        "current_hp",
        "max_hp",
        "armor_class",
        "combat_status",
        "current_turn",
    ];

    /// Stable key used for watches and change events
    pub fn key(self) -> &'static str {
        match self {
            Metric::CurrentHp => Self::KEYS[0],
            Metric::MaxHp => Self::KEYS[1],
            Metric::ArmorClass => Self::KEYS[2],
            Metric::CombatStatus => Self::KEYS[3],
            Metric::CurrentTurn => Self::KEYS[4],
        }
    }

    pub fn from_key(key: &str) -> Option<Metric> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    /// Run this metric's extractor
    pub fn extract(self, payload: Option<&Payload>) -> MetricValue {
        match self {
            Metric::CurrentHp => current_hp(payload),
            Metric::MaxHp => max_hp(payload),
            Metric::ArmorClass => armor_class(payload),
            Metric::CombatStatus => combat_status(payload),
            Metric::CurrentTurn => current_turn(payload),
        }
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            Metric::CurrentHp => "Current HP",
            Metric::MaxHp => "Max HP",
            Metric::ArmorClass => "Armor Class",
            Metric::CombatStatus => "Combat Status",
            Metric::CurrentTurn => "Current Turn",
        }
    }

    /// Material Design icon name
    pub fn icon(self) -> &'static str {
        match self {
            Metric::CurrentHp => "mdi:heart",
            Metric::MaxHp => "mdi:heart-outline",
            Metric::ArmorClass => "mdi:shield",
            Metric::CombatStatus => "mdi:sword-cross",
            Metric::CurrentTurn => "mdi:account-clock",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            Metric::CurrentHp | Metric::MaxHp => Some("HP"),
            _ => None,
        }
    }

    /// `measurement` for the numeric metrics
    pub fn state_class(self) -> Option<&'static str> {
        match self {
            Metric::CurrentHp | Metric::MaxHp | Metric::ArmorClass => Some("measurement"),
            _ => None,
        }
    }

    /// Entity id for this metric of a subscription
    pub fn unique_id(self, subscription_id: &SubscriptionId) -> String {
        let suffix = match self {
            Metric::CurrentHp => "current_hp",
            Metric::MaxHp => "max_hp",
            Metric::ArmorClass => "ac",
            Metric::CombatStatus => "combat_status",
            Metric::CurrentTurn => "combat_turn",
        };
        format!("{subscription_id}_{suffix}")
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All five metrics evaluated against one payload snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub current_hp: MetricValue,
    pub max_hp: MetricValue,
    pub armor_class: MetricValue,
    pub combat_status: MetricValue,
    pub current_turn: MetricValue,
}

impl MetricSnapshot {
    pub fn from_payload(payload: Option<&Payload>) -> Self {
        Self {
            current_hp: current_hp(payload),
            max_hp: max_hp(payload),
            armor_class: armor_class(payload),
            combat_status: combat_status(payload),
            current_turn: current_turn(payload),
        }
    }

    pub fn get(&self, metric: Metric) -> &MetricValue {
        match metric {
            Metric::CurrentHp => &self.current_hp,
            Metric::MaxHp => &self.max_hp,
            Metric::ArmorClass => &self.armor_class,
            Metric::CombatStatus => &self.combat_status,
            Metric::CurrentTurn => &self.current_turn,
        }
    }
}

pub fn current_hp(payload: Option<&Payload>) -> MetricValue {
    numeric_metric(Metric::CurrentHp, payload, "hp", Some("value"))
}

pub fn max_hp(payload: Option<&Payload>) -> MetricValue {
    numeric_metric(Metric::MaxHp, payload, "hp", Some("max"))
}

pub fn armor_class(payload: Option<&Payload>) -> MetricValue {
    numeric_metric(Metric::ArmorClass, payload, "ac", None)
}

pub fn combat_status(payload: Option<&Payload>) -> MetricValue {
    let Some(payload) = received(payload) else {
        return NO_COMBAT.into();
    };

    if payload.endpoint_kind() != EndpointKind::CombatEvent {
        return UNKNOWN_STATUS.into();
    }

    let Some(data) = data_object(Metric::CombatStatus, payload) else {
        return UNKNOWN_STATUS.into();
    };

    match data.get("event").and_then(Value::as_str) {
        Some("combat_start") => IN_COMBAT.into(),
        Some("combat_end") => NO_COMBAT.into(),
        Some("combat_round") => format!("Round {}", placeholder(data.get("round"), "?")).into(),
        _ => UNKNOWN_STATUS.into(),
    }
}

pub fn current_turn(payload: Option<&Payload>) -> MetricValue {
    let Some(payload) = received(payload) else {
        return NO_ACTIVE_TURN.into();
    };

    if payload.endpoint_kind() != EndpointKind::CombatEvent {
        return NO_ACTIVE_TURN.into();
    }

    let Some(data) = data_object(Metric::CurrentTurn, payload) else {
        return NO_ACTIVE_TURN.into();
    };

    if data.get("event").and_then(Value::as_str) != Some("combat_turn") {
        return NO_ACTIVE_TURN.into();
    }

    let current = match data.get("current") {
        None => return NO_ACTIVE_TURN.into(),
        Some(Value::Object(current)) => current,
        Some(other) => {
            error!(
                metric = Metric::CurrentTurn.key(),
                endpoint = payload.endpoint(),
                found = json_kind(other),
                "`data.current` is not an object"
            );
            return NO_ACTIVE_TURN.into();
        }
    };

    format!(
        "{} (Initiative: {})",
        placeholder(current.get("name"), "Unknown"),
        placeholder(current.get("initiative"), "?")
    )
    .into()
}

enum Lookup<'a> {
    Found(&'a Value),
    Absent,
    Malformed(&'static str),
}

/// `data[key]`, or `data[key][field]` when `field` is given
fn lookup<'a>(data: &'a Map<String, Value>, key: &str, field: Option<&str>) -> Lookup<'a> {
    let Some(value) = data.get(key) else {
        return Lookup::Absent;
    };

    match (field, value) {
        (None, value) => Lookup::Found(value),
        (Some(field), Value::Object(inner)) => match inner.get(field) {
            Some(found) => Lookup::Found(found),
            None => Lookup::Malformed("nested field missing"),
        },
        (Some(_), _) => Lookup::Malformed("not an object"),
    }
}

fn numeric_metric(
    metric: Metric,
    payload: Option<&Payload>,
    key: &str,
    field: Option<&str>,
) -> MetricValue {
    let Some(payload) = received(payload) else {
        return MetricValue::zero();
    };

    let Some(data) = data_object(metric, payload) else {
        return MetricValue::zero();
    };

    // Generic shape
    match lookup(data, key, field) {
        Lookup::Found(value) => return MetricValue::from_json(value),
        Lookup::Malformed(reason) => {
            error!(
                metric = metric.key(),
                endpoint = payload.endpoint(),
                key,
                reason,
                "Malformed metric field"
            );
            return MetricValue::zero();
        }
        Lookup::Absent => {}
    }

    // Actor-scoped shape
    if payload.endpoint_kind() == EndpointKind::ActorUpdate {
        if let Lookup::Found(value) = lookup(data, key, field) {
            return MetricValue::from_json(value);
        }
    }

    MetricValue::zero()
}

/// The payload, unless none was received or it is `{}`
fn received(payload: Option<&Payload>) -> Option<&Payload> {
    payload.filter(|p| !p.is_empty())
}

/// `data` as an object; logs when present with another type
fn data_object(metric: Metric, payload: &Payload) -> Option<&Map<String, Value>> {
    match payload.data()? {
        Value::Object(data) => Some(data),
        other => {
            error!(
                metric = metric.key(),
                endpoint = payload.endpoint(),
                found = json_kind(other),
                "`data` is not an object"
            );
            None
        }
    }
}

/// Text for a formatted slot: strings verbatim, absent or null as `default`
fn placeholder(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
