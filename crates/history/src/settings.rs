//! Plugin settings: schema, defaults, validation.
//!
//! Settings are stored as `(key, text)` pairs and exposed over the API as a
//! JSON object keyed by the upper-case setting name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stockhistory_core::{Currency, DomainError, DomainResult};

pub const USER_GROUP: &str = "USER_GROUP";
pub const EXCLUDE_EXTERNAL_LOCATIONS: &str = "EXCLUDE_EXTERNAL_LOCATIONS";
pub const STOCK_COUNT_PERIOD: &str = "STOCK_COUNT_PERIOD";
pub const IGNORE_INACTIVE_PARTS: &str = "IGNORE_INACTIVE_PARTS";
pub const STOCK_DELETE_PERIOD: &str = "STOCK_DELETE_PERIOD";
pub const ENABLE_SNAPSHOTS: &str = "ENABLE_SNAPSHOTS";
pub const ENABLE_RETENTION: &str = "ENABLE_RETENTION";
pub const DEFAULT_CURRENCY: &str = "DEFAULT_CURRENCY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    Bool,
    /// Whole number of days, with a lower bound.
    Days { min: u32 },
    /// Name of a host user group; empty means "no restriction".
    Group,
    Currency,
}

/// One entry of the settings schema, as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: SettingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<&'static str>,
}

const DEFINITIONS: &[SettingDefinition] = &[
    SettingDefinition {
        key: USER_GROUP,
        name: "Allowed Group",
        description: "The user group that is allowed to view stock history",
        kind: SettingKind::Group,
        units: None,
    },
    SettingDefinition {
        key: EXCLUDE_EXTERNAL_LOCATIONS,
        name: "Exclude External Locations",
        description: "Exclude stock items in external locations from stocktake calculations",
        kind: SettingKind::Bool,
        units: None,
    },
    SettingDefinition {
        key: STOCK_COUNT_PERIOD,
        name: "Stock Count Period",
        description: "How often to record stock history levels",
        kind: SettingKind::Days { min: 1 },
        units: Some("days"),
    },
    SettingDefinition {
        key: IGNORE_INACTIVE_PARTS,
        name: "Ignore Inactive Parts",
        description: "Ignore stock history for parts that are marked as inactive",
        kind: SettingKind::Bool,
        units: None,
    },
    SettingDefinition {
        key: STOCK_DELETE_PERIOD,
        name: "Stock Delete Period",
        description: "How long to keep stock history records before deletion",
        kind: SettingKind::Days { min: 1 },
        units: Some("days"),
    },
    SettingDefinition {
        key: ENABLE_SNAPSHOTS,
        name: "Enable Snapshots",
        description: "Record stock history levels on a schedule",
        kind: SettingKind::Bool,
        units: None,
    },
    SettingDefinition {
        key: ENABLE_RETENTION,
        name: "Enable Retention",
        description: "Delete stock history records older than the delete period",
        kind: SettingKind::Bool,
        units: None,
    },
    SettingDefinition {
        key: DEFAULT_CURRENCY,
        name: "Default Currency",
        description: "Currency used for recorded stock values",
        kind: SettingKind::Currency,
        units: None,
    },
];

/// Current plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct HistorySettings {
    pub user_group: Option<String>,
    pub exclude_external_locations: bool,
    pub stock_count_period: u32,
    pub ignore_inactive_parts: bool,
    pub stock_delete_period: u32,
    pub enable_snapshots: bool,
    pub enable_retention: bool,
    pub default_currency: Currency,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            user_group: None,
            exclude_external_locations: true,
            stock_count_period: 7,
            ignore_inactive_parts: true,
            stock_delete_period: 365,
            enable_snapshots: true,
            enable_retention: true,
            default_currency: Currency::usd(),
        }
    }
}

/// Partial update, as sent by `PATCH /settings/`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SettingsPatch(pub Map<String, Value>);

impl HistorySettings {
    pub fn definitions() -> &'static [SettingDefinition] {
        DEFINITIONS
    }

    fn definition(key: &str) -> Option<&'static SettingDefinition> {
        DEFINITIONS.iter().find(|d| d.key == key)
    }

    /// Settings as a JSON object (`{"STOCK_COUNT_PERIOD": 7, ...}`).
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Text form of every setting, for key/value persistence.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (USER_GROUP, self.user_group.clone().unwrap_or_default()),
            (EXCLUDE_EXTERNAL_LOCATIONS, self.exclude_external_locations.to_string()),
            (STOCK_COUNT_PERIOD, self.stock_count_period.to_string()),
            (IGNORE_INACTIVE_PARTS, self.ignore_inactive_parts.to_string()),
            (STOCK_DELETE_PERIOD, self.stock_delete_period.to_string()),
            (ENABLE_SNAPSHOTS, self.enable_snapshots.to_string()),
            (ENABLE_RETENTION, self.enable_retention.to_string()),
            (DEFAULT_CURRENCY, self.default_currency.to_string()),
        ]
    }

    /// Rebuild settings from stored pairs, starting from defaults.
    ///
    /// Keys that are no longer part of the schema are skipped.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> DomainResult<Self> {
        let mut settings = Self::default();
        for (key, raw) in pairs {
            if Self::definition(key).is_none() {
                tracing::debug!(key, "ignoring unknown stored setting");
                continue;
            }
            settings.set(key, &Value::String(raw.to_string()))?;
        }
        Ok(settings)
    }

    /// Apply a partial update, validating every key before touching anything.
    pub fn apply(&self, patch: &SettingsPatch) -> DomainResult<Self> {
        let mut next = self.clone();
        for (key, value) in &patch.0 {
            next.set(key, value)?;
        }
        Ok(next)
    }

    fn bool_field(&mut self, key: &str) -> DomainResult<&mut bool> {
        match key {
            EXCLUDE_EXTERNAL_LOCATIONS => Ok(&mut self.exclude_external_locations),
            IGNORE_INACTIVE_PARTS => Ok(&mut self.ignore_inactive_parts),
            ENABLE_SNAPSHOTS => Ok(&mut self.enable_snapshots),
            ENABLE_RETENTION => Ok(&mut self.enable_retention),
            other => Err(DomainError::invariant(format!("no boolean field for setting '{other}'"))),
        }
    }

    fn days_field(&mut self, key: &str) -> DomainResult<&mut u32> {
        match key {
            STOCK_COUNT_PERIOD => Ok(&mut self.stock_count_period),
            STOCK_DELETE_PERIOD => Ok(&mut self.stock_delete_period),
            other => Err(DomainError::invariant(format!("no day-count field for setting '{other}'"))),
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> DomainResult<()> {
        let def = Self::definition(key)
            .ok_or_else(|| DomainError::validation(format!("unknown setting '{key}'")))?;

        match def.kind {
            SettingKind::Bool => {
                let v = parse_bool(key, value)?;
                *self.bool_field(key)? = v;
            }
            SettingKind::Days { min } => {
                let v = parse_days(key, value, min)?;
                *self.days_field(key)? = v;
            }
            SettingKind::Group => {
                self.user_group = match value {
                    Value::Null => None,
                    Value::String(s) if s.trim().is_empty() => None,
                    Value::String(s) => Some(s.trim().to_string()),
                    other => {
                        return Err(DomainError::validation(format!(
                            "{key}: expected a group name, got {other}"
                        )));
                    }
                };
            }
            SettingKind::Currency => {
                let code = value.as_str().ok_or_else(|| {
                    DomainError::validation(format!("{key}: expected a currency code"))
                })?;
                self.default_currency = Currency::new(code)?;
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &Value) -> DomainResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(DomainError::validation(format!("{key}: '{s}' is not a boolean"))),
        },
        other => Err(DomainError::validation(format!("{key}: {other} is not a boolean"))),
    }
}

fn parse_days(key: &str, value: &Value, min: u32) -> DomainResult<u32> {
    let n: i64 = match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| DomainError::validation(format!("{key}: {n} is not a whole number")))?,
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| DomainError::validation(format!("{key}: '{s}' is not a whole number")))?,
        other => {
            return Err(DomainError::validation(format!(
                "{key}: {other} is not a whole number"
            )));
        }
    };

    if n < i64::from(min) {
        return Err(DomainError::validation(format!(
            "{key}: must be at least {min}"
        )));
    }
    u32::try_from(n).map_err(|_| DomainError::validation(format!("{key}: {n} is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(v: Value) -> SettingsPatch {
        SettingsPatch(v.as_object().cloned().unwrap())
    }

    #[test]
    fn defaults_match_schema() {
        let s = HistorySettings::default();
        assert_eq!(s.stock_count_period, 7);
        assert_eq!(s.stock_delete_period, 365);
        assert!(s.exclude_external_locations);
        assert!(s.ignore_inactive_parts);
        assert_eq!(s.user_group, None);
        assert_eq!(HistorySettings::definitions().len(), s.to_pairs().len());
    }

    #[test]
    fn each_flag_and_period_updates_only_its_own_field() {
        let defaults = HistorySettings::default();
        let before = defaults.to_json();

        for def in HistorySettings::definitions() {
            let value = match def.kind {
                SettingKind::Bool => json!(!before[def.key].as_bool().unwrap()),
                SettingKind::Days { .. } => json!(4321),
                _ => continue,
            };
            let mut single = Map::new();
            single.insert(def.key.to_string(), value.clone());
            let after = defaults.apply(&SettingsPatch(single)).unwrap().to_json();

            for other in HistorySettings::definitions() {
                if other.key == def.key {
                    assert_eq!(after[other.key], value, "{}", def.key);
                } else {
                    assert_eq!(after[other.key], before[other.key], "{} changed {}", def.key, other.key);
                }
            }
        }
    }

    #[test]
    fn json_uses_setting_keys() {
        let v = HistorySettings::default().to_json();
        assert_eq!(v["STOCK_COUNT_PERIOD"], 7);
        assert_eq!(v["USER_GROUP"], Value::Null);
        assert_eq!(v["DEFAULT_CURRENCY"], "USD");
    }

    #[test]
    fn pairs_round_trip() {
        let mut s = HistorySettings::default();
        s.user_group = Some("stock".to_string());
        s.stock_count_period = 3;
        s.exclude_external_locations = false;

        let pairs = s.to_pairs();
        let back = HistorySettings::from_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str()))).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn patch_validates_minimums_and_types() {
        let s = HistorySettings::default();
        assert!(s.apply(&patch(json!({ "STOCK_COUNT_PERIOD": 0 }))).is_err());
        assert!(s.apply(&patch(json!({ "STOCK_DELETE_PERIOD": "soon" }))).is_err());
        assert!(s.apply(&patch(json!({ "IGNORE_INACTIVE_PARTS": 3 }))).is_err());
        assert!(s.apply(&patch(json!({ "NOT_A_SETTING": true }))).is_err());

        let next = s
            .apply(&patch(json!({ "STOCK_COUNT_PERIOD": 1, "USER_GROUP": "stock", "DEFAULT_CURRENCY": "eur" })))
            .unwrap();
        assert_eq!(next.stock_count_period, 1);
        assert_eq!(next.user_group.as_deref(), Some("stock"));
        assert_eq!(next.default_currency.as_str(), "EUR");
    }

    #[test]
    fn empty_group_clears_restriction() {
        let mut s = HistorySettings::default();
        s.user_group = Some("stock".to_string());
        let next = s.apply(&patch(json!({ "USER_GROUP": "" }))).unwrap();
        assert_eq!(next.user_group, None);
    }

    #[test]
    fn unknown_stored_keys_are_ignored() {
        let s = HistorySettings::from_pairs([("LEGACY_FLAG", "1"), (STOCK_COUNT_PERIOD, "14")]).unwrap();
        assert_eq!(s.stock_count_period, 14);
    }
}
