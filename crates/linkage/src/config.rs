use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::LinkageError;
use crate::model::FieldKind;
use crate::select::parse_timestamp;

/// Weight of a field that has no entry in the weight table.
pub const DEFAULT_WEIGHT: f64 = 1.0;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    pub name: String,
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub ground_truth: Option<GroundTruthConfig>,
    #[serde(default)]
    pub candidates: CandidatesConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub units: Vec<UnitConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Field list, kinds, weights and the demotion threshold.
///
/// Passed explicitly into every scoring call, so several configurations (one per
/// supplier, say) can be used side by side.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Compared fields, in report order.
    pub fields: Vec<String>,
    #[serde(default)]
    pub kinds: HashMap<String, FieldKind>,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    /// Matched pairs scoring below this are demoted to unmatched.
    #[serde(default)]
    pub min_score: f64,
}

impl ScoringConfig {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldKind)>,
        S: Into<String>,
    {
        let mut names = Vec::new();
        let mut kinds = HashMap::new();
        for (name, kind) in fields {
            let name = name.into();
            kinds.insert(name.clone(), kind);
            names.push(name);
        }
        Self {
            fields: names,
            kinds,
            weights: HashMap::new(),
            min_score: 0.0,
        }
    }

    pub fn with_weight(mut self, field: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(field.into(), weight);
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn kind(&self, field: &str) -> Result<FieldKind, LinkageError> {
        self.kinds
            .get(field)
            .copied()
            .ok_or_else(|| LinkageError::UnknownFieldKind(field.to_string()))
    }

    pub fn weight(&self, field: &str) -> f64 {
        self.weights.get(field).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    /// `(name, kind, weight)` per field, in field-list order.
    pub fn resolved_fields(&self) -> Result<Vec<(&str, FieldKind, f64)>, LinkageError> {
        self.fields
            .iter()
            .map(|f| Ok((f.as_str(), self.kind(f)?, self.weight(f))))
            .collect()
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.as_str()) {
                return Err(LinkageError::ConfigValidation(format!(
                    "field '{field}' listed twice"
                )));
            }
            self.kind(field)?;
        }

        for name in self.kinds.keys() {
            if !seen.contains(name.as_str()) {
                return Err(LinkageError::ConfigValidation(format!(
                    "kind given for unlisted field '{name}'"
                )));
            }
        }

        for (name, weight) in &self.weights {
            if !seen.contains(name.as_str()) {
                return Err(LinkageError::ConfigValidation(format!(
                    "weight given for unlisted field '{name}'"
                )));
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(LinkageError::ConfigValidation(format!(
                    "weight for '{name}' must be a finite number >= 0, got {weight}"
                )));
            }
        }

        let total: f64 = self.fields.iter().map(|f| self.weight(f)).sum();
        if !total.is_finite() {
            return Err(LinkageError::ConfigValidation(format!(
                "total weight must be finite, got {total}"
            )));
        }

        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(LinkageError::ConfigValidation(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    /// Cell values (case-insensitive) that mean "nothing was given".
    #[serde(default = "default_placeholders")]
    pub placeholders: Vec<String>,
    /// Treat a candidate's numeric zero as Absent. Ground-truth zeros are kept.
    #[serde(default)]
    pub candidate_zero_as_absent: bool,
}

fn default_placeholders() -> Vec<String> {
    vec!["unspecified".into(), "N/A - unspecified".into()]
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            placeholders: default_placeholders(),
            candidate_zero_as_absent: false,
        }
    }
}

impl NormalizeConfig {
    pub fn is_placeholder(&self, cell: &str) -> bool {
        self.placeholders.iter().any(|p| p.trim().eq_ignore_ascii_case(cell))
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroundTruthConfig {
    /// CSV path, relative to the config file.
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidatesConfig {
    #[serde(default = "default_offers_key")]
    pub offers_key: String,
}

fn default_offers_key() -> String {
    "product_offers".into()
}

impl Default for CandidatesConfig {
    fn default() -> Self {
        Self {
            offers_key: default_offers_key(),
        }
    }
}

// ---------------------------------------------------------------------------
// Selection + Units
// ---------------------------------------------------------------------------

/// How ground-truth rows are picked for a unit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    /// Columns that must all equal the unit key.
    #[serde(default)]
    pub all_of: Vec<String>,
    /// Columns of which at least one must equal the unit key.
    #[serde(default)]
    pub any_of: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<TimestampConfig>,
}

impl SelectionConfig {
    /// Every ground-truth column the selection reads.
    pub fn columns(&self) -> Vec<&str> {
        self.all_of
            .iter()
            .chain(self.any_of.iter())
            .map(String::as_str)
            .chain(self.timestamp.as_ref().map(|t| t.column.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimestampConfig {
    pub column: String,
    /// `chrono` format of the ground-truth column.
    pub format: String,
    /// `chrono` format of the unit key value.
    #[serde(default = "default_unit_format")]
    pub unit_format: String,
    /// Hours added to the unit key value before comparison.
    #[serde(default)]
    pub offset_hours: i64,
}

fn default_unit_format() -> String {
    "%Y-%m-%d %H:%M:%S".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    pub name: String,
    /// Candidate payload path, relative to the config file.
    pub candidates: String,
    #[serde(default)]
    pub key: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EvalConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: EvalConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        self.scoring.validate()?;

        if !self.units.is_empty() && self.ground_truth.is_none() {
            return Err(LinkageError::ConfigValidation(
                "units require a [ground_truth] file".into(),
            ));
        }

        let mut names = HashSet::new();
        for unit in &self.units {
            if !names.insert(unit.name.as_str()) {
                return Err(LinkageError::ConfigValidation(format!(
                    "unit '{}' defined twice",
                    unit.name
                )));
            }
            self.validate_unit_key(unit)?;
        }

        Ok(())
    }

    fn validate_unit_key(&self, unit: &UnitConfig) -> Result<(), LinkageError> {
        let sel = &self.selection;

        for column in &sel.all_of {
            if !unit.key.contains_key(column) {
                return Err(LinkageError::ConfigValidation(format!(
                    "unit '{}': key is missing '{column}'",
                    unit.name
                )));
            }
        }

        if !sel.any_of.is_empty() && !sel.any_of.iter().any(|c| unit.key.contains_key(c)) {
            return Err(LinkageError::ConfigValidation(format!(
                "unit '{}': key needs at least one of {:?}",
                unit.name, sel.any_of
            )));
        }

        if let Some(ts) = &sel.timestamp {
            let value = unit.key.get(&ts.column).ok_or_else(|| {
                LinkageError::ConfigValidation(format!(
                    "unit '{}': key is missing '{}'",
                    unit.name, ts.column
                ))
            })?;
            if parse_timestamp(value, &ts.unit_format).is_none() {
                return Err(LinkageError::ConfigValidation(format!(
                    "unit '{}': cannot parse '{value}' with format '{}'",
                    unit.name, ts.unit_format
                )));
            }
        }

        Ok(())
    }

    /// Units to run: all of them, or the named subset in config order.
    pub fn units_named(&self, names: &[String]) -> Result<Vec<&UnitConfig>, LinkageError> {
        if names.is_empty() {
            return Ok(self.units.iter().collect());
        }
        for name in names {
            if !self.units.iter().any(|u| &u.name == name) {
                return Err(LinkageError::ConfigValidation(format!("unknown unit '{name}'")));
            }
        }
        Ok(self.units.iter().filter(|u| names.contains(&u.name)).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Produce offers"

[scoring]
fields = ["product_type", "variety", "price"]
min_score = 0.25

[scoring.kinds]
product_type = "text"
variety = "text"
price = "numeric"

[scoring.weights]
product_type = 2.0
price = 2.0

[ground_truth]
file = "labeled.csv"

[selection]
all_of = ["supplier_name"]
any_of = ["email_address", "phone_number"]

[selection.timestamp]
column = "date_of_sending"
format = "%d-%m-%Y %H:%M:%S"
offset_hours = 1

[[units]]
name = "input-17"
candidates = "runs/17.json"

[units.key]
supplier_name = "Agro Sur"
email_address = "sales@agrosur.example"
date_of_sending = "2025-03-17 08:15:00"
"#;

    #[test]
    fn parse_valid() {
        let config = EvalConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Produce offers");
        assert_eq!(config.scoring.fields.len(), 3);
        assert_eq!(config.scoring.kind("price").unwrap(), FieldKind::Numeric);
        assert_eq!(config.scoring.weight("price"), 2.0);
        assert_eq!(config.scoring.weight("variety"), DEFAULT_WEIGHT);
        assert_eq!(config.scoring.min_score, 0.25);
        assert_eq!(config.candidates.offers_key, "product_offers");
        assert!(!config.normalize.candidate_zero_as_absent);
        assert_eq!(config.units.len(), 1);
        let ts = config.selection.timestamp.as_ref().unwrap();
        assert_eq!(ts.unit_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(ts.offset_hours, 1);
    }

    #[test]
    fn builder_matches_parsed_defaults() {
        let scoring = ScoringConfig::new([("type", FieldKind::Text), ("price", FieldKind::Numeric)])
            .with_weight("price", 3.0)
            .with_min_score(0.5);
        scoring.validate().unwrap();
        assert_eq!(scoring.fields, vec!["type", "price"]);
        assert_eq!(scoring.weight("type"), 1.0);
        assert_eq!(scoring.weight("price"), 3.0);
        let resolved = scoring.resolved_fields().unwrap();
        assert_eq!(resolved[1], ("price", FieldKind::Numeric, 3.0));
    }

    #[test]
    fn reject_field_without_kind() {
        let mut scoring = ScoringConfig::new([("type", FieldKind::Text)]);
        scoring.fields.push("price".into());
        let err = scoring.validate().unwrap_err();
        assert!(matches!(err, LinkageError::UnknownFieldKind(ref f) if f == "price"));
    }

    #[test]
    fn reject_unknown_kind_name() {
        let input = r#"
name = "Bad"
[scoring]
fields = ["price"]
[scoring.kinds]
price = "money"
"#;
        let err = EvalConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, LinkageError::ConfigParse(_)));
    }

    #[test]
    fn reject_duplicate_field() {
        let mut scoring = ScoringConfig::new([("type", FieldKind::Text)]);
        scoring.fields.push("type".into());
        let err = scoring.validate().unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn reject_weight_for_unlisted_field() {
        let scoring = ScoringConfig::new([("type", FieldKind::Text)]).with_weight("typo", 2.0);
        let err = scoring.validate().unwrap_err();
        assert!(err.to_string().contains("'typo'"));
    }

    #[test]
    fn reject_negative_weight() {
        let scoring = ScoringConfig::new([("type", FieldKind::Text)]).with_weight("type", -1.0);
        assert!(scoring.validate().is_err());
    }

    #[test]
    fn reject_weights_whose_sum_overflows() {
        let scoring = ScoringConfig::new([("type", FieldKind::Text), ("price", FieldKind::Numeric)])
            .with_weight("type", 1e308)
            .with_weight("price", 1e308);
        let err = scoring.validate().unwrap_err();
        assert!(err.to_string().contains("total weight must be finite"), "{err}");
    }

    #[test]
    fn reject_min_score_out_of_range() {
        let scoring = ScoringConfig::new([("type", FieldKind::Text)]).with_min_score(1.5);
        let err = scoring.validate().unwrap_err();
        assert!(err.to_string().contains("min_score"));
    }

    #[test]
    fn reject_unit_missing_selection_column() {
        let input = VALID.replace("supplier_name = \"Agro Sur\"\n", "");
        let err = EvalConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("missing 'supplier_name'"));
    }

    #[test]
    fn reject_unit_without_any_of_column() {
        let input = VALID.replace("email_address = \"sales@agrosur.example\"\n", "");
        let err = EvalConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("at least one of"));
    }

    #[test]
    fn reject_unparsable_unit_timestamp() {
        let input = VALID.replace("2025-03-17 08:15:00", "17/03/2025");
        let err = EvalConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }

    #[test]
    fn reject_units_without_ground_truth() {
        let input = VALID.replace("[ground_truth]\nfile = \"labeled.csv\"\n", "");
        let err = EvalConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("[ground_truth]"));
    }

    #[test]
    fn units_named_filters_in_config_order() {
        let config = EvalConfig::from_toml(VALID).unwrap();
        assert_eq!(config.units_named(&[]).unwrap().len(), 1);
        assert_eq!(config.units_named(&["input-17".into()]).unwrap()[0].name, "input-17");
        assert!(config.units_named(&["nope".into()]).is_err());
    }

    #[test]
    fn placeholder_match_is_case_insensitive() {
        let norm = NormalizeConfig::default();
        assert!(norm.is_placeholder("Unspecified"));
        assert!(norm.is_placeholder("n/a - unspecified"));
        assert!(!norm.is_placeholder("Tomato"));
    }
}
