use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};

/// Cell text used for the Unspecified placeholder in tabular output.
pub const UNSPECIFIED_CELL: &str = "unspecified";

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Numeric,
    Text,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A typed field value.
///
/// `Absent` and `Unspecified` are the missing-value sentinels of the numeric and
/// text kinds respectively. `Number(0.0)` is a real measurement, never absence.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Absent,
    Text(String),
    Unspecified,
}

impl FieldValue {
    /// The missing-value sentinel for `kind`.
    pub fn missing(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Numeric => Self::Absent,
            FieldKind::Text => Self::Unspecified,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Number(_) | Self::Absent => FieldKind::Numeric,
            Self::Text(_) | Self::Unspecified => FieldKind::Text,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Absent | Self::Unspecified)
    }

    /// Uniform string form for tabular sinks: numbers in shortest round-trip form,
    /// `Absent` as an empty cell, `Unspecified` as [`UNSPECIFIED_CELL`].
    pub fn to_cell(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Absent => String::new(),
            Self::Text(s) => s.clone(),
            Self::Unspecified => UNSPECIFIED_CELL.to_string(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Absent => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Unspecified => serializer.serialize_str(UNSPECIFIED_CELL),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    GroundTruth,
    Candidate,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroundTruth => write!(f, "ground truth"),
            Self::Candidate => write!(f, "candidate"),
        }
    }
}

/// One structured offer: field name to typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.values.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Linkage
// ---------------------------------------------------------------------------

/// Ground-truth index to candidate index (`None` = unmatched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Linkage {
    pub links: Vec<Option<usize>>,
    pub candidate_count: usize,
}

impl Linkage {
    /// Every ground-truth row unmatched.
    pub fn unmatched(ground_truth_count: usize, candidate_count: usize) -> Self {
        Self {
            links: vec![None; ground_truth_count],
            candidate_count,
        }
    }

    pub fn matched_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(i, link)| link.map(|j| (i, j)))
    }

    pub fn matched_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_some()).count()
    }

    /// Candidate indices no ground-truth row points to, ascending.
    pub fn unmatched_candidates(&self) -> Vec<usize> {
        let mut used = vec![false; self.candidate_count];
        for (_, j) in self.matched_pairs() {
            if j < used.len() {
                used[j] = true;
            }
        }
        used.iter()
            .enumerate()
            .filter(|(_, u)| !**u)
            .map(|(j, _)| j)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Report rows
// ---------------------------------------------------------------------------

/// One emitted row of the report, at (record pair, field) granularity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub ground_truth_index: Option<usize>,
    pub candidate_index: Option<usize>,
    pub field: String,
    pub ground_truth_value: FieldValue,
    pub candidate_value: FieldValue,
    pub similarity: f64,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMean {
    pub field: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSummary {
    pub ground_truth_rows: usize,
    pub candidate_rows: usize,
    pub matched_rows: usize,
    pub unmatched_ground_truth: usize,
    pub unmatched_candidates: usize,
    pub comparisons: usize,
    pub mean_similarity: f64,
    /// Mean aggregate score over matched pairs; `None` when nothing matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_row_score: Option<f64>,
    pub field_means: Vec<FieldMean>,
}

/// Result of one evaluation call: linkage, report rows, summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub linkage: Linkage,
    pub comparisons: Vec<Comparison>,
    pub summary: UnitSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitMeta {
    pub config_name: String,
    pub unit: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub meta: UnitMeta,
    pub summary: UnitSummary,
    pub links: Vec<Option<usize>>,
    pub comparisons: Vec<Comparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub units: usize,
    pub comparisons: usize,
    pub mean_similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub name: String,
    pub engine_version: String,
    pub run_at: String,
    pub summary: BatchSummary,
    pub units: Vec<UnitReport>,
}
