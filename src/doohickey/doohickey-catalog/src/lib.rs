//! App Doohickey catalog model and validation.
//!
//! Parses the `apps.json` catalog document into [`Catalog`] snapshots,
//! provides the built-in fallback catalog, and checks catalog files and
//! new catalog submissions for the fields the browser relies on.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

// ============================================================================
// Error type
// ============================================================================

/// Errors that can occur when reading catalogs or submissions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no ```json block found in submission")]
    MissingSubmission,

    #[error("submission must be a JSON object")]
    NotAnObject,
}

// ============================================================================
// Validation diagnostics
// ============================================================================

/// Severity level for a validation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The entry cannot be published as-is.
    Error,
    /// The entry works but renders poorly.
    Warning,
}

/// A single validation finding, tied to a rule id.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Rule ID (e.g., `"submission.field.required"`).
    pub rule: &'static str,
    pub message: String,
}

/// Collected validation results from checking a catalog or a submission.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// True if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// True if there are no diagnostics at all.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.diagnostics.extend(other.diagnostics);
    }

    fn error(&mut self, rule: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            rule,
            message: message.into(),
        });
    }

    fn warning(&mut self, rule: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            rule,
            message: message.into(),
        });
    }
}

// ============================================================================
// Catalog types
// ============================================================================

/// Who published an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Developer {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub avatar: Option<String>,
}

/// One installable item in the catalog.
///
/// Only `name` is mandatory on the wire. Text fields tolerate `null` and
/// plain numbers, so one sloppy entry never hides the rest of the catalog;
/// renderers skip empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Unique identifier, used for routing and install calls.
    #[serde(deserialize_with = "lenient::name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub long_description: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub download_url: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub source_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub release_date: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub size: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub requirements: String,
    #[serde(default, deserialize_with = "lenient::developer")]
    pub developer: Option<Developer>,
}

/// Field decoders that accept the loosely typed JSON found in hand-edited
/// catalogs.
mod lenient {
    use super::Developer;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar_text(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        scalar_text(Value::deserialize(d)?)
            .ok_or_else(|| serde::de::Error::custom("name must be a string"))
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_text(Value::deserialize(d)?))
    }

    /// Non-text items are dropped; anything but an array means "no list".
    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => Some(items.into_iter().filter_map(scalar_text).collect()),
            _ => None,
        })
    }

    pub fn developer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Developer>, D::Error> {
        match Value::deserialize(d)? {
            value @ Value::Object(_) => Developer::deserialize(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// A catalog entry that could not be decoded and was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Zero-based position in the source document.
    pub index: usize,
    pub reason: String,
}

/// An ordered snapshot of the catalog, exactly as the source listed it.
///
/// Decoding is per entry: entries without a usable `name` are skipped with
/// a warning instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    apps: Vec<Application>,
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let entries = Vec::<Value>::deserialize(d)?;
        let (catalog, skipped) = Catalog::from_entries(entries);
        for entry in &skipped {
            tracing::warn!(index = entry.index, reason = %entry.reason, "skipping catalog entry");
        }
        Ok(catalog)
    }
}

impl Catalog {
    pub fn new(apps: Vec<Application>) -> Self {
        Self { apps }
    }

    /// Decode raw entries, returning the ones that were left out alongside.
    pub fn from_entries(entries: Vec<Value>) -> (Self, Vec<SkippedEntry>) {
        let mut apps = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Application>(entry) {
                Ok(app) => apps.push(app),
                Err(e) => skipped.push(SkippedEntry {
                    index,
                    reason: e.to_string(),
                }),
            }
        }
        (Self { apps }, skipped)
    }

    /// Parse a catalog document (a JSON array of applications).
    pub fn parse(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a catalog document from raw response bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Placeholder entries shown when live data is late.
    pub fn fallback() -> Self {
        Self::new(vec![
            Application {
                name: "Fallbacker".to_string(),
                description: "Fell back? We've got you. (Fallback)".to_string(),
                ..Default::default()
            },
            Application {
                name: "Netflixbus".to_string(),
                description: "Guten tag! (Fallback)".to_string(),
                ..Default::default()
            },
        ])
    }

    /// Look up an application by exact name. The first entry in source
    /// order wins when names are duplicated.
    pub fn find(&self, name: &str) -> Option<&Application> {
        self.apps.iter().find(|app| app.name == name)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Application> {
        self.apps.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Application> {
        self.apps.get(index)
    }

    /// Names that appear more than once, in order of their second occurrence.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = std::collections::BTreeSet::new();
        let mut dups = Vec::new();
        for app in &self.apps {
            if !seen.insert(app.name.as_str()) && !dups.contains(&app.name.as_str()) {
                dups.push(app.name.as_str());
            }
        }
        dups
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Application;
    type IntoIter = std::slice::Iter<'a, Application>;

    fn into_iter(self) -> Self::IntoIter {
        self.apps.iter()
    }
}

/// Read and parse a catalog file from disk.
pub fn load_catalog(path: &Path) -> Result<Catalog, Error> {
    Catalog::parse(&read_file(path)?)
}

/// Read a catalog file, reporting every entry that had to be skipped as a
/// `catalog.entry.invalid` error.
pub fn load_catalog_checked(path: &Path) -> Result<(Catalog, ValidationReport), Error> {
    let entries: Vec<Value> = serde_json::from_str(&read_file(path)?)?;
    let (catalog, skipped) = Catalog::from_entries(entries);

    let mut report = ValidationReport::default();
    for entry in skipped {
        report.error(
            "catalog.entry.invalid",
            format!("entry #{} skipped: {}", entry.index + 1, entry.reason),
        );
    }
    Ok((catalog, report))
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

// ============================================================================
// Catalog validation
// ============================================================================

/// Check a parsed catalog for entries the browser cannot serve correctly.
pub fn validate_catalog(catalog: &Catalog) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (index, app) in catalog.iter().enumerate() {
        if app.name.trim().is_empty() {
            report.error(
                "catalog.name.empty",
                format!("entry #{} has an empty name", index + 1),
            );
        }
        if app.download_url.is_empty() {
            report.warning(
                "catalog.download.empty",
                format!("'{}' has no downloadUrl", app.name),
            );
        }
    }

    for name in catalog.duplicate_names() {
        report.error(
            "catalog.name.unique",
            format!("'{name}' is listed more than once; only the first entry is reachable"),
        );
    }

    report
}

// ============================================================================
// Submissions
// ============================================================================

/// Fields every new catalog entry must carry.
pub const REQUIRED_FIELDS: [&str; 10] = [
    "name",
    "description",
    "developer",
    "longDescription",
    "downloadUrl",
    "version",
    "releaseDate",
    "size",
    "requirements",
    "features",
];

const DEVELOPER_FIELDS: [&str; 3] = ["name", "url", "avatar"];

/// Fields that must hold a JSON string whenever they are present.
const TEXT_FIELDS: [&str; 9] = [
    "name",
    "description",
    "longDescription",
    "downloadUrl",
    "sourceUrl",
    "version",
    "releaseDate",
    "size",
    "requirements",
];

/// Pull the JSON object out of the first ```` ```json ```` fence in `text`.
///
/// Returns `None` when either fence marker is missing or the enclosed text
/// is not valid JSON.
pub fn extract_submission(text: &str) -> Option<Value> {
    const START: &str = "```json";
    const END: &str = "```";

    let start = text.find(START)? + START.len();
    let end = start + text[start..].find(END)?;
    serde_json::from_str(text[start..end].trim()).ok()
}

/// Like [`extract_submission`], but reports a missing block as an error.
pub fn parse_submission(text: &str) -> Result<Value, Error> {
    extract_submission(text).ok_or(Error::MissingSubmission)
}

/// Check a submission for the fields a catalog entry needs.
pub fn validate_submission(value: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(entry) = value.as_object() else {
        report.error("submission.object", "submission must be a JSON object");
        return report;
    };

    for field in REQUIRED_FIELDS {
        if !entry.contains_key(field) {
            report.error(
                "submission.field.required",
                format!("Missing required field: {field}"),
            );
        }
    }

    for field in TEXT_FIELDS {
        if let Some(value) = entry.get(field)
            && !value.is_string()
        {
            report.error(
                "submission.field.type",
                format!("Field {field} must be a string."),
            );
        }
    }

    if let Some(developer) = entry.get("developer") {
        let complete = developer
            .as_object()
            .is_some_and(|dev| DEVELOPER_FIELDS.iter().all(|f| dev.contains_key(*f)));
        if !complete {
            report.error(
                "submission.developer.fields",
                "Developer object is missing required fields.",
            );
        }
        if let Some(dev) = developer.as_object() {
            for field in DEVELOPER_FIELDS {
                if dev.get(field).is_some_and(|v| !v.is_string()) {
                    report.error(
                        "submission.field.type",
                        format!("Developer {field} must be a string."),
                    );
                }
            }
        }
    }

    match entry.get("features") {
        Some(Value::Array(items)) if !items.iter().all(Value::is_string) => {
            report.error("submission.field.type", "Features must be a list of strings.");
        }
        Some(features) if !features.is_array() => {
            report.error("submission.features.list", "Features must be a list.");
        }
        _ => {}
    }

    if let Some(screenshots) = entry.get("screenshots")
        && !screenshots.is_array()
    {
        report.error("submission.screenshots.list", "Screenshots must be a list.");
    }

    report
}

/// Read a catalog file as raw JSON entries for appending.
///
/// A missing or unparsable file counts as an empty catalog.
pub fn load_catalog_for_append(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<Vec<Value>>(&content).ok())
        .unwrap_or_default()
}

/// Append a submission to the catalog file at `path`, writing the result
/// back with two-space indentation. Returns the new number of entries.
pub fn append_submission(path: &Path, submission: Value) -> Result<usize, Error> {
    if !submission.is_object() {
        return Err(Error::NotAnObject);
    }

    let mut entries = load_catalog_for_append(path);
    entries.push(submission);

    let rendered = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, rendered).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;

    Ok(entries.len())
}
