//! Portfolio input data.
//!
//! The fetch step writes one JSON file per run. Every key is optional and a
//! `null` reads the same as a missing key.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Deserialize `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Non-empty string or `None`.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioData {
    #[serde(deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectEntry>,
    pub reference_data: serde_json::Value,
}

impl PortfolioData {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::DataError(e.to_string()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| Error::DataError(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

/// One project and the records fetched alongside it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub project: Project,
    #[serde(deserialize_with = "null_as_default")]
    pub resolved: Resolved,
    #[serde(deserialize_with = "null_as_default")]
    pub milestones: Vec<Milestone>,
    #[serde(deserialize_with = "null_as_default")]
    pub decisions: Vec<Decision>,
    #[serde(deserialize_with = "null_as_default")]
    pub attention_points: Vec<AttentionPoint>,
}

impl ProjectEntry {
    /// Mood code, preferring the resolved value.
    pub fn mood(&self) -> Option<&str> {
        non_empty(&self.resolved.mood).or_else(|| non_empty(&self.project.mood))
    }

    pub fn status(&self) -> Option<&str> {
        non_empty(&self.resolved.status).or_else(|| non_empty(&self.project.status))
    }

    pub fn risk(&self) -> Option<&str> {
        non_empty(&self.resolved.risk).or_else(|| non_empty(&self.project.risk))
    }

    pub fn completed_milestones(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter().filter(|m| m.is_done())
    }

    pub fn pending_decisions(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| d.is_pending())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: Option<String>,
    pub short_id: Option<String>,
    pub mood: Option<String>,
    pub status: Option<String>,
    pub risk: Option<String>,
    pub progress: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description_text: Option<String>,
    pub budget_capex_initial: Option<f64>,
    pub budget_capex_used: Option<f64>,
    pub budget_capex_landing: Option<f64>,
    /// Usually `{ "name": ... }`; other shapes are ignored.
    pub owner: serde_json::Value,
}

impl Project {
    pub fn name_or_unknown(&self) -> &str {
        non_empty(&self.name).unwrap_or("Unknown Project")
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(&self.description_text)
    }

    pub fn start_date(&self) -> Option<&str> {
        non_empty(&self.start_date)
    }

    pub fn end_date(&self) -> Option<&str> {
        non_empty(&self.end_date)
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.owner
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
    }
}

/// Values resolved against reference data; they override the raw project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resolved {
    pub mood: Option<String>,
    pub status: Option<String>,
    pub risk: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Milestone {
    pub name: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

impl Milestone {
    pub fn is_done(&self) -> bool {
        self.status.as_deref() == Some("done")
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Decision {
    pub title: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

impl Decision {
    /// A decision still needs action unless it was taken or its actions are done.
    pub fn is_pending(&self) -> bool {
        !matches!(self.status.as_deref(), Some("taken") | Some("actions-done"))
    }

    /// The title, or the name when no title is set.
    pub fn label(&self) -> Option<&str> {
        match &self.title {
            Some(title) => Some(title.as_str()).filter(|t| !t.is_empty()),
            None => non_empty(&self.name),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionPoint {
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "projects": [
            {
                "project": {
                    "name": "ERP Rollout",
                    "short_id": "P-12",
                    "mood": "issues",
                    "status": "in_progress",
                    "progress": 40,
                    "budget_capex_initial": 120000.0,
                    "owner": { "name": "Ada Lovelace" },
                    "unexpected": true
                },
                "resolved": { "mood": "good", "status": null },
                "milestones": [
                    { "name": "Kickoff", "status": "done" },
                    { "name": "Pilot", "status": "todo" }
                ],
                "decisions": null,
                "attention_points": [{ "title": "Vendor delay" }]
            },
            { "project": null }
        ],
        "reference_data": { "moods": [] }
    }"#;

    #[test]
    fn test_parse_sample() {
        let data = PortfolioData::from_json_str(SAMPLE).unwrap();
        assert_eq!(data.projects.len(), 2);

        let entry = &data.projects[0];
        assert_eq!(entry.project.name_or_unknown(), "ERP Rollout");
        assert_eq!(entry.mood(), Some("good"));
        assert_eq!(entry.status(), Some("in_progress"));
        assert_eq!(entry.project.progress, Some(40.0));
        assert_eq!(entry.project.owner_name(), Some("Ada Lovelace"));
        assert_eq!(entry.completed_milestones().count(), 1);
        assert!(entry.decisions.is_empty());

        let empty = &data.projects[1];
        assert_eq!(empty.project.name_or_unknown(), "Unknown Project");
        assert_eq!(empty.mood(), None);
    }

    #[test]
    fn test_decision_pending_and_label() {
        let taken = Decision {
            title: Some("Go live".to_string()),
            name: None,
            status: Some("taken".to_string()),
        };
        let open = Decision {
            title: None,
            name: Some("Budget increase".to_string()),
            status: Some("open".to_string()),
        };
        assert!(!taken.is_pending());
        assert!(open.is_pending());
        assert_eq!(open.label(), Some("Budget increase"));
        assert_eq!(taken.label(), Some("Go live"));
    }

    #[test]
    fn test_owner_not_an_object() {
        let project: Project = serde_json::from_str(r#"{ "owner": "someone" }"#).unwrap();
        assert_eq!(project.owner_name(), None);
    }

    #[test]
    fn test_invalid_json_is_data_error() {
        let err = PortfolioData::from_json_str("{ \"projects\": 5 }").unwrap_err();
        assert!(matches!(err, Error::DataError(_)));
    }
}
