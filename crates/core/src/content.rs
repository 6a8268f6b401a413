//! What goes into each field of a project slide.
//!
//! Content is decided here as plain data; the pptx crate turns it into
//! DrawingML.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::fitting::{fit_items, fit_text, truncate_text};
use crate::format::{
    format_amount, format_date, format_progress, humanize_status, mood_color, mood_label,
    owner_short, split_sentences, status_color, DATE_FORMAT,
};
use crate::layout::{Field, TemplateLayout};
use crate::model::{Project, ProjectEntry};
use crate::styles::StyleRole;

/// Text written into one box.
#[derive(Debug, Clone, PartialEq)]
pub enum TextBlock {
    /// One paragraph; `\n` becomes a soft line break.
    Plain(String),
    /// An optional heading paragraph, blank padding paragraphs, then one
    /// paragraph per item.
    Structured {
        title: Option<String>,
        padding_lines: usize,
        items: Vec<String>,
        bullets: bool,
    },
}

impl TextBlock {
    /// Plain text view, one line per paragraph.
    pub fn to_plain_text(&self) -> String {
        match self {
            TextBlock::Plain(text) => text.clone(),
            TextBlock::Structured {
                title,
                padding_lines,
                items,
                ..
            } => {
                let mut lines: Vec<&str> = Vec::new();
                if let Some(title) = title {
                    lines.push(title);
                }
                lines.extend(std::iter::repeat("").take(*padding_lines));
                lines.extend(items.iter().map(String::as_str));
                lines.join("\n")
            }
        }
    }
}

/// Content of one field on a project slide.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldContent {
    pub field: Field,
    pub role: StyleRole,
    /// Font size in points; `None` keeps the role's size.
    pub font_size: Option<u32>,
    pub block: TextBlock,
}

impl FieldContent {
    fn plain(field: Field, role: StyleRole, font_size: u32, text: String) -> Self {
        Self {
            field,
            role,
            font_size: Some(font_size),
            block: TextBlock::Plain(text),
        }
    }

    fn list(field: Field, font_size: u32, title: Option<&str>, padding: usize, items: Vec<String>) -> Self {
        Self {
            field,
            role: StyleRole::Content,
            font_size: Some(font_size),
            block: TextBlock::Structured {
                title: title.map(str::to_string),
                padding_lines: padding,
                items,
                bullets: true,
            },
        }
    }
}

/// Content for every field of a project's slide, in field order.
pub fn project_slide_content(
    entry: &ProjectEntry,
    layout: &TemplateLayout,
    today: NaiveDate,
) -> Vec<FieldContent> {
    let project = &entry.project;
    let body_size = layout.font_scale.normal;
    let limits = |field: Field| layout.limits(field);

    let title = format!("Project review : {}", truncate_text(project.name_or_unknown(), 60));
    let title = fit_text(&title, limits(Field::Title), layout.font_scale).text;

    let status = entry.status().map(|s| truncate_text(s, 40));
    let mood = entry.mood().map(|m| truncate_text(m, 40));
    let comment = format!(
        "Status: {}\nMood: {}",
        status.as_deref().unwrap_or("N/A"),
        mood.as_deref().unwrap_or("N/A")
    );
    let mood_status = fit_text(&comment, limits(Field::MoodStatus), layout.font_scale);

    let mut contents = vec![
        FieldContent::plain(Field::Title, StyleRole::Title, layout.title_font_size, title),
        FieldContent::plain(
            Field::Date,
            StyleRole::Date,
            layout.date_font_size,
            today.format(DATE_FORMAT).to_string(),
        ),
        FieldContent::plain(
            Field::MoodStatus,
            StyleRole::Status,
            mood_status.font_size,
            mood_status.text,
        ),
    ];

    // Scope is never capped.
    contents.push(FieldContent::list(Field::Scope, body_size, None, 1, scope_items(entry, today)));
    contents.push(FieldContent::plain(Field::Info, StyleRole::Content, body_size, String::new()));
    contents.push(FieldContent::list(
        Field::Achievements,
        body_size,
        None,
        0,
        fit_items(&achievement_items(project), limits(Field::Achievements), 0),
    ));
    contents.push(FieldContent::plain(Field::Trends, StyleRole::Content, body_size, String::new()));
    contents.push(FieldContent::list(
        Field::NextSteps,
        body_size,
        None,
        0,
        fit_items(&next_step_items(entry), limits(Field::NextSteps), 0),
    ));
    contents.push(FieldContent::list(
        Field::Made,
        body_size,
        Some("Made :"),
        0,
        fit_items(&made_items(entry), limits(Field::Made), 1),
    ));
    contents.push(FieldContent::list(
        Field::Risks,
        body_size,
        None,
        0,
        fit_items(&risk_items(entry), limits(Field::Risks), 0),
    ));
    contents.push(FieldContent::list(
        Field::Budget,
        body_size,
        Some("Build"),
        0,
        fit_items(&budget_items(project), limits(Field::Budget), 1),
    ));

    contents
}

fn scope_items(entry: &ProjectEntry, today: NaiveDate) -> Vec<String> {
    let project = &entry.project;
    let done = entry.completed_milestones().count();
    let mut items = vec![
        format!("Milestones: {}/{}", done, entry.milestones.len()),
        format!("Progress: {}%", format_progress(project.progress.unwrap_or(0.0))),
    ];
    if let Some(start) = project.start_date() {
        items.push(format!("Start: {}", format_date(start, today)));
    }
    if let Some(end) = project.end_date() {
        items.push(format!("End: {}", format_date(end, today)));
    }
    items
}

fn achievement_items(project: &Project) -> Vec<String> {
    match project.description() {
        Some(desc) => {
            let sentences = split_sentences(desc);
            if sentences.is_empty() {
                vec![truncate_text(desc, 180)]
            } else {
                sentences
            }
        }
        None => vec!["No description available".to_string()],
    }
}

fn next_step_items(entry: &ProjectEntry) -> Vec<String> {
    let pending: Vec<_> = entry.pending_decisions().collect();
    let labels: Vec<&str> = if !pending.is_empty() {
        pending.iter().take(3).filter_map(|d| d.label()).collect()
    } else if !entry.decisions.is_empty() {
        entry.decisions.iter().take(3).filter_map(|d| d.label()).collect()
    } else {
        entry
            .milestones
            .iter()
            .filter(|m| !m.is_done())
            .take(3)
            .filter_map(|m| m.name())
            .collect()
    };

    let items: Vec<String> = labels.into_iter().map(|l| truncate_text(l, 45)).collect();
    if items.is_empty() {
        vec!["No pending decisions or milestones".to_string()]
    } else {
        items
    }
}

fn made_items(entry: &ProjectEntry) -> Vec<String> {
    let items: Vec<String> = entry
        .completed_milestones()
        .take(4)
        .filter_map(|m| m.name())
        .map(|name| truncate_text(name, 40))
        .collect();
    if items.is_empty() {
        vec!["No completed milestones yet".to_string()]
    } else {
        items
    }
}

fn risk_items(entry: &ProjectEntry) -> Vec<String> {
    let mut items = vec![format!(
        "Risk Level: {}",
        truncate_text(entry.risk().unwrap_or("Not set"), 35)
    )];
    items.extend(
        entry
            .attention_points
            .iter()
            .take(2)
            .filter_map(|ap| ap.title.as_deref().filter(|t| !t.is_empty()))
            .map(|title| truncate_text(title, 40)),
    );
    items
}

fn budget_items(project: &Project) -> Vec<String> {
    let line = |label: &str, value: Option<f64>| match value {
        Some(v) => format!("{}: {}", label, format_amount(v)),
        None => format!("{}: N/A", label),
    };
    vec![
        line("BAC", project.budget_capex_initial),
        line("Actual", project.budget_capex_used),
        line("EAC", project.budget_capex_landing),
    ]
}

/// A field the source data left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataNote {
    pub project: String,
    pub field: String,
    pub reason: String,
}

/// Fields of `project` the Data Notes slide reports as missing.
pub fn unfilled_fields(project: &Project) -> Vec<DataNote> {
    let name = project
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or("Unknown");
    let note = |field: &str, reason: &str| DataNote {
        project: name.to_string(),
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let mut notes = Vec::new();
    if project.description().is_none() {
        notes.push(note("Description", "Non renseigné"));
    }
    if project.end_date().is_none() {
        notes.push(note("End date", "Non renseigné"));
    }
    if project.budget_capex_initial.is_none() && project.budget_capex_used.is_none() {
        notes.push(note("Budget", "Non renseigné dans AirSaas"));
    }
    notes
}

/// Fields the source API never provides.
pub const API_LIMITATIONS: [(&str, &str); 3] = [
    (
        "Mood comment",
        "L'API retourne uniquement le code du mood, pas le commentaire",
    ),
    ("Deployment area", "Champ non disponible dans l'API AirSaas"),
    ("End users (actual/target)", "Champ non disponible dans l'API AirSaas"),
];

/// Notes grouped by project in first-seen order, at most `max_projects`
/// projects and `max_notes` notes each.
pub fn group_notes(
    notes: &[DataNote],
    max_projects: usize,
    max_notes: usize,
) -> Vec<(String, Vec<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for note in notes {
        let entry = grouped.entry(note.project.clone()).or_insert_with(|| {
            order.push(note.project.clone());
            Vec::new()
        });
        entry.push(format!("{}: {}", note.field, note.reason));
    }

    order
        .into_iter()
        .take(max_projects)
        .map(|project| {
            let mut lines = grouped.remove(&project).unwrap_or_default();
            lines.truncate(max_notes);
            (project, lines)
        })
        .collect()
}

/// One line of the portfolio summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub short_id: String,
    pub name: String,
    pub status: String,
    pub status_color: Option<String>,
    pub mood: String,
    pub mood_color: Option<String>,
    pub owner: String,
}

impl SummaryRow {
    pub fn from_entry(entry: &ProjectEntry) -> Self {
        let project = &entry.project;
        let full_name = project.name.as_deref().unwrap_or("Unknown");
        let mut name: String = full_name.chars().take(35).collect();
        if full_name.chars().count() > 35 {
            name.push_str("...");
        }

        let status = entry.status();
        let mood = entry.mood();
        Self {
            short_id: project.short_id.clone().unwrap_or_default(),
            name,
            status: status.map(humanize_status).unwrap_or_else(|| "-".to_string()),
            status_color: status.and_then(status_color).map(str::to_string),
            mood: mood.map(|m| mood_label(m).to_string()).unwrap_or_else(|| "-".to_string()),
            mood_color: mood.and_then(mood_color).map(str::to_string),
            owner: owner_short(project.owner_name()),
        }
    }
}

/// Summary rows for the first `max_rows` projects and the number left out.
pub fn summary_rows(projects: &[ProjectEntry], max_rows: usize) -> (Vec<SummaryRow>, usize) {
    let rows = projects
        .iter()
        .take(max_rows)
        .map(SummaryRow::from_entry)
        .collect();
    (rows, projects.len().saturating_sub(max_rows))
}
