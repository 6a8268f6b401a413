//! The two generated slides: the portfolio summary table and Data Notes.

use chrono::{NaiveDate, NaiveDateTime};
use flashdeck_core::content::{group_notes, API_LIMITATIONS};
use flashdeck_core::format::DATE_FORMAT;
use flashdeck_core::{summary_rows, DataNote, ProjectEntry, TextStyle};

use crate::render::{ParagraphSpec, TextBox};

const HEADING_COLOR: &str = "003366";
const SUBTITLE_COLOR: &str = "666666";
const SECTION_COLOR: &str = "993300";
const FOOTER_COLOR: &str = "999999";

const COLUMN_X: [f64; 5] = [0.3, 1.0, 3.8, 5.8, 7.5];
const COLUMN_WIDTHS: [f64; 5] = [0.7, 2.8, 1.8, 1.5, 1.3];
const HEADERS: [&str; 5] = ["ID", "Projet", "Status", "Mood", "Owner"];
const HEADER_Y: f64 = 1.1;
const ROW_HEIGHT: f64 = 0.28;

const MAX_NOTE_PROJECTS: usize = 6;
const MAX_NOTES_PER_PROJECT: usize = 3;

fn sized(points: u32) -> TextStyle {
    TextStyle::default().with_size_points(points)
}

fn colored(points: u32, color: &str) -> TextStyle {
    TextStyle {
        color: Some(color.to_string()),
        ..sized(points)
    }
}

fn bold(style: TextStyle) -> TextStyle {
    TextStyle {
        bold: Some(true),
        ..style
    }
}

fn italic(style: TextStyle) -> TextStyle {
    TextStyle {
        italic: Some(true),
        ..style
    }
}

fn text_box(x: f64, y: f64, width: f64, height: f64, text: impl Into<String>, style: TextStyle) -> TextBox {
    TextBox::new(x, y, width, height, ParagraphSpec::new(text, style))
}

fn page_title(title: &str) -> TextBox {
    text_box(0.4, 0.15, 9.0, 0.4, title, bold(colored(20, HEADING_COLOR)))
}

/// Text boxes of the portfolio summary slide.
pub fn summary_boxes(projects: &[ProjectEntry], max_rows: usize, today: NaiveDate) -> Vec<TextBox> {
    let mut boxes = vec![
        page_title("Portfolio Flash Report"),
        text_box(
            0.4,
            0.5,
            9.0,
            0.25,
            format!("Projets Vitaux CODIR - {}", today.format(DATE_FORMAT)),
            colored(11, SUBTITLE_COLOR),
        ),
        text_box(0.4, 0.8, 9.0, 0.25, format!("{} projets", projects.len()), italic(sized(10))),
    ];

    for (col, header) in HEADERS.iter().enumerate() {
        boxes.push(text_box(
            COLUMN_X[col],
            HEADER_Y,
            COLUMN_WIDTHS[col],
            0.25,
            *header,
            bold(colored(8, HEADING_COLOR)),
        ));
    }

    let (rows, overflow) = summary_rows(projects, max_rows);
    let mut row_y = HEADER_Y + ROW_HEIGHT;
    for row in rows {
        let status_style = match &row.status_color {
            Some(color) => colored(7, color),
            None => sized(7),
        };
        let mood_style = match &row.mood_color {
            Some(color) => bold(colored(7, color)),
            None => sized(7),
        };
        let cells = [
            (row.short_id, bold(sized(7))),
            (row.name, sized(7)),
            (row.status, status_style),
            (row.mood, mood_style),
            (row.owner, sized(7)),
        ];
        for (col, (text, style)) in cells.into_iter().enumerate() {
            boxes.push(text_box(COLUMN_X[col], row_y, COLUMN_WIDTHS[col], ROW_HEIGHT, text, style));
        }
        row_y += ROW_HEIGHT;
    }

    if overflow > 0 {
        boxes.push(text_box(
            0.3,
            row_y + 0.05,
            9.0,
            0.2,
            format!("... et {} autres projets", overflow),
            italic(sized(7)),
        ));
    }
    boxes
}

/// Text boxes of the Data Notes slide.
pub fn data_notes_boxes(notes: &[DataNote], generated_at: NaiveDateTime) -> Vec<TextBox> {
    let section = |y: f64, title: &str| text_box(0.4, y, 9.0, 0.25, title, bold(colored(9, SECTION_COLOR)));

    let mut boxes = vec![
        page_title("Data Notes"),
        text_box(
            0.4,
            0.5,
            9.0,
            0.25,
            "Champs non remplis / Fields not populated",
            colored(10, SUBTITLE_COLOR),
        ),
    ];

    let section_y = 0.85;
    boxes.push(section(section_y, "Limitations API connues:"));
    let mut row_y = section_y + 0.28;
    for (field, reason) in API_LIMITATIONS {
        boxes.push(text_box(0.5, row_y, 9.0, 0.2, format!("• {}: {}", field, reason), sized(7)));
        row_y += 0.2;
    }

    if !notes.is_empty() {
        row_y += 0.15;
        boxes.push(section(row_y, "Champs manquants par projet:"));
        row_y += 0.28;

        for (project, lines) in group_notes(notes, MAX_NOTE_PROJECTS, MAX_NOTES_PER_PROJECT) {
            boxes.push(text_box(0.5, row_y, 9.0, 0.18, format!("{}:", project), bold(sized(7))));
            row_y += 0.18;
            for line in lines {
                boxes.push(text_box(0.7, row_y, 8.5, 0.16, format!("- {}", line), sized(6)));
                row_y += 0.16;
            }
            row_y += 0.08;
        }
    }

    boxes.push(text_box(
        0.4,
        5.2,
        9.0,
        0.2,
        format!(
            "Generated: {} | Source: AirSaas API",
            generated_at.format("%Y-%m-%d %H:%M")
        ),
        italic(colored(6, FOOTER_COLOR)),
    ));
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashdeck_core::PortfolioData;

    fn projects(count: usize) -> Vec<ProjectEntry> {
        let entries: Vec<String> = (0..count)
            .map(|i| {
                format!(
                    r#"{{ "project": {{ "name": "Project {i}", "short_id": "P{i}", "mood": "good", "status": "in_progress", "owner": {{ "name": "Grace Hopper" }} }} }}"#
                )
            })
            .collect();
        let json = format!(r#"{{ "projects": [{}] }}"#, entries.join(","));
        PortfolioData::from_json_str(&json).unwrap().projects
    }

    fn texts(boxes: &[TextBox]) -> Vec<String> {
        boxes.iter().map(|b| b.body.text()).collect()
    }

    #[test]
    fn test_summary_header_and_rows() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let boxes = summary_boxes(&projects(2), 14, today);
        let texts = texts(&boxes);
        assert_eq!(texts[0], "Portfolio Flash Report");
        assert_eq!(texts[1], "Projets Vitaux CODIR - 07/03/2025");
        assert_eq!(texts[2], "2 projets");
        assert_eq!(&texts[3..8], &["ID", "Projet", "Status", "Mood", "Owner"]);
        assert_eq!(boxes.len(), 3 + 5 + 2 * 5);
        assert_eq!(texts[8], "P0");
        assert_eq!(texts[12], "Grace");
        assert!(!texts.iter().any(|t| t.contains("autres projets")));

        let id_style = &boxes[8].body.paragraphs[0].style;
        assert_eq!(id_style.bold, Some(true));
        assert_eq!(id_style.size, Some(700));
    }

    #[test]
    fn test_summary_overflow_line() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let boxes = summary_boxes(&projects(16), 14, today);
        assert_eq!(boxes.len(), 3 + 5 + 14 * 5 + 1);
        let last = boxes.last().unwrap();
        assert_eq!(last.body.text(), "... et 2 autres projets");
        assert_eq!(last.body.paragraphs[0].style.italic, Some(true));
    }

    #[test]
    fn test_data_notes_grouping_and_footer() {
        let note = |project: &str, field: &str| DataNote {
            project: project.to_string(),
            field: field.to_string(),
            reason: "Non renseigné".to_string(),
        };
        let notes: Vec<DataNote> = (0..8)
            .flat_map(|i| {
                let project = format!("Project {}", i);
                vec![
                    note(&project, "Description"),
                    note(&project, "End date"),
                    note(&project, "Budget"),
                    note(&project, "Owner"),
                ]
            })
            .collect();
        let generated_at = NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        let boxes = data_notes_boxes(&notes, generated_at);
        let texts = texts(&boxes);

        assert_eq!(texts[0], "Data Notes");
        assert_eq!(texts[2], "Limitations API connues:");
        assert!(texts[3].starts_with("• Mood comment: "));
        assert_eq!(texts[6], "Champs manquants par projet:");
        assert_eq!(texts.iter().filter(|t| t.ends_with(':') && t.starts_with("Project")).count(), 6);
        assert_eq!(texts.iter().filter(|t| t.starts_with("- ")).count(), 18);
        assert!(!texts.iter().any(|t| t.contains("Owner")));
        assert_eq!(
            texts.last().map(String::as_str),
            Some("Generated: 2025-03-07 09:05 | Source: AirSaas API")
        );
    }

    #[test]
    fn test_data_notes_without_missing_fields() {
        let generated_at = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let boxes = data_notes_boxes(&[], generated_at);
        assert_eq!(boxes.len(), 2 + 1 + API_LIMITATIONS.len() + 1);
    }
}
