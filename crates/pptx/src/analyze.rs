//! Template inspection: every shape of every slide with its position, for
//! updating the layout file after the template changes.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use chrono::NaiveDateTime;
use flashdeck_core::geometry::{emu_to_inches, round_to};
use flashdeck_core::{Error, Field, LayoutInfo, Position, Result, ShapeInfo, ShapeKind, Size, TemplateSlide};
use serde::Serialize;

use crate::deck::Deck;

const RULE_WIDTH: usize = 80;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub width_inches: f64,
    pub height_inches: f64,
    pub width_emu: i64,
    pub height_emu: i64,
}

/// One shape as exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeExport {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub position: Position,
    pub size: Size,
    pub has_text_frame: bool,
    pub is_placeholder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_count: Option<usize>,
}

impl ShapeExport {
    fn from_shape(shape: &ShapeInfo) -> Self {
        let (text_preview, paragraph_count) = if shape.has_text_frame {
            (
                Some(shape.text().chars().take(PREVIEW_CHARS).collect()),
                Some(shape.paragraphs.len()),
            )
        } else {
            (None, None)
        };
        Self {
            id: shape.id,
            name: shape.name.clone(),
            kind: shape.kind.label(),
            position: shape.position().rounded(2),
            size: shape.size().rounded(2),
            has_text_frame: shape.has_text_frame,
            is_placeholder: shape.is_placeholder,
            text_preview,
            paragraph_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideExport {
    /// 0-based, as used by the `template_slide` layout setting.
    pub index: usize,
    pub layout: Option<String>,
    /// Top-to-bottom, then left-to-right.
    pub shapes: Vec<ShapeExport>,
}

/// The structure of a template, printable or exportable as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateAnalysis {
    #[serde(rename = "_description")]
    pub description: String,
    #[serde(rename = "_template")]
    pub template: String,
    #[serde(rename = "_exported_at")]
    pub exported_at: String,
    #[serde(rename = "_dimensions")]
    pub dimensions: Option<Dimensions>,
    pub layouts: Vec<LayoutInfo>,
    pub slides: Vec<SlideExport>,
    #[serde(skip)]
    template_slide: usize,
}

impl TemplateAnalysis {
    pub fn analyze(path: &Path, template_slide: usize, exported_at: NaiveDateTime) -> Result<Self> {
        let deck = Deck::open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_deck(&deck, &name, template_slide, exported_at)
    }

    pub fn from_deck(
        deck: &Deck,
        template: &str,
        template_slide: usize,
        exported_at: NaiveDateTime,
    ) -> Result<Self> {
        let dimensions = deck.slide_size().map(|(cx, cy)| Dimensions {
            width_inches: round_to(emu_to_inches(cx), 2),
            height_inches: round_to(emu_to_inches(cy), 2),
            width_emu: cx,
            height_emu: cy,
        });

        let mut slides = Vec::with_capacity(deck.slide_count());
        for index in 0..deck.slide_count() {
            let mut slide: TemplateSlide = deck.parse_slide(index)?;
            slide.sort_by_position();
            slides.push(SlideExport {
                index,
                layout: slide.layout.clone(),
                shapes: slide.shapes.iter().map(ShapeExport::from_shape).collect(),
            });
        }

        Ok(Self {
            description: "Template shape positions extracted by flashdeck".to_string(),
            template: template.to_string(),
            exported_at: exported_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            dimensions,
            layouts: deck.layouts()?,
            slides,
            template_slide,
        })
    }

    pub fn shape_count(&self) -> usize {
        self.slides.iter().map(|s| s.shapes.len()).sum()
    }

    /// Pretty JSON, as written by `export-mapping`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::DataError(format!("Failed to serialize template analysis: {}", e)))
    }

    /// Human-readable report. `verbose` also lists shapes that are neither
    /// text nor pictures.
    pub fn report(&self, verbose: bool) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "─".repeat(RULE_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "{}\nTEMPLATE ANALYSIS\n{}", heavy, heavy);
        let _ = writeln!(out, "File: {}", self.template);
        if let Some(d) = &self.dimensions {
            let _ = writeln!(
                out,
                "Dimensions: {:.2}\" x {:.2}\" (inches)\n            {} x {} (EMU)",
                d.width_inches, d.height_inches, d.width_emu, d.height_emu
            );
        }
        let _ = writeln!(out, "Total slides: {}", self.slides.len());
        let _ = writeln!(out, "Total layouts: {}", self.layouts.len());

        let _ = writeln!(out, "\n{}\nAVAILABLE LAYOUTS:\n{}", light, light);
        for layout in &self.layouts {
            let _ = writeln!(out, "  [{}] {}", layout.index, layout.name);
        }

        let mut kind_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for slide in &self.slides {
            let _ = writeln!(out, "\n{}\nSLIDE {}\n{}", heavy, slide.index, heavy);
            let _ = writeln!(out, "Layout: {}", slide.layout.as_deref().unwrap_or("(unknown)"));
            let _ = writeln!(out, "Total shapes: {}", slide.shapes.len());
            for shape in &slide.shapes {
                *kind_counts.entry(shape.kind).or_default() += 1;
            }

            let text: Vec<&ShapeExport> = slide.shapes.iter().filter(|s| s.has_text_frame).collect();
            if !text.is_empty() {
                let _ = writeln!(out, "\n  TEXT SHAPES ({}):\n  {}", text.len(), "─".repeat(RULE_WIDTH - 4));
                for shape in text {
                    let mark = if shape.is_placeholder { " [PLACEHOLDER]" } else { "" };
                    let _ = writeln!(out, "  ▸ {}{}", shape.name, mark);
                    let _ = writeln!(out, "    Position: ({}, {}) inches", shape.position.x, shape.position.y);
                    let _ = writeln!(out, "    Size: {}\" x {}\"", shape.size.width, shape.size.height);
                    let _ = writeln!(out, "    Text: \"{}\"\n", preview_line(shape, 60));
                }
            }

            let pictures: Vec<&ShapeExport> = slide
                .shapes
                .iter()
                .filter(|s| !s.has_text_frame && s.kind == ShapeKind::Picture.label())
                .collect();
            if !pictures.is_empty() {
                let _ = writeln!(out, "\n  IMAGE SHAPES ({}):\n  {}", pictures.len(), "─".repeat(RULE_WIDTH - 4));
                for shape in pictures {
                    let _ = writeln!(out, "  ▸ {}", shape.name);
                    let _ = writeln!(
                        out,
                        "    Position: ({}, {}) | Size: {}\" x {}\"",
                        shape.position.x, shape.position.y, shape.size.width, shape.size.height
                    );
                }
            }

            if verbose {
                let others: Vec<&ShapeExport> = slide
                    .shapes
                    .iter()
                    .filter(|s| !s.has_text_frame && s.kind != ShapeKind::Picture.label())
                    .collect();
                if !others.is_empty() {
                    let _ = writeln!(out, "\n  OTHER SHAPES ({}):\n  {}", others.len(), "─".repeat(RULE_WIDTH - 4));
                    for shape in others {
                        let _ = writeln!(out, "  ▸ {} ({})", shape.name, shape.kind);
                        let _ = writeln!(
                            out,
                            "    Position: ({}, {}) | Size: {}\" x {}\"",
                            shape.position.x, shape.position.y, shape.size.width, shape.size.height
                        );
                    }
                }
            }
        }

        let _ = writeln!(out, "\n{}\nSUMMARY\n{}", heavy, heavy);
        let _ = writeln!(out, "\nShape type distribution:");
        let mut counts: Vec<(&str, usize)> = kind_counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        for (kind, count) in counts {
            let _ = writeln!(out, "  {}: {}", kind, count);
        }
        let text_total: usize = self
            .slides
            .iter()
            .map(|s| s.shapes.iter().filter(|sh| sh.has_text_frame).count())
            .sum();
        let _ = writeln!(out, "\nTotal text shapes: {}", text_total);

        if let Some(slide) = self.slides.get(self.template_slide) {
            let text: Vec<&ShapeExport> = slide.shapes.iter().filter(|s| s.has_text_frame).collect();

            let _ = writeln!(out, "\n{}\nSUGGESTED FIELD POSITIONS (layout file \"fields\")\n{}", heavy, heavy);
            for shape in &text {
                if let Some(field) = guess_field(shape.text_preview.as_deref().unwrap_or(""), &shape.name) {
                    let _ = writeln!(
                        out,
                        "  \"{}\": {{ \"expected\": {{ \"x\": {}, \"y\": {} }} }},",
                        field, shape.position.x, shape.position.y
                    );
                }
            }

            let _ = writeln!(out, "\n{}\nFIELD MAPPING SUGGESTIONS (slide {})\n{}", heavy, slide.index, heavy);
            for shape in &text {
                let text = shape.text_preview.as_deref().unwrap_or("");
                let guess = match guess_field(text, &shape.name) {
                    Some(field) => field.as_str().to_uppercase(),
                    None if is_placeholder_text(text) => "PLACEHOLDER (needs content)".to_string(),
                    None => "unknown".to_string(),
                };
                let _ = writeln!(out, "  Position ({}, {}): {}", shape.position.x, shape.position.y, guess);
                let _ = writeln!(out, "    Shape: {}", shape.name);
                let _ = writeln!(out, "    Current text: \"{}\"", preview_line(shape, 50));
                let _ = writeln!(out, "    Size: {}\" x {}\"\n", shape.size.width, shape.size.height);
            }
        }

        let _ = writeln!(out, "{}\nEND OF ANALYSIS\n{}", heavy, heavy);
        out
    }

    /// One line per slide: index, layout and text shape count.
    pub fn slide_summary(&self) -> Vec<String> {
        self.slides
            .iter()
            .map(|slide| {
                format!(
                    "Slide {} ({}): {} text shapes",
                    slide.index,
                    slide.layout.as_deref().unwrap_or("unknown"),
                    slide.shapes.iter().filter(|s| s.has_text_frame).count()
                )
            })
            .collect()
    }
}

fn preview_line(shape: &ShapeExport, max: usize) -> String {
    let text = shape.text_preview.as_deref().unwrap_or("");
    if text.is_empty() {
        return "(empty)".to_string();
    }
    let line: String = text.chars().map(|c| if c == '\n' { '↵' } else { c }).collect();
    if line.chars().count() > max {
        format!("{}...", line.chars().take(max).collect::<String>())
    } else {
        line
    }
}

fn is_placeholder_text(text: &str) -> bool {
    text.is_empty() || text.to_lowercase().contains("xxx")
}

/// Field a shape probably holds, from its current text and name.
pub fn guess_field(text: &str, name: &str) -> Option<Field> {
    let text = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if has(&["project review"]) || name.to_lowercase().contains("title") {
        Some(Field::Title)
    } else if has(&["dd/mm", "date"]) {
        Some(Field::Date)
    } else if has(&["status", "mood"]) {
        Some(Field::MoodStatus)
    } else if has(&["scope", "milestone"]) {
        Some(Field::Scope)
    } else if has(&["description", "benefit"]) {
        Some(Field::Achievements)
    } else if has(&["trend", "progress"]) {
        Some(Field::Trends)
    } else if has(&["next", "step"]) {
        Some(Field::NextSteps)
    } else if has(&["made", "done", "completed"]) {
        Some(Field::Made)
    } else if has(&["risk", "issue"]) {
        Some(Field::Risks)
    } else if has(&["budget", "bac", "eac"]) {
        Some(Field::Budget)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashdeck_core::Rect;

    fn export(name: &str, text: &str, kind: ShapeKind) -> ShapeExport {
        let mut shape = ShapeInfo::new(kind, 0);
        shape.name = name.to_string();
        shape.bounds = Rect::from_inches(0.39, 0.17, 7.99, 0.43);
        shape.has_text_frame = kind == ShapeKind::Shape;
        if shape.has_text_frame {
            shape.paragraphs.push(flashdeck_core::ParagraphInfo {
                text: text.to_string(),
                ..Default::default()
            });
        }
        ShapeExport::from_shape(&shape)
    }

    #[test]
    fn test_guess_field() {
        assert_eq!(guess_field("Project review : xxx", "TextBox 5"), Some(Field::Title));
        assert_eq!(guess_field("dd/mm/yyyy", "Google Shape;12"), Some(Field::Date));
        assert_eq!(guess_field("Status: ok", "x"), Some(Field::MoodStatus));
        assert_eq!(guess_field("BAC: 0", "x"), Some(Field::Budget));
        assert_eq!(guess_field("xxx", "x"), None);
        assert!(is_placeholder_text("xxx"));
        assert!(is_placeholder_text(""));
    }

    #[test]
    fn test_shape_export_fields() {
        let shape = export("TextBox 5", "Project review :\nline", ShapeKind::Shape);
        assert_eq!(shape.kind, "Shape");
        assert_eq!(shape.position, Position::new(0.39, 0.17));
        assert_eq!(shape.size, Size::new(7.99, 0.43));
        assert_eq!(shape.text_preview.as_deref(), Some("Project review :\nline"));
        assert_eq!(shape.paragraph_count, Some(1));
        assert_eq!(preview_line(&shape, 60), "Project review :↵line");
        assert_eq!(preview_line(&shape, 7), "Project...");

        let picture = export("Logo", "", ShapeKind::Picture);
        assert_eq!(picture.text_preview, None);
        let json = serde_json::to_value(&picture).unwrap();
        assert_eq!(json["type"], "Picture");
        assert!(json.get("text_preview").is_none());
    }
}
