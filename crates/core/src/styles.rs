//! Template style extraction.
//!
//! Generated text takes its typography from the template itself: the shapes
//! at known positions are sampled once, and every paragraph written later is
//! styled from the resulting sheet.

use serde::{Deserialize, Serialize};

use crate::geometry::{points_to_hundredths, Position};
use crate::types::{ParagraphInfo, RunStyle, ShapeInfo, TemplateSlide};

/// The typographic role of a generated paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleRole {
    Title,
    Date,
    Status,
    /// The heading paragraph inside a content box ("Build", "Made :").
    InlineTitle,
    Content,
}

/// Run properties applied to a paragraph. Unset properties are inherited
/// from the template's list styles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_name: Option<String>,
    /// Size in hundredths of a point.
    pub size: Option<u32>,
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

impl TextStyle {
    /// A role counts as sampled once a size was found.
    fn is_sampled(&self) -> bool {
        self.size.is_some()
    }

    /// Take every property the run defines.
    fn merge_run(&mut self, run: &RunStyle) {
        if run.size.is_some() {
            self.size = run.size;
        }
        if run.font_name.is_some() {
            self.font_name = run.font_name.clone();
        }
        if run.bold.is_some() {
            self.bold = run.bold;
        }
        if run.italic.is_some() {
            self.italic = run.italic;
        }
        if run.color.is_some() {
            self.color = run.color.clone();
        }
    }

    fn sample(&mut self, paragraph: &ParagraphInfo) {
        if self.is_sampled() {
            return;
        }
        if let Some(run) = &paragraph.run_style {
            self.merge_run(run);
        }
    }

    /// This style with its size replaced by `points`.
    pub fn with_size_points(&self, points: u32) -> TextStyle {
        TextStyle {
            size: Some(points_to_hundredths(f64::from(points))),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletStyle {
    pub char: String,
    pub color: String,
}

/// Where each role is sampled from on the template slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleRules {
    pub title: Option<Position>,
    pub date: Option<Position>,
    pub status: Option<Position>,
    pub inline_title: Vec<Position>,
    /// Shapes whose top edge is at one of these y values hold content.
    pub content_y: Vec<f64>,
    /// Bullet colours never taken as the template bullet colour.
    pub bullet_skip_colors: Vec<String>,
    /// Per-axis window (inches) around a rule position.
    pub match_window: f64,
}

impl Default for StyleRules {
    fn default() -> Self {
        Self {
            title: Some(Position::new(0.39, 0.17)),
            date: Some(Position::new(8.88, 0.08)),
            status: Some(Position::new(0.39, 0.98)),
            inline_title: vec![Position::new(5.14, 1.0), Position::new(5.13, 4.4)],
            content_y: vec![1.93, 3.16, 4.53, 2.48],
            bullet_skip_colors: vec!["000000".to_string(), "FFFFFF".to_string()],
            match_window: 0.1,
        }
    }
}

impl StyleRules {
    fn near(&self, a: Position, b: Position) -> bool {
        (a.x - b.x).abs() < self.match_window && (a.y - b.y).abs() < self.match_window
    }

    /// Role of a shape by position. Single-role positions win over inline titles.
    fn role_at(&self, position: Position) -> Option<StyleRole> {
        let single = [
            (self.title, StyleRole::Title),
            (self.date, StyleRole::Date),
            (self.status, StyleRole::Status),
        ];
        for (rule, role) in single {
            if let Some(rule) = rule {
                if self.near(position, rule) {
                    return Some(role);
                }
            }
        }
        if self.inline_title.iter().any(|p| self.near(position, *p)) {
            return Some(StyleRole::InlineTitle);
        }
        None
    }

    fn is_content_row(&self, y: f64) -> bool {
        self.content_y.iter().any(|cy| (y - cy).abs() < self.match_window)
    }

    fn skips_color(&self, color: &str) -> bool {
        self.bullet_skip_colors
            .iter()
            .any(|skip| skip.eq_ignore_ascii_case(color))
    }
}

/// Values used when the template does not provide a style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
    pub font_name: String,
    pub font_size_pt: u32,
    pub font_color: String,
    pub bullet_char: String,
    pub bullet_color: String,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            font_name: "Lato".to_string(),
            font_size_pt: 9,
            font_color: "000000".to_string(),
            bullet_char: "▪".to_string(),
            bullet_color: "D32427".to_string(),
        }
    }
}

/// Styles sampled from the template slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub title: TextStyle,
    pub date: TextStyle,
    pub status: TextStyle,
    pub inline_title: TextStyle,
    pub content: TextStyle,
    pub bullet: BulletStyle,
}

impl StyleSheet {
    /// A sheet holding only the defaults.
    pub fn from_defaults(defaults: &StyleDefaults) -> Self {
        let mut sheet = Self {
            title: TextStyle::default(),
            date: TextStyle::default(),
            status: TextStyle::default(),
            inline_title: TextStyle::default(),
            content: TextStyle::default(),
            bullet: BulletStyle {
                char: defaults.bullet_char.clone(),
                color: defaults.bullet_color.clone(),
            },
        };
        sheet.fill_content_defaults(defaults);
        sheet
    }

    /// Sample the styles of `slide`.
    ///
    /// Each role is taken from the first paragraph that carries a font size;
    /// the bullet character and colour come from the first paragraphs
    /// defining them anywhere on the slide.
    pub fn extract(slide: &TemplateSlide, rules: &StyleRules, defaults: &StyleDefaults) -> Self {
        let mut sheet = Self {
            title: TextStyle::default(),
            date: TextStyle::default(),
            status: TextStyle::default(),
            inline_title: TextStyle::default(),
            content: TextStyle::default(),
            bullet: BulletStyle {
                char: String::new(),
                color: String::new(),
            },
        };
        let mut bullet_char: Option<String> = None;
        let mut bullet_color: Option<String> = None;

        for shape in slide.text_shapes() {
            let role = rules.role_at(shape.position());
            let content_row = rules.is_content_row(shape.position().y);

            for (idx, paragraph) in shape.paragraphs.iter().enumerate() {
                if bullet_char.is_none() {
                    bullet_char = paragraph.bullet_char.clone().filter(|c| !c.is_empty());
                }
                if bullet_color.is_none() {
                    bullet_color = paragraph
                        .bullet_color
                        .clone()
                        .filter(|c| !rules.skips_color(c));
                }
                sheet.sample_paragraph(shape, role, content_row, idx, paragraph);
            }
        }

        sheet.bullet = BulletStyle {
            char: bullet_char.unwrap_or_else(|| defaults.bullet_char.clone()),
            color: bullet_color.unwrap_or_else(|| defaults.bullet_color.clone()),
        };
        sheet.fill_content_defaults(defaults);

        log::debug!(
            "Template styles: content {:?} {:?}pt #{:?}, bullet '{}' #{}",
            sheet.content.font_name,
            sheet.content.size.map(|s| s / 100),
            sheet.content.color,
            sheet.bullet.char,
            sheet.bullet.color
        );
        sheet
    }

    fn sample_paragraph(
        &mut self,
        shape: &ShapeInfo,
        role: Option<StyleRole>,
        content_row: bool,
        idx: usize,
        paragraph: &ParagraphInfo,
    ) {
        match role {
            Some(StyleRole::Title) => self.title.sample(paragraph),
            Some(StyleRole::Date) => self.date.sample(paragraph),
            Some(StyleRole::Status) => self.status.sample(paragraph),
            Some(StyleRole::InlineTitle) if idx == 0 => self.inline_title.sample(paragraph),
            Some(StyleRole::InlineTitle) | Some(StyleRole::Content) => {
                self.content.sample(paragraph)
            }
            None if content_row => self.content.sample(paragraph),
            None => {
                log::trace!("shape '{}' carries no sampled style", shape.name);
            }
        }
    }

    fn fill_content_defaults(&mut self, defaults: &StyleDefaults) {
        if self.content.font_name.is_none() {
            self.content.font_name = Some(defaults.font_name.clone());
        }
        if self.content.color.is_none() {
            self.content.color = Some(defaults.font_color.clone());
        }
    }

    pub fn role(&self, role: StyleRole) -> &TextStyle {
        match role {
            StyleRole::Title => &self.title,
            StyleRole::Date => &self.date,
            StyleRole::Status => &self.status,
            StyleRole::InlineTitle => &self.inline_title,
            StyleRole::Content => &self.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::types::ShapeKind;

    fn run(font: &str, size: u32, color: &str, bold: bool) -> RunStyle {
        RunStyle {
            font_name: Some(font.to_string()),
            size: Some(size),
            color: Some(color.to_string()),
            bold: Some(bold),
            italic: None,
        }
    }

    fn shape(index: usize, x: f64, y: f64, paragraphs: Vec<ParagraphInfo>) -> ShapeInfo {
        let mut shape = ShapeInfo::new(ShapeKind::Shape, index);
        shape.id = index as u32 + 2;
        shape.name = format!("Shape {}", index);
        shape.bounds = Rect::from_inches(x, y, 4.0, 1.0);
        shape.has_text_frame = true;
        shape.paragraphs = paragraphs;
        shape
    }

    fn para(text: &str, style: Option<RunStyle>) -> ParagraphInfo {
        ParagraphInfo {
            text: text.to_string(),
            run_style: style,
            ..Default::default()
        }
    }

    fn template() -> TemplateSlide {
        let mut slide = TemplateSlide::new(1);
        slide.add_shape(shape(
            0,
            0.39,
            0.17,
            vec![para("Project review :", Some(run("Lato", 1400, "003D4B", true)))],
        ));
        slide.add_shape(shape(
            1,
            5.14,
            1.0,
            vec![
                para("Made :", Some(run("Lato", 900, "003D4B", true))),
                ParagraphInfo {
                    text: "xxx".to_string(),
                    bullet_char: Some("•".to_string()),
                    bullet_color: Some("000000".to_string()),
                    run_style: Some(run("Lato", 900, "333333", false)),
                },
            ],
        ));
        slide.add_shape(shape(
            2,
            0.39,
            3.16,
            vec![ParagraphInfo {
                text: "xxx".to_string(),
                bullet_char: Some("▫".to_string()),
                bullet_color: Some("D32427".to_string()),
                run_style: Some(run("Arial", 800, "111111", false)),
            }],
        ));
        slide
    }

    #[test]
    fn test_extract_roles_from_positions() {
        let sheet =
            StyleSheet::extract(&template(), &StyleRules::default(), &StyleDefaults::default());
        assert_eq!(sheet.title.size, Some(1400));
        assert_eq!(sheet.title.bold, Some(true));
        assert_eq!(sheet.inline_title.color.as_deref(), Some("003D4B"));
        // The inline-title shape is scanned first, so its body paragraph wins.
        assert_eq!(sheet.content.color.as_deref(), Some("333333"));
        assert_eq!(sheet.content.size, Some(900));
    }

    #[test]
    fn test_bullet_takes_first_char_and_first_unskipped_color() {
        let sheet =
            StyleSheet::extract(&template(), &StyleRules::default(), &StyleDefaults::default());
        assert_eq!(sheet.bullet.char, "•");
        assert_eq!(sheet.bullet.color, "D32427");
    }

    #[test]
    fn test_defaults_fill_gaps() {
        let slide = TemplateSlide::new(1);
        let sheet = StyleSheet::extract(&slide, &StyleRules::default(), &StyleDefaults::default());
        assert_eq!(sheet, StyleSheet::from_defaults(&StyleDefaults::default()));
        assert_eq!(sheet.content.font_name.as_deref(), Some("Lato"));
        assert_eq!(sheet.content.color.as_deref(), Some("000000"));
        assert_eq!(sheet.bullet.char, "▪");
        assert_eq!(sheet.title.size, None);
    }

    #[test]
    fn test_with_size_points() {
        let style = TextStyle {
            font_name: Some("Lato".to_string()),
            size: Some(900),
            ..Default::default()
        };
        let sized = style.with_size_points(14);
        assert_eq!(sized.size, Some(1400));
        assert_eq!(sized.font_name.as_deref(), Some("Lato"));
    }
}
