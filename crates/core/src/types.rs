//! Domain types for a template slide's shape tree.

use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Rect, Size};

/// Kind of a top-level element in a slide's shape tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// `p:sp`, an autoshape or text box.
    Shape,
    /// `p:pic`
    Picture,
    /// `p:grpSp`
    Group,
    /// `p:cxnSp`
    Connector,
    /// `p:graphicFrame` (tables, charts)
    GraphicFrame,
}

impl ShapeKind {
    /// Map an element local name to a shape kind.
    pub fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sp" => Some(Self::Shape),
            b"pic" => Some(Self::Picture),
            b"grpSp" => Some(Self::Group),
            b"cxnSp" => Some(Self::Connector),
            b"graphicFrame" => Some(Self::GraphicFrame),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Shape => "Shape",
            Self::Picture => "Picture",
            Self::Group => "GroupShape",
            Self::Connector => "Connector",
            Self::GraphicFrame => "GraphicFrame",
        }
    }
}

/// Character properties of a run (`a:rPr`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStyle {
    pub font_name: Option<String>,
    /// Size in hundredths of a point.
    pub size: Option<u32>,
    /// Hex RGB, e.g. `003D4B`.
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

impl RunStyle {
    pub fn is_empty(&self) -> bool {
        self.font_name.is_none()
            && self.size.is_none()
            && self.color.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
    }

    pub fn size_points(&self) -> Option<f64> {
        self.size.map(|sz| f64::from(sz) / 100.0)
    }
}

/// A paragraph of a shape's text frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphInfo {
    /// Plain text; soft line breaks are `\n`.
    pub text: String,
    /// `a:buChar/@char`
    pub bullet_char: Option<String>,
    /// `a:buClr/a:srgbClr/@val`
    pub bullet_color: Option<String>,
    /// Properties of the first run.
    pub run_style: Option<RunStyle>,
}

/// Stable handle of a shape within one slide: its id plus its position in
/// the shape tree, which stays unique even when ids are duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShapeKey {
    pub id: u32,
    pub index: usize,
}

/// A top-level shape on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeInfo {
    /// `p:cNvPr/@id`
    pub id: u32,
    /// Position among the top-level shapes of the slide, in document order.
    pub index: usize,
    /// `p:cNvPr/@name`
    pub name: String,
    pub kind: ShapeKind,
    pub bounds: Rect,
    pub has_text_frame: bool,
    pub is_placeholder: bool,
    pub paragraphs: Vec<ParagraphInfo>,
}

impl ShapeInfo {
    pub fn new(kind: ShapeKind, index: usize) -> Self {
        Self {
            id: 0,
            index,
            name: String::new(),
            kind,
            bounds: Rect::default(),
            has_text_frame: false,
            is_placeholder: false,
            paragraphs: Vec::new(),
        }
    }

    pub fn key(&self) -> ShapeKey {
        ShapeKey {
            id: self.id,
            index: self.index,
        }
    }

    /// Top-left corner in inches.
    pub fn position(&self) -> Position {
        self.bounds.position()
    }

    pub fn size(&self) -> Size {
        self.bounds.size()
    }

    /// Full text, paragraphs separated by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Up to `max` characters of text on one line, `(empty)` when blank.
    pub fn preview(&self, max: usize) -> String {
        let text = self.text();
        if text.is_empty() {
            return "(empty)".to_string();
        }
        text.chars()
            .take(max)
            .map(|c| if c == '\n' { '↵' } else { c })
            .collect()
    }
}

/// A slide read from the template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSlide {
    /// 1-based slide number.
    pub number: usize,
    /// Name of the slide layout, when known.
    pub layout: Option<String>,
    /// Top-level shapes in document order.
    pub shapes: Vec<ShapeInfo>,
}

impl TemplateSlide {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            layout: None,
            shapes: Vec::new(),
        }
    }

    pub fn add_shape(&mut self, shape: ShapeInfo) {
        self.shapes.push(shape);
    }

    /// Shapes that carry a text frame.
    pub fn text_shapes(&self) -> impl Iterator<Item = &ShapeInfo> {
        self.shapes.iter().filter(|s| s.has_text_frame)
    }

    pub fn shape(&self, key: ShapeKey) -> Option<&ShapeInfo> {
        self.shapes.iter().find(|s| s.key() == key)
    }

    /// Sort shapes top-to-bottom, then left-to-right.
    pub fn sort_by_position(&mut self) {
        self.shapes.sort_by(|a, b| {
            let y_cmp = a.bounds.y.cmp(&b.bounds.y);
            if y_cmp == std::cmp::Ordering::Equal {
                a.bounds.x.cmp(&b.bounds.x)
            } else {
                y_cmp
            }
        });
    }
}

/// A slide layout of the template's first master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub index: usize,
    pub name: String,
}
