//! Template verification: a structural diff between the layout contract and
//! the shapes actually present on the template slide.

use serde::Serialize;

use crate::geometry::{Position, Size};
use crate::layout::{Field, TemplateLayout};
use crate::matching::assign_nearest;
use crate::types::{ShapeKey, TemplateSlide};

/// Decimal places positions are rounded to before comparison.
const VERIFY_DECIMALS: u32 = 2;

/// Characters of shape text kept in the report.
const PREVIEW_CHARS: usize = 50;

/// New shapes listed individually in the warnings.
const LISTED_NEW_SHAPES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatch {
    pub field: Field,
    pub expected: Position,
    pub actual: Position,
    /// Distance between expected and actual positions, in inches.
    pub offset: f64,
    pub shape_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingField {
    pub field: Field,
    pub expected: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewShape {
    pub name: String,
    pub position: Position,
    pub size: Size,
    pub text: String,
}

impl NewShape {
    /// Placeholder text such as `xxx` and empty boxes are not worth a warning.
    fn is_meaningful(&self) -> bool {
        self.text != "(empty)" && !self.text.is_empty() && !self.text.to_lowercase().contains("xxx")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub template: String,
    pub expected_count: usize,
    /// Bound within the exact-match threshold.
    pub matched: Vec<FieldMatch>,
    /// Bound, but moved further than the threshold.
    pub drifted: Vec<FieldMatch>,
    pub missing: Vec<MissingField>,
    pub new_shapes: Vec<NewShape>,
    pub min_match_ratio: f64,
}

impl VerificationReport {
    pub fn matched_count(&self) -> usize {
        self.matched.len() + self.drifted.len()
    }

    pub fn match_ratio(&self) -> f64 {
        if self.expected_count == 0 {
            return 1.0;
        }
        self.matched_count() as f64 / self.expected_count as f64
    }

    pub fn is_valid(&self) -> bool {
        self.match_ratio() >= self.min_match_ratio
    }

    pub fn summary(&self) -> String {
        let rule = "─".repeat(60);
        [
            rule.clone(),
            "TEMPLATE VERIFICATION REPORT".to_string(),
            rule.clone(),
            format!("Template: {}", self.template),
            format!("Expected shapes: {}", self.expected_count),
            format!("Matched perfectly: {}", self.matched.len()),
            format!("Position drifted: {}", self.drifted.len()),
            format!("Missing: {}", self.missing.len()),
            format!("New/unexpected: {}", self.new_shapes.len()),
            format!("Match ratio: {:.0}%", self.match_ratio() * 100.0),
            rule,
        ]
        .join("\n")
    }

    /// Summary block followed by one line per problem.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = vec![self.summary()];

        for d in &self.drifted {
            warnings.push(format!(
                "  {}: drifted from ({}, {}) to ({}, {}), offset {:.2}\"",
                d.field, d.expected.x, d.expected.y, d.actual.x, d.actual.y, d.offset
            ));
        }
        for m in &self.missing {
            warnings.push(format!(
                "  {}: expected at ({}, {}), not found",
                m.field, m.expected.x, m.expected.y
            ));
        }
        for shape in self.new_shapes.iter().filter(|s| s.is_meaningful()) {
            warnings.push(format!(
                "  new shape: {} at ({}, {}) \"{}\"",
                shape.name,
                shape.position.x,
                shape.position.y,
                shape.text.chars().take(30).collect::<String>()
            ));
        }

        if !self.is_valid() {
            warnings.push(format!(
                "Template may have changed significantly, only {:.0}% compatible.",
                self.match_ratio() * 100.0
            ));
        }
        warnings
    }

    /// What to change in the layout configuration to follow the template.
    pub fn action_items(&self) -> Vec<String> {
        let mut items = Vec::new();
        if !self.is_valid() {
            items.push("Run `flashdeck analyze` and update the layout file.".to_string());
        }
        if !self.drifted.is_empty() {
            items.push("Drifted shapes, update these expected positions:".to_string());
            for d in &self.drifted {
                items.push(format!(
                    "    \"{}\": {{ \"x\": {}, \"y\": {} }}  (was ({}, {}))",
                    d.field, d.actual.x, d.actual.y, d.expected.x, d.expected.y
                ));
            }
        }
        if !self.new_shapes.is_empty() {
            items.push(format!("New shapes detected ({}):", self.new_shapes.len()));
            for shape in self.new_shapes.iter().take(LISTED_NEW_SHAPES) {
                items.push(format!(
                    "    {} at ({}, {}) \"{}\"",
                    shape.name,
                    shape.position.x,
                    shape.position.y,
                    shape.text.chars().take(30).collect::<String>()
                ));
            }
            if self.new_shapes.len() > LISTED_NEW_SHAPES {
                items.push(format!(
                    "    ... and {} more",
                    self.new_shapes.len() - LISTED_NEW_SHAPES
                ));
            }
        }
        items
    }
}

/// Compare the text shapes of `slide` with the layout's expected positions.
pub fn verify_slide(slide: &TemplateSlide, layout: &TemplateLayout, template: &str) -> VerificationReport {
    let candidates: Vec<(Position, ShapeKey)> = slide
        .text_shapes()
        .map(|shape| (shape.position().rounded(VERIFY_DECIMALS), shape.key()))
        .collect();
    let expected = layout.expected_positions();
    let assignment = assign_nearest(&expected, &candidates, layout.verify_tolerance);

    let mut matched = Vec::new();
    let mut drifted = Vec::new();
    for (field, binding) in &assignment.bindings {
        let Some(shape) = slide.shape(binding.shape) else {
            continue;
        };
        let entry = FieldMatch {
            field: *field,
            expected: layout.spec(*field).expected,
            actual: binding.actual,
            offset: binding.distance,
            shape_name: shape.name.clone(),
            text: shape.preview(PREVIEW_CHARS),
        };
        if binding.distance < layout.exact_threshold {
            matched.push(entry);
        } else {
            log::warn!(
                "{} drifted from ({}, {}) to ({}, {})",
                field,
                entry.expected.x,
                entry.expected.y,
                entry.actual.x,
                entry.actual.y
            );
            drifted.push(entry);
        }
    }

    let missing = assignment
        .missing
        .iter()
        .map(|field| MissingField {
            field: *field,
            expected: layout.spec(*field).expected,
        })
        .collect();

    let new_shapes = assignment
        .unmatched
        .iter()
        .filter_map(|(position, key)| {
            slide.shape(*key).map(|shape| NewShape {
                name: shape.name.clone(),
                position: *position,
                size: shape.size().rounded(VERIFY_DECIMALS),
                text: shape.preview(PREVIEW_CHARS),
            })
        })
        .collect();

    VerificationReport {
        template: template.to_string(),
        expected_count: expected.len(),
        matched,
        drifted,
        missing,
        new_shapes,
        min_match_ratio: layout.min_match_ratio,
    }
}
