//! The layout contract of the Project Review template.
//!
//! Every field has an expected top-left position, the size of its box and the
//! text budgets derived from that size. The defaults describe the shipped
//! template; a JSON file can override any part of them.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fitting::{FontScale, TextLimits};
use crate::geometry::{Position, Size};
use crate::styles::{StyleDefaults, StyleRules};

/// A semantic slot on the Project Review slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Date,
    MoodStatus,
    Scope,
    Info,
    Achievements,
    Trends,
    NextSteps,
    Made,
    Risks,
    Budget,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Title,
        Field::Date,
        Field::MoodStatus,
        Field::Scope,
        Field::Info,
        Field::Achievements,
        Field::Trends,
        Field::NextSteps,
        Field::Made,
        Field::Risks,
        Field::Budget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Date => "date",
            Field::MoodStatus => "mood_status",
            Field::Scope => "scope",
            Field::Info => "info",
            Field::Achievements => "achievements",
            Field::Trends => "trends",
            Field::NextSteps => "next_steps",
            Field::Made => "made",
            Field::Risks => "risks",
            Field::Budget => "budget",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::LayoutError(format!("Unknown field '{}'", s)))
    }
}

/// Where a field's box sits and how much text it holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Expected top-left corner in inches.
    pub expected: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub limits: TextLimits,
}

impl FieldSpec {
    const fn new(x: f64, y: f64, width: f64, height: f64, limits: (usize, usize, usize)) -> Self {
        Self {
            expected: Position::new(x, y),
            size: Size::new(width, height),
            limits: TextLimits {
                max_chars_per_line: limits.0,
                max_lines: limits.1,
                total_chars: limits.2,
            },
        }
    }
}

fn default_fields() -> BTreeMap<Field, FieldSpec> {
    BTreeMap::from([
        (Field::Title, FieldSpec::new(0.39, 0.17, 7.99, 0.43, (80, 1, 80))),
        (Field::Date, FieldSpec::new(8.88, 0.08, 1.07, 0.35, (10, 1, 10))),
        (Field::MoodStatus, FieldSpec::new(0.39, 0.98, 4.53, 0.96, (50, 3, 120))),
        (Field::Scope, FieldSpec::new(0.35, 1.93, 4.57, 0.98, (50, 4, 180))),
        (Field::Info, FieldSpec::new(0.37, 2.15, 4.53, 0.75, (50, 4, 180))),
        (Field::Achievements, FieldSpec::new(0.39, 3.16, 4.53, 1.12, (55, 5, 250))),
        (Field::Trends, FieldSpec::new(0.39, 4.32, 4.57, 0.99, (50, 3, 120))),
        (Field::NextSteps, FieldSpec::new(0.39, 4.53, 4.53, 0.89, (50, 4, 180))),
        (Field::Made, FieldSpec::new(5.14, 1.0, 4.51, 1.19, (50, 5, 200))),
        (Field::Risks, FieldSpec::new(5.14, 2.48, 4.41, 1.04, (50, 4, 180))),
        (Field::Budget, FieldSpec::new(5.13, 4.4, 4.43, 1.15, (45, 6, 220))),
    ])
}

/// Complete layout configuration for generation and verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    pub fields: BTreeMap<Field, FieldSpec>,
    /// Matching tolerance (inches) when filling slides.
    pub fill_tolerance: f64,
    /// Matching tolerance (inches) when verifying the template.
    pub verify_tolerance: f64,
    /// Offsets below this count as an exact match rather than drift.
    pub exact_threshold: f64,
    /// Share of expected fields that must be found for the template to be valid.
    pub min_match_ratio: f64,
    pub font_scale: FontScale,
    pub title_font_size: u32,
    pub date_font_size: u32,
    /// Zero-based index of the Project Review slide in the template.
    pub template_slide: usize,
    /// Zero-based index of the layout used for the summary and data notes slides.
    pub summary_layout: usize,
    pub summary_max_rows: usize,
    pub style_rules: StyleRules,
    pub style_defaults: StyleDefaults,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            fill_tolerance: 0.15,
            verify_tolerance: 0.3,
            exact_threshold: 0.05,
            min_match_ratio: 0.7,
            font_scale: FontScale::default(),
            title_font_size: 14,
            date_font_size: 8,
            template_slide: 0,
            summary_layout: 3,
            summary_max_rows: 14,
            style_rules: StyleRules::default(),
            style_defaults: StyleDefaults::default(),
        }
    }
}

impl TemplateLayout {
    /// Parse a layout override. Fields not listed keep their default spec.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: TemplateLayout =
            serde_json::from_str(json).map_err(|e| Error::LayoutError(e.to_string()))?;
        Ok(parsed.with_default_fields())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let parsed: TemplateLayout =
            serde_json::from_reader(reader).map_err(|e| Error::LayoutError(e.to_string()))?;
        Ok(parsed.with_default_fields())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let layout = Self::from_reader(BufReader::new(file))?;
        log::debug!("Loaded layout overrides from {}", path.display());
        Ok(layout)
    }

    fn with_default_fields(mut self) -> Self {
        for (field, spec) in default_fields() {
            self.fields.entry(field).or_insert(spec);
        }
        self
    }

    /// Spec for a field; unknown fields get the fallback limits at the origin.
    pub fn spec(&self, field: Field) -> FieldSpec {
        self.fields.get(&field).copied().unwrap_or(FieldSpec {
            expected: Position::default(),
            size: Size::default(),
            limits: TextLimits::default(),
        })
    }

    pub fn limits(&self, field: Field) -> TextLimits {
        self.spec(field).limits
    }

    /// Expected positions of all configured fields, in field order.
    pub fn expected_positions(&self) -> Vec<(Field, Position)> {
        self.fields
            .iter()
            .map(|(field, spec)| (*field, spec.expected))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_has_every_field() {
        let layout = TemplateLayout::default();
        assert_eq!(layout.fields.len(), Field::ALL.len());
        assert_eq!(layout.spec(Field::Budget).expected, Position::new(5.13, 4.4));
        assert_eq!(layout.limits(Field::Achievements), TextLimits::new(55, 5, 250));
    }

    #[test]
    fn test_field_round_trips_through_str() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>().unwrap(), field);
        }
        assert!("unknown".parse::<Field>().is_err());
    }

    #[test]
    fn test_override_merges_with_defaults() {
        let json = r#"{
            "fill_tolerance": 0.2,
            "fields": {
                "budget": { "expected": { "x": 5.2, "y": 4.5 }, "limits": [40, 5, 200] }
            }
        }"#;
        let layout = TemplateLayout::from_json_str(json).unwrap();
        assert_eq!(layout.fill_tolerance, 0.2);
        assert_eq!(layout.verify_tolerance, 0.3);
        assert_eq!(layout.spec(Field::Budget).expected, Position::new(5.2, 4.5));
        assert_eq!(layout.limits(Field::Budget), TextLimits::new(40, 5, 200));
        assert_eq!(layout.spec(Field::Title).expected, Position::new(0.39, 0.17));
        assert_eq!(layout.fields.len(), Field::ALL.len());
    }

    #[test]
    fn test_invalid_override_is_layout_error() {
        let err = TemplateLayout::from_json_str("{ \"fields\": 3 }").unwrap_err();
        assert!(matches!(err, Error::LayoutError(_)));
    }

    #[test]
    fn test_expected_positions_in_field_order() {
        let positions = TemplateLayout::default().expected_positions();
        assert_eq!(positions.first().map(|p| p.0), Some(Field::Title));
        assert_eq!(positions.last().map(|p| p.0), Some(Field::Budget));
    }
}
