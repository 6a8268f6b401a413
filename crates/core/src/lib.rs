//! Core domain logic for flash report generation: geometry, shape-position
//! matching, text fitting, report content and template verification.

pub mod content;
pub mod error;
pub mod fitting;
pub mod format;
pub mod geometry;
pub mod layout;
pub mod matching;
pub mod model;
pub mod styles;
pub mod types;
pub mod verify;

pub use content::{
    project_slide_content, summary_rows, unfilled_fields, DataNote, FieldContent, SummaryRow, TextBlock,
};
pub use error::{Error, Result};
pub use fitting::{
    fit_items, fit_text, truncate_lines, truncate_text, FittedText, FontScale, TextLimits,
};
pub use geometry::{Position, Rect, Size};
pub use layout::{Field, FieldSpec, TemplateLayout};
pub use matching::{assign_nearest, Assignment, Binding, PositionIndex};
pub use model::{PortfolioData, ProjectEntry};
pub use styles::{BulletStyle, StyleDefaults, StyleRole, StyleRules, StyleSheet, TextStyle};
pub use types::{LayoutInfo, ParagraphInfo, RunStyle, ShapeInfo, ShapeKey, ShapeKind, TemplateSlide};
pub use verify::{verify_slide, VerificationReport};
