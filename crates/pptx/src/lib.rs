//! PPTX (Office Open XML) backend for flash report generation.
//!
//! A .pptx file is a ZIP archive of XML parts. This crate reads template
//! slides, rewrites shape text in place, restructures the slide list and
//! renders the generated summary slides.

pub mod analyze;
pub mod deck;
pub mod editor;
pub mod generate;
pub mod package;
pub mod parser;
pub mod render;
pub mod slides;
pub mod xml;

pub use analyze::{guess_field, TemplateAnalysis};
pub use deck::{Deck, SlideRef};
pub use editor::SlideEditor;
pub use generate::{FlashReportGenerator, GenerationSummary};
pub use package::Package;
pub use parser::SlideParser;
pub use render::{BulletMode, ParagraphSpec, TextBody, TextBox};
