//! The flash report pipeline: verify the template, fill one slide per
//! project, add the summary and Data Notes slides, save.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use flashdeck_core::{
    assign_nearest, project_slide_content, unfilled_fields, verify_slide, DataNote, Error, PortfolioData,
    PositionIndex, ProjectEntry, Result, StyleSheet, TemplateLayout, TemplateSlide, VerificationReport,
};
use serde::Serialize;

use crate::deck::Deck;
use crate::editor::SlideEditor;
use crate::render::{text_box_slide_xml, TextBody};
use crate::slides::{data_notes_boxes, summary_boxes};

/// What a generation run produced.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub output: Option<PathBuf>,
    pub projects: usize,
    pub slides: usize,
    /// Fields written across all project slides.
    pub fields_filled: usize,
    /// Fields with no matching shape, summed over project slides.
    pub fields_unmatched: usize,
    /// Entries listed on the Data Notes slide.
    pub data_notes: usize,
    pub template_valid: bool,
    pub match_ratio: f64,
}

/// Generates flash report decks from a template and portfolio data.
pub struct FlashReportGenerator {
    layout: TemplateLayout,
}

impl FlashReportGenerator {
    pub fn new(layout: TemplateLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    /// Verify the template slide of the template at `template`.
    pub fn verify(&self, template: &Path) -> Result<VerificationReport> {
        let deck = Deck::open(template)?;
        let slide = self.template_slide(&deck)?;
        Ok(verify_slide(&slide, &self.layout, &display_name(template)))
    }

    /// Run the pipeline on files. `Ok(None)` when the data holds no projects.
    pub fn generate(&self, template: &Path, data: &Path, output: &Path) -> Result<Option<GenerationSummary>> {
        log::info!("Loading template {}", template.display());
        let deck = Deck::open(template)?;
        log::info!("Loading data {}", data.display());
        let data = PortfolioData::from_json_file(data)?;

        let now = Local::now().naive_local();
        let Some((mut deck, mut summary)) = self.build(deck, &data, &display_name(template), now)? else {
            return Ok(None);
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        deck.save(output)?;
        summary.output = Some(output.to_path_buf());
        Ok(Some(summary))
    }

    /// Run the pipeline on an opened deck; the deck is returned unsaved.
    pub fn build(
        &self,
        mut deck: Deck,
        data: &PortfolioData,
        template_name: &str,
        now: NaiveDateTime,
    ) -> Result<Option<(Deck, GenerationSummary)>> {
        let today = now.date();
        let template = self.template_slide(&deck)?;

        let report = verify_slide(&template, &self.layout, template_name);
        for line in report.warnings() {
            log::warn!("{}", line);
        }
        if !report.is_valid() {
            log::warn!(
                "Template matches only {:.0}% of expected fields, generating anyway",
                report.match_ratio() * 100.0
            );
        }

        if data.projects.is_empty() {
            log::warn!("No projects in data, nothing to generate");
            return Ok(None);
        }

        let styles = StyleSheet::extract(&template, &self.layout.style_rules, &self.layout.style_defaults);

        let template_index = self.layout.template_slide;
        for index in (0..deck.slide_count()).rev().filter(|i| *i != template_index) {
            deck.delete_slide(index)?;
        }
        for _ in 1..data.projects.len() {
            deck.duplicate_slide(0)?;
        }
        log::info!("Filling {} project slides", data.projects.len());

        let mut fields_filled = 0;
        let mut fields_unmatched = 0;
        let mut notes: Vec<DataNote> = Vec::new();
        for (index, entry) in data.projects.iter().enumerate() {
            let slide = deck.parse_slide(index)?;
            let (filled, unmatched) = self.fill_slide(&mut deck, index, &slide, entry, &styles, today)?;
            fields_filled += filled;
            fields_unmatched += unmatched;
            notes.extend(unfilled_fields(&entry.project));
        }

        let layouts = deck.layouts()?;
        let layout_index = if self.layout.summary_layout < layouts.len() {
            self.layout.summary_layout
        } else {
            0
        };

        let summary_xml = text_box_slide_xml(&summary_boxes(&data.projects, self.layout.summary_max_rows, today))?;
        let summary_index = deck.add_slide(layout_index, summary_xml)?;
        deck.add_slide(layout_index, text_box_slide_xml(&data_notes_boxes(&notes, now))?)?;
        deck.move_slide(summary_index, 0)?;

        let summary = GenerationSummary {
            output: None,
            projects: data.projects.len(),
            slides: deck.slide_count(),
            fields_filled,
            fields_unmatched,
            data_notes: notes.len(),
            template_valid: report.is_valid(),
            match_ratio: report.match_ratio(),
        };
        log::info!(
            "Generated {} slides ({} projects, {} fields filled)",
            summary.slides,
            summary.projects,
            summary.fields_filled
        );
        Ok(Some((deck, summary)))
    }

    fn template_slide(&self, deck: &Deck) -> Result<TemplateSlide> {
        let index = self.layout.template_slide;
        if index >= deck.slide_count() {
            return Err(Error::TemplateError(format!(
                "Template slide {} not found ({} slides)",
                index + 1,
                deck.slide_count()
            )));
        }
        deck.parse_slide(index)
    }

    /// Write one project's content into slide `index`; returns the number of
    /// fields written and of fields with no shape.
    fn fill_slide(
        &self,
        deck: &mut Deck,
        index: usize,
        slide: &TemplateSlide,
        entry: &ProjectEntry,
        styles: &StyleSheet,
        today: NaiveDate,
    ) -> Result<(usize, usize)> {
        let shapes = PositionIndex::build(slide.text_shapes().map(|s| (s.position(), s.key())));
        let assignment = assign_nearest(
            &self.layout.expected_positions(),
            &shapes.candidates(),
            self.layout.fill_tolerance,
        );

        let mut editor = SlideEditor::new();
        for content in project_slide_content(entry, &self.layout, today) {
            match assignment.get(&content.field) {
                Some(binding) => editor.set_text(binding.shape.index, TextBody::from_content(&content, styles)),
                None => log::debug!(
                    "{}: no shape for {} on slide {}",
                    entry.project.name_or_unknown(),
                    content.field,
                    index + 1
                ),
            }
        }

        let (xml, filled) = editor.apply(&deck.slide_xml(index)?)?;
        deck.set_slide_xml(index, xml)?;
        Ok((filled, assignment.missing.len()))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
