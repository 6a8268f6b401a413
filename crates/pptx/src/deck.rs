//! A presentation opened for editing: slide order, slide parts and their
//! relationships, layouts.
//!
//! `ppt/presentation.xml`, its relationships and `[Content_Types].xml` are
//! held parsed and written back on save, so every structural edit keeps the
//! three consistent.

use std::path::Path;

use flashdeck_core::{Error, LayoutInfo, Result, TemplateSlide};

use crate::package::{rels_path, relative_target, resolve_target, Package};
use crate::parser::{extract_slide_number, SlideParser};
use crate::xml::{
    next_relationship_id, parse_common_slide_name, parse_id_list, parse_relationships, parse_slide_size,
    rewrite_slide_id_list, write_relationships, ContentTypes, IdEntry, Relationship, CONTENT_TYPE_SLIDE,
    REL_TYPE_NOTES_SLIDE, REL_TYPE_SLIDE, REL_TYPE_SLIDE_LAYOUT, REL_TYPE_SLIDE_MASTER,
};

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const ROOT_RELS_PART: &str = "_rels/.rels";
const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";
const OFFICE_DOCUMENT_SUFFIX: &str = "/officeDocument";
const FIRST_SLIDE_ID: u32 = 256;

/// A slide in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRef {
    /// `p:sldId/@id`
    pub id: u32,
    /// Relationship id in the presentation's relationships.
    pub rel_id: String,
    /// Part name, e.g. `ppt/slides/slide1.xml`.
    pub part: String,
}

#[derive(Debug, Clone)]
pub struct Deck {
    package: Package,
    content_types: ContentTypes,
    presentation_part: String,
    presentation: String,
    presentation_rels: Vec<Relationship>,
    slides: Vec<SlideRef>,
}

impl Deck {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_package(Package::open_path(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_package(Package::from_bytes(bytes)?)
    }

    pub fn from_package(package: Package) -> Result<Self> {
        let content_types = ContentTypes::parse(&package.read_string(CONTENT_TYPES_PART)?)?;
        let presentation_part = find_presentation_part(&package)?;
        let presentation = package.read_string(&presentation_part)?;
        let presentation_rels = match package.read_string(&rels_path(&presentation_part)) {
            Ok(xml) => parse_relationships(&xml)?,
            Err(Error::PartNotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut slides = Vec::new();
        for entry in parse_id_list(&presentation, b"sldIdLst")? {
            let Some(rel) = presentation_rels.iter().find(|r| r.id == entry.rel_id) else {
                log::warn!("Slide id {} references unknown relationship {}", entry.id, entry.rel_id);
                continue;
            };
            let part = resolve_target(&presentation_part, &rel.target);
            if !package.contains(&part) {
                log::warn!("Slide part {} is missing from the package", part);
                continue;
            }
            slides.push(SlideRef {
                id: entry.id,
                rel_id: entry.rel_id,
                part,
            });
        }

        log::debug!("Presentation {} has {} slides", presentation_part, slides.len());
        Ok(Self {
            package,
            content_types,
            presentation_part,
            presentation,
            presentation_rels,
            slides,
        })
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn slides(&self) -> &[SlideRef] {
        &self.slides
    }

    /// `(cx, cy)` of the slides in EMU.
    pub fn slide_size(&self) -> Option<(i64, i64)> {
        parse_slide_size(&self.presentation)
    }

    fn slide(&self, index: usize) -> Result<&SlideRef> {
        self.slides.get(index).ok_or_else(|| {
            Error::TemplateError(format!(
                "Slide index {} out of range ({} slides)",
                index,
                self.slides.len()
            ))
        })
    }

    pub fn slide_xml(&self, index: usize) -> Result<String> {
        let part = &self.slide(index)?.part;
        self.package.read_string(part)
    }

    pub fn set_slide_xml(&mut self, index: usize, xml: String) -> Result<()> {
        let part = self.slide(index)?.part.clone();
        self.package.set_part(&part, xml.into_bytes());
        Ok(())
    }

    /// Shapes of a slide, numbered from 1 like PowerPoint does.
    pub fn parse_slide(&self, index: usize) -> Result<TemplateSlide> {
        let slide = self.slide(index)?;
        let xml = self.package.read_string(&slide.part)?;
        let mut parsed = SlideParser::new().parse_slide(&xml, index + 1)?;
        parsed.layout = self.slide_layout_part(&slide.part).map(|part| self.layout_name(&part));
        Ok(parsed)
    }

    fn part_relationships(&self, part: &str) -> Result<Vec<Relationship>> {
        match self.package.read_string(&rels_path(part)) {
            Ok(xml) => parse_relationships(&xml),
            Err(Error::PartNotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn slide_layout_part(&self, slide_part: &str) -> Option<String> {
        let rels = self.part_relationships(slide_part).ok()?;
        rels.iter()
            .find(|r| r.rel_type == REL_TYPE_SLIDE_LAYOUT)
            .map(|r| resolve_target(slide_part, &r.target))
    }

    fn layout_name(&self, layout_part: &str) -> String {
        self.package
            .read_string(layout_part)
            .ok()
            .and_then(|xml| parse_common_slide_name(&xml))
            .unwrap_or_else(|| {
                layout_part
                    .rsplit('/')
                    .next()
                    .unwrap_or(layout_part)
                    .trim_end_matches(".xml")
                    .to_string()
            })
    }

    /// Layout parts of the first slide master, in the master's order.
    fn layout_parts(&self) -> Result<Vec<String>> {
        let masters = parse_id_list(&self.presentation, b"sldMasterIdLst")?;
        let master_part = masters
            .iter()
            .filter_map(|m| self.presentation_rels.iter().find(|r| r.id == m.rel_id))
            .chain(self.presentation_rels.iter().filter(|r| r.rel_type == REL_TYPE_SLIDE_MASTER))
            .map(|r| resolve_target(&self.presentation_part, &r.target))
            .find(|part| self.package.contains(part));

        if let Some(master_part) = master_part {
            let master = self.package.read_string(&master_part)?;
            let master_rels = self.part_relationships(&master_part)?;
            let parts: Vec<String> = parse_id_list(&master, b"sldLayoutIdLst")?
                .iter()
                .filter_map(|entry| master_rels.iter().find(|r| r.id == entry.rel_id))
                .map(|r| resolve_target(&master_part, &r.target))
                .filter(|part| self.package.contains(part))
                .collect();
            if !parts.is_empty() {
                return Ok(parts);
            }
        }

        let mut parts: Vec<(usize, String)> = self
            .package
            .part_names()
            .filter(|name| name.starts_with("ppt/slideLayouts/") && name.ends_with(".xml"))
            .filter_map(|name| extract_slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        parts.sort();
        Ok(parts.into_iter().map(|(_, name)| name).collect())
    }

    pub fn layouts(&self) -> Result<Vec<LayoutInfo>> {
        Ok(self
            .layout_parts()?
            .iter()
            .enumerate()
            .map(|(index, part)| LayoutInfo {
                index,
                name: self.layout_name(part),
            })
            .collect())
    }

    fn next_slide_part(&self) -> String {
        let max = self
            .package
            .part_names()
            .filter(|name| name.starts_with("ppt/slides/") && !name.contains("/_rels/"))
            .filter_map(extract_slide_number)
            .max()
            .unwrap_or(0);
        format!("ppt/slides/slide{}.xml", max + 1)
    }

    fn next_slide_id(&self) -> u32 {
        self.slides
            .iter()
            .map(|s| s.id)
            .max()
            .unwrap_or(FIRST_SLIDE_ID - 1)
            .max(FIRST_SLIDE_ID - 1)
            + 1
    }

    /// Register a new slide part at the end of the deck.
    fn append_slide(&mut self, part: String, xml: String, rels: &[Relationship]) -> Result<usize> {
        self.package.set_part(&part, xml.into_bytes());
        self.package
            .set_part(&rels_path(&part), write_relationships(rels)?.into_bytes());
        self.content_types.set_override(&part, CONTENT_TYPE_SLIDE);

        let rel_id = next_relationship_id(&self.presentation_rels);
        self.presentation_rels.push(Relationship {
            id: rel_id.clone(),
            rel_type: REL_TYPE_SLIDE.to_string(),
            target: relative_target(&self.presentation_part, &part),
            target_mode: None,
        });
        let id = self.next_slide_id();
        log::debug!("Added slide {} (id {}, {})", part, id, rel_id);
        self.slides.push(SlideRef { id, rel_id, part });
        Ok(self.slides.len() - 1)
    }

    /// Copy a slide to the end of the deck; returns the copy's index.
    ///
    /// Relationships are copied with their ids so the XML stays valid;
    /// the notes slide stays with the original.
    pub fn duplicate_slide(&mut self, index: usize) -> Result<usize> {
        let source = self.slide(index)?.part.clone();
        let xml = self.package.read_string(&source)?;
        let part = self.next_slide_part();

        let rels: Vec<Relationship> = self
            .part_relationships(&source)?
            .into_iter()
            .filter(|r| r.rel_type != REL_TYPE_NOTES_SLIDE)
            .map(|r| {
                if r.is_external() {
                    r
                } else {
                    let target = resolve_target(&source, &r.target);
                    Relationship {
                        target: relative_target(&part, &target),
                        ..r
                    }
                }
            })
            .collect();

        self.append_slide(part, xml, &rels)
    }

    /// Add a slide on layout `layout_index`; returns its index.
    pub fn add_slide(&mut self, layout_index: usize, xml: String) -> Result<usize> {
        let layouts = self.layout_parts()?;
        let layout = layouts.get(layout_index).ok_or_else(|| {
            Error::TemplateError(format!(
                "Layout index {} out of range ({} layouts)",
                layout_index,
                layouts.len()
            ))
        })?;
        let part = self.next_slide_part();
        let rels = vec![Relationship {
            id: "rId1".to_string(),
            rel_type: REL_TYPE_SLIDE_LAYOUT.to_string(),
            target: relative_target(&part, layout),
            target_mode: None,
        }];
        self.append_slide(part, xml, &rels)
    }

    /// Remove a slide with its relationships and notes.
    pub fn delete_slide(&mut self, index: usize) -> Result<()> {
        let slide = self.slide(index)?.clone();

        for rel in self.part_relationships(&slide.part)? {
            if rel.rel_type == REL_TYPE_NOTES_SLIDE && !rel.is_external() {
                let notes = resolve_target(&slide.part, &rel.target);
                self.package.remove_part(&notes);
                self.package.remove_part(&rels_path(&notes));
                self.content_types.remove_override(&notes);
            }
        }
        self.package.remove_part(&slide.part);
        self.package.remove_part(&rels_path(&slide.part));
        self.content_types.remove_override(&slide.part);
        self.presentation_rels.retain(|r| r.id != slide.rel_id);
        self.slides.remove(index);

        log::debug!("Deleted slide {}", slide.part);
        Ok(())
    }

    pub fn move_slide(&mut self, from: usize, to: usize) -> Result<()> {
        self.slide(from)?;
        if to >= self.slides.len() {
            return Err(Error::TemplateError(format!(
                "Slide index {} out of range ({} slides)",
                to,
                self.slides.len()
            )));
        }
        let slide = self.slides.remove(from);
        self.slides.insert(to, slide);
        Ok(())
    }

    /// Write presentation.xml, its relationships and the content types back
    /// into the package.
    fn flush(&mut self) -> Result<()> {
        let entries: Vec<IdEntry> = self
            .slides
            .iter()
            .map(|s| IdEntry {
                id: s.id,
                rel_id: s.rel_id.clone(),
            })
            .collect();
        self.presentation = rewrite_slide_id_list(&self.presentation, &entries)?;

        self.package
            .set_part(&self.presentation_part, self.presentation.clone().into_bytes());
        self.package.set_part(
            &rels_path(&self.presentation_part),
            write_relationships(&self.presentation_rels)?.into_bytes(),
        );
        self.package
            .set_part(CONTENT_TYPES_PART, self.content_types.to_xml()?.into_bytes());
        Ok(())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush()?;
        self.package.to_bytes()
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.flush()?;
        self.package.save(path)?;
        log::info!("Saved {} slides to {}", self.slides.len(), path.display());
        Ok(())
    }
}

fn find_presentation_part(package: &Package) -> Result<String> {
    if let Ok(xml) = package.read_string(ROOT_RELS_PART) {
        let found = parse_relationships(&xml)?
            .into_iter()
            .find(|r| r.rel_type.ends_with(OFFICE_DOCUMENT_SUFFIX))
            .map(|r| r.target.trim_start_matches('/').to_string());
        if let Some(part) = found {
            return Ok(part);
        }
    }
    if package.contains(DEFAULT_PRESENTATION_PART) {
        Ok(DEFAULT_PRESENTATION_PART.to_string())
    } else {
        Err(Error::TemplateError("Not a presentation: no presentation.xml".to_string()))
    }
}
