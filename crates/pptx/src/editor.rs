//! Rewrites the text of existing shapes in a slide part.
//!
//! Only the paragraphs of a shape's `p:txBody` are replaced. Everything else
//! in the part is copied event for event, so geometry, fills, pictures and
//! extension data survive untouched.

use std::collections::{BTreeMap, BTreeSet};

use flashdeck_core::{Result, ShapeKind};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::render::{is_bullet_property, is_spacing_property, write_paragraphs, ParagraphTemplate, TextBody};
use crate::xml::{local_name, prefix_of, write_event, xml_error};

/// Replacement text for the top-level shapes of one slide, keyed by the
/// shape's index in `p:spTree`.
#[derive(Debug, Default)]
pub struct SlideEditor {
    bodies: BTreeMap<usize, TextBody>,
}

impl SlideEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, shape_index: usize, body: TextBody) {
        self.bodies.insert(shape_index, body);
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Apply every replacement to `xml`; also returns how many text bodies
    /// were rewritten.
    pub fn apply(&self, xml: &str) -> Result<(String, usize)> {
        let mut reader = Reader::from_str(xml);
        let mut writer = Writer::new(Vec::new());
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut next_index = 0usize;
        let mut shape: Option<(usize, usize)> = None;
        let mut rewrite: Option<BodyRewrite> = None;
        let mut rewritten = BTreeSet::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| xml_error("Failed to parse slide", e))?;
            if matches!(event, Event::Eof) {
                break;
            }
            let level = stack.len();

            if let Some(body) = rewrite.as_mut() {
                match &event {
                    Event::Start(e) => stack.push(local_name(e.name().as_ref()).to_vec()),
                    Event::End(_) => {
                        stack.pop();
                    }
                    _ => {}
                }
                let closes_body = matches!(event, Event::End(_)) && stack.len() == body.level;
                if !closes_body {
                    body.handle(&mut writer, event, level)?;
                    continue;
                }
                body.finish(&mut writer)?;
                rewritten.insert(body.index);
                rewrite = None;
                write_event(&mut writer, event)?;
                continue;
            }

            match &event {
                Event::Start(e) | Event::Empty(e) => {
                    let name = local_name(e.name().as_ref()).to_vec();
                    let is_start = matches!(event, Event::Start(_));
                    if shape.is_none()
                        && stack.last().map(Vec::as_slice) == Some(b"spTree".as_slice())
                        && ShapeKind::from_local_name(&name).is_some()
                    {
                        if is_start {
                            shape = Some((next_index, level));
                        }
                        next_index += 1;
                    } else if let Some((index, shape_level)) = shape {
                        if is_start && name == b"txBody" && level == shape_level + 1 {
                            if let Some(body) = self.bodies.get(&index) {
                                rewrite = Some(BodyRewrite::new(index, level, body));
                            }
                        }
                    }
                    if is_start {
                        stack.push(name);
                    }
                }
                Event::End(_) => {
                    stack.pop();
                    if shape.is_some_and(|(_, shape_level)| shape_level == stack.len()) {
                        shape = None;
                    }
                }
                _ => {}
            }
            write_event(&mut writer, event)?;
        }

        for index in self.bodies.keys().filter(|idx| !rewritten.contains(*idx)) {
            log::warn!("Shape #{} has no text body to rewrite", index);
        }

        let xml = String::from_utf8(writer.into_inner()).map_err(|e| xml_error("Edited slide is not UTF-8", e))?;
        Ok((xml, rewritten.len()))
    }
}

/// State while inside a `p:txBody` being rewritten.
struct BodyRewrite<'b> {
    index: usize,
    /// Element depth of the `p:txBody` itself.
    level: usize,
    body: &'b TextBody,
    prefix: Option<String>,
    template: Option<ParagraphTemplate>,
    /// Attributes of the first paragraph's `a:pPr`.
    attributes: Vec<(String, String)>,
    /// Depth of the paragraph being skipped.
    paragraph: Option<usize>,
    /// Events under the first paragraph's `a:pPr`, and its depth.
    properties: Option<(usize, Vec<Event<'static>>)>,
}

impl<'b> BodyRewrite<'b> {
    fn new(index: usize, level: usize, body: &'b TextBody) -> Self {
        Self {
            index,
            level,
            body,
            prefix: None,
            template: None,
            attributes: Vec::new(),
            paragraph: None,
            properties: None,
        }
    }

    /// `level` is the depth the event sits at before any push or pop.
    fn handle(&mut self, writer: &mut Writer<Vec<u8>>, event: Event<'_>, level: usize) -> Result<()> {
        if let Some(paragraph_level) = self.paragraph {
            self.capture(&event, level, paragraph_level);
            if matches!(event, Event::End(_)) && level == paragraph_level + 1 {
                self.paragraph = None;
                self.template.get_or_insert_with(ParagraphTemplate::default);
            }
            return Ok(());
        }

        let child = match &event {
            Event::Start(e) | Event::Empty(e) if level == self.level + 1 => Some((
                prefix_of(e.name().as_ref()),
                local_name(e.name().as_ref()) == b"p",
            )),
            _ => None,
        };
        if let Some((prefix, is_paragraph)) = child {
            self.prefix.get_or_insert(prefix);
            if is_paragraph {
                if matches!(event, Event::Start(_)) {
                    self.paragraph = Some(level);
                } else {
                    self.template.get_or_insert_with(ParagraphTemplate::default);
                }
                return Ok(());
            }
        }
        write_event(writer, event)
    }

    /// Record the first paragraph's `a:pPr`.
    fn capture(&mut self, event: &Event<'_>, level: usize, paragraph_level: usize) {
        if self.template.is_some() {
            return;
        }
        if let Some((properties_level, events)) = self.properties.as_mut() {
            if matches!(event, Event::End(_)) && level == *properties_level + 1 {
                let events = std::mem::take(events);
                self.properties = None;
                self.template = Some(self.split_properties(events));
            } else {
                events.push(event.clone().into_owned());
            }
            return;
        }
        match event {
            Event::Start(e) | Event::Empty(e)
                if level == paragraph_level + 1 && local_name(e.name().as_ref()) == b"pPr" =>
            {
                let attributes = attributes(e);
                if matches!(event, Event::Start(_)) {
                    self.properties = Some((level, Vec::new()));
                    self.attributes = attributes;
                } else {
                    self.template = Some(ParagraphTemplate {
                        attributes,
                        ..ParagraphTemplate::default()
                    });
                }
            }
            Event::Start(_) | Event::Empty(_) if level == paragraph_level + 1 => {
                self.template = Some(ParagraphTemplate::default());
            }
            _ => {}
        }
    }

    fn split_properties(&mut self, events: Vec<Event<'static>>) -> ParagraphTemplate {
        let mut template = ParagraphTemplate {
            attributes: std::mem::take(&mut self.attributes),
            ..ParagraphTemplate::default()
        };
        let mut depth = 0usize;
        let mut bucket = Bucket::After;
        for event in events {
            if depth == 0 {
                if let Event::Start(e) | Event::Empty(e) = &event {
                    let qname = e.name();
                    let local = local_name(qname.as_ref());
                    bucket = if is_spacing_property(local) {
                        Bucket::Before
                    } else if is_bullet_property(local) {
                        Bucket::Bullet
                    } else {
                        Bucket::After
                    };
                }
            }
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }
            match bucket {
                Bucket::Before => template.before.push(event),
                Bucket::Bullet => template.bullet.push(event),
                Bucket::After => template.after.push(event),
            }
        }
        template
    }

    /// Write the new paragraphs before `</p:txBody>`.
    fn finish(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let prefix = self.prefix.as_deref().unwrap_or("a:");
        write_paragraphs(writer, self.body, self.template.as_ref(), prefix)
    }
}

enum Bucket {
    Before,
    Bullet,
    After,
}

fn attributes(e: &BytesStart) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).to_string(),
                a.unescape_value().map(|v| v.to_string()).unwrap_or_default(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SlideParser;
    use crate::render::{BulletMode, ParagraphSpec};
    use flashdeck_core::TextStyle;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/>
<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>Project review :</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="3" name="Made"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/>
<p:txBody><a:bodyPr wrap="square" lIns="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>
<a:p><a:pPr marL="171450" indent="-171450"><a:lnSpc><a:spcPct val="90000"/></a:lnSpc><a:buClr><a:srgbClr val="D32427"/></a:buClr><a:buFont typeface="Arial"/><a:buChar char="&#9642;"/><a:defRPr sz="900"/></a:pPr><a:r><a:rPr sz="900"/><a:t>xxx</a:t></a:r></a:p>
<a:p><a:pPr lvl="1"/><a:r><a:t>yyy</a:t></a:r></a:p>
</p:txBody></p:sp>
</p:spTree></p:cSld></p:sld>"#;

    fn bullet() -> BulletMode {
        BulletMode::Bullet {
            char: "-".to_string(),
            color: "112233".to_string(),
        }
    }

    #[test]
    fn test_replaces_only_target_shape() {
        let mut editor = SlideEditor::new();
        editor.set_text(
            1,
            TextBody {
                paragraphs: vec![
                    ParagraphSpec::new("Made :", TextStyle::default()).with_bullet(BulletMode::None),
                    ParagraphSpec::new("Kickoff", TextStyle::default()).with_bullet(bullet()),
                    ParagraphSpec::new("Pilot", TextStyle::default()).with_bullet(bullet()),
                ],
            },
        );
        let (xml, rewritten) = editor.apply(SLIDE).unwrap();
        assert_eq!(rewritten, 1);

        let shapes = SlideParser::new().parse_shapes(&xml).unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].text(), "Project review :");
        assert_eq!(shapes[1].text(), "Made :\nKickoff\nPilot");
        assert_eq!(shapes[1].paragraphs[1].bullet_char.as_deref(), Some("-"));
        assert_eq!(shapes[1].paragraphs[1].bullet_color.as_deref(), Some("112233"));

        assert!(xml.contains(r#"<a:bodyPr wrap="square" lIns="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#));
        assert!(!xml.contains("xxx"));
        assert!(!xml.contains("lvl=\"1\""));
        assert!(!xml.contains("buFont"));
    }

    #[test]
    fn test_first_paragraph_properties_reused() {
        let mut editor = SlideEditor::new();
        editor.set_text(1, TextBody::plain("a", TextStyle::default()));
        let (xml, _) = editor.apply(SLIDE).unwrap();
        assert!(xml.contains(
            r#"<a:pPr marL="171450" indent="-171450"><a:lnSpc><a:spcPct val="90000"/></a:lnSpc><a:buClr><a:srgbClr val="D32427"/></a:buClr><a:buFont typeface="Arial"/><a:buChar char="&#9642;"/><a:defRPr sz="900"/></a:pPr>"#
        ));

        let mut editor = SlideEditor::new();
        editor.set_text(
            1,
            TextBody {
                paragraphs: vec![ParagraphSpec::new("b", TextStyle::default()).with_bullet(BulletMode::None)],
            },
        );
        let (xml, _) = editor.apply(SLIDE).unwrap();
        assert!(xml.contains(
            r#"<a:pPr marL="171450" indent="-171450"><a:lnSpc><a:spcPct val="90000"/></a:lnSpc><a:buNone/><a:defRPr sz="900"/></a:pPr>"#
        ));
    }

    #[test]
    fn test_empty_editor_copies_slide() {
        let (xml, rewritten) = SlideEditor::new().apply(SLIDE).unwrap();
        assert_eq!(xml, SLIDE);
        assert_eq!(rewritten, 0);
    }

    #[test]
    fn test_missing_shape_is_skipped() {
        let mut editor = SlideEditor::new();
        editor.set_text(7, TextBody::plain("nowhere", TextStyle::default()));
        assert_eq!(editor.len(), 1);
        let (xml, rewritten) = editor.apply(SLIDE).unwrap();
        assert!(!xml.contains("nowhere"));
        assert_eq!(rewritten, 0);
    }

    #[test]
    fn test_shape_without_text_body_is_not_counted() {
        let slide = SLIDE.replace(
            "</p:spTree>",
            r#"<p:pic><p:nvPicPr><p:cNvPr id="4" name="Logo"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr/></p:pic></p:spTree>"#,
        );
        let mut editor = SlideEditor::new();
        editor.set_text(0, TextBody::plain("Project review : ERP", TextStyle::default()));
        editor.set_text(2, TextBody::plain("logo text", TextStyle::default()));
        assert_eq!(editor.len(), 2);

        let (xml, rewritten) = editor.apply(&slide).unwrap();
        assert_eq!(rewritten, 1);
        assert!(xml.contains("Project review : ERP"));
        assert!(!xml.contains("logo text"));
    }
}
