//! Slide XML parser: the top-level shapes of a slide with their geometry,
//! names, placeholder flags and paragraphs.

use flashdeck_core::{ParagraphInfo, Result, RunStyle, ShapeInfo, ShapeKind, TemplateSlide};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::xml::{attr, local_name};

/// Parser for slide parts (`ppt/slides/slideN.xml`).
pub struct SlideParser;

impl SlideParser {
    /// Create a new slide parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a slide part into a template slide.
    pub fn parse_slide(&self, xml_content: &str, number: usize) -> Result<TemplateSlide> {
        let mut slide = TemplateSlide::new(number);
        for shape in self.parse_shapes(xml_content)? {
            slide.add_shape(shape);
        }
        Ok(slide)
    }

    /// Extract the top-level shapes of `p:spTree` in document order.
    pub fn parse_shapes(&self, xml_content: &str) -> Result<Vec<ShapeInfo>> {
        let mut reader = Reader::from_str(xml_content);
        reader.trim_text(false);
        let mut state = TreeState::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => state.open(e, false),
                Ok(Event::Empty(ref e)) => state.open(e, true),
                Ok(Event::Text(ref e)) => {
                    if state.in_text_run() {
                        let text = e.unescape().unwrap_or_default();
                        state.push_text(&text);
                    }
                }
                Ok(Event::End(_)) => state.close(),
                Ok(Event::Eof) => break,
                Err(e) => {
                    log::warn!("XML parsing error, slide read up to here: {}", e);
                    break;
                }
                _ => {}
            }
        }

        Ok(state.shapes)
    }
}

impl Default for SlideParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A shape being read and where it sits in the element stack.
struct OpenShape {
    shape: ShapeInfo,
    depth: usize,
    cnvpr_seen: bool,
    off_seen: bool,
    ext_seen: bool,
    in_text_body: bool,
    paragraph: Option<ParagraphInfo>,
    first_run_seen: bool,
    in_first_run: bool,
    in_first_rpr: bool,
}

impl OpenShape {
    fn new(kind: ShapeKind, index: usize, depth: usize) -> Self {
        Self {
            shape: ShapeInfo::new(kind, index),
            depth,
            cnvpr_seen: false,
            off_seen: false,
            ext_seen: false,
            in_text_body: false,
            paragraph: None,
            first_run_seen: false,
            in_first_run: false,
            in_first_rpr: false,
        }
    }

    fn finish_paragraph(&mut self) {
        if let Some(mut paragraph) = self.paragraph.take() {
            if paragraph.run_style.as_ref().is_some_and(RunStyle::is_empty) {
                paragraph.run_style = None;
            }
            self.shape.paragraphs.push(paragraph);
        }
        self.first_run_seen = false;
        self.in_first_run = false;
        self.in_first_rpr = false;
    }
}

#[derive(Default)]
struct TreeState {
    stack: Vec<Vec<u8>>,
    current: Option<OpenShape>,
    next_index: usize,
    shapes: Vec<ShapeInfo>,
}

impl TreeState {
    fn parent(&self) -> Option<&[u8]> {
        self.stack.last().map(Vec::as_slice)
    }

    fn grandparent(&self) -> Option<&[u8]> {
        self.stack
            .len()
            .checked_sub(2)
            .map(|idx| self.stack[idx].as_slice())
    }

    fn in_text_run(&self) -> bool {
        self.parent() == Some(b"t".as_slice())
            && self.current.as_ref().is_some_and(|c| c.paragraph.is_some())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(paragraph) = self.current.as_mut().and_then(|c| c.paragraph.as_mut()) {
            paragraph.text.push_str(text);
        }
    }

    fn open(&mut self, e: &BytesStart, empty: bool) {
        let name = local_name(e.name().as_ref()).to_vec();

        if self.current.is_none() {
            if self.parent() == Some(b"spTree".as_slice()) {
                if let Some(kind) = ShapeKind::from_local_name(&name) {
                    self.current = Some(OpenShape::new(kind, self.next_index, self.stack.len()));
                    self.next_index += 1;
                    if empty {
                        self.finish_shape();
                        return;
                    }
                }
            }
        } else {
            self.open_in_shape(e, &name, empty);
        }

        if !empty {
            self.stack.push(name);
        }
    }

    fn open_in_shape(&mut self, e: &BytesStart, name: &[u8], empty: bool) {
        let depth = self.stack.len();
        let parent = self.parent().map(<[u8]>::to_vec).unwrap_or_default();
        let grandparent = self.grandparent().map(<[u8]>::to_vec).unwrap_or_default();
        let Some(open) = self.current.as_mut() else {
            return;
        };

        match name {
            b"cNvPr" if !open.cnvpr_seen => {
                open.cnvpr_seen = true;
                open.shape.id = attr(e, b"id").and_then(|v| v.parse().ok()).unwrap_or(0);
                open.shape.name = attr(e, b"name").unwrap_or_default();
            }
            b"ph" if depth == open.depth + 3 => open.shape.is_placeholder = true,
            b"off" if parent == b"xfrm" && !open.off_seen => {
                open.off_seen = true;
                open.shape.bounds.x = parse_emu(e, b"x");
                open.shape.bounds.y = parse_emu(e, b"y");
            }
            b"ext" if parent == b"xfrm" && !open.ext_seen => {
                open.ext_seen = true;
                open.shape.bounds.cx = parse_emu(e, b"cx");
                open.shape.bounds.cy = parse_emu(e, b"cy");
            }
            b"txBody" if depth == open.depth + 1 && open.shape.kind == ShapeKind::Shape => {
                open.shape.has_text_frame = true;
                open.in_text_body = !empty;
            }
            b"p" if open.in_text_body && parent == b"txBody" => {
                open.paragraph = Some(ParagraphInfo::default());
                if empty {
                    open.finish_paragraph();
                }
            }
            b"buChar" if parent == b"pPr" => {
                if let Some(paragraph) = open.paragraph.as_mut() {
                    paragraph.bullet_char = attr(e, b"char");
                }
            }
            b"srgbClr" if parent == b"buClr" => {
                if let Some(paragraph) = open.paragraph.as_mut() {
                    paragraph.bullet_color = attr(e, b"val");
                }
            }
            b"r" if parent == b"p" && open.paragraph.is_some() && !open.first_run_seen => {
                open.first_run_seen = true;
                open.in_first_run = !empty;
                if let Some(paragraph) = open.paragraph.as_mut() {
                    paragraph.run_style = Some(RunStyle::default());
                }
            }
            b"rPr" if parent == b"r" && open.in_first_run => {
                if let Some(style) = open.paragraph.as_mut().and_then(|p| p.run_style.as_mut()) {
                    style.size = attr(e, b"sz").and_then(|v| v.parse().ok());
                    style.bold = attr(e, b"b").map(|v| parse_bool(&v));
                    style.italic = attr(e, b"i").map(|v| parse_bool(&v));
                }
                open.in_first_rpr = !empty;
            }
            b"srgbClr" if open.in_first_rpr && parent == b"solidFill" && grandparent == b"rPr" => {
                if let Some(style) = open.paragraph.as_mut().and_then(|p| p.run_style.as_mut()) {
                    style.color = attr(e, b"val");
                }
            }
            b"latin" if open.in_first_rpr && parent == b"rPr" => {
                if let Some(style) = open.paragraph.as_mut().and_then(|p| p.run_style.as_mut()) {
                    style.font_name = attr(e, b"typeface").filter(|t| !t.is_empty());
                }
            }
            b"br" if parent == b"p" => {
                if let Some(paragraph) = open.paragraph.as_mut() {
                    paragraph.text.push('\n');
                }
            }
            _ => {}
        }
    }

    fn close(&mut self) {
        let Some(name) = self.stack.pop() else {
            return;
        };
        let depth = self.stack.len();
        let Some(open) = self.current.as_mut() else {
            return;
        };

        if depth == open.depth {
            self.finish_shape();
            return;
        }
        match name.as_slice() {
            b"p" if open.in_text_body => open.finish_paragraph(),
            b"rPr" => open.in_first_rpr = false,
            b"r" => open.in_first_run = false,
            b"txBody" if depth == open.depth + 1 => open.in_text_body = false,
            _ => {}
        }
    }

    fn finish_shape(&mut self) {
        if let Some(mut open) = self.current.take() {
            open.finish_paragraph();
            log::trace!(
                "shape {} '{}' {:?} at ({}, {})",
                open.shape.id,
                open.shape.name,
                open.shape.kind,
                open.shape.bounds.x,
                open.shape.bounds.y
            );
            self.shapes.push(open.shape);
        }
    }
}

fn parse_emu(e: &BytesStart, key: &[u8]) -> i64 {
    attr(e, key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "on")
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
pub fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".rels").trim_end_matches(".xml");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
