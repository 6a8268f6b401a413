//! DrawingML output: paragraphs for a text body, and whole text-box slides.

use flashdeck_core::{FieldContent, Rect, Result, StyleRole, StyleSheet, TextBlock, TextStyle};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::xml::{declaration, into_string, write_event};

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

/// How a paragraph's bullet is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulletMode {
    /// Keep whatever the reused paragraph properties say.
    Inherit,
    Bullet { char: String, color: String },
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphSpec {
    /// `\n` becomes `a:br`.
    pub text: String,
    pub style: TextStyle,
    pub bullet: BulletMode,
}

impl ParagraphSpec {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            bullet: BulletMode::Inherit,
        }
    }

    pub fn with_bullet(mut self, bullet: BulletMode) -> Self {
        self.bullet = bullet;
        self
    }
}

/// The paragraphs replacing a shape's text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBody {
    pub paragraphs: Vec<ParagraphSpec>,
}

impl TextBody {
    pub fn plain(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            paragraphs: vec![ParagraphSpec::new(text, style)],
        }
    }

    /// Style a field's content with the template's style sheet.
    pub fn from_content(content: &FieldContent, sheet: &StyleSheet) -> Self {
        let sized = |style: &TextStyle| match content.font_size {
            Some(points) => style.with_size_points(points),
            None => style.clone(),
        };
        let role_style = sized(sheet.role(content.role));

        match &content.block {
            TextBlock::Plain(text) => Self::plain(text.clone(), role_style),
            TextBlock::Structured {
                title,
                padding_lines,
                items,
                bullets,
            } => {
                let mut paragraphs = Vec::with_capacity(1 + padding_lines + items.len());
                if let Some(title) = title {
                    let mut style = sheet.role(StyleRole::InlineTitle).clone();
                    if style.size.is_none() {
                        style = sized(&style);
                    }
                    paragraphs.push(ParagraphSpec::new(title.clone(), style).with_bullet(BulletMode::None));
                }
                for _ in 0..*padding_lines {
                    paragraphs.push(ParagraphSpec::new("", role_style.clone()).with_bullet(BulletMode::None));
                }
                for item in items {
                    let paragraph = ParagraphSpec::new(item.clone(), role_style.clone());
                    paragraphs.push(if *bullets {
                        paragraph.with_bullet(BulletMode::Bullet {
                            char: sheet.bullet.char.clone(),
                            color: sheet.bullet.color.clone(),
                        })
                    } else {
                        paragraph
                    });
                }
                Self { paragraphs }
            }
        }
    }

    /// Plain text, one line per paragraph.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `a:pPr` of an existing paragraph, kept so new paragraphs keep its
/// indentation, spacing and alignment.
#[derive(Debug, Clone, Default)]
pub struct ParagraphTemplate {
    pub attributes: Vec<(String, String)>,
    /// Spacing children (`a:lnSpc`, `a:spcBef`, `a:spcAft`).
    pub before: Vec<Event<'static>>,
    /// Bullet children, written back only for [`BulletMode::Inherit`].
    pub bullet: Vec<Event<'static>>,
    /// `a:tabLst`, `a:defRPr`, `a:extLst`.
    pub after: Vec<Event<'static>>,
}

impl ParagraphTemplate {
    fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && self.before.is_empty()
            && self.bullet.is_empty()
            && self.after.is_empty()
    }
}

/// Whether a `a:pPr` child is a bullet property.
pub fn is_bullet_property(local: &[u8]) -> bool {
    local.starts_with(b"bu")
}

/// Whether a `a:pPr` child is written before the bullet properties.
pub fn is_spacing_property(local: &[u8]) -> bool {
    matches!(local, b"lnSpc" | b"spcBef" | b"spcAft")
}

/// Write the paragraphs of `body` with DrawingML prefix `prefix` (`a:`).
pub fn write_paragraphs(
    writer: &mut Writer<Vec<u8>>,
    body: &TextBody,
    template: Option<&ParagraphTemplate>,
    prefix: &str,
) -> Result<()> {
    let tag = |local: &str| format!("{}{}", prefix, local);

    for paragraph in &body.paragraphs {
        write_event(writer, Event::Start(BytesStart::new(tag("p"))))?;
        write_paragraph_properties(writer, paragraph, template, prefix)?;

        for (idx, line) in paragraph.text.split('\n').enumerate() {
            if idx > 0 {
                write_event(writer, Event::Start(BytesStart::new(tag("br"))))?;
                write_run_properties(writer, &paragraph.style, &tag("rPr"), prefix)?;
                write_event(writer, Event::End(BytesEnd::new(tag("br"))))?;
            }
            if line.is_empty() {
                continue;
            }
            write_event(writer, Event::Start(BytesStart::new(tag("r"))))?;
            write_run_properties(writer, &paragraph.style, &tag("rPr"), prefix)?;
            write_event(writer, Event::Start(BytesStart::new(tag("t"))))?;
            write_event(writer, Event::Text(BytesText::new(line)))?;
            write_event(writer, Event::End(BytesEnd::new(tag("t"))))?;
            write_event(writer, Event::End(BytesEnd::new(tag("r"))))?;
        }

        write_run_properties(writer, &paragraph.style, &tag("endParaRPr"), prefix)?;
        write_event(writer, Event::End(BytesEnd::new(tag("p"))))?;
    }
    Ok(())
}

fn write_paragraph_properties(
    writer: &mut Writer<Vec<u8>>,
    paragraph: &ParagraphSpec,
    template: Option<&ParagraphTemplate>,
    prefix: &str,
) -> Result<()> {
    let empty = ParagraphTemplate::default();
    let template = template.unwrap_or(&empty);
    if template.is_empty() && paragraph.bullet == BulletMode::Inherit {
        return Ok(());
    }

    let tag = |local: &str| format!("{}{}", prefix, local);
    let mut start = BytesStart::new(tag("pPr"));
    for (key, value) in &template.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    write_event(writer, Event::Start(start))?;

    for event in &template.before {
        write_event(writer, event.clone())?;
    }
    match &paragraph.bullet {
        BulletMode::Inherit => {
            for event in &template.bullet {
                write_event(writer, event.clone())?;
            }
        }
        BulletMode::Bullet { char, color } => {
            write_event(writer, Event::Start(BytesStart::new(tag("buClr"))))?;
            write_color(writer, color, prefix)?;
            write_event(writer, Event::End(BytesEnd::new(tag("buClr"))))?;
            let mut bu_char = BytesStart::new(tag("buChar"));
            bu_char.push_attribute(("char", char.as_str()));
            write_event(writer, Event::Empty(bu_char))?;
        }
        BulletMode::None => {
            write_event(writer, Event::Empty(BytesStart::new(tag("buNone"))))?;
        }
    }
    for event in &template.after {
        write_event(writer, event.clone())?;
    }

    write_event(writer, Event::End(BytesEnd::new(tag("pPr"))))
}

fn write_color(writer: &mut Writer<Vec<u8>>, color: &str, prefix: &str) -> Result<()> {
    let mut srgb = BytesStart::new(format!("{}srgbClr", prefix));
    srgb.push_attribute(("val", color));
    write_event(writer, Event::Empty(srgb))
}

/// `a:rPr` (or `a:endParaRPr`) for `style`. Unset properties are left to
/// the list styles.
fn write_run_properties(
    writer: &mut Writer<Vec<u8>>,
    style: &TextStyle,
    name: &str,
    prefix: &str,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("lang", "en-US"));
    if let Some(size) = style.size {
        start.push_attribute(("sz", size.to_string().as_str()));
    }
    if let Some(bold) = style.bold {
        start.push_attribute(("b", if bold { "1" } else { "0" }));
    }
    if let Some(italic) = style.italic {
        start.push_attribute(("i", if italic { "1" } else { "0" }));
    }
    start.push_attribute(("dirty", "0"));

    if style.color.is_none() && style.font_name.is_none() {
        return write_event(writer, Event::Empty(start));
    }

    write_event(writer, Event::Start(start))?;
    if let Some(color) = &style.color {
        let fill = format!("{}solidFill", prefix);
        write_event(writer, Event::Start(BytesStart::new(fill.as_str())))?;
        write_color(writer, color, prefix)?;
        write_event(writer, Event::End(BytesEnd::new(fill.as_str())))?;
    }
    if let Some(font) = &style.font_name {
        let mut latin = BytesStart::new(format!("{}latin", prefix));
        latin.push_attribute(("typeface", font.as_str()));
        write_event(writer, Event::Empty(latin))?;
    }
    write_event(writer, Event::End(BytesEnd::new(name)))
}

/// A free text box placed on a generated slide.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub bounds: Rect,
    pub body: TextBody,
}

impl TextBox {
    /// A one-paragraph box at a position in inches.
    pub fn new(x: f64, y: f64, width: f64, height: f64, paragraph: ParagraphSpec) -> Self {
        Self {
            bounds: Rect::from_inches(x, y, width, height),
            body: TextBody {
                paragraphs: vec![paragraph],
            },
        }
    }
}

/// A complete slide part holding `boxes` as text boxes.
pub fn text_box_slide_xml(boxes: &[TextBox]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    declaration(&mut writer)?;

    let mut sld = BytesStart::new("p:sld");
    sld.push_attribute(("xmlns:a", NS_A));
    sld.push_attribute(("xmlns:r", NS_R));
    sld.push_attribute(("xmlns:p", NS_P));
    write_event(&mut writer, Event::Start(sld))?;
    write_event(&mut writer, Event::Start(BytesStart::new("p:cSld")))?;
    write_event(&mut writer, Event::Start(BytesStart::new("p:spTree")))?;

    write_event(&mut writer, Event::Start(BytesStart::new("p:nvGrpSpPr")))?;
    let mut root = BytesStart::new("p:cNvPr");
    root.push_attribute(("id", "1"));
    root.push_attribute(("name", ""));
    write_event(&mut writer, Event::Empty(root))?;
    write_event(&mut writer, Event::Empty(BytesStart::new("p:cNvGrpSpPr")))?;
    write_event(&mut writer, Event::Empty(BytesStart::new("p:nvPr")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("p:nvGrpSpPr")))?;
    write_event(&mut writer, Event::Start(BytesStart::new("p:grpSpPr")))?;
    write_transform(&mut writer, &Rect::default(), true)?;
    write_event(&mut writer, Event::End(BytesEnd::new("p:grpSpPr")))?;

    for (idx, text_box) in boxes.iter().enumerate() {
        write_text_box(&mut writer, text_box, idx as u32 + 2)?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("p:spTree")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("p:cSld")))?;
    write_event(&mut writer, Event::Start(BytesStart::new("p:clrMapOvr")))?;
    write_event(&mut writer, Event::Empty(BytesStart::new("a:masterClrMapping")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("p:clrMapOvr")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("p:sld")))?;
    into_string(writer)
}

fn write_transform(writer: &mut Writer<Vec<u8>>, rect: &Rect, group: bool) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new("a:xfrm")))?;
    let mut pairs = vec![
        ("a:off", "x", "y", rect.x, rect.y),
        ("a:ext", "cx", "cy", rect.cx, rect.cy),
    ];
    if group {
        pairs.push(("a:chOff", "x", "y", rect.x, rect.y));
        pairs.push(("a:chExt", "cx", "cy", rect.cx, rect.cy));
    }
    for (name, a, b, va, vb) in pairs {
        let mut e = BytesStart::new(name);
        e.push_attribute((a, va.to_string().as_str()));
        e.push_attribute((b, vb.to_string().as_str()));
        write_event(writer, Event::Empty(e))?;
    }
    write_event(writer, Event::End(BytesEnd::new("a:xfrm")))
}

fn write_text_box(writer: &mut Writer<Vec<u8>>, text_box: &TextBox, id: u32) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new("p:sp")))?;

    write_event(writer, Event::Start(BytesStart::new("p:nvSpPr")))?;
    let mut c_nv_pr = BytesStart::new("p:cNvPr");
    let name = format!("TextBox {}", id - 1);
    c_nv_pr.push_attribute(("id", id.to_string().as_str()));
    c_nv_pr.push_attribute(("name", name.as_str()));
    write_event(writer, Event::Empty(c_nv_pr))?;
    let mut c_nv_sp_pr = BytesStart::new("p:cNvSpPr");
    c_nv_sp_pr.push_attribute(("txBox", "1"));
    write_event(writer, Event::Empty(c_nv_sp_pr))?;
    write_event(writer, Event::Empty(BytesStart::new("p:nvPr")))?;
    write_event(writer, Event::End(BytesEnd::new("p:nvSpPr")))?;

    write_event(writer, Event::Start(BytesStart::new("p:spPr")))?;
    write_transform(writer, &text_box.bounds, false)?;
    let mut geometry = BytesStart::new("a:prstGeom");
    geometry.push_attribute(("prst", "rect"));
    write_event(writer, Event::Start(geometry))?;
    write_event(writer, Event::Empty(BytesStart::new("a:avLst")))?;
    write_event(writer, Event::End(BytesEnd::new("a:prstGeom")))?;
    write_event(writer, Event::Empty(BytesStart::new("a:noFill")))?;
    write_event(writer, Event::End(BytesEnd::new("p:spPr")))?;

    write_event(writer, Event::Start(BytesStart::new("p:txBody")))?;
    let mut body_pr = BytesStart::new("a:bodyPr");
    body_pr.push_attribute(("wrap", "square"));
    body_pr.push_attribute(("rtlCol", "0"));
    write_event(writer, Event::Start(body_pr))?;
    write_event(writer, Event::Empty(BytesStart::new("a:noAutofit")))?;
    write_event(writer, Event::End(BytesEnd::new("a:bodyPr")))?;
    write_event(writer, Event::Empty(BytesStart::new("a:lstStyle")))?;
    write_paragraphs(writer, &text_box.body, None, "a:")?;
    write_event(writer, Event::End(BytesEnd::new("p:txBody")))?;

    write_event(writer, Event::End(BytesEnd::new("p:sp")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashdeck_core::{Field, StyleDefaults};

    use crate::parser::SlideParser;

    fn sheet() -> StyleSheet {
        let mut sheet = StyleSheet::from_defaults(&StyleDefaults::default());
        sheet.inline_title = TextStyle {
            size: Some(900),
            bold: Some(true),
            ..TextStyle::default()
        };
        sheet
    }

    fn render(body: &TextBody, template: Option<&ParagraphTemplate>) -> String {
        let mut writer = Writer::new(Vec::new());
        write_paragraphs(&mut writer, body, template, "a:").unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_structured_content_paragraphs() {
        let content = FieldContent {
            field: Field::Made,
            role: StyleRole::Content,
            font_size: Some(8),
            block: TextBlock::Structured {
                title: Some("Made :".to_string()),
                padding_lines: 1,
                items: vec!["Kickoff".to_string(), "Pilot".to_string()],
                bullets: true,
            },
        };
        let body = TextBody::from_content(&content, &sheet());
        assert_eq!(body.paragraphs.len(), 4);
        assert_eq!(body.text(), "Made :\n\nKickoff\nPilot");

        assert_eq!(body.paragraphs[0].bullet, BulletMode::None);
        assert_eq!(body.paragraphs[0].style.size, Some(900));
        assert_eq!(body.paragraphs[0].style.bold, Some(true));
        assert_eq!(body.paragraphs[1].bullet, BulletMode::None);
        assert_eq!(
            body.paragraphs[2].bullet,
            BulletMode::Bullet {
                char: "▪".to_string(),
                color: "D32427".to_string()
            }
        );
        assert_eq!(body.paragraphs[2].style.size, Some(800));
        assert_eq!(body.paragraphs[2].style.color.as_deref(), Some("000000"));
        assert_eq!(body.paragraphs[2].style.font_name.as_deref(), Some("Lato"));
    }

    #[test]
    fn test_plain_text_line_breaks() {
        let body = TextBody::plain(
            "Status: ok\nMood: good & fine",
            TextStyle {
                size: Some(900),
                ..TextStyle::default()
            },
        );
        let xml = render(&body, None);
        assert!(xml.starts_with("<a:p><a:r><a:rPr lang=\"en-US\" sz=\"900\" dirty=\"0\"/>"));
        assert!(xml.contains("<a:t>Status: ok</a:t>"));
        assert!(xml.contains("<a:br><a:rPr lang=\"en-US\" sz=\"900\" dirty=\"0\"/></a:br>"));
        assert!(xml.contains("<a:t>Mood: good &amp; fine</a:t>"));
        assert!(!xml.contains("pPr"));
        assert!(xml.ends_with("<a:endParaRPr lang=\"en-US\" sz=\"900\" dirty=\"0\"/></a:p>"));
    }

    #[test]
    fn test_template_properties_reused_without_bullets() {
        let template = ParagraphTemplate {
            attributes: vec![("marL".to_string(), "171450".to_string())],
            before: vec![Event::Empty(BytesStart::new("a:spcBef"))],
            bullet: vec![Event::Empty(BytesStart::new("a:buFont"))],
            after: vec![Event::Empty(BytesStart::new("a:defRPr"))],
        };
        let body = TextBody {
            paragraphs: vec![
                ParagraphSpec::new("a", TextStyle::default()).with_bullet(BulletMode::Bullet {
                    char: "▪".to_string(),
                    color: "D32427".to_string(),
                }),
                ParagraphSpec::new("b", TextStyle::default()),
            ],
        };
        let xml = render(&body, Some(&template));
        assert!(xml.contains(
            "<a:pPr marL=\"171450\"><a:spcBef/><a:buClr><a:srgbClr val=\"D32427\"/></a:buClr><a:buChar char=\"▪\"/><a:defRPr/></a:pPr>"
        ));
        assert!(xml.contains("<a:pPr marL=\"171450\"><a:spcBef/><a:buFont/><a:defRPr/></a:pPr>"));
    }

    #[test]
    fn test_run_properties_order() {
        let style = TextStyle {
            font_name: Some("Lato".to_string()),
            size: Some(2000),
            color: Some("003366".to_string()),
            bold: Some(true),
            italic: Some(false),
        };
        let xml = render(&TextBody::plain("Title", style), None);
        assert!(xml.contains(
            "<a:rPr lang=\"en-US\" sz=\"2000\" b=\"1\" i=\"0\" dirty=\"0\"><a:solidFill><a:srgbClr val=\"003366\"/></a:solidFill><a:latin typeface=\"Lato\"/></a:rPr>"
        ));
    }

    #[test]
    fn test_text_box_slide_parses_back() {
        let boxes = vec![
            TextBox::new(0.4, 0.15, 9.0, 0.4, ParagraphSpec::new("Portfolio", TextStyle::default())),
            TextBox::new(0.3, 1.1, 0.7, 0.3, ParagraphSpec::new("ID", TextStyle::default())),
        ];
        let xml = text_box_slide_xml(&boxes).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));

        let shapes = SlideParser::new().parse_shapes(&xml).unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].id, 2);
        assert_eq!(shapes[0].name, "TextBox 1");
        assert_eq!(shapes[0].text(), "Portfolio");
        assert_eq!(shapes[1].bounds, Rect::from_inches(0.3, 1.1, 0.7, 0.3));
    }
}
