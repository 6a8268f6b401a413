//! XML helpers shared by the parser, the editor and the deck: element names,
//! attributes, relationship parts, content types and id lists.

use flashdeck_core::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub const REL_TYPE_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const REL_TYPE_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub const REL_TYPE_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
pub const REL_TYPE_NOTES_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

pub const CONTENT_TYPE_SLIDE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Prefix of a qualified name including the colon (`p:` for `p:sldIdLst`).
pub fn prefix_of(name: &[u8]) -> String {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => String::from_utf8_lossy(&name[..=pos]).to_string(),
        None => String::new(),
    }
}

/// Unescaped value of the attribute whose qualified name is `key`.
pub fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

pub(crate) fn xml_error(context: &str, e: impl std::fmt::Display) -> Error {
    Error::XmlError(format!("{}: {}", context, e))
}

pub(crate) fn write_event<'a>(writer: &mut Writer<Vec<u8>>, event: Event<'a>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| xml_error("Failed to write XML", e))
}

pub(crate) fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner()).map_err(|e| xml_error("Generated XML is not UTF-8", e))
}

pub(crate) fn declaration(writer: &mut Writer<Vec<u8>>) -> Result<()> {
    write_event(
        writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )
}

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub target_mode: Option<String>,
}

impl Relationship {
    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some("External")
    }
}

pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                rels.push(Relationship {
                    id: attr(e, b"Id").unwrap_or_default(),
                    rel_type: attr(e, b"Type").unwrap_or_default(),
                    target: attr(e, b"Target").unwrap_or_default(),
                    target_mode: attr(e, b"TargetMode"),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("Error parsing relationships", e)),
            _ => {}
        }
    }

    Ok(rels)
}

pub fn write_relationships(rels: &[Relationship]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    declaration(&mut writer)?;

    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", RELATIONSHIPS_NS));
    write_event(&mut writer, Event::Start(root))?;
    for rel in rels {
        let mut e = BytesStart::new("Relationship");
        e.push_attribute(("Id", rel.id.as_str()));
        e.push_attribute(("Type", rel.rel_type.as_str()));
        e.push_attribute(("Target", rel.target.as_str()));
        if let Some(mode) = &rel.target_mode {
            e.push_attribute(("TargetMode", mode.as_str()));
        }
        write_event(&mut writer, Event::Empty(e))?;
    }
    write_event(&mut writer, Event::End(BytesEnd::new("Relationships")))?;

    into_string(writer)
}

/// First `rIdN` not used by `rels`.
pub fn next_relationship_id(rels: &[Relationship]) -> String {
    let max = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// `[Content_Types].xml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// `(extension, content type)`
    pub defaults: Vec<(String, String)>,
    /// `(part name with leading slash, content type)`
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut types = ContentTypes::default();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    match local_name(e.name().as_ref()) {
                        b"Default" => types.defaults.push((
                            attr(e, b"Extension").unwrap_or_default(),
                            attr(e, b"ContentType").unwrap_or_default(),
                        )),
                        b"Override" => types.overrides.push((
                            attr(e, b"PartName").unwrap_or_default(),
                            attr(e, b"ContentType").unwrap_or_default(),
                        )),
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error("Error parsing content types", e)),
                _ => {}
            }
        }

        Ok(types)
    }

    pub fn override_for(&self, part: &str) -> Option<&str> {
        let name = format!("/{}", part);
        self.overrides
            .iter()
            .find(|(p, _)| *p == name)
            .map(|(_, ct)| ct.as_str())
    }

    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let name = format!("/{}", part);
        match self.overrides.iter_mut().find(|(p, _)| *p == name) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.overrides.push((name, content_type.to_string())),
        }
    }

    pub fn remove_override(&mut self, part: &str) {
        let name = format!("/{}", part);
        self.overrides.retain(|(p, _)| *p != name);
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        declaration(&mut writer)?;

        let mut root = BytesStart::new("Types");
        root.push_attribute(("xmlns", CONTENT_TYPES_NS));
        write_event(&mut writer, Event::Start(root))?;
        for (ext, ct) in &self.defaults {
            let mut e = BytesStart::new("Default");
            e.push_attribute(("Extension", ext.as_str()));
            e.push_attribute(("ContentType", ct.as_str()));
            write_event(&mut writer, Event::Empty(e))?;
        }
        for (part, ct) in &self.overrides {
            let mut e = BytesStart::new("Override");
            e.push_attribute(("PartName", part.as_str()));
            e.push_attribute(("ContentType", ct.as_str()));
            write_event(&mut writer, Event::Empty(e))?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new("Types")))?;

        into_string(writer)
    }
}

/// An entry of `p:sldIdLst`, `p:sldMasterIdLst` or `p:sldLayoutIdLst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdEntry {
    pub id: u32,
    pub rel_id: String,
}

/// Entries of the first list element named `list` (local name), in
/// document order.
pub fn parse_id_list(xml: &str, list: &[u8]) -> Result<Vec<IdEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut entries = Vec::new();
    let mut depth_in_list = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if depth_in_list > 0 {
                    depth_in_list += 1;
                    if depth_in_list == 2 {
                        push_id_entry(e, &mut entries);
                    }
                } else if local_name(e.name().as_ref()) == list {
                    depth_in_list = 1;
                }
            }
            Ok(Event::Empty(ref e)) if depth_in_list == 1 => push_id_entry(e, &mut entries),
            Ok(Event::Empty(ref e))
                if depth_in_list == 0 && local_name(e.name().as_ref()) == list =>
            {
                break;
            }
            Ok(Event::End(_)) if depth_in_list > 0 => {
                depth_in_list -= 1;
                if depth_in_list == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("Error parsing id list", e)),
            _ => {}
        }
    }

    Ok(entries)
}

fn push_id_entry(e: &BytesStart, entries: &mut Vec<IdEntry>) {
    let mut id = None;
    let mut rel_id = None;
    for a in e.attributes().flatten() {
        let key = a.key.as_ref();
        if key == b"id" {
            id = a.unescape_value().ok().and_then(|v| v.parse::<u32>().ok());
        } else if local_name(key) == b"id" {
            rel_id = a.unescape_value().ok().map(|v| v.to_string());
        }
    }
    match (id, rel_id) {
        (Some(id), Some(rel_id)) => entries.push(IdEntry { id, rel_id }),
        _ => log::warn!("Skipping malformed id list entry"),
    }
}

/// Extension holding the slide section list.
const SECTION_EXT_URI: &str = "{521415D9-36F7-43E2-AB2F-B90AF26B5E84}";

fn is_section_list(e: &BytesStart) -> bool {
    match local_name(e.name().as_ref()) {
        b"sectionLst" => true,
        b"ext" => attr(e, b"uri").as_deref() == Some(SECTION_EXT_URI),
        _ => false,
    }
}

/// Rewrite `p:sldIdLst` of presentation.xml with `entries`, passing the rest
/// of the document through. Section lists, which reference slide ids, are
/// dropped.
pub fn rewrite_slide_id_list(xml: &str, entries: &[IdEntry]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut skip_depth = 0usize;
    let mut written = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error("Error parsing presentation", e))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                write_slide_id_list(&mut writer, &prefix_of(e.name().as_ref()), entries)?;
                written = true;
                skip_depth = 1;
            }
            Event::Empty(ref e) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                write_slide_id_list(&mut writer, &prefix_of(e.name().as_ref()), entries)?;
                written = true;
            }
            Event::Start(ref e) if is_section_list(e) => {
                log::debug!("Dropping section list");
                skip_depth = 1;
            }
            Event::Empty(ref e) if is_section_list(e) => {}
            Event::Start(ref e) if local_name(e.name().as_ref()) == b"sldSz" && !written => {
                // The id list precedes the slide size; insert it when the
                // presentation had none.
                write_slide_id_list(&mut writer, &prefix_of(e.name().as_ref()), entries)?;
                written = true;
                write_event(&mut writer, event)?;
            }
            Event::Empty(ref e) if local_name(e.name().as_ref()) == b"sldSz" && !written => {
                write_slide_id_list(&mut writer, &prefix_of(e.name().as_ref()), entries)?;
                written = true;
                write_event(&mut writer, event)?;
            }
            Event::Eof => break,
            other => write_event(&mut writer, other)?,
        }
    }

    into_string(writer)
}

fn write_slide_id_list(writer: &mut Writer<Vec<u8>>, prefix: &str, entries: &[IdEntry]) -> Result<()> {
    let list = format!("{}sldIdLst", prefix);
    let item = format!("{}sldId", prefix);
    write_event(writer, Event::Start(BytesStart::new(list.as_str())))?;
    for entry in entries {
        let mut e = BytesStart::new(item.as_str());
        let id = entry.id.to_string();
        e.push_attribute(("id", id.as_str()));
        e.push_attribute(("r:id", entry.rel_id.as_str()));
        write_event(writer, Event::Empty(e))?;
    }
    write_event(writer, Event::End(BytesEnd::new(list.as_str())))
}

/// `cx`/`cy` of `p:sldSz` in EMU.
pub fn parse_slide_size(xml: &str) -> Option<(i64, i64)> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldSz" =>
            {
                let cx = attr(e, b"cx")?.parse().ok()?;
                let cy = attr(e, b"cy")?.parse().ok()?;
                return Some((cx, cy));
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// `p:cSld/@name` of a slide, layout or master part.
pub fn parse_common_slide_name(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"cSld" =>
            {
                return attr(e, b"name").filter(|n| !n.is_empty());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
