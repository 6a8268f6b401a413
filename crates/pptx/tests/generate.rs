use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use flashdeck_core::geometry::inches_to_emu;
use flashdeck_core::{verify_slide, Field, PortfolioData, TemplateLayout};
use flashdeck_pptx::xml::{write_relationships, ContentTypes, Relationship, CONTENT_TYPE_SLIDE};
use flashdeck_pptx::{Deck, FlashReportGenerator, Package, TemplateAnalysis};

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

fn rel(id: &str, kind: &str, target: &str) -> Relationship {
    Relationship {
        id: id.to_string(),
        rel_type: format!("http://schemas.openxmlformats.org/officeDocument/2006/relationships/{}", kind),
        target: target.to_string(),
        target_mode: None,
    }
}

fn text_shape(id: usize, name: &str, x: f64, y: f64, text: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square"/><a:lstStyle/><a:p><a:pPr><a:buFont typeface="Arial"/><a:buChar char="•"/></a:pPr><a:r><a:rPr lang="fr-FR" sz="1000"/><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#,
        inches_to_emu(x),
        inches_to_emu(y),
        inches_to_emu(4.0),
        inches_to_emu(0.2),
    )
}

fn slide_xml(shapes: &str) -> String {
    format!(
        r#"{DECLARATION}<p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

/// A project card with one text box per field, offset horizontally by `shift` inches.
fn project_card(layout: &TemplateLayout, shift: f64) -> String {
    let shapes: String = layout
        .fields
        .iter()
        .enumerate()
        .map(|(i, (field, spec))| {
            text_shape(
                i + 2,
                &field.to_string(),
                spec.expected.x + shift,
                spec.expected.y,
                "Lorem ipsum",
            )
        })
        .collect();
    slide_xml(&shapes)
}

/// A two-slide template: the project card followed by a slide with notes.
fn template(card: String) -> Deck {
    let mut package = Package::default();

    let mut types = ContentTypes::default();
    types.defaults.push((
        "rels".to_string(),
        "application/vnd.openxmlformats-package.relationships+xml".to_string(),
    ));
    types.defaults.push(("xml".to_string(), "application/xml".to_string()));
    types.set_override(
        "ppt/presentation.xml",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
    );
    types.set_override("ppt/slides/slide1.xml", CONTENT_TYPE_SLIDE);
    types.set_override("ppt/slides/slide2.xml", CONTENT_TYPE_SLIDE);
    types.set_override(
        "ppt/notesSlides/notesSlide1.xml",
        "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml",
    );
    package.set_part("[Content_Types].xml", types.to_xml().unwrap().into_bytes());
    package.set_part(
        "_rels/.rels",
        write_relationships(&[rel("rId1", "officeDocument", "ppt/presentation.xml")])
            .unwrap()
            .into_bytes(),
    );

    let presentation = format!(
        r#"{DECLARATION}<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst><p:sldSz cx="9144000" cy="5143500"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    );
    package.set_part("ppt/presentation.xml", presentation.into_bytes());
    let rels = [
        rel("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        rel("rId2", "slide", "slides/slide1.xml"),
        rel("rId3", "slide", "slides/slide2.xml"),
    ];
    package.set_part("ppt/_rels/presentation.xml.rels", write_relationships(&rels).unwrap().into_bytes());

    let layout_ids: String = (1..=4)
        .map(|i| format!(r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2147483648u32 + i, i))
        .collect();
    let master = format!(
        r#"{DECLARATION}<p:sldMaster {NS}><p:cSld><p:spTree/></p:cSld><p:sldLayoutIdLst>{layout_ids}</p:sldLayoutIdLst></p:sldMaster>"#
    );
    package.set_part("ppt/slideMasters/slideMaster1.xml", master.into_bytes());
    let master_rels: Vec<Relationship> = (1..=4)
        .map(|i| rel(&format!("rId{}", i), "slideLayout", &format!("../slideLayouts/slideLayout{}.xml", i)))
        .collect();
    package.set_part(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        write_relationships(&master_rels).unwrap().into_bytes(),
    );
    for (i, name) in ["Title", "Project_Card", "Blank", "Texte"].iter().enumerate() {
        let layout = format!(
            r#"{DECLARATION}<p:sldLayout {NS}><p:cSld name="{name}"><p:spTree/></p:cSld></p:sldLayout>"#
        );
        package.set_part(&format!("ppt/slideLayouts/slideLayout{}.xml", i + 1), layout.into_bytes());
    }

    package.set_part("ppt/slides/slide1.xml", card.into_bytes());
    package.set_part(
        "ppt/slides/slide2.xml",
        slide_xml(&text_shape(2, "Follow Up", 0.5, 0.5, "Follow up")).into_bytes(),
    );
    let layout_rel = rel("rId1", "slideLayout", "../slideLayouts/slideLayout2.xml");
    package.set_part(
        "ppt/slides/_rels/slide1.xml.rels",
        write_relationships(&[layout_rel.clone()]).unwrap().into_bytes(),
    );
    package.set_part(
        "ppt/slides/_rels/slide2.xml.rels",
        write_relationships(&[layout_rel, rel("rId2", "notesSlide", "../notesSlides/notesSlide1.xml")])
            .unwrap()
            .into_bytes(),
    );
    package.set_part("ppt/notesSlides/notesSlide1.xml", b"<p:notes/>".to_vec());

    Deck::from_package(package).unwrap()
}

fn portfolio() -> PortfolioData {
    PortfolioData::from_json_str(
        r#"{
            "projects": [
                {
                    "project": {
                        "name": "ERP Rollout",
                        "short_id": "ERP",
                        "status": "in_progress",
                        "mood": "good",
                        "progress": 45,
                        "description_text": "Finance module is live. Supply chain follows in Q3.",
                        "owner": { "name": "Grace Hopper" }
                    },
                    "milestones": [
                        { "name": "Kickoff", "status": "done" },
                        { "name": "Go live", "status": "pending" }
                    ]
                },
                {
                    "project": { "name": "Data Platform", "short_id": "DAT" },
                    "resolved": { "status": "Paused", "mood": "Worried" }
                },
                {
                    "project": null
                }
            ]
        }"#,
    )
    .unwrap()
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 7)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn shape_text(deck: &Deck, slide: usize, name: &str) -> String {
    deck.parse_slide(slide)
        .unwrap()
        .shapes
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.text())
        .unwrap_or_else(|| panic!("no shape {} on slide {}", name, slide + 1))
}

#[test]
fn test_generates_one_slide_per_project() {
    let layout = TemplateLayout::default();
    let generator = FlashReportGenerator::new(layout.clone());
    let deck = template(project_card(&layout, 0.0));

    let (mut deck, summary) = generator
        .build(deck, &portfolio(), "template.pptx", now())
        .unwrap()
        .expect("projects present");

    assert_eq!(summary.projects, 3);
    assert_eq!(summary.slides, 5);
    assert!(summary.template_valid);
    assert_eq!(summary.fields_filled, 3 * layout.fields.len());
    assert_eq!(summary.fields_unmatched, 0);
    assert!(summary.data_notes > 0);

    let mut deck = Deck::from_bytes(&deck.to_bytes().unwrap()).unwrap();
    assert_eq!(deck.slide_count(), 5);

    let ids: HashSet<u32> = deck.slides().iter().map(|s| s.id).collect();
    let rel_ids: HashSet<&str> = deck.slides().iter().map(|s| s.rel_id.as_str()).collect();
    let parts: HashSet<&str> = deck.slides().iter().map(|s| s.part.as_str()).collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(rel_ids.len(), 5);
    assert_eq!(parts.len(), 5);

    let first = deck.parse_slide(0).unwrap();
    assert_eq!(first.shapes[0].text(), "Portfolio Flash Report");
    assert_eq!(first.layout.as_deref(), Some("Texte"));
    let last = deck.parse_slide(4).unwrap();
    assert_eq!(last.shapes[0].text(), "Data Notes");

    let title = Field::Title.to_string();
    assert_eq!(shape_text(&deck, 1, &title), "Project review : ERP Rollout");
    assert_eq!(shape_text(&deck, 2, &title), "Project review : Data Platform");
    assert_eq!(shape_text(&deck, 3, &title), "Project review : Unknown Project");
    assert_eq!(shape_text(&deck, 1, &Field::Date.to_string()), "07/03/2025");
    assert_eq!(
        shape_text(&deck, 2, &Field::MoodStatus.to_string()),
        "Status: Paused\nMood: Worried"
    );
    assert!(shape_text(&deck, 1, &Field::Scope.to_string()).contains("Milestones: 1/2"));

    for slide in 1..=3 {
        let card = deck.parse_slide(slide).unwrap();
        assert_eq!(card.layout.as_deref(), Some("Project_Card"));
        assert!(card.shapes.iter().all(|s| s.text() != "Lorem ipsum"));
    }
    let xml = deck.slide_xml(1).unwrap();
    assert!(!xml.contains("Follow up"));

    // the follow-up slide and its notes are gone
    let saved = deck.to_bytes().unwrap();
    let package = Package::from_bytes(&saved).unwrap();
    assert!(!package.contains("ppt/notesSlides/notesSlide1.xml"));
}

#[test]
fn test_no_projects_generates_nothing() {
    let layout = TemplateLayout::default();
    let generator = FlashReportGenerator::new(layout.clone());
    let deck = template(project_card(&layout, 0.0));
    let data = PortfolioData::from_json_str(r#"{ "projects": [] }"#).unwrap();

    assert!(generator.build(deck, &data, "template.pptx", now()).unwrap().is_none());
}

#[test]
fn test_drifted_template_still_generates() {
    let layout = TemplateLayout::default();
    let generator = FlashReportGenerator::new(layout.clone());
    let deck = template(project_card(&layout, 20.0));

    let report = verify_slide(&deck.parse_slide(0).unwrap(), &layout, "template.pptx");
    assert!(!report.is_valid());
    assert!(!report.action_items().is_empty());

    let (_, summary) = generator
        .build(deck, &portfolio(), "template.pptx", now())
        .unwrap()
        .expect("projects present");
    assert!(!summary.template_valid);
    assert_eq!(summary.fields_filled, 0);
    assert_eq!(summary.fields_unmatched, 3 * layout.fields.len());
    assert_eq!(summary.slides, 5);
}

#[test]
fn test_verify_and_analyze_template_file() {
    let layout = TemplateLayout::default();
    let mut deck = template(project_card(&layout, 0.0));
    let path = std::env::temp_dir().join(format!("flashdeck-template-{}.pptx", std::process::id()));
    deck.save(&path).unwrap();

    let report = FlashReportGenerator::new(layout.clone()).verify(&path).unwrap();
    assert!(report.is_valid());
    assert_eq!(report.matched_count(), layout.fields.len());

    let analysis = TemplateAnalysis::analyze(&path, 0, now()).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(analysis.slides.len(), 2);
    assert_eq!(analysis.shape_count(), layout.fields.len() + 1);

    let json: serde_json::Value = serde_json::from_str(&analysis.to_json().unwrap()).unwrap();
    assert_eq!(json["_exported_at"], "2025-03-07T09:30:00");
    assert_eq!(json["_dimensions"]["width_inches"], 10.0);
    assert_eq!(json["slides"][0]["layout"], "Project_Card");
    assert_eq!(json["layouts"].as_array().map(Vec::len), Some(4));
}
