//! PPTX shape reader.
//!
//! Reads a deck back into per-slide shape summaries: geometry, fill and
//! outline state, and the resolved hyperlink of each shape.

use crate::package::{part, rel};
use click2pptx_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Kind of a slide shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShapeKind {
    Picture,
    Shape,
}

/// One shape found on a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeSummary {
    pub kind: ShapeKind,
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,

    /// Shape fill is `a:noFill`.
    pub no_fill: bool,

    /// Outline fill is `a:noFill`.
    pub no_line: bool,

    /// Target of the shape's click action.
    pub hyperlink: Option<String>,

    /// Package part of an embedded picture.
    pub image_part: Option<String>,
}

impl ShapeSummary {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            x: 0,
            y: 0,
            cx: 0,
            cy: 0,
            no_fill: false,
            no_line: false,
            hyperlink: None,
            image_part: None,
        }
    }
}

/// Shapes of one slide, in z-order.
#[derive(Debug, Clone, Serialize)]
pub struct SlideShapes {
    /// 1-based slide number.
    pub number: usize,
    pub shapes: Vec<ShapeSummary>,
}

/// Reader for PPTX (Office Open XML) decks.
pub struct DeckReader;

impl DeckReader {
    /// Create a new deck reader.
    pub fn new() -> Self {
        Self
    }

    /// Read every slide's shapes from a reader.
    pub fn read<R: Read + Seek>(&self, reader: R) -> Result<Vec<SlideShapes>> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let slides = self.slide_parts(&mut archive)?;
        log::debug!("Deck has {} slides", slides.len());

        slides
            .iter()
            .enumerate()
            .map(|(idx, slide_path)| self.read_slide(&mut archive, slide_path, idx + 1))
            .collect()
    }

    /// Slide part names in presentation relationship order.
    fn slide_parts<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        Ok(self
            .read_relationships(archive, part::PRESENTATION_RELS)?
            .into_iter()
            .filter(|r| r.rel_type == rel::SLIDE)
            .map(|r| resolve_target("ppt", &r.target))
            .collect())
    }

    fn read_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        number: usize,
    ) -> Result<SlideShapes> {
        let content = self.read_part(archive, slide_path)?;

        let (dir, file) = slide_path.rsplit_once('/').unwrap_or(("", slide_path));
        let rels_path = format!("{}/_rels/{}.rels", dir, file);
        let has_rels = archive.file_names().any(|name| name == rels_path);
        let targets: HashMap<String, String> = if has_rels {
            self.read_relationships(archive, &rels_path)?
                .into_iter()
                .map(|r| {
                    let target = if r.external {
                        r.target
                    } else {
                        resolve_target(dir, &r.target)
                    };
                    (r.id, target)
                })
                .collect()
        } else {
            HashMap::new()
        };

        let shapes = extract_shapes_from_xml(&content, &targets)?;
        Ok(SlideShapes { number, shapes })
    }

    /// Parse a relationships part.
    fn read_relationships<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<Vec<RelationshipEntry>> {
        let content = self.read_part(archive, path)?;
        let mut entries = Vec::new();

        let mut reader = Reader::from_str(&content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                    let mut entry = RelationshipEntry::default();
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        match attr.key.as_ref() {
                            b"Id" => entry.id = value,
                            b"Type" => entry.rel_type = value,
                            b"Target" => entry.target = unescape_attr(&value),
                            b"TargetMode" => entry.external = value == "External",
                            _ => {}
                        }
                    }
                    entries.push(entry);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships in '{}': {}",
                        path, e
                    )));
                }
                _ => {}
            }
        }

        Ok(entries)
    }

    /// Read a package part as text.
    fn read_part<R: Read + Seek>(&self, archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
        let mut content = String::new();
        archive
            .by_name(name)
            .map_err(|e| Error::ZipError(format!("Missing part '{}': {}", name, e)))?
            .read_to_string(&mut content)?;
        Ok(content)
    }
}

impl Default for DeckReader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct RelationshipEntry {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

/// Extract pictures and shapes from slide XML.
fn extract_shapes_from_xml(xml_content: &str, targets: &HashMap<String, String>) -> Result<Vec<ShapeSummary>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut current: Option<ShapeSummary> = None;
    let mut in_sp_pr = false;
    let mut in_ln = false;

    loop {
        let (e, is_empty) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::End(ref e)) => {
                match local_name(e.name().as_ref()) {
                    b"sp" | b"pic" => {
                        if let Some(shape) = current.take() {
                            shapes.push(shape);
                        }
                        in_sp_pr = false;
                        in_ln = false;
                    }
                    b"spPr" => in_sp_pr = false,
                    b"ln" => in_ln = false,
                    _ => {}
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
            }
            _ => continue,
        };

        let name = e.name();
        let name = local_name(name.as_ref());

        match name {
            b"sp" if !is_empty => current = Some(ShapeSummary::new(ShapeKind::Shape)),
            b"pic" if !is_empty => current = Some(ShapeSummary::new(ShapeKind::Picture)),
            _ => {}
        }

        let Some(shape) = current.as_mut() else {
            continue;
        };

        match name {
            b"spPr" => in_sp_pr = !is_empty,
            b"ln" if in_sp_pr => in_ln = !is_empty,
            b"cNvPr" => {
                if let Some(value) = attr_value(&e, b"name") {
                    shape.name = value;
                }
            }
            b"hlinkClick" => {
                shape.hyperlink = attr_value(&e, b"id").and_then(|id| targets.get(&id).cloned());
            }
            b"blip" => {
                shape.image_part = attr_value(&e, b"embed").and_then(|id| targets.get(&id).cloned());
            }
            b"off" if in_sp_pr => {
                shape.x = attr_i64(&e, b"x");
                shape.y = attr_i64(&e, b"y");
            }
            b"ext" if in_sp_pr => {
                shape.cx = attr_i64(&e, b"cx");
                shape.cy = attr_i64(&e, b"cy");
            }
            b"noFill" if in_ln => shape.no_line = true,
            b"noFill" if in_sp_pr => shape.no_fill = true,
            _ => {}
        }
    }

    Ok(shapes)
}

/// Attribute value by local name.
fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| unescape_attr(&String::from_utf8_lossy(&attr.value)))
}

fn attr_i64(e: &BytesStart, key: &[u8]) -> i64 {
    attr_value(e, key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn unescape_attr(value: &str) -> String {
    quick_xml::escape::unescape(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Strip a namespace prefix (`p:sp` -> `sp`).
fn local_name(name: &[u8]) -> &[u8] {
    name.rsplit(|&b| b == b':').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_slide(name: &str) -> String {
        format!(
            r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="{}"/></p:nvSpPr></p:sp></p:spTree></p:cSld></p:sld>"#,
            name
        )
    }

    #[test]
    fn test_slides_follow_relationship_order() {
        use std::io::{Cursor, Write};
        use zip::write::SimpleFileOptions;

        let rels = format!(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="{master}" Target="slideMasters/slideMaster1.xml"/>
<Relationship Id="rId2" Type="{slide}" Target="slides/slide2.xml"/>
<Relationship Id="rId3" Type="{slide}" Target="slides/slide1.xml"/>
</Relationships>"#,
            master = rel::SLIDE_MASTER,
            slide = rel::SLIDE,
        );

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default();
        for (name, data) in [
            (part::PRESENTATION_RELS.to_string(), rels),
            ("ppt/slides/slide1.xml".to_string(), named_slide("first file")),
            ("ppt/slides/slide2.xml".to_string(), named_slide("second file")),
        ] {
            zip.start_file(name, opts).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        let bytes = zip.finish().unwrap().into_inner();

        let slides = DeckReader::new().read(Cursor::new(bytes)).unwrap();
        let names: Vec<(usize, &str)> = slides
            .iter()
            .map(|s| (s.number, s.shapes[0].name.as_str()))
            .collect();
        assert_eq!(names, vec![(1, "second file"), (2, "first file")]);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"r:id"), b"id");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("ppt/slides", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("ppt/slides", "/ppt/media/a.png"), "ppt/media/a.png");
    }

    #[test]
    fn test_extract_rectangle_shape() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p" xmlns:r="r"><p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/></p:nvGrpSpPr>
<p:grpSpPr><a:xfrm><a:off x="5" y="5"/><a:ext cx="1" cy="1"/></a:xfrm></p:grpSpPr>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Rectangle 1"><a:hlinkClick r:id="rId2"/></p:cNvPr></p:nvSpPr>
<p:spPr><a:xfrm><a:off x="95250" y="190500"/><a:ext cx="9525" cy="19050"/></a:xfrm>
<a:noFill/><a:ln><a:noFill/></a:ln></p:spPr></p:sp>
</p:spTree></p:cSld></p:sld>"#;
        let targets = HashMap::from([("rId2".to_string(), "https://example.com/".to_string())]);

        let shapes = extract_shapes_from_xml(xml, &targets).unwrap();
        assert_eq!(
            shapes,
            vec![ShapeSummary {
                kind: ShapeKind::Shape,
                name: "Rectangle 1".to_string(),
                x: 95_250,
                y: 190_500,
                cx: 9_525,
                cy: 19_050,
                no_fill: true,
                no_line: true,
                hyperlink: Some("https://example.com/".to_string()),
                image_part: None,
            }]
        );
    }

    #[test]
    fn test_line_fill_alone_is_not_shape_fill() {
        let xml = r#"<p:sp xmlns:a="a" xmlns:p="p"><p:spPr><a:solidFill/><a:ln><a:noFill/></a:ln></p:spPr></p:sp>"#;
        let shapes = extract_shapes_from_xml(xml, &HashMap::new()).unwrap();
        assert!(!shapes[0].no_fill);
        assert!(shapes[0].no_line);
        assert_eq!(shapes[0].hyperlink, None);
    }
}
