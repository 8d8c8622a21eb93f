//! Single-slide PPTX writer.
//!
//! Produces a deck with one blank slide holding an optional background
//! picture at the origin and one transparent, hyperlinked rectangle per
//! clickable region.

use crate::package::{self, content_type, part, rel, NS_A, NS_CONTENT_TYPES, NS_P, NS_R, NS_RELATIONSHIPS};
use click2pptx_core::{px_to_emu, Clickable, EmuRect, Error, Result};
use image::ImageFormat;
use quick_xml::events::{BytesDecl, Event};
use quick_xml::Writer;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Default 4:3 slide width in EMU.
pub const SLIDE_WIDTH: i64 = 9_144_000;

/// Default 4:3 slide height in EMU.
pub const SLIDE_HEIGHT: i64 = 6_858_000;

/// Relationship id of the slide layout inside the slide's rels.
const LAYOUT_REL_ID: &str = "rId1";

/// Builder for clickable single-slide decks.
#[derive(Debug, Clone)]
pub struct DeckBuilder {
    slide_width: i64,
    slide_height: i64,
}

impl Default for DeckBuilder {
    fn default() -> Self {
        Self {
            slide_width: SLIDE_WIDTH,
            slide_height: SLIDE_HEIGHT,
        }
    }
}

impl DeckBuilder {
    /// Create a builder with the default 4:3 slide size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the deck to `dest`, replacing any existing file.
    ///
    /// `image` is skipped with a warning when it is not an existing file.
    /// The package is rendered in memory first, so `dest` is left untouched
    /// when rendering fails.
    pub fn build(&self, clickables: &[Clickable], image: Option<&Path>, dest: &Path) -> Result<()> {
        let bytes = self.write_to(Cursor::new(Vec::new()), clickables, image)?.into_inner();
        fs::write(dest, bytes)?;
        log::info!("Wrote {} clickable shapes to {}", clickables.len(), dest.display());
        Ok(())
    }

    /// Write the deck into any seekable writer and hand it back.
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: W,
        clickables: &[Clickable],
        image: Option<&Path>,
    ) -> Result<W> {
        let picture = match image {
            Some(path) if path.is_file() => Some(Picture::load(path)?),
            Some(path) => {
                log::warn!("Background image not found, skipping: {}", path.display());
                None
            }
            None => None,
        };

        let slide = SlideContent::new(picture.as_ref(), clickables)?;

        let mut zip = ZipWriter::new(writer);
        let opts = SimpleFileOptions::default();

        let mut add_part = |name: &str, data: &[u8]| -> Result<()> {
            zip.start_file(name, opts)
                .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", name, e)))?;
            zip.write_all(data)?;
            Ok(())
        };

        add_part(part::CONTENT_TYPES, &content_types_xml(picture.as_ref())?)?;
        add_part(part::PACKAGE_RELS, &package_rels_xml()?)?;
        add_part(part::CORE_PROPERTIES, package::CORE_PROPERTIES_XML.as_bytes())?;
        add_part(part::APP_PROPERTIES, package::APP_PROPERTIES_XML.as_bytes())?;
        add_part(part::PRESENTATION, &self.presentation_xml()?)?;
        add_part(part::PRESENTATION_RELS, &presentation_rels_xml()?)?;
        add_part(part::SLIDE_MASTER, package::SLIDE_MASTER_XML.as_bytes())?;
        add_part(part::SLIDE_MASTER_RELS, &slide_master_rels_xml()?)?;
        add_part(part::SLIDE_LAYOUT, package::SLIDE_LAYOUT_XML.as_bytes())?;
        add_part(part::SLIDE_LAYOUT_RELS, &slide_layout_rels_xml()?)?;
        add_part(part::THEME, package::THEME_XML.as_bytes())?;
        add_part(part::PRES_PROPS, package::PRES_PROPS_XML.as_bytes())?;
        add_part(part::VIEW_PROPS, package::VIEW_PROPS_XML.as_bytes())?;
        add_part(part::TABLE_STYLES, package::TABLE_STYLES_XML.as_bytes())?;
        add_part(part::SLIDE, &slide.slide_xml()?)?;
        add_part(part::SLIDE_RELS, &relationships_xml(&slide.relationships)?)?;
        if let Some(picture) = &picture {
            add_part(&picture.part_name(), &picture.data)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))
    }

    fn presentation_xml(&self) -> Result<Vec<u8>> {
        xml_part(|w| {
            w.create_element("p:presentation")
                .with_attributes([("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)])
                .with_attribute(("saveSubsetFonts", "1"))
                .write_inner_content::<_, quick_xml::Error>(|w| {
                    w.create_element("p:sldMasterIdLst").write_inner_content::<_, quick_xml::Error>(|w| {
                        w.create_element("p:sldMasterId")
                            .with_attributes([("id", "2147483648"), ("r:id", "rId1")])
                            .write_empty()?;
                        Ok(())
                    })?;
                    w.create_element("p:sldIdLst").write_inner_content::<_, quick_xml::Error>(|w| {
                        w.create_element("p:sldId")
                            .with_attributes([("id", "256"), ("r:id", "rId2")])
                            .write_empty()?;
                        Ok(())
                    })?;
                    w.create_element("p:sldSz")
                        .with_attribute(("cx", self.slide_width.to_string().as_str()))
                        .with_attribute(("cy", self.slide_height.to_string().as_str()))
                        .write_empty()?;
                    w.create_element("p:notesSz")
                        .with_attributes([("cx", "6858000"), ("cy", "9144000")])
                        .write_empty()?;
                    Ok(())
                })?;
            Ok(())
        })
    }
}

/// An embedded background picture.
#[derive(Debug)]
struct Picture {
    data: Vec<u8>,
    extension: &'static str,
    content_type: &'static str,
    width_px: u32,
    height_px: u32,
}

impl Picture {
    fn load(path: &Path) -> Result<Self> {
        let reader = image::io::Reader::open(path)?.with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            Error::Image(format!("Unrecognized image format: {}", path.display()))
        })?;
        let (extension, content_type) = media_type(format).ok_or_else(|| {
            Error::Image(format!("Unsupported image format {:?}: {}", format, path.display()))
        })?;
        let (width_px, height_px) = reader
            .into_dimensions()
            .map_err(|e| Error::Image(format!("Failed to read {}: {}", path.display(), e)))?;
        let data = std::fs::read(path)?;

        log::debug!(
            "Background {} is {}x{} px ({:?})",
            path.display(),
            width_px,
            height_px,
            format
        );

        Ok(Self {
            data,
            extension,
            content_type,
            width_px,
            height_px,
        })
    }

    fn part_name(&self) -> String {
        format!("ppt/media/image1.{}", self.extension)
    }

    fn extent(&self) -> EmuRect {
        EmuRect {
            left: 0,
            top: 0,
            width: px_to_emu(i64::from(self.width_px)),
            height: px_to_emu(i64::from(self.height_px)),
        }
    }
}

/// Part extension and content type for embeddable formats.
fn media_type(format: ImageFormat) -> Option<(&'static str, &'static str)> {
    match format {
        ImageFormat::Png => Some(("png", "image/png")),
        ImageFormat::Jpeg => Some(("jpeg", "image/jpeg")),
        ImageFormat::Gif => Some(("gif", "image/gif")),
        ImageFormat::Bmp => Some(("bmp", "image/bmp")),
        ImageFormat::Tiff => Some(("tiff", "image/tiff")),
        _ => None,
    }
}

/// A package relationship entry.
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: &'static str,
    target: String,
    external: bool,
}

impl Relationship {
    fn internal(id: &str, rel_type: &'static str, target: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            rel_type,
            target: target.into(),
            external: false,
        }
    }
}

/// Shapes and relationships of the single slide.
struct SlideContent<'a> {
    picture: Option<(&'a Picture, String)>,
    rectangles: Vec<(EmuRect, String)>,
    relationships: Vec<Relationship>,
}

impl<'a> SlideContent<'a> {
    fn new(picture: Option<&'a Picture>, clickables: &[Clickable]) -> Result<Self> {
        let mut relationships = vec![Relationship::internal(
            LAYOUT_REL_ID,
            rel::SLIDE_LAYOUT,
            "../slideLayouts/slideLayout1.xml",
        )];

        let picture = picture.map(|pic| {
            let id = format!("rId{}", relationships.len() + 1);
            relationships.push(Relationship::internal(
                &id,
                rel::IMAGE,
                format!("../media/image1.{}", pic.extension),
            ));
            (pic, id)
        });

        // One hyperlink relationship per distinct URL
        let mut by_url: HashMap<&str, String> = HashMap::new();
        let rectangles = clickables
            .iter()
            .map(|clickable| {
                let rect = clickable.rect;
                let extent = rect.to_emu().ok_or_else(|| {
                    Error::MalformedCoordinates(format!("{},{},{},{}", rect.x1, rect.y1, rect.x2, rect.y2))
                })?;
                let id = by_url
                    .entry(clickable.url.as_str())
                    .or_insert_with(|| {
                        let id = format!("rId{}", relationships.len() + 1);
                        relationships.push(Relationship {
                            id: id.clone(),
                            rel_type: rel::HYPERLINK,
                            target: clickable.url.clone(),
                            external: true,
                        });
                        id
                    })
                    .clone();
                Ok((extent, id))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            picture,
            rectangles,
            relationships,
        })
    }

    fn slide_xml(&self) -> Result<Vec<u8>> {
        xml_part(|w| {
            w.create_element("p:sld")
                .with_attributes([("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)])
                .write_inner_content::<_, quick_xml::Error>(|w| {
                    w.create_element("p:cSld").write_inner_content::<_, quick_xml::Error>(|w| {
                        w.create_element("p:spTree").write_inner_content::<_, quick_xml::Error>(|w| {
                            write_group_properties(w)?;

                            let mut shape_id = 2;
                            if let Some((picture, rel_id)) = &self.picture {
                                write_picture(w, shape_id, picture, rel_id)?;
                                shape_id += 1;
                            }
                            for (extent, rel_id) in &self.rectangles {
                                write_rectangle(w, shape_id, extent, rel_id)?;
                                shape_id += 1;
                            }
                            Ok(())
                        })?;
                        Ok(())
                    })?;
                    w.create_element("p:clrMapOvr").write_inner_content::<_, quick_xml::Error>(|w| {
                        w.create_element("a:masterClrMapping").write_empty()?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
            Ok(())
        })
    }
}

type XmlWriter = Writer<Vec<u8>>;

/// Serialize one XML part with the standard declaration.
fn xml_part(build: impl FnOnce(&mut XmlWriter) -> quick_xml::Result<()>) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_error)?;
    build(&mut writer).map_err(xml_error)?;
    Ok(writer.into_inner())
}

fn xml_error(e: quick_xml::Error) -> Error {
    Error::XmlError(format!("Failed to write XML: {}", e))
}

fn write_group_properties(w: &mut XmlWriter) -> quick_xml::Result<()> {
    w.create_element("p:nvGrpSpPr").write_inner_content::<_, quick_xml::Error>(|w| {
        w.create_element("p:cNvPr")
            .with_attributes([("id", "1"), ("name", "")])
            .write_empty()?;
        w.create_element("p:cNvGrpSpPr").write_empty()?;
        w.create_element("p:nvPr").write_empty()?;
        Ok(())
    })?;
    w.create_element("p:grpSpPr").write_inner_content::<_, quick_xml::Error>(|w| {
        w.create_element("a:xfrm").write_inner_content::<_, quick_xml::Error>(|w| {
            for (name, a, b) in [
                ("a:off", "x", "y"),
                ("a:ext", "cx", "cy"),
                ("a:chOff", "x", "y"),
                ("a:chExt", "cx", "cy"),
            ] {
                w.create_element(name)
                    .with_attributes([(a, "0"), (b, "0")])
                    .write_empty()?;
            }
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn write_transform(w: &mut XmlWriter, rect: &EmuRect) -> quick_xml::Result<()> {
    w.create_element("a:xfrm").write_inner_content::<_, quick_xml::Error>(|w| {
        w.create_element("a:off")
            .with_attribute(("x", rect.left.to_string().as_str()))
            .with_attribute(("y", rect.top.to_string().as_str()))
            .write_empty()?;
        w.create_element("a:ext")
            .with_attribute(("cx", rect.width.to_string().as_str()))
            .with_attribute(("cy", rect.height.to_string().as_str()))
            .write_empty()?;
        Ok(())
    })?;
    w.create_element("a:prstGeom")
        .with_attribute(("prst", "rect"))
        .write_inner_content::<_, quick_xml::Error>(|w| {
            w.create_element("a:avLst").write_empty()?;
            Ok(())
        })?;
    Ok(())
}

fn write_picture(w: &mut XmlWriter, shape_id: usize, picture: &Picture, rel_id: &str) -> quick_xml::Result<()> {
    w.create_element("p:pic").write_inner_content::<_, quick_xml::Error>(|w| {
        w.create_element("p:nvPicPr").write_inner_content::<_, quick_xml::Error>(|w| {
            w.create_element("p:cNvPr")
                .with_attribute(("id", shape_id.to_string().as_str()))
                .with_attribute(("name", format!("Picture {}", shape_id - 1).as_str()))
                .write_empty()?;
            w.create_element("p:cNvPicPr").write_inner_content::<_, quick_xml::Error>(|w| {
                w.create_element("a:picLocks")
                    .with_attribute(("noChangeAspect", "1"))
                    .write_empty()?;
                Ok(())
            })?;
            w.create_element("p:nvPr").write_empty()?;
            Ok(())
        })?;
        w.create_element("p:blipFill").write_inner_content::<_, quick_xml::Error>(|w| {
            w.create_element("a:blip")
                .with_attribute(("r:embed", rel_id))
                .write_empty()?;
            w.create_element("a:stretch").write_inner_content::<_, quick_xml::Error>(|w| {
                w.create_element("a:fillRect").write_empty()?;
                Ok(())
            })?;
            Ok(())
        })?;
        w.create_element("p:spPr").write_inner_content::<_, quick_xml::Error>(|w| write_transform(w, &picture.extent()))?;
        Ok(())
    })?;
    Ok(())
}

fn write_rectangle(w: &mut XmlWriter, shape_id: usize, rect: &EmuRect, rel_id: &str) -> quick_xml::Result<()> {
    w.create_element("p:sp").write_inner_content::<_, quick_xml::Error>(|w| {
        w.create_element("p:nvSpPr").write_inner_content::<_, quick_xml::Error>(|w| {
            w.create_element("p:cNvPr")
                .with_attribute(("id", shape_id.to_string().as_str()))
                .with_attribute(("name", format!("Rectangle {}", shape_id - 1).as_str()))
                .write_inner_content::<_, quick_xml::Error>(|w| {
                    w.create_element("a:hlinkClick")
                        .with_attribute(("r:id", rel_id))
                        .write_empty()?;
                    Ok(())
                })?;
            w.create_element("p:cNvSpPr").write_empty()?;
            w.create_element("p:nvPr").write_empty()?;
            Ok(())
        })?;
        w.create_element("p:spPr").write_inner_content::<_, quick_xml::Error>(|w| {
            write_transform(w, rect)?;
            w.create_element("a:noFill").write_empty()?;
            w.create_element("a:ln").write_inner_content::<_, quick_xml::Error>(|w| {
                w.create_element("a:noFill").write_empty()?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn relationships_xml(relationships: &[Relationship]) -> Result<Vec<u8>> {
    xml_part(|w| {
        w.create_element("Relationships")
            .with_attribute(("xmlns", NS_RELATIONSHIPS))
            .write_inner_content::<_, quick_xml::Error>(|w| {
                for relationship in relationships {
                    let element = w
                        .create_element("Relationship")
                        .with_attribute(("Id", relationship.id.as_str()))
                        .with_attribute(("Type", relationship.rel_type))
                        .with_attribute(("Target", relationship.target.as_str()));
                    if relationship.external {
                        element.with_attribute(("TargetMode", "External")).write_empty()?;
                    } else {
                        element.write_empty()?;
                    }
                }
                Ok(())
            })?;
        Ok(())
    })
}

fn package_rels_xml() -> Result<Vec<u8>> {
    relationships_xml(&[
        Relationship::internal("rId1", rel::OFFICE_DOCUMENT, part::PRESENTATION),
        Relationship::internal("rId2", rel::CORE_PROPERTIES, part::CORE_PROPERTIES),
        Relationship::internal("rId3", rel::EXTENDED_PROPERTIES, part::APP_PROPERTIES),
    ])
}

fn presentation_rels_xml() -> Result<Vec<u8>> {
    relationships_xml(&[
        Relationship::internal("rId1", rel::SLIDE_MASTER, "slideMasters/slideMaster1.xml"),
        Relationship::internal("rId2", rel::SLIDE, "slides/slide1.xml"),
        Relationship::internal("rId3", rel::PRES_PROPS, "presProps.xml"),
        Relationship::internal("rId4", rel::VIEW_PROPS, "viewProps.xml"),
        Relationship::internal("rId5", rel::THEME, "theme/theme1.xml"),
        Relationship::internal("rId6", rel::TABLE_STYLES, "tableStyles.xml"),
    ])
}

fn slide_master_rels_xml() -> Result<Vec<u8>> {
    relationships_xml(&[
        Relationship::internal("rId1", rel::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
        Relationship::internal("rId2", rel::THEME, "../theme/theme1.xml"),
    ])
}

fn slide_layout_rels_xml() -> Result<Vec<u8>> {
    relationships_xml(&[Relationship::internal(
        "rId1",
        rel::SLIDE_MASTER,
        "../slideMasters/slideMaster1.xml",
    )])
}

fn content_types_xml(picture: Option<&Picture>) -> Result<Vec<u8>> {
    let overrides = [
        (part::PRESENTATION, content_type::PRESENTATION),
        (part::SLIDE_MASTER, content_type::SLIDE_MASTER),
        (part::SLIDE_LAYOUT, content_type::SLIDE_LAYOUT),
        (part::SLIDE, content_type::SLIDE),
        (part::THEME, content_type::THEME),
        (part::PRES_PROPS, content_type::PRES_PROPS),
        (part::VIEW_PROPS, content_type::VIEW_PROPS),
        (part::TABLE_STYLES, content_type::TABLE_STYLES),
        (part::CORE_PROPERTIES, content_type::CORE_PROPERTIES),
        (part::APP_PROPERTIES, content_type::EXTENDED_PROPERTIES),
    ];

    xml_part(|w| {
        w.create_element("Types")
            .with_attribute(("xmlns", NS_CONTENT_TYPES))
            .write_inner_content::<_, quick_xml::Error>(|w| {
                let mut defaults = vec![("rels", content_type::RELATIONSHIPS), ("xml", content_type::XML)];
                if let Some(picture) = picture {
                    defaults.push((picture.extension, picture.content_type));
                }
                for (extension, content_type) in defaults {
                    w.create_element("Default")
                        .with_attributes([("Extension", extension), ("ContentType", content_type)])
                        .write_empty()?;
                }
                for (part_name, content_type) in overrides {
                    w.create_element("Override")
                        .with_attribute(("PartName", format!("/{}", part_name).as_str()))
                        .with_attribute(("ContentType", content_type))
                        .write_empty()?;
                }
                Ok(())
            })?;
        Ok(())
    })
}
