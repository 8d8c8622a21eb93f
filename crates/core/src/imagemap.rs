//! Freeplane image-map extraction.
//!
//! A Freeplane HTML export draws the map as one `<img usemap="#fm_imagemap">`
//! backed by a `<map id="fm_imagemap">`. Each `<area>` points at an internal
//! anchor (`#FMID_<n>FM`) placed next to the node's text, and the node's
//! external link is the next `http(s)` anchor after that internal one.

use crate::error::{Error, Result};
use crate::html::{Document, Element};
use crate::types::{Clickable, ImageMap, Rect};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Map id used by Freeplane's HTML export.
pub const DEFAULT_MAP_ID: &str = "fm_imagemap";

/// Matches the `id` of an internal node anchor.
static INTERNAL_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"FMID_\d+FM").unwrap());

/// Matches an absolute external link.
static EXTERNAL_HREF_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());

/// Extracts clickable regions and the background image from HTML.
#[derive(Debug, Clone)]
pub struct MapExtractor {
    map_id: String,
}

impl Default for MapExtractor {
    fn default() -> Self {
        Self {
            map_id: DEFAULT_MAP_ID.to_string(),
        }
    }
}

impl MapExtractor {
    /// Create an extractor for the default Freeplane map id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different `<map id>`.
    pub fn with_map_id(mut self, map_id: impl Into<String>) -> Self {
        self.map_id = map_id.into();
        self
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    /// Extract clickables and the background image path.
    ///
    /// A document without the image map gives an empty result, not an
    /// error. Areas whose anchor has no external link are skipped.
    pub fn extract(&self, html: &str) -> Result<ImageMap> {
        let doc = Document::parse(html);

        let Some(map_index) = doc.find(|el| el.is("map") && el.attr("id") == Some(self.map_id.as_str()))
        else {
            log::debug!("No <map id=\"{}\"> found", self.map_id);
            return Ok(ImageMap::new());
        };

        let links = link_table(&doc);
        log::debug!("Resolved {} internal anchors to external links", links.len());

        let mut image_map = ImageMap::new();
        for area in doc.find_all_within(map_index, "area") {
            let rect = parse_coords(area.attr("coords"))?;
            let Some(href) = area.attr("href") else {
                log::debug!("Skipping area without href");
                continue;
            };
            let internal_id = href.trim_start_matches('#');
            match links.get(internal_id) {
                Some(url) => image_map.add_clickable(Clickable::new(rect, url.clone())),
                None => log::debug!("No external link for area target {:?}", href),
            }
        }

        let usemap = format!("#{}", self.map_id);
        image_map.background = doc
            .elements()
            .iter()
            .find(|el| el.is("img") && el.attr("usemap") == Some(usemap.as_str()))
            .and_then(|img| img.attr("src"))
            .map(str::to_string);

        Ok(image_map)
    }
}

/// Map each internal anchor id to the next external link after it.
///
/// Later duplicates of an id overwrite earlier ones.
fn link_table(doc: &Document) -> HashMap<String, String> {
    let elements = doc.elements();

    // next_external[i] is the first external anchor strictly after i
    let mut next_external: Vec<Option<&str>> = vec![None; elements.len()];
    let mut following: Option<&str> = None;
    for (i, el) in elements.iter().enumerate().rev() {
        next_external[i] = following;
        if let Some(href) = external_href(el) {
            following = Some(href);
        }
    }

    let mut table = HashMap::new();
    for (i, el) in elements.iter().enumerate() {
        if !el.is("a") {
            continue;
        }
        let Some(id) = el.attr("id").filter(|id| INTERNAL_ID_REGEX.is_match(id)) else {
            continue;
        };
        if let Some(url) = next_external[i] {
            table.insert(id.to_string(), url.to_string());
        }
    }
    table
}

fn external_href(el: &Element) -> Option<&str> {
    if !el.is("a") {
        return None;
    }
    el.attr("href").filter(|href| EXTERNAL_HREF_REGEX.is_match(href))
}

/// Parse `"x1,y1,x2,y2"` into a rectangle.
///
/// Values whose EMU geometry would overflow are rejected here.
fn parse_coords(coords: Option<&str>) -> Result<Rect> {
    let raw = coords.ok_or_else(|| Error::MalformedCoordinates(String::new()))?;
    let values = raw
        .split(',')
        .map(|token| token.trim().parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::MalformedCoordinates(raw.to_string()))?;

    let coords: [i64; 4] = values
        .try_into()
        .map_err(|_| Error::MalformedCoordinates(raw.to_string()))?;

    let rect = Rect::from_array(coords);
    if rect.to_emu().is_none() {
        return Err(Error::MalformedCoordinates(raw.to_string()));
    }
    Ok(rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r##"<html><body>
<map id="fm_imagemap" name="fm_imagemap">
  <area shape="rect" href="#FMID_1FM" coords="140,50,412,108">
</map>
<img src="bg.png" usemap="#fm_imagemap">
<ul><li><a id="FMID_1FM"></a>Node <a href="https://example.com/">link</a></li></ul>
</body></html>"##;

    #[test]
    fn test_single_area_scenario() {
        let result = MapExtractor::new().extract(SCENARIO).unwrap();
        assert_eq!(
            result.clickables,
            vec![Clickable::new(Rect::new(140, 50, 412, 108), "https://example.com/")]
        );
        assert_eq!(result.background.as_deref(), Some("bg.png"));
    }

    #[test]
    fn test_missing_map_is_empty() {
        let html = r##"<html><body><img src="bg.png" usemap="#fm_imagemap"><a id="FMID_1FM"></a><a href="http://x.org">x</a></body></html>"##;
        let result = MapExtractor::new().extract(html).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.background, None);
    }

    #[test]
    fn test_anchor_without_following_link_is_skipped() {
        let html = r##"<map id="fm_imagemap"><area href="#FMID_1FM" coords="1,2,3,4"></map>
<a href="https://before.example/">early</a>
<a id="FMID_1FM"></a>Node without link"##;
        let result = MapExtractor::new().extract(html).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_areas_keep_document_order() {
        let html = r##"<map id="fm_imagemap">
<area href="#FMID_2FM" coords="0,0,10,10">
<area href="#FMID_9FM" coords="5,5,6,6">
<area href="#FMID_1FM" coords="20,20,30,30">
</map>
<a id="FMID_1FM"></a><a href="https://one.example/">1</a>
<a id="FMID_2FM"></a><a href="http://two.example/">2</a>"##;
        let result = MapExtractor::new().extract(html).unwrap();
        let urls: Vec<&str> = result.clickables.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["http://two.example/", "https://one.example/"]);
        assert_eq!(result.clickables[1].rect, Rect::new(20, 20, 30, 30));
    }

    #[test]
    fn test_consecutive_internal_anchors_share_next_link() {
        let html = r##"<map id="fm_imagemap">
<area href="#FMID_1FM" coords="0,0,1,1"><area href="#FMID_2FM" coords="2,2,3,3">
</map>
<a id="FMID_1FM"></a><a id="FMID_2FM"></a><a href="https://shared.example/">s</a>"##;
        let result = MapExtractor::new().extract(html).unwrap();
        assert_eq!(result.clickables.len(), 2);
        assert!(result.clickables.iter().all(|c| c.url == "https://shared.example/"));
    }

    #[test]
    fn test_duplicate_internal_id_last_wins() {
        let html = r##"<map id="fm_imagemap"><area href="#FMID_1FM" coords="0,0,1,1"></map>
<a id="FMID_1FM"></a><a href="https://first.example/">a</a>
<a id="FMID_1FM"></a><a href="https://second.example/">b</a>"##;
        let result = MapExtractor::new().extract(html).unwrap();
        assert_eq!(result.clickables[0].url, "https://second.example/");
    }

    #[test]
    fn test_relative_links_are_not_external() {
        let html = r##"<map id="fm_imagemap"><area href="#FMID_1FM" coords="0,0,1,1"></map>
<a id="FMID_1FM"></a><a href="page.html">local</a><a href="ftp://files.example/">ftp</a>"##;
        assert!(MapExtractor::new().extract(html).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_coords_fail() {
        let html = r##"<map id="fm_imagemap"><area href="#FMID_1FM" coords="1,two,3,4"></map>"##;
        let err = MapExtractor::new().extract(html).unwrap_err();
        assert!(matches!(err, Error::MalformedCoordinates(ref raw) if raw == "1,two,3,4"));
    }

    #[test]
    fn test_wrong_coordinate_count_fails() {
        let html = r##"<map id="fm_imagemap"><area href="#FMID_1FM" coords="1,2,3"></map>"##;
        assert!(matches!(
            MapExtractor::new().extract(html),
            Err(Error::MalformedCoordinates(_))
        ));
    }

    #[test]
    fn test_oversized_coords_fail() {
        let html = r##"<map id="fm_imagemap"><area href="#FMID_1FM" coords="1000000000000000,0,1,1"></map>
<a id="FMID_1FM"></a><a href="https://example.com/">link</a>"##;
        let err = MapExtractor::new().extract(html).unwrap_err();
        assert!(matches!(err, Error::MalformedCoordinates(ref raw) if raw == "1000000000000000,0,1,1"));

        assert!(parse_coords(Some("-9223372036854775808,0,9223372036854775807,1")).is_err());
    }

    #[test]
    fn test_area_without_href_is_skipped() {
        let html = r##"<map id="fm_imagemap"><area coords="1,2,3,4"></map>"##;
        assert!(MapExtractor::new().extract(html).unwrap().is_empty());
    }

    #[test]
    fn test_custom_map_id() {
        let html = SCENARIO.replace("fm_imagemap", "nodes");
        assert!(MapExtractor::new().extract(&html).unwrap().is_empty());

        let result = MapExtractor::new().with_map_id("nodes").extract(&html).unwrap();
        assert_eq!(result.clickables.len(), 1);
        assert_eq!(result.background.as_deref(), Some("bg.png"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = MapExtractor::new();
        assert_eq!(
            extractor.extract(SCENARIO).unwrap(),
            extractor.extract(SCENARIO).unwrap()
        );
    }

    #[test]
    fn test_parse_coords_trims_whitespace() {
        assert_eq!(parse_coords(Some(" 1, 2 ,3,4 ")).unwrap(), Rect::new(1, 2, 3, 4));
        assert!(parse_coords(None).is_err());
    }

    #[test]
    fn test_freeplane_export_fixture() {
        let html = include_str!("../testdata/carte.html");
        let result = MapExtractor::new().extract(html).unwrap();
        assert_eq!(result.background.as_deref(), Some("carte.html_files/image.png"));

        let news = "https://news.google.com/search?q=ia&hl=fr&gl=FR&ceid=FR%3Afr";
        assert_eq!(
            result.clickables,
            vec![
                Clickable::new(Rect::new(140, 50, 412, 108), news),
                Clickable::new(Rect::new(437, 67, 502, 91), news),
                Clickable::new(Rect::new(100, 53, 115, 77), "https://duckduckgo.com/"),
                Clickable::new(Rect::new(50, 81, 115, 105), "https://duckduckgo.com/"),
            ]
        );
    }
}
