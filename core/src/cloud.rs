//! Word cloud of tag frequencies: sizing, a seeded spiral layout and SVG output.

use crate::tagging::TagCount;
use anyhow::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// First six colours of the Dark2 categorical scheme.
pub const PALETTE: [&str; 6] = ["#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e", "#e6ab02"];
pub const MUTED: &str = "#888";
pub const FONT: &str = "Poppins";

#[derive(Debug, Clone, PartialEq)]
pub struct CloudConfig {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub max_font: u32,
    /// Weight share is multiplied by this before capping at `max_font`.
    pub scale: f64,
    pub seed: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self { width: 1000.0, height: 200.0, padding: 2.0, max_font: 40, scale: 1000.0, seed: 0x5eed }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudWord {
    pub text: String,
    pub size: u32,
}

/// A laid out label. `x`/`y` are relative to the canvas centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedWord {
    pub text: String,
    pub size: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotate: i32,
}

/// Font size proportional to each tag's share of the total weight.
pub fn cloud_words(tags: &[TagCount], config: &CloudConfig) -> Vec<CloudWord> {
    let total = tags.iter().map(|t| t.count as f64).sum::<f64>() + 0.00001;
    tags.iter()
        .map(|t| {
            let size = ((t.count as f64 * config.scale) / total).round().min(config.max_font as f64);
            CloudWord { text: t.tag.clone(), size: size as u32 }
        })
        .collect()
}

#[derive(Clone, Copy)]
struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Rect {
    fn around(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Rect { x0: cx - w / 2.0, y0: cy - h / 2.0, x1: cx + w / 2.0, y1: cy + h / 2.0 }
    }
    fn overlaps(&self, o: &Rect) -> bool { self.x0 < o.x1 && o.x0 < self.x1 && self.y0 < o.y1 && o.y0 < self.y1 }
}

// Rough advance width of the label font.
fn label_box(word: &CloudWord, padding: f64) -> (f64, f64) {
    let w = word.text.chars().count() as f64 * word.size as f64 * 0.6;
    (w + 2.0 * padding, word.size as f64 + 2.0 * padding)
}

/// Place words largest first along an Archimedean spiral from a seeded start point.
/// Words that cannot fit on the canvas are dropped.
pub fn layout(words: &[CloudWord], config: &CloudConfig) -> Vec<PlacedWord> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (width, height) = (config.width.max(1.0), config.height.max(1.0));
    let ratio = width / height;
    let max_delta = (width * width + height * height).sqrt();

    let mut order: Vec<&CloudWord> = words.iter().filter(|w| w.size > 0).collect();
    order.sort_by(|a, b| b.size.cmp(&a.size));

    let mut taken: Vec<Rect> = Vec::new();
    let mut placed = Vec::new();
    for word in order {
        let (w, h) = label_box(word, config.padding);
        let start_x = width * (rng.gen::<f64>() + 0.5) / 2.0;
        let start_y = height * (rng.gen::<f64>() + 0.5) / 2.0;
        let dt = if rng.gen::<f64>() < 0.5 { 1.0 } else { -1.0 };
        let mut t = -dt;
        loop {
            t += dt;
            let r = t * 0.1;
            let (dx, dy) = (ratio * r * r.cos(), r * r.sin());
            if dx.abs().min(dy.abs()) >= max_delta { break; }
            let (cx, cy) = (start_x + dx, start_y + dy);
            let rect = Rect::around(cx, cy, w, h);
            if rect.x0 < 0.0 || rect.y0 < 0.0 || rect.x1 > width || rect.y1 > height { continue; }
            if taken.iter().any(|o| o.overlaps(&rect)) { continue; }
            taken.push(rect);
            placed.push(PlacedWord {
                text: word.text.clone(),
                size: word.size,
                x: cx - width / 2.0,
                y: cy - height / 2.0,
                width: w,
                height: h,
                rotate: 0,
            });
            break;
        }
    }
    placed
}

/// Colour of the `index`-th rendered label under the current filter set.
pub fn word_color(index: usize, text: &str, filters: &[String]) -> &'static str {
    if filters.is_empty() || filters.iter().any(|f| f == text) { PALETTE[index % PALETTE.len()] } else { MUTED }
}

/// Labels are drawn centred on their layout box (`dominant-baseline="central"`),
/// so layout, rendering and `CloudView::hit` agree on where a word is.
pub fn render_svg(placed: &[PlacedWord], filters: &[String], config: &CloudConfig) -> Result<String> {
    let mut xml = Writer::new(Vec::new());
    let (w, h) = (config.width.to_string(), config.height.to_string());
    let view_box = format!("0 0 {w} {h}");
    let mut svg = BytesStart::new("svg");
    svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
    svg.push_attribute(("width", "100%"));
    svg.push_attribute(("height", h.as_str()));
    svg.push_attribute(("viewBox", view_box.as_str()));
    svg.push_attribute(("preserveAspectRatio", "xMidYMid meet"));
    xml.write_event(Event::Start(svg))?;

    let centre = format!("translate({},{})", config.width / 2.0, config.height / 2.0);
    let mut group = BytesStart::new("g");
    group.push_attribute(("transform", centre.as_str()));
    xml.write_event(Event::Start(group))?;

    for (i, word) in placed.iter().enumerate() {
        let size = word.size.to_string();
        let transform = format!("translate({:.1},{:.1}) rotate({})", word.x, word.y, word.rotate);
        let mut text = BytesStart::new("text");
        text.push_attribute(("font-family", FONT));
        text.push_attribute(("font-size", size.as_str()));
        text.push_attribute(("fill", word_color(i, &word.text, filters)));
        text.push_attribute(("text-anchor", "middle"));
        text.push_attribute(("dominant-baseline", "central"));
        text.push_attribute(("transform", transform.as_str()));
        xml.write_event(Event::Start(text))?;
        xml.write_event(Event::Text(BytesText::new(&word.text)))?;
        xml.write_event(Event::End(BytesEnd::new("text")))?;
    }

    xml.write_event(Event::End(BytesEnd::new("g")))?;
    xml.write_event(Event::End(BytesEnd::new("svg")))?;
    let mut out = String::from_utf8(xml.into_inner())?;
    out.push('\n');
    Ok(out)
}

/// Cached layout that is recomputed only when the words or the container width change.
#[derive(Debug, Clone)]
pub struct CloudView {
    config: CloudConfig,
    tags: Vec<TagCount>,
    placed: Vec<PlacedWord>,
}

impl CloudView {
    pub fn new(tags: &[TagCount], config: CloudConfig) -> Self {
        let placed = layout(&cloud_words(tags, &config), &config);
        Self { config, tags: tags.to_vec(), placed }
    }

    pub fn config(&self) -> &CloudConfig { &self.config }

    pub fn placed(&self) -> &[PlacedWord] { &self.placed }

    fn relayout(&mut self) { self.placed = layout(&cloud_words(&self.tags, &self.config), &self.config); }

    /// Returns true when a new layout was computed.
    pub fn set_words(&mut self, tags: &[TagCount]) -> bool {
        if self.tags == tags { return false; }
        self.tags = tags.to_vec();
        self.relayout();
        true
    }

    pub fn resize(&mut self, width: f64) -> bool {
        if width <= 0.0 || width == self.config.width { return false; }
        self.config.width = width;
        self.relayout();
        true
    }

    /// The label under a click at `(x, y)`, in centre-relative coordinates.
    pub fn hit(&self, x: f64, y: f64) -> Option<&str> {
        self.placed
            .iter()
            .find(|p| Rect::around(p.x, p.y, p.width, p.height).overlaps(&Rect { x0: x, y0: y, x1: x + 0.001, y1: y + 0.001 }))
            .map(|p| p.text.as_str())
    }

    pub fn svg(&self, filters: &[String]) -> Result<String> { render_svg(&self.placed, filters, &self.config) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(tag: &str, count: usize) -> TagCount { TagCount { tag: tag.into(), count } }

    #[test]
    fn sizes_are_proportional_and_capped() {
        let words = cloud_words(&[tc("a", 3), tc("b", 1)], &CloudConfig::default());
        assert_eq!(words[0].size, 40);
        assert_eq!(words[1].size, 40);
        let cfg = CloudConfig { scale: 100.0, ..Default::default() };
        let words = cloud_words(&[tc("a", 3), tc("b", 1)], &cfg);
        assert_eq!(words[0].size, 40);
        assert_eq!(words[1].size, 25);
    }

    #[test]
    fn muted_when_filtered_out() {
        let filters = vec!["x".to_string()];
        assert_eq!(word_color(0, "y", &filters), MUTED);
        assert_eq!(word_color(1, "x", &filters), PALETTE[1]);
        assert_eq!(word_color(7, "y", &[]), PALETTE[1]);
    }

    #[test]
    fn escapes_labels() {
        let placed = vec![PlacedWord { text: "a<b&c".into(), size: 12, x: 0.0, y: 0.0, width: 30.0, height: 16.0, rotate: 0 }];
        let svg = render_svg(&placed, &[], &CloudConfig::default()).unwrap();
        assert!(svg.contains(">a&lt;b&amp;c</text>"));
        assert!(svg.contains(r#"dominant-baseline="central""#));
    }
}
