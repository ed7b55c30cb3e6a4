//! Card background: solid, gradient, pattern or texture.
//!
//! Gradients keep two representations. `gradientStops` is authoritative;
//! `color1`/`color2` mirror the first and last stop so the legacy two-stop
//! UI keeps working. Every stop edit goes through [`GradientBackground`]
//! methods, which re-establish the mirror afterwards.

use crate::error::{CoreError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Background {
    Solid(SolidBackground),
    Gradient(GradientBackground),
    Pattern(PatternBackground),
    Texture(PatternBackground),
}

impl Default for Background {
    fn default() -> Self {
        Background::solid("#FFFFFF")
    }
}

impl Background {
    pub fn solid(color: &str) -> Self {
        Background::Solid(SolidBackground {
            color1: color.to_string(),
        })
    }

    /// The flat base color every variant paints first.
    pub fn base_color(&self) -> &str {
        match self {
            Background::Solid(s) => &s.color1,
            Background::Gradient(g) => &g.color1,
            Background::Pattern(p) | Background::Texture(p) => &p.color1,
        }
    }

    /// Merge a partial JSON object into the background.
    ///
    /// `type` may change here (switching solid to gradient is an ordinary
    /// edit). After the merge the gradient mirror and the pattern data URI
    /// are brought back in line.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<()> {
        let invalid = |e: serde_json::Error| CoreError::InvalidProps {
            id: "background".into(),
            reason: e.to_string(),
        };
        let mut value = serde_json::to_value(&*self).map_err(invalid)?;
        if let Some(obj) = value.as_object_mut() {
            for (k, v) in patch {
                obj.insert(k.clone(), v.clone());
            }
        }
        let mut next: Background = serde_json::from_value(value).map_err(invalid)?;
        match &mut next {
            Background::Gradient(g) => {
                let touched_stops = patch.contains_key("gradientStops");
                if !touched_stops && patch.contains_key("color1") {
                    let c = g.color1.clone();
                    g.set_color1(&c);
                }
                if !touched_stops && patch.contains_key("color2") {
                    let c = g.color2.clone();
                    g.set_color2(&c);
                }
                g.sort_stops();
                g.mirror_endpoints();
            }
            Background::Pattern(p) | Background::Texture(p) => p.refresh_image_url(),
            Background::Solid(_) => {}
        }
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolidBackground {
    pub color1: String,
}

impl Default for SolidBackground {
    fn default() -> Self {
        Self {
            color1: "#FFFFFF".into(),
        }
    }
}

// ─── Gradient ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientType {
    #[default]
    Linear,
    Radial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient, 0–1.
    pub offset: f32,
    pub color: String,
}

impl GradientStop {
    pub fn new(offset: f32, color: &str) -> Self {
        Self {
            offset: offset.clamp(0.0, 1.0),
            color: color.to_string(),
        }
    }
}

/// Color of a stop added without an explicit color.
pub const NEW_STOP_COLOR: &str = "#FFFFFF";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradientBackground {
    pub color1: String,
    pub color2: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gradient_stops: Vec<GradientStop>,
    pub gradient_type: GradientType,
    /// Linear angle in degrees; ignored for radial.
    pub rotation: f32,
}

impl Default for GradientBackground {
    fn default() -> Self {
        Self {
            color1: "#FFFFFF".into(),
            color2: "#000000".into(),
            gradient_stops: Vec::new(),
            gradient_type: GradientType::Linear,
            rotation: 0.0,
        }
    }
}

impl GradientBackground {
    pub fn new(stops: Vec<GradientStop>) -> Self {
        let mut g = Self {
            gradient_stops: stops,
            ..Self::default()
        };
        g.sort_stops();
        g.mirror_endpoints();
        g
    }

    /// Stops to render: the authoritative list, or a two-stop list
    /// synthesized from `color1`/`color2` when none are stored.
    pub fn effective_stops(&self) -> Vec<GradientStop> {
        if self.gradient_stops.is_empty() {
            vec![
                GradientStop::new(0.0, &self.color1),
                GradientStop::new(1.0, &self.color2),
            ]
        } else {
            self.gradient_stops.clone()
        }
    }

    fn materialize(&mut self) {
        if self.gradient_stops.is_empty() {
            self.gradient_stops = self.effective_stops();
        }
    }

    fn sort_stops(&mut self) {
        // Stable: equal offsets keep their insertion order.
        self.gradient_stops
            .sort_by(|a, b| a.offset.total_cmp(&b.offset));
    }

    fn mirror_endpoints(&mut self) {
        if let (Some(first), Some(last)) = (self.gradient_stops.first(), self.gradient_stops.last()) {
            self.color1 = first.color.clone();
            self.color2 = last.color.clone();
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.gradient_stops.len() {
            return Err(CoreError::IndexOutOfBounds {
                index,
                len: self.gradient_stops.len(),
            });
        }
        Ok(())
    }

    /// Insert a stop keeping the list sorted by offset. A stop at an offset
    /// already present lands after the existing ones. Returns its index.
    pub fn insert_stop(&mut self, offset: f32, color: &str) -> usize {
        self.materialize();
        let stop = GradientStop::new(offset, color);
        let at = self
            .gradient_stops
            .partition_point(|s| s.offset <= stop.offset);
        self.gradient_stops.insert(at, stop);
        self.mirror_endpoints();
        at
    }

    /// Insert a white stop at `offset`.
    pub fn add_stop(&mut self, offset: f32) -> usize {
        self.insert_stop(offset, NEW_STOP_COLOR)
    }

    /// Remove a stop. Returns `false` without changing anything when only
    /// two stops remain.
    pub fn remove_stop(&mut self, index: usize) -> Result<bool> {
        self.materialize();
        self.check_index(index)?;
        if self.gradient_stops.len() <= 2 {
            return Ok(false);
        }
        self.gradient_stops.remove(index);
        self.mirror_endpoints();
        Ok(true)
    }

    pub fn set_stop_color(&mut self, index: usize, color: &str) -> Result<()> {
        self.materialize();
        self.check_index(index)?;
        self.gradient_stops[index].color = color.to_string();
        self.mirror_endpoints();
        Ok(())
    }

    /// Move a stop; the list is re-sorted. Returns the stop's new index.
    pub fn set_stop_offset(&mut self, index: usize, offset: f32) -> Result<usize> {
        self.materialize();
        self.check_index(index)?;
        let stop = self.gradient_stops.remove(index);
        self.mirror_endpoints();
        Ok(self.insert_stop(offset, &stop.color))
    }

    /// Two-stop UI edit of the start color: writes the first stop.
    pub fn set_color1(&mut self, color: &str) {
        self.materialize();
        if let Some(first) = self.gradient_stops.first_mut() {
            first.color = color.to_string();
        }
        self.mirror_endpoints();
    }

    /// Two-stop UI edit of the end color: writes the last stop.
    pub fn set_color2(&mut self, color: &str) {
        self.materialize();
        if let Some(last) = self.gradient_stops.last_mut() {
            last.color = color.to_string();
        }
        self.mirror_endpoints();
    }
}

// ─── Pattern / texture ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatternBackground {
    pub color1: String,
    pub pattern_id: String,
    pub pattern_color: String,
    /// Derived from `pattern_id` + `pattern_color`; see [`pattern_data_uri`].
    #[serde(rename = "patternImageURL")]
    pub pattern_image_url: String,
    pub scale: f32,
    pub opacity: f32,
    pub rotation: f32,
    /// Texture only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_color: Option<String>,
}

impl Default for PatternBackground {
    fn default() -> Self {
        let mut p = Self {
            color1: "#FFFFFF".into(),
            pattern_id: PatternKind::Dots.as_str().into(),
            pattern_color: "#000000".into(),
            pattern_image_url: String::new(),
            scale: 1.0,
            opacity: 0.1,
            rotation: 0.0,
            overlay_color: None,
        };
        p.refresh_image_url();
        p
    }
}

impl PatternBackground {
    pub fn refresh_image_url(&mut self) {
        self.pattern_image_url = pattern_data_uri(&self.pattern_id, &self.pattern_color);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Dots,
    Grid,
    Stripes,
    Diagonal,
    Checker,
    Waves,
    Crosses,
}

impl PatternKind {
    /// Unknown ids fall back to dots.
    pub fn from_id(id: &str) -> Self {
        match id {
            "grid" => PatternKind::Grid,
            "stripes" => PatternKind::Stripes,
            "diagonal" => PatternKind::Diagonal,
            "checker" => PatternKind::Checker,
            "waves" => PatternKind::Waves,
            "crosses" => PatternKind::Crosses,
            _ => PatternKind::Dots,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Dots => "dots",
            PatternKind::Grid => "grid",
            PatternKind::Stripes => "stripes",
            PatternKind::Diagonal => "diagonal",
            PatternKind::Checker => "checker",
            PatternKind::Waves => "waves",
            PatternKind::Crosses => "crosses",
        }
    }

    fn tile_body(&self, c: &str) -> String {
        match self {
            PatternKind::Dots => format!(r#"<circle cx="10" cy="10" r="2" fill="{c}"/>"#),
            PatternKind::Grid => {
                format!(r#"<path d="M20 0H0V20" fill="none" stroke="{c}" stroke-width="1"/>"#)
            }
            PatternKind::Stripes => format!(r#"<rect width="20" height="10" fill="{c}"/>"#),
            PatternKind::Diagonal => format!(
                r#"<path d="M-5 5L5 -5M0 20L20 0M15 25L25 15" stroke="{c}" stroke-width="2"/>"#
            ),
            PatternKind::Checker => format!(
                r#"<rect width="10" height="10" fill="{c}"/><rect x="10" y="10" width="10" height="10" fill="{c}"/>"#
            ),
            PatternKind::Waves => format!(
                r#"<path d="M0 10Q5 5 10 10T20 10" fill="none" stroke="{c}" stroke-width="1.5"/>"#
            ),
            PatternKind::Crosses => {
                format!(r#"<path d="M10 6V14M6 10H14" stroke="{c}" stroke-width="1.5"/>"#)
            }
        }
    }
}

/// Deterministic `data:image/svg+xml;base64,...` tile for a pattern id
/// tinted with `color`.
pub fn pattern_data_uri(pattern_id: &str, color: &str) -> String {
    let color: String = color
        .chars()
        .filter(|c| !matches!(c, '"' | '<' | '>' | '&'))
        .collect();
    let body = PatternKind::from_id(pattern_id).tile_body(&color);
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20" viewBox="0 0 20 20">{body}</svg>"#
    );
    format!("data:image/svg+xml;base64,{}", BASE64.encode(svg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn red_blue() -> GradientBackground {
        GradientBackground::new(vec![
            GradientStop::new(0.0, "red"),
            GradientStop::new(1.0, "blue"),
        ])
    }

    #[test]
    fn added_stop_is_sorted_and_white() {
        let mut g = red_blue();
        let at = g.add_stop(0.5);
        assert_eq!(at, 1);
        assert_eq!(
            g.gradient_stops,
            vec![
                GradientStop::new(0.0, "red"),
                GradientStop::new(0.5, "#FFFFFF"),
                GradientStop::new(1.0, "blue"),
            ]
        );
    }

    #[test]
    fn equal_offsets_keep_insertion_order() {
        let mut g = red_blue();
        g.insert_stop(0.5, "green");
        let at = g.insert_stop(0.5, "yellow");
        assert_eq!(at, 2);
        assert_eq!(g.gradient_stops[1].color, "green");
    }

    #[test]
    fn endpoints_stay_mirrored() {
        let mut g = red_blue();
        g.set_stop_color(0, "black").unwrap();
        assert_eq!(g.color1, "black");
        g.set_color2("white");
        assert_eq!(g.gradient_stops.last().unwrap().color, "white");
        g.insert_stop(0.0, "pink");
        assert_eq!(g.color1, "black");
    }

    #[test]
    fn removal_keeps_two_stops() {
        let mut g = red_blue();
        assert_eq!(g.remove_stop(0).unwrap(), false);
        g.add_stop(0.3);
        assert_eq!(g.remove_stop(0).unwrap(), true);
        assert_eq!(g.color1, "#FFFFFF");
        assert!(g.remove_stop(7).is_err());
    }

    #[test]
    fn legacy_two_stop_gradient_synthesizes_stops() {
        let bg: Background =
            serde_json::from_value(json!({ "type": "gradient", "color1": "#111111", "color2": "#EEEEEE" }))
                .unwrap();
        let Background::Gradient(g) = bg else {
            panic!("expected gradient");
        };
        assert!(g.gradient_stops.is_empty());
        assert_eq!(
            g.effective_stops(),
            vec![GradientStop::new(0.0, "#111111"), GradientStop::new(1.0, "#EEEEEE")]
        );
    }

    #[test]
    fn patch_switches_type_and_writes_back_color1() {
        let mut bg = Background::default();
        bg.apply_patch(json!({ "type": "gradient", "gradientStops": [
            { "offset": 1.0, "color": "#0000FF" },
            { "offset": 0.0, "color": "#FF0000" }
        ]}).as_object().unwrap())
            .unwrap();
        bg.apply_patch(json!({ "color1": "#00FF00" }).as_object().unwrap()).unwrap();
        let Background::Gradient(g) = &bg else {
            panic!("expected gradient");
        };
        assert_eq!(g.gradient_stops[0].color, "#00FF00");
        assert_eq!(g.color2, "#0000FF");
    }

    #[test]
    fn pattern_uri_is_deterministic() {
        let a = pattern_data_uri("grid", "#123456");
        assert_eq!(a, pattern_data_uri("grid", "#123456"));
        assert_ne!(a, pattern_data_uri("grid", "#654321"));
        assert!(a.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(pattern_data_uri("nope", "#000"), pattern_data_uri("dots", "#000"));
    }

    #[test]
    fn pattern_patch_refreshes_uri() {
        let mut bg = Background::Pattern(PatternBackground::default());
        bg.apply_patch(json!({ "patternId": "waves", "patternColor": "#FF0000" }).as_object().unwrap())
            .unwrap();
        let Background::Pattern(p) = &bg else {
            panic!("expected pattern");
        };
        assert_eq!(p.pattern_image_url, pattern_data_uri("waves", "#FF0000"));
    }
}
