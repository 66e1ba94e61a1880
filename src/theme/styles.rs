// ABOUTME: Element and layout style records resolved from theme JSON
// ABOUTME: Converts styles to inline CSS and utility classes and merges them with defaults

use crate::errors::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Font size as either a pixel count or any CSS length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontSize {
    Px(f64),
    Css(String),
}

impl FontSize {
    fn is_empty(&self) -> bool {
        matches!(self, FontSize::Css(s) if s.is_empty())
    }

    fn to_value(&self) -> Value {
        match self {
            FontSize::Px(n) => crate::theme::evaluator::number_to_value(*n),
            FontSize::Css(s) => Value::String(s.clone()),
        }
    }
}

impl From<Value> for FontSize {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => FontSize::Px(n.as_f64().unwrap_or_default()),
            Value::String(s) => FontSize::Css(s),
            Value::Null => FontSize::Css(String::new()),
            other => FontSize::Css(other.to_string()),
        }
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSize::Px(n) => write!(f, "{}px", n),
            FontSize::Css(s) => f.write_str(s),
        }
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn opacity_value<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(1.0),
        Value::String(s) => s.trim().parse().unwrap_or(1.0),
        _ => 1.0,
    })
}

fn default_opacity() -> f64 {
    1.0
}

/// Styling for one element: title, subtitle, table header, and so on.
///
/// Classes and inline CSS are additive; both are applied when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    #[serde(default, deserialize_with = "scalar_string")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<FontSize>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub weight: String,
    #[serde(default = "default_opacity", deserialize_with = "opacity_value")]
    pub opacity: f64,
    #[serde(default, deserialize_with = "scalar_string")]
    pub font: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub classes: String,
    #[serde(default, alias = "style", deserialize_with = "scalar_string")]
    pub css: String,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            color: String::new(),
            size: None,
            weight: String::new(),
            opacity: 1.0,
            font: String::new(),
            classes: String::new(),
            css: String::new(),
        }
    }
}

impl ElementStyle {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    fn size_text(&self) -> Option<String> {
        self.size
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }

    /// Utility classes: `opacity-N` for partial opacity followed by the user classes
    pub fn to_classes(&self) -> String {
        let mut parts = Vec::new();
        if self.opacity < 1.0 {
            parts.push(format!("opacity-{}", (self.opacity * 100.0) as i64));
        }
        if !self.classes.is_empty() {
            parts.push(self.classes.clone());
        }
        parts.join(" ")
    }

    pub fn to_css(&self) -> String {
        let mut styles = Vec::new();
        if !self.color.is_empty() {
            styles.push(format!("color: {}", self.color));
        }
        if let Some(size) = self.size_text() {
            styles.push(format!("font-size: {}", size));
        }
        if !self.weight.is_empty() {
            styles.push(format!("font-weight: {}", self.weight));
        }
        if self.opacity < 1.0 {
            styles.push(format!("opacity: {}", self.opacity));
        }
        if !self.font.is_empty() {
            styles.push(format!("font-family: {}", self.font));
        }
        if !self.css.is_empty() {
            styles.push(self.css.clone());
        }
        styles.join("; ")
    }

    /// Layer `other` on top of `self`. Non-empty fields of `other` win; classes and css accumulate.
    pub fn merge(&self, other: &ElementStyle) -> ElementStyle {
        let pick = |mine: &String, theirs: &String| {
            if theirs.is_empty() {
                mine.clone()
            } else {
                theirs.clone()
            }
        };
        let size = match &other.size {
            Some(s) if !s.is_empty() => Some(s.clone()),
            _ => self.size.clone(),
        };
        let css = format!("{}; {}", self.css, other.css)
            .trim_matches(|c| c == ';' || c == ' ')
            .to_string();

        ElementStyle {
            color: pick(&self.color, &other.color),
            size,
            weight: pick(&self.weight, &other.weight),
            opacity: if other.opacity != 1.0 {
                other.opacity
            } else {
                self.opacity
            },
            font: pick(&self.font, &other.font),
            classes: format!("{} {}", self.classes, other.classes).trim().to_string(),
            css,
        }
    }

    /// Scalar attribute lookup used by dotted theme keys
    pub fn property(&self, name: &str) -> Option<Value> {
        match name {
            "color" => Some(Value::String(self.color.clone())),
            "size" => self.size.as_ref().map(FontSize::to_value),
            "weight" => Some(Value::String(self.weight.clone())),
            "opacity" => Some(Value::from(self.opacity)),
            "font" => Some(Value::String(self.font.clone())),
            "classes" => Some(Value::String(self.classes.clone())),
            "css" | "style" => Some(Value::String(self.css.clone())),
            _ => None,
        }
    }

    /// Rebuild the style with every text field passed through `resolve`
    pub fn try_map<F>(&self, mut resolve: F) -> Result<ElementStyle>
    where
        F: FnMut(&str) -> Result<Value>,
    {
        let mut text = |s: &str| -> Result<String> {
            if s.is_empty() {
                return Ok(String::new());
            }
            Ok(crate::theme::evaluator::value_to_text(&resolve(s)?))
        };
        let color = text(&self.color)?;
        let weight = text(&self.weight)?;
        let font = text(&self.font)?;
        let classes = text(&self.classes)?;
        let css = text(&self.css)?;
        let size = match &self.size {
            Some(FontSize::Css(s)) if !s.is_empty() => Some(FontSize::from(resolve(s)?)),
            other => other.clone(),
        };

        Ok(ElementStyle {
            color,
            size,
            weight,
            opacity: self.opacity,
            font,
            classes,
            css,
        })
    }
}

/// Well-known element names; dotted section names such as `table.header` are `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Title,
    Subtitle,
    Text,
    Heading,
    Link,
    Bullet,
    Overlay,
    Blur,
    SplitTitle,
    SplitSubtitle,
    SplitText,
    Custom(String),
}

impl Element {
    pub fn as_str(&self) -> &str {
        match self {
            Element::Title => "title",
            Element::Subtitle => "subtitle",
            Element::Text => "text",
            Element::Heading => "heading",
            Element::Link => "link",
            Element::Bullet => "bullet",
            Element::Overlay => "overlay",
            Element::Blur => "blur",
            Element::SplitTitle => "split_title",
            Element::SplitSubtitle => "split_subtitle",
            Element::SplitText => "split_text",
            Element::Custom(name) => name,
        }
    }
}

impl From<&str> for Element {
    fn from(name: &str) -> Self {
        match name {
            "title" => Element::Title,
            "subtitle" => Element::Subtitle,
            "text" => Element::Text,
            "heading" => Element::Heading,
            "link" => Element::Link,
            "bullet" => Element::Bullet,
            "overlay" => Element::Overlay,
            "blur" => Element::Blur,
            "split_title" => Element::SplitTitle,
            "split_subtitle" => Element::SplitSubtitle,
            "split_text" => Element::SplitText,
            other => Element::Custom(other.to_string()),
        }
    }
}

impl FromStr for Element {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Element::from(s))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of element styles plus a slide background.
///
/// `get` never fails: unknown elements fall back to the attached defaults, or to an empty style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutStyle {
    pub name: String,
    pub background: String,
    elements: IndexMap<Element, ElementStyle>,
    defaults: Option<Arc<LayoutStyle>>,
}

impl LayoutStyle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Parse a layout object: `background` plus one object per element
    pub fn from_value(name: &str, value: &Value) -> Result<Self> {
        let mut layout = LayoutStyle::new(name);
        if let Value::Object(map) = value {
            for (key, entry) in map {
                match (key.as_str(), entry) {
                    ("background", bg) => {
                        layout.background = crate::theme::evaluator::value_to_text(bg)
                    }
                    (_, Value::Object(_)) => {
                        layout.set(Element::from(key.as_str()), ElementStyle::from_value(entry)?)
                    }
                    _ => {}
                }
            }
        }
        Ok(layout)
    }

    /// Built-in styles used when no default theme can be loaded
    pub fn fallback() -> Self {
        let mut layout = LayoutStyle::new("fallback");
        layout.set(
            Element::Title,
            ElementStyle {
                color: "#ffffff".to_string(),
                size: Some(FontSize::Px(80.0)),
                weight: "bold".to_string(),
                ..ElementStyle::default()
            },
        );
        layout.set(
            Element::Subtitle,
            ElementStyle {
                color: "#94a3b8".to_string(),
                size: Some(FontSize::Px(40.0)),
                ..ElementStyle::default()
            },
        );
        layout.set(
            Element::Text,
            ElementStyle {
                color: "#e2e8f0".to_string(),
                size: Some(FontSize::Px(32.0)),
                ..ElementStyle::default()
            },
        );
        layout
    }

    pub fn with_defaults(mut self, defaults: Arc<LayoutStyle>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn set(&mut self, element: Element, style: ElementStyle) {
        self.elements.insert(element, style);
    }

    /// The style stored for `element` without defaults applied
    pub fn element(&self, element: &Element) -> Option<&ElementStyle> {
        self.elements.get(element)
    }

    pub fn elements(&self) -> impl Iterator<Item = (&Element, &ElementStyle)> {
        self.elements.iter()
    }

    pub fn get(&self, element: &Element) -> ElementStyle {
        let user = self.elements.get(element).cloned().unwrap_or_default();
        match &self.defaults {
            Some(defaults) => defaults
                .elements
                .get(element)
                .cloned()
                .unwrap_or_default()
                .merge(&user),
            None => user,
        }
    }

    /// Combine two layouts; `other` wins per element field and for name/background
    pub fn merge(&self, other: &LayoutStyle) -> LayoutStyle {
        let mut elements = self.elements.clone();
        for (element, style) in &other.elements {
            let merged = match elements.get(element) {
                Some(existing) => existing.merge(style),
                None => style.clone(),
            };
            elements.insert(element.clone(), merged);
        }

        LayoutStyle {
            name: if other.name.is_empty() {
                self.name.clone()
            } else {
                other.name.clone()
            },
            background: if other.background.is_empty() {
                self.background.clone()
            } else {
                other.background.clone()
            },
            elements,
            defaults: other.defaults.clone().or_else(|| self.defaults.clone()),
        }
    }

    /// CSS declarations for the layout background
    pub fn background_style(&self) -> String {
        let bg = self.background.as_str();
        if bg.is_empty() {
            String::new()
        } else if bg.contains("gradient") {
            format!("background: {};", bg)
        } else if bg.starts_with("url(") {
            format!(
                "background-image: {}; background-size: cover; background-position: center;",
                bg
            )
        } else {
            format!("background-color: {};", bg)
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if !self.background.is_empty() {
            map.insert("background".to_string(), Value::String(self.background.clone()));
        }
        for (element, style) in &self.elements {
            if let Ok(value) = serde_json::to_value(style) {
                map.insert(element.to_string(), value);
            }
        }
        Value::Object(map)
    }
}
