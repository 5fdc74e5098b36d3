//! # Styled text
//!
//! [`StyledText`] is the rich-text tree produced by the [`ComponentParser`]. It
//! serializes to the JSON chat-component shape used by status responses, and can
//! be flattened to plain or legacy `§`-coded text for platforms without rich text.
//!
//! The parser only ever produces a root node without style whose children are
//! leaves carrying a fully resolved style, so flattening and legacy rendering do
//! not need to reason about style inheritance.

pub mod markup;
pub mod parser;

pub use markup::{parse_markup, strip_markup};
pub use parser::ComponentParser;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Section sign used by legacy formatting codes
pub const SECTION: char = '§';

/// The sixteen named chat colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

impl NamedColor {
    pub const ALL: [NamedColor; 16] = [
        NamedColor::Black,
        NamedColor::DarkBlue,
        NamedColor::DarkGreen,
        NamedColor::DarkAqua,
        NamedColor::DarkRed,
        NamedColor::DarkPurple,
        NamedColor::Gold,
        NamedColor::Gray,
        NamedColor::DarkGray,
        NamedColor::Blue,
        NamedColor::Green,
        NamedColor::Aqua,
        NamedColor::Red,
        NamedColor::LightPurple,
        NamedColor::Yellow,
        NamedColor::White,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NamedColor::Black => "black",
            NamedColor::DarkBlue => "dark_blue",
            NamedColor::DarkGreen => "dark_green",
            NamedColor::DarkAqua => "dark_aqua",
            NamedColor::DarkRed => "dark_red",
            NamedColor::DarkPurple => "dark_purple",
            NamedColor::Gold => "gold",
            NamedColor::Gray => "gray",
            NamedColor::DarkGray => "dark_gray",
            NamedColor::Blue => "blue",
            NamedColor::Green => "green",
            NamedColor::Aqua => "aqua",
            NamedColor::Red => "red",
            NamedColor::LightPurple => "light_purple",
            NamedColor::Yellow => "yellow",
            NamedColor::White => "white",
        }
    }

    /// Legacy code character (`0`-`9`, `a`-`f`)
    pub fn code(self) -> char {
        let index = NamedColor::ALL.iter().position(|c| *c == self).unwrap_or(15);
        std::char::from_digit(index as u32, 16).unwrap_or('f')
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.to_ascii_lowercase();
        let normalized = match normalized.as_str() {
            "grey" => "gray",
            "dark_grey" => "dark_gray",
            other => other,
        };
        NamedColor::ALL.iter().copied().find(|c| c.name() == normalized)
    }

    pub fn from_code(code: char) -> Option<Self> {
        code.to_digit(16).map(|i| NamedColor::ALL[i as usize])
    }

    /// Display value used by vanilla clients.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            NamedColor::Black => (0x00, 0x00, 0x00),
            NamedColor::DarkBlue => (0x00, 0x00, 0xaa),
            NamedColor::DarkGreen => (0x00, 0xaa, 0x00),
            NamedColor::DarkAqua => (0x00, 0xaa, 0xaa),
            NamedColor::DarkRed => (0xaa, 0x00, 0x00),
            NamedColor::DarkPurple => (0xaa, 0x00, 0xaa),
            NamedColor::Gold => (0xff, 0xaa, 0x00),
            NamedColor::Gray => (0xaa, 0xaa, 0xaa),
            NamedColor::DarkGray => (0x55, 0x55, 0x55),
            NamedColor::Blue => (0x55, 0x55, 0xff),
            NamedColor::Green => (0x55, 0xff, 0x55),
            NamedColor::Aqua => (0x55, 0xff, 0xff),
            NamedColor::Red => (0xff, 0x55, 0x55),
            NamedColor::LightPurple => (0xff, 0x55, 0xff),
            NamedColor::Yellow => (0xff, 0xff, 0x55),
            NamedColor::White => (0xff, 0xff, 0xff),
        }
    }
}

/// A text color, either one of the named colors or an RGB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextColor {
    Named(NamedColor),
    Rgb(u8, u8, u8),
}

impl TextColor {
    /// Parses a color name or a `#rrggbb` value.
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        NamedColor::from_name(value).map(TextColor::Named)
    }

    /// The closest named color. Legacy text cannot carry RGB values.
    ///
    /// Colors are compared in HSV space with hue weighted strongest and
    /// brightness ahead of saturation, so `#ff0000` maps to red, not dark red.
    pub fn nearest_named(self) -> NamedColor {
        let (r, g, b) = match self {
            TextColor::Named(color) => return color,
            TextColor::Rgb(r, g, b) => (r, g, b),
        };
        let target = hsv(r, g, b);
        let mut best = NamedColor::White;
        let mut best_distance = f32::MAX;
        for color in NamedColor::ALL {
            let (cr, cg, cb) = color.rgb();
            let distance = hsv_distance(target, hsv(cr, cg, cb));
            if distance < best_distance {
                best = color;
                best_distance = distance;
            }
        }
        best
    }
}

/// Hue, saturation and value, each in `0.0..=1.0`.
fn hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    (hue, saturation, max)
}

fn hsv_distance(a: (f32, f32, f32), b: (f32, f32, f32)) -> f32 {
    // Hue wraps around, and only matters when both sides have some saturation.
    let hue = if a.1 == 0.0 || b.1 == 0.0 {
        0.0
    } else {
        let diff = (a.0 - b.0).abs();
        6.0 * diff.min(1.0 - diff)
    };
    let saturation = a.1 - b.1;
    let value = a.2 - b.2;
    hue * hue + saturation * saturation + 2.0 * value * value
}

fn parse_hex(hex: &str) -> Option<TextColor> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(TextColor::Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8))
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextColor::Named(color) => f.write_str(color.name()),
            TextColor::Rgb(r, g, b) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
        }
    }
}

impl From<TextColor> for String {
    fn from(color: TextColor) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for TextColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TextColor::parse(&value).ok_or_else(|| format!("unknown color: {}", value))
    }
}

/// Action performed when the text is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    OpenUrl,
    RunCommand,
    SuggestCommand,
    CopyToClipboard,
}

impl ClickAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "open_url" => Some(ClickAction::OpenUrl),
            "run_command" => Some(ClickAction::RunCommand),
            "suggest_command" => Some(ClickAction::SuggestCommand),
            "copy_to_clipboard" => Some(ClickAction::CopyToClipboard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub action: ClickAction,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "contents", rename_all = "snake_case")]
pub enum HoverEvent {
    ShowText(Box<StyledText>),
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Style attributes of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<TextColor>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underlined: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub obfuscated: bool,
    #[serde(default, rename = "clickEvent", skip_serializing_if = "Option::is_none")]
    pub click: Option<ClickEvent>,
    #[serde(default, rename = "hoverEvent", skip_serializing_if = "Option::is_none")]
    pub hover: Option<HoverEvent>,
}

impl Style {
    pub fn is_plain(&self) -> bool {
        *self == Style::default()
    }

    /// Legacy codes for this style. A color code comes first because it resets
    /// decorations on legacy clients. RGB colors are downsampled.
    fn legacy_codes(&self) -> String {
        let mut codes = String::new();
        if let Some(color) = self.color {
            codes.push(SECTION);
            codes.push(color.nearest_named().code());
        }
        let flags = [
            (self.obfuscated, 'k'),
            (self.bold, 'l'),
            (self.strikethrough, 'm'),
            (self.underlined, 'n'),
            (self.italic, 'o'),
        ];
        for (enabled, code) in flags {
            if enabled {
                codes.push(SECTION);
                codes.push(code);
            }
        }
        codes
    }
}

/// A node of styled text with ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledText {
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub style: Style,
    #[serde(default, rename = "extra", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StyledText>,
}

impl StyledText {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
            children: Vec::new(),
        }
    }

    pub fn newline() -> Self {
        Self::text("\n")
    }

    pub fn append(&mut self, child: StyledText) {
        self.children.push(child);
    }

    pub fn with_child(mut self, child: StyledText) -> Self {
        self.append(child);
        self
    }

    /// Concatenates all text in document order, ignoring style.
    pub fn to_plain_string(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    fn write_plain(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.write_plain(out);
        }
    }

    /// Renders `§`-coded legacy text.
    pub fn to_legacy_string(&self) -> String {
        let mut out = String::new();
        let mut current = Style::default();
        self.write_legacy(&Style::default(), &mut current, &mut out);
        out
    }

    fn write_legacy(&self, inherited: &Style, current: &mut Style, out: &mut String) {
        let effective = self.effective_style(inherited);

        if !self.text.is_empty() && self.text != "\n" {
            let wanted = legacy_relevant(&effective);
            if wanted != *current {
                if wanted.color.is_none() && !current.is_plain() {
                    out.push(SECTION);
                    out.push('r');
                }
                out.push_str(&wanted.legacy_codes());
                *current = wanted;
            }
        }
        out.push_str(&self.text);

        for child in &self.children {
            child.write_legacy(&effective, current, out);
        }
    }

    fn effective_style(&self, parent: &Style) -> Style {
        Style {
            color: self.style.color.or(parent.color),
            bold: self.style.bold || parent.bold,
            italic: self.style.italic || parent.italic,
            underlined: self.style.underlined || parent.underlined,
            strikethrough: self.style.strikethrough || parent.strikethrough,
            obfuscated: self.style.obfuscated || parent.obfuscated,
            click: self.style.click.clone().or_else(|| parent.click.clone()),
            hover: self.style.hover.clone().or_else(|| parent.hover.clone()),
        }
    }

    /// Number of nodes in the tree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(StyledText::node_count).sum::<usize>()
    }
}

/// Legacy text has no hover or click, so those never force a new code run.
/// RGB colors are compared after downsampling.
fn legacy_relevant(style: &Style) -> Style {
    Style {
        color: style.color.map(|c| TextColor::Named(c.nearest_named())),
        click: None,
        hover: None,
        ..style.clone()
    }
}

impl fmt::Display for StyledText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}
