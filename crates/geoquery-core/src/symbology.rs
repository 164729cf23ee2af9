//! Display symbols and the visual-variable renderer
//!
//! Symbols are plain descriptions; front ends decide how to draw them.
//! The renderer reproduces the classic "color ramp + size by population"
//! styling: each visual variable maps a numeric attribute onto a color or
//! size by linear interpolation between its stops, clamped at both ends.

use crate::feature::Feature;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColorSpec", into = "ColorSpec")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ColorSpec {
    Text(String),
    Channels(Vec<u8>),
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`, `#rgb` or one of the CSS names used in map styling.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return match hex.len() {
                6 => {
                    let v = u32::from_str_radix(hex, 16).ok()?;
                    Some(Color::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
                }
                3 => {
                    let v = u16::from_str_radix(hex, 16).ok()?;
                    let expand = |n: u16| ((n & 0xf) * 17) as u8;
                    Some(Color::rgb(expand(v >> 8), expand(v >> 4), expand(v)))
                }
                _ => None,
            };
        }
        let named = match text.to_ascii_lowercase().as_str() {
            "yellowgreen" => Color::rgb(154, 205, 50),
            "white" => Color::rgb(255, 255, 255),
            "black" => Color::rgb(0, 0, 0),
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 128, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "orange" => Color::rgb(255, 165, 0),
            "cyan" => Color::rgb(0, 255, 255),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            _ => return None,
        };
        Some(named)
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(&self, other: &Color, t: f64) -> Color {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl TryFrom<ColorSpec> for Color {
    type Error = String;

    fn try_from(spec: ColorSpec) -> Result<Self, Self::Error> {
        match spec {
            ColorSpec::Text(text) => {
                Color::parse(&text).ok_or_else(|| format!("Unknown color '{}'", text))
            }
            ColorSpec::Channels(c) if c.len() == 3 || c.len() == 4 => Ok(Color::rgb(c[0], c[1], c[2])),
            ColorSpec::Channels(c) => Err(format!("Expected 3 or 4 color channels, got {}", c.len())),
        }
    }
}

impl From<Color> for ColorSpec {
    fn from(color: Color) -> Self {
        ColorSpec::Text(color.to_hex())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerStyle {
    #[default]
    Circle,
    Square,
    Diamond,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSymbol {
    pub color: Color,
    /// Width in points.
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerSymbol {
    #[serde(default)]
    pub style: MarkerStyle,
    pub color: Color,
    /// Size in points.
    pub size: f64,
    #[serde(default)]
    pub outline: Option<LineSymbol>,
}

impl Default for MarkerSymbol {
    fn default() -> Self {
        Self {
            style: MarkerStyle::Square,
            color: Color::rgb(154, 205, 50),
            size: 6.0,
            outline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillSymbol {
    #[serde(default)]
    pub color: Option<Color>,
    pub outline: LineSymbol,
}

impl Default for FillSymbol {
    fn default() -> Self {
        Self {
            color: None,
            outline: LineSymbol {
                color: Color::rgb(53, 151, 143),
                width: 0.25,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub value: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeStop {
    pub value: f64,
    pub size: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorVariable {
    pub field: String,
    #[serde(default)]
    pub legend_title: Option<String>,
    pub stops: Vec<ColorStop>,
}

impl ColorVariable {
    pub fn color_for(&self, value: f64) -> Option<Color> {
        let (i, t) = locate(self.stops.iter().map(|s| s.value), value)?;
        let from = &self.stops[i].color;
        match self.stops.get(i + 1) {
            Some(next) => Some(from.lerp(&next.color, t)),
            None => Some(*from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeVariable {
    pub field: String,
    #[serde(default)]
    pub legend_title: Option<String>,
    pub stops: Vec<SizeStop>,
}

impl SizeVariable {
    pub fn size_for(&self, value: f64) -> Option<f64> {
        let (i, t) = locate(self.stops.iter().map(|s| s.value), value)?;
        let from = self.stops[i].size;
        match self.stops.get(i + 1) {
            Some(next) => Some(from + (next.size - from) * t),
            None => Some(from),
        }
    }

    /// Legend label of the first stop at or above `value`.
    pub fn label_for(&self, value: f64) -> Option<&str> {
        self.stops
            .iter()
            .find(|s| value <= s.value)
            .or_else(|| self.stops.last())
            .and_then(|s| s.label.as_deref())
    }
}

/// Index of the stop segment containing `value` and the position inside it.
fn locate<I>(values: I, value: f64) -> Option<(usize, f64)>
where
    I: Iterator<Item = f64>,
{
    let values: Vec<f64> = values.collect();
    let first = *values.first()?;
    if value <= first || value.is_nan() {
        return Some((0, 0.0));
    }
    for (i, pair) in values.windows(2).enumerate() {
        let (lo, hi) = (pair[0], pair[1]);
        if value <= hi {
            let span = hi - lo;
            let t = if span > 0.0 { (value - lo) / span } else { 1.0 };
            return Some((i, t));
        }
    }
    Some((values.len() - 1, 0.0))
}

/// Resolved styling for one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub color: Color,
    pub size: f64,
}

/// Simple renderer with optional color and size visual variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renderer {
    #[serde(default)]
    pub symbol: MarkerSymbol,
    #[serde(default)]
    pub color_variable: Option<ColorVariable>,
    #[serde(default)]
    pub size_variable: Option<SizeVariable>,
}

impl Default for Renderer {
    fn default() -> Self {
        let stops = [50_000.0, 100_000.0, 500_000.0, 1_000_000.0, 5_000_000.0, 10_000_001.0];
        let colors = ["#f7fcfd", "#ccece6", "#66c2a4", "#238b45", "#006d2c", "#00441b"];
        let sizes = [3.0, 6.0, 9.0, 12.0, 15.0, 20.0];
        let labels = [
            "< 50,000",
            "50,000 - 100,000",
            "250,000 - 500,000",
            "500,000 - 1,000,000",
            "1,000,000 - 5,000,000",
            "> 10,000,000",
        ];

        Self {
            symbol: MarkerSymbol {
                style: MarkerStyle::Circle,
                color: Color::rgb(255, 255, 255),
                size: 6.0,
                outline: Some(LineSymbol {
                    color: Color::rgb(0x71, 0xde, 0x6e),
                    width: 0.5,
                }),
            },
            color_variable: Some(ColorVariable {
                field: "POP".to_string(),
                legend_title: Some("Population Per City By Color Ramp".to_string()),
                stops: stops
                    .iter()
                    .zip(colors.iter())
                    .filter_map(|(value, hex)| {
                        Color::parse(hex).map(|color| ColorStop {
                            value: *value,
                            color,
                        })
                    })
                    .collect(),
            }),
            size_variable: Some(SizeVariable {
                field: "POP".to_string(),
                legend_title: Some("Population Per City By Point Size".to_string()),
                stops: stops
                    .iter()
                    .zip(sizes.iter().zip(labels.iter()))
                    .map(|(value, (size, label))| SizeStop {
                        value: *value,
                        size: *size,
                        label: Some(label.to_string()),
                    })
                    .collect(),
            }),
        }
    }
}

impl Renderer {
    pub fn style_for(&self, feature: &Feature) -> ResolvedStyle {
        let color = self
            .color_variable
            .as_ref()
            .and_then(|v| feature.attribute_f64(&v.field).and_then(|x| v.color_for(x)))
            .unwrap_or(self.symbol.color);
        let size = self
            .size_variable
            .as_ref()
            .and_then(|v| feature.attribute_f64(&v.field).and_then(|x| v.size_for(x)))
            .unwrap_or(self.symbol.size);
        ResolvedStyle { color, size }
    }

    pub fn legend_label_for(&self, feature: &Feature) -> Option<&str> {
        let variable = self.size_variable.as_ref()?;
        let value = feature.attribute_f64(&variable.field)?;
        variable.label_for(value)
    }

    /// Stops must be sorted ascending for interpolation to make sense.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(v) = &self.color_variable {
            ensure_ascending(v.stops.iter().map(|s| s.value), &v.field)?;
        }
        if let Some(v) = &self.size_variable {
            ensure_ascending(v.stops.iter().map(|s| s.value), &v.field)?;
        }
        Ok(())
    }
}

fn ensure_ascending<I: Iterator<Item = f64>>(values: I, field: &str) -> Result<(), String> {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return Err(format!("Visual variable on '{}' has no stops", field));
    }
    if values.windows(2).any(|w| w[0] > w[1]) {
        return Err(format!("Visual variable stops on '{}' are not ascending", field));
    }
    Ok(())
}
