//! Popup templates
//!
//! Templates reference attributes as `{FIELD}`. Per-field formatting
//! (thousands separators, decimal places) applies to numeric values only;
//! text values are inserted unchanged and missing ones become empty.

use crate::feature::Feature;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFormat {
    pub field_name: String,
    #[serde(default)]
    pub digit_separator: bool,
    #[serde(default)]
    pub places: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupTemplate {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub field_infos: Vec<FieldFormat>,
}

/// Title and body with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPopup {
    pub title: String,
    pub content: String,
}

impl PopupTemplate {
    pub fn cities() -> Self {
        Self {
            title: "World Cities: {CITY_NAME}".to_string(),
            content: "The population of {CITY_NAME} is {POP}.".to_string(),
            field_infos: vec![
                FieldFormat {
                    field_name: "POP".to_string(),
                    digit_separator: true,
                    places: Some(0),
                },
                FieldFormat {
                    field_name: "CITY_NAME".to_string(),
                    digit_separator: false,
                    places: Some(0),
                },
            ],
        }
    }

    pub fn continents() -> Self {
        Self {
            title: "Continents of the World".to_string(),
            content: "{CONTINENT} has a total of {SQMI} square miles.".to_string(),
            field_infos: vec![
                FieldFormat {
                    field_name: "CONTINENT".to_string(),
                    digit_separator: true,
                    places: Some(0),
                },
                FieldFormat {
                    field_name: "SQMI".to_string(),
                    digit_separator: true,
                    places: Some(0),
                },
            ],
        }
    }

    pub fn render(&self, feature: &Feature) -> RenderedPopup {
        RenderedPopup {
            title: self.substitute(&self.title, feature),
            content: self.substitute(&self.content, feature),
        }
    }

    fn substitute(&self, text: &str, feature: &Feature) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let field = &after[..close];
                    out.push_str(&self.format_field(field, feature));
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn format_field(&self, field: &str, feature: &Feature) -> String {
        let value = match feature.attribute(field) {
            Some(v) => v,
            None => return String::new(),
        };
        let format = self.field_infos.iter().find(|f| f.field_name == field);

        match (value, format) {
            (Value::Number(n), Some(fmt)) => match n.as_f64() {
                Some(x) => format_number(x, fmt.places, fmt.digit_separator),
                None => n.to_string(),
            },
            (Value::Number(n), None) => n.to_string(),
            (Value::String(s), _) => s.clone(),
            (other, _) => other.to_string(),
        }
    }
}

/// Rounds to `places` decimals (keeps the natural spelling when `None`)
/// and optionally groups the integer part in thousands.
pub fn format_number(value: f64, places: Option<u32>, digit_separator: bool) -> String {
    let text = match places {
        Some(p) => format!("{:.*}", p as usize, value),
        None => value.to_string(),
    };
    if !digit_separator {
        return text;
    }

    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(dot) => (&unsigned[..dot], &unsigned[dot..]),
        None => (unsigned, ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}{}", sign, grouped, frac_part)
}
