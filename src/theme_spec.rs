use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new("^#[0-9A-Fa-f]{6}$").unwrap());

/// A generated color palette for skinning the UI. Required colors always
/// carry a value; the remaining fields are optional refinements. Specs are
/// replaced wholesale on regeneration, never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSpec {
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default = "default_button")]
    pub button: String,
    #[serde(default = "default_secondary")]
    pub secondary: String,
    #[serde(rename = "cardBackground", default, skip_serializing_if = "Option::is_none")]
    pub card_background: Option<String>,
    #[serde(rename = "borderColor", default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(rename = "headerColor", default, skip_serializing_if = "Option::is_none")]
    pub header_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

fn default_background() -> String {
    "#FFFFFF".to_string()
}
fn default_text() -> String {
    "#111111".to_string()
}
fn default_accent() -> String {
    "#3D7DFF".to_string()
}
fn default_button() -> String {
    "#1976D2".to_string()
}
fn default_secondary() -> String {
    "#F5F5F5".to_string()
}

impl ThemeSpec {
    /// The fixed light palette used whenever generation or parsing fails.
    pub fn default_light() -> ThemeSpec {
        ThemeSpec {
            background: "#FFFFFF".to_string(),
            text: "#111111".to_string(),
            accent: "#2E7D32".to_string(),
            button: "#1976D2".to_string(),
            secondary: "#F5F5F5".to_string(),
            card_background: None,
            border_color: None,
            header_color: None,
            emoji: None,
        }
    }

    /// Strict parse: `None` when the input is not a JSON object. Missing
    /// fields still default.
    pub fn parse(json: &str) -> Option<ThemeSpec> {
        if json.trim().is_empty() {
            return None;
        }
        serde_json::from_str(json).ok()
    }

    /// Tolerant parse: any failure yields the default light palette.
    pub fn from_json(json: &str) -> ThemeSpec {
        Self::parse(json).unwrap_or_else(Self::default_light)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// A spec is valid when every required color is a strict #RRGGBB value
    /// and every populated optional color is too. The emoji carries no
    /// format constraint.
    pub fn is_valid(&self) -> bool {
        let opt_ok = |v: &Option<String>| v.as_deref().map(is_valid_hex_color).unwrap_or(true);
        is_valid_hex_color(&self.background)
            && is_valid_hex_color(&self.text)
            && is_valid_hex_color(&self.accent)
            && is_valid_hex_color(&self.button)
            && is_valid_hex_color(&self.secondary)
            && opt_ok(&self.card_background)
            && opt_ok(&self.border_color)
            && opt_ok(&self.header_color)
    }
}

fn is_valid_hex_color(hex: &str) -> bool {
    HEX_COLOR.is_match(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_light_is_valid() {
        assert!(ThemeSpec::default_light().is_valid());
    }

    #[test]
    fn round_trips_through_json() {
        let mut spec = ThemeSpec::default_light();
        spec.card_background = Some("#ABCDEF".to_string());
        spec.emoji = Some("🌲".to_string());
        let restored = ThemeSpec::from_json(&spec.to_json());
        assert_eq!(spec, restored);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let spec = ThemeSpec::from_json(r##"{"background":"#000000"}"##);
        assert_eq!(spec.background, "#000000");
        assert_eq!(spec.text, "#111111");
        assert_eq!(spec.secondary, "#F5F5F5");
        assert!(spec.card_background.is_none());
    }

    #[test]
    fn malformed_json_falls_back_to_default() {
        assert_eq!(ThemeSpec::from_json("not json at all"), ThemeSpec::default_light());
        assert_eq!(ThemeSpec::from_json(""), ThemeSpec::default_light());
        assert!(ThemeSpec::parse("{broken").is_none());
        assert!(ThemeSpec::parse("").is_none());
    }

    #[test]
    fn rejects_non_hex_colors() {
        let mut spec = ThemeSpec::default_light();
        spec.accent = "#12345".to_string();
        assert!(!spec.is_valid());

        let mut spec = ThemeSpec::default_light();
        spec.background = "blue".to_string();
        assert!(!spec.is_valid());

        let mut spec = ThemeSpec::default_light();
        spec.border_color = Some("#GGGGGG".to_string());
        assert!(!spec.is_valid());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let spec = ThemeSpec::default_light();
        assert!(spec.is_valid());
        let json = spec.to_json();
        assert!(!json.contains("cardBackground"));
    }
}
