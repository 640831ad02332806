use serde::{Deserialize, Serialize};

/// UI color scheme preference chosen at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Theme {
    Light,
    Dark,
    Default,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "LIGHT",
            Theme::Dark => "DARK",
            Theme::Default => "DEFAULT",
        }
    }

    /// Parses the stored column value; unknown values fall back to `Default`.
    pub fn parse(s: &str) -> Theme {
        match s {
            "LIGHT" => Theme::Light,
            "DARK" => Theme::Dark,
            _ => Theme::Default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub theme: Theme,
    pub theme_json: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
