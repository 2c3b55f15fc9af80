use serde::{Deserialize, Serialize};

/// Which kind of client this installation acts as.
///
/// Admin sessions bypass the once-a-day freshness rule and may mutate the
/// dictionary and texts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AppMode {
    #[default]
    User,
    Admin,
}

impl AppMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AppMode::User => "user",
            AppMode::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(AppMode::User),
            "admin" => Some(AppMode::Admin),
            _ => None,
        }
    }
}

/// Persisted form of the mode flag: `{"appType": "admin"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppConfig {
    pub app_type: AppMode,
}
