use serde::{Deserialize, Serialize};

/// Smallest selectable font size level.
pub const MIN_FONT_SIZE: u8 = 1;

/// Largest selectable font size level.
pub const MAX_FONT_SIZE: u8 = 5;

/// Text scale multipliers for levels 1 through 5 (level 3 is unscaled).
const FONT_SCALE_FACTORS: [f32; 5] = [0.8, 0.9, 1.0, 1.1, 1.2];

/// Font size level in `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FontSize(u8);

impl FontSize {
    pub fn new(level: u8) -> Option<Self> {
        (MIN_FONT_SIZE..=MAX_FONT_SIZE)
            .contains(&level)
            .then_some(Self(level))
    }

    /// Build a level from arbitrary input, pinning it into range.
    pub fn clamped(level: i64) -> Self {
        let level = level.clamp(i64::from(MIN_FONT_SIZE), i64::from(MAX_FONT_SIZE));
        Self(level as u8)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn scale_factor(self) -> f32 {
        FONT_SCALE_FACTORS[usize::from(self.0 - MIN_FONT_SIZE)]
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for FontSize {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| {
            format!(
                "font size {} out of range {}..={}",
                level, MIN_FONT_SIZE, MAX_FONT_SIZE
            )
        })
    }
}

impl From<FontSize> for u8 {
    fn from(size: FontSize) -> Self {
        size.0
    }
}

/// Per-installation user preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Settings {
    pub dark_mode: bool,
    pub font_size: FontSize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: true,
            font_size: FontSize::default(),
        }
    }
}

impl Settings {
    /// Shallow merge; every key present in the patch wins.
    pub fn merged(self, patch: SettingsPatch) -> Self {
        Self {
            dark_mode: patch.dark_mode.unwrap_or(self.dark_mode),
            font_size: patch
                .font_size
                .map(FontSize::clamped)
                .unwrap_or(self.font_size),
        }
    }
}

/// A partial settings update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<i64>,
}

impl SettingsPatch {
    pub fn dark_mode(enabled: bool) -> Self {
        Self {
            dark_mode: Some(enabled),
            ..Self::default()
        }
    }

    pub fn font_size(level: i64) -> Self {
        Self {
            font_size: Some(level),
            ..Self::default()
        }
    }
}
