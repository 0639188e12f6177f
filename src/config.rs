//! Composition input records and their validation.

use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8;
use crate::foundation::error::{StoryError, StoryResult};

/// One video record as the directory lookups return it. `thumbnail` is the
/// default subject source and `duration` stays in ISO 8601 form (`PT4M13S`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
    pub channel_title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: String,
}

/// Full input to one composition. Sizes are configured against a 1080-wide
/// reference canvas and scaled at render time; `overlay_opacity` is a
/// percentage in `[0, 100]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionConfig {
    pub video: Video,
    pub user_email: String,
    pub text_color: String,
    pub font_size: f64,
    pub overlay_opacity: f64,
    pub channel_name_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_image: Option<String>,
}

impl CompositionConfig {
    /// Check every field that can make the render fail later and parse the
    /// text color. Runs before any asset is fetched.
    pub fn validate(&self) -> StoryResult<Rgba8> {
        if self.user_email.trim().is_empty() {
            return Err(StoryError::validation("userEmail must not be empty"));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(StoryError::validation(format!(
                "fontSize must be a positive number, got {}",
                self.font_size
            )));
        }
        if !self.channel_name_size.is_finite() || self.channel_name_size <= 0.0 {
            return Err(StoryError::validation(format!(
                "channelNameSize must be a positive number, got {}",
                self.channel_name_size
            )));
        }
        if !self.overlay_opacity.is_finite()
            || !(0.0..=100.0).contains(&self.overlay_opacity)
        {
            return Err(StoryError::validation(format!(
                "overlayOpacity must be in [0, 100], got {}",
                self.overlay_opacity
            )));
        }
        if self.subject_source().trim().is_empty() {
            return Err(StoryError::validation("subject image source must not be empty"));
        }
        parse_hex_color(&self.text_color)
    }

    /// The subject image source: `custom_image` when present, else the
    /// video thumbnail.
    pub fn subject_source(&self) -> &str {
        self.custom_image.as_deref().unwrap_or(&self.video.thumbnail)
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional, hex digits in
/// either case) into a straight color.
pub fn parse_hex_color(s: &str) -> StoryResult<Rgba8> {
    let t = s.trim();
    let t = t.strip_prefix('#').unwrap_or(t);
    if !t.is_ascii() {
        return Err(StoryError::validation(format!("invalid color \"{s}\"")));
    }

    fn hex_byte(pair: &str) -> StoryResult<u8> {
        u8::from_str_radix(pair, 16)
            .map_err(|_| StoryError::validation(format!("invalid hex byte \"{pair}\"")))
    }

    match t.len() {
        6 => Ok(Rgba8::new(
            hex_byte(&t[0..2])?,
            hex_byte(&t[2..4])?,
            hex_byte(&t[4..6])?,
            255,
        )),
        8 => Ok(Rgba8::new(
            hex_byte(&t[0..2])?,
            hex_byte(&t[2..4])?,
            hex_byte(&t[4..6])?,
            hex_byte(&t[6..8])?,
        )),
        _ => Err(StoryError::validation(format!(
            "color must be #RRGGBB or #RRGGBBAA, got \"{s}\""
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> CompositionConfig {
        CompositionConfig {
            video: Video {
                id: "abc123".to_string(),
                title: "A title".to_string(),
                thumbnail: "https://example.com/thumb.jpg".to_string(),
                duration: "PT4M13S".to_string(),
                channel_title: "Channel".to_string(),
                description: String::new(),
                published_at: "2024-05-01T10:00:00Z".to_string(),
            },
            user_email: "user@example.com".to_string(),
            text_color: "#ffffff".to_string(),
            font_size: 48.0,
            overlay_opacity: 50.0,
            channel_name_size: 32.0,
            custom_image: None,
        }
    }

    #[test]
    fn config_json_uses_camel_case() {
        let json = serde_json::to_string(&sample_config()).unwrap();
        assert!(json.contains("\"userEmail\""));
        assert!(json.contains("\"channelNameSize\""));
        assert!(json.contains("\"channelTitle\""));
        assert!(json.contains("\"publishedAt\""));
        assert!(!json.contains("\"customImage\""));

        let back: CompositionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_config());
    }

    #[test]
    fn validate_accepts_sample() {
        let color = sample_config().validate().unwrap();
        assert_eq!(color, Rgba8::new(255, 255, 255, 255));
    }

    #[test]
    fn validate_rejects_bad_inputs() {
        let mut c = sample_config();
        c.font_size = 0.0;
        assert!(matches!(c.validate(), Err(StoryError::Validation(_))));

        let mut c = sample_config();
        c.channel_name_size = f64::NAN;
        assert!(matches!(c.validate(), Err(StoryError::Validation(_))));

        let mut c = sample_config();
        c.overlay_opacity = 101.0;
        assert!(matches!(c.validate(), Err(StoryError::Validation(_))));

        let mut c = sample_config();
        c.user_email = "  ".to_string();
        assert!(matches!(c.validate(), Err(StoryError::Validation(_))));

        let mut c = sample_config();
        c.video.thumbnail = String::new();
        assert!(matches!(c.validate(), Err(StoryError::Validation(_))));
    }

    #[test]
    fn custom_image_overrides_thumbnail_source() {
        let mut c = sample_config();
        assert_eq!(c.subject_source(), "https://example.com/thumb.jpg");
        c.custom_image = Some("file:///tmp/override.png".to_string());
        assert_eq!(c.subject_source(), "file:///tmp/override.png");
    }

    #[test]
    fn hex_color_forms() {
        assert_eq!(parse_hex_color("#ff8800").unwrap(), Rgba8::new(255, 136, 0, 255));
        assert_eq!(parse_hex_color("FF8800").unwrap(), Rgba8::new(255, 136, 0, 255));
        assert_eq!(
            parse_hex_color("#ff880080").unwrap(),
            Rgba8::new(255, 136, 0, 128)
        );
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#ggg000").is_err());
        assert!(parse_hex_color("").is_err());
    }
}
