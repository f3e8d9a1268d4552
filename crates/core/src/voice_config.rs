//! Voice configuration for recognition and synthesis

use serde::{Deserialize, Serialize};

/// Locale and voice used by the speech ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// BCP-47 locale used for recognition and as the SSML language
    pub locale: String,
    /// Synthesis voice name (e.g. "es-ES-DarioNeural")
    pub voice_name: String,
    /// Speech speed (0.5 - 2.0, default 1.0)
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            locale: "es-ES".to_string(),
            voice_name: "es-ES-DarioNeural".to_string(),
            speed: default_speed(),
        }
    }
}

impl VoiceConfig {
    pub fn new(locale: impl Into<String>, voice_name: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            voice_name: voice_name.into(),
            ..Default::default()
        }
    }

    /// Set the speech speed
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.clamp(0.5, 2.0);
        self
    }

    /// Relative prosody rate, e.g. "+20%", or None at normal speed
    pub fn prosody_rate(&self) -> Option<String> {
        let percent = ((self.speed - 1.0) * 100.0).round() as i32;
        if percent == 0 {
            None
        } else {
            Some(format!("{:+}%", percent))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_clamped() {
        let voice = VoiceConfig::default().with_speed(5.0);
        assert_eq!(voice.speed, 2.0);
        assert_eq!(voice.prosody_rate().as_deref(), Some("+100%"));
    }

    #[test]
    fn test_normal_speed_has_no_rate() {
        assert_eq!(VoiceConfig::default().prosody_rate(), None);
        let slow = VoiceConfig::default().with_speed(0.8);
        assert_eq!(slow.prosody_rate().as_deref(), Some("-20%"));
    }
}
