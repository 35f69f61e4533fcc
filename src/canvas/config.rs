//! Canvas configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VizError};

/// Options recognized by [`Canvas::new`](super::Canvas::new).
///
/// Every field has a default, so a JSON config only needs the keys it
/// overrides: `{"show_fps": true, "size": [1280, 720]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Forward the measured frame rate to the backend overlay
    pub show_fps: bool,
    /// Surface size in pixels
    pub size: [u32; 2],
    pub title: String,
    /// Target frames per second for frame pacing
    pub frame_rate: f64,
    /// Escape key closes the canvas
    pub close_on_esc: bool,
    pub clear_color: [u8; 4],
    /// Stop `run()` after this many frames
    pub max_frames: Option<u64>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            show_fps: false,
            size: [800, 600],
            title: "panelviz".to_string(),
            frame_rate: 60.0,
            close_on_esc: true,
            clear_color: [0, 0, 0, 255],
            max_frames: None,
        }
    }
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(VizError::Domain(format!(
                "frame rate {} must be positive",
                self.frame_rate
            )));
        }
        if self.size[0] == 0 || self.size[1] == 0 {
            return Err(VizError::Domain(format!(
                "canvas size {}x{} is empty",
                self.size[0], self.size[1]
            )));
        }
        self.frame_interval()?;
        Ok(())
    }

    /// Time budget of one frame.
    pub fn frame_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(1.0 / self.frame_rate).map_err(|e| {
            VizError::Domain(format!("frame rate {} gives no usable frame interval: {e}", self.frame_rate))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CanvasConfig::from_json(r#"{"show_fps": true, "size": [1280, 720]}"#).unwrap();
        assert!(config.show_fps);
        assert_eq!(config.size, [1280, 720]);
        assert_eq!(config.frame_rate, 60.0);
        assert!(config.close_on_esc);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(CanvasConfig::from_json(r#"{"fullscreen": true}"#).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(CanvasConfig::default().validate().is_ok());
        let config = CanvasConfig {
            frame_rate: 0.0,
            ..CanvasConfig::default()
        };
        assert!(matches!(config.validate(), Err(VizError::Domain(_))));
        let config = CanvasConfig {
            size: [0, 600],
            ..CanvasConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_frame_interval_rejected() {
        let config = CanvasConfig {
            frame_rate: 1e-20,
            ..CanvasConfig::default()
        };
        assert!(matches!(config.validate(), Err(VizError::Domain(_))));
        assert!(config.frame_interval().is_err());

        let interval = CanvasConfig::default().frame_interval().unwrap();
        assert_eq!(interval, Duration::from_secs_f64(1.0 / 60.0));
    }
}
