use serde::Deserialize;

use scene::prefabs::{GlobeSettings, StarfieldSettings};

use crate::error::ViewerError;

/// Viewer settings, optionally overridden by JSON passed to `init_globe`.
///
/// Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub texture_url: String,
    pub globe_radius: f64,
    pub globe_segments: u32,
    pub marker_radius: f64,
    pub marker_altitude: f64,
    pub atmosphere_scale: f64,

    pub fov_deg: f64,
    pub near: f64,
    pub far: f64,
    pub initial_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub zoom_step: f64,
    pub rotate_speed: f64,

    pub popup_margin_px: f64,
    pub popup_id: String,
    pub tab_button_class: String,
    pub tab_panel_class: String,

    pub star_count: usize,
    pub star_seed: u64,
    pub max_pixel_ratio: f64,
    pub focus_duration_s: f64,
    pub log_filter: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            texture_url: "https://threejs.org/examples/textures/land_ocean_ice_cloud_2048.jpg"
                .to_string(),
            globe_radius: 5.0,
            globe_segments: 64,
            marker_radius: 0.10,
            marker_altitude: 0.10,
            atmosphere_scale: 1.03,

            fov_deg: 60.0,
            near: 0.1,
            far: 1000.0,
            initial_distance: 12.0,
            min_distance: 6.0,
            max_distance: 30.0,
            zoom_step: 0.6,
            rotate_speed: 0.005,

            popup_margin_px: 16.0,
            popup_id: "infoPopup".to_string(),
            tab_button_class: "tab-btn".to_string(),
            tab_panel_class: "tab-panel".to_string(),

            star_count: 800,
            star_seed: 42,
            max_pixel_ratio: 2.0,
            focus_duration_s: 0.8,
            log_filter: "info".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Parses and validates `json`. `None` or a blank string yields the
    /// defaults.
    pub fn from_json(json: Option<&str>) -> Result<Self, ViewerError> {
        let config = match json.map(str::trim) {
            None | Some("") => Self::default(),
            Some(text) => serde_json::from_str(text)
                .map_err(|e| ViewerError::Config(format!("invalid config json: {e}")))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        let positive = [
            ("globe_radius", self.globe_radius),
            ("marker_radius", self.marker_radius),
            ("atmosphere_scale", self.atmosphere_scale),
            ("fov_deg", self.fov_deg),
            ("near", self.near),
            ("min_distance", self.min_distance),
            ("max_pixel_ratio", self.max_pixel_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ViewerError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if self.far <= self.near {
            return Err(ViewerError::Config(format!(
                "far ({}) must exceed near ({})",
                self.far, self.near
            )));
        }
        if self.min_distance > self.max_distance {
            return Err(ViewerError::Config(format!(
                "min_distance ({}) exceeds max_distance ({})",
                self.min_distance, self.max_distance
            )));
        }
        if self.fov_deg >= 180.0 {
            return Err(ViewerError::Config(format!(
                "fov_deg must be below 180, got {}",
                self.fov_deg
            )));
        }
        if self.focus_duration_s < 0.0 || !self.focus_duration_s.is_finite() {
            return Err(ViewerError::Config(format!(
                "focus_duration_s must be non-negative, got {}",
                self.focus_duration_s
            )));
        }
        if self.globe_segments < 3 {
            return Err(ViewerError::Config("globe_segments must be at least 3".to_string()));
        }
        Ok(())
    }

    pub fn globe_settings(&self) -> GlobeSettings {
        GlobeSettings {
            radius: self.globe_radius,
            segments: self.globe_segments,
            atmosphere_scale: self.atmosphere_scale,
            marker_radius: self.marker_radius,
            marker_altitude: self.marker_altitude,
            ..GlobeSettings::default()
        }
    }

    pub fn starfield_settings(&self) -> StarfieldSettings {
        StarfieldSettings {
            count: self.star_count,
            seed: self.star_seed,
            ..StarfieldSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ViewerConfig;
    use crate::error::ViewerError;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_json_uses_defaults() {
        assert_eq!(ViewerConfig::from_json(None), Ok(ViewerConfig::default()));
        assert_eq!(ViewerConfig::from_json(Some("  ")), Ok(ViewerConfig::default()));
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let config = ViewerConfig::from_json(Some(r#"{"max_distance": 40.0, "star_seed": 9}"#))
            .expect("config");
        assert_eq!(config.max_distance, 40.0);
        assert_eq!(config.star_seed, 9);
        assert_eq!(config.min_distance, 6.0);
        assert_eq!(config.popup_id, "infoPopup");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ViewerConfig::from_json(Some("{not json")).expect_err("should fail");
        assert!(matches!(err, ViewerError::Config(_)));
    }

    #[test]
    fn inverted_distance_range_is_rejected() {
        let err = ViewerConfig::from_json(Some(r#"{"min_distance": 31.0}"#)).expect_err("range");
        assert!(matches!(err, ViewerError::Config(msg) if msg.contains("min_distance")));
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let config = ViewerConfig {
            globe_radius: 0.0,
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn settings_carry_configured_values() {
        let config = ViewerConfig {
            globe_radius: 2.0,
            star_count: 10,
            ..ViewerConfig::default()
        };
        assert_eq!(config.globe_settings().radius, 2.0);
        assert_eq!(config.globe_settings().marker_segments, 20);
        assert_eq!(config.starfield_settings().count, 10);
        assert_eq!(config.starfield_settings().min_radius, 60.0);
    }
}
