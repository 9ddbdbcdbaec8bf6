//! Locomotion tuning loaded from TOML.

use std::path::{Path, PathBuf};

use character_motor_shooter::{
    CrouchConfig, DashConfig, GrappleConfig, GroundConfig, JumpConfig, MomentumConfig,
    MovementConfig, SlideConfig, WallRunConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse locomotion config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid locomotion config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Clone, Debug, Default)]
pub struct ConfigValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub version: u32,
    pub movement: MovementConfig,
    pub ground: GroundConfig,
    pub momentum: MomentumConfig,
    pub jump: JumpConfig,
    pub dash: DashConfig,
    pub slide: SlideConfig,
    pub grapple: GrappleConfig,
    pub wall_run: WallRunConfig,
    pub crouch: CrouchConfig,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            movement: MovementConfig::default(),
            ground: GroundConfig::default(),
            momentum: MomentumConfig::default(),
            jump: JumpConfig::default(),
            dash: DashConfig::default(),
            slide: SlideConfig::default(),
            grapple: GrappleConfig::default(),
            wall_run: WallRunConfig::default(),
            crouch: CrouchConfig::default(),
        }
    }
}

impl LocomotionConfig {
    pub fn parse_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read, parse and validate. Warnings are returned to the caller.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, Vec<String>), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse_toml(&text)?;
        let validation = config.validate();
        if !validation.is_ok() {
            return Err(ConfigError::Invalid(validation.errors));
        }
        Ok((config, validation.warnings))
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::default();
        if self.version != CONFIG_VERSION {
            validation
                .errors
                .push(format!("unsupported locomotion config version {}", self.version));
        }

        let positive = [
            ("movement.base_speed", self.movement.base_speed),
            ("movement.gravity", self.movement.gravity),
            ("momentum.half_life", self.momentum.half_life),
            ("jump.min_jump_height", self.jump.min_jump_height),
            ("jump.rise_time", self.jump.rise_time),
            ("jump.fall_time_ratio", self.jump.fall_time_ratio),
            ("jump.jump_cut_multiplier", self.jump.jump_cut_multiplier),
            ("dash.dash_speed", self.dash.dash_speed),
            ("dash.dash_duration", self.dash.dash_duration),
            ("dash.charge_recovery_time", self.dash.charge_recovery_time),
            ("slide.max_duration", self.slide.max_duration),
            ("grapple.max_distance", self.grapple.max_distance),
            ("grapple.pull_speed", self.grapple.pull_speed),
            ("wall_run.max_time", self.wall_run.max_time),
            ("wall_run.check_distance", self.wall_run.check_distance),
            ("crouch.stand_height", self.crouch.stand_height),
            ("crouch.radius", self.crouch.radius),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                validation
                    .errors
                    .push(format!("{name} must be finite and > 0"));
            }
        }

        let non_negative = [
            ("ground.check_distance", self.ground.check_distance),
            ("momentum.max_momentum", self.momentum.max_momentum),
            ("jump.coyote_time", self.jump.coyote_time),
            ("jump.jump_buffer_time", self.jump.jump_buffer_time),
            ("dash.cooldown", self.dash.cooldown),
            ("grapple.cooldown", self.grapple.cooldown),
            ("grapple.attach_delay", self.grapple.attach_delay),
            ("wall_run.cooldown", self.wall_run.cooldown),
            ("movement.movement_smoothing", self.movement.movement_smoothing),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                validation
                    .errors
                    .push(format!("{name} must be finite and >= 0"));
            }
        }

        let fractions = [
            ("dash.momentum_retention", self.dash.momentum_retention),
            ("grapple.velocity_retention", self.grapple.velocity_retention),
            ("wall_run.horizontal_blend", self.wall_run.horizontal_blend),
            ("crouch.crouch_height_multiplier", self.crouch.crouch_height_multiplier),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                validation
                    .errors
                    .push(format!("{name} must be within [0, 1]"));
            }
        }

        if self.jump.min_jump_height > self.jump.max_jump_height {
            validation
                .errors
                .push("jump.min_jump_height must not exceed jump.max_jump_height".to_string());
        }
        if self.ground.min_slope_angle > self.ground.max_slope_angle {
            validation
                .errors
                .push("ground.min_slope_angle must not exceed ground.max_slope_angle".to_string());
        }
        if self.dash.max_charges == 0 {
            validation
                .errors
                .push("dash.max_charges must be at least 1".to_string());
        }
        if self.slide.min_speed >= self.slide.start_speed_threshold {
            validation
                .warnings
                .push("slide.min_speed >= slide.start_speed_threshold; slides end immediately".to_string());
        }
        if self.grapple.min_distance >= self.grapple.max_distance {
            validation
                .warnings
                .push("grapple.min_distance >= grapple.max_distance; grapples release on attach".to_string());
        }
        if self.crouch.radius * 2.0 > self.crouch.crouch_height() {
            validation
                .warnings
                .push("crouch height is shorter than the capsule diameter".to_string());
        }
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::prelude::Real;

    #[test]
    fn defaults_validate_cleanly() {
        let validation = LocomotionConfig::default().validate();
        assert!(validation.is_ok(), "{:?}", validation.errors);
        assert!(validation.warnings.is_empty(), "{:?}", validation.warnings);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = LocomotionConfig::parse_toml(
            r#"
version = 1

[dash]
max_charges = 3
curve = "linear"

[jump]
coyote_time = 0.2
"#,
        )
        .expect("parse");
        assert_eq!(config.dash.max_charges, 3);
        assert_eq!(config.dash.curve, character_motor_shooter::EaseCurve::Linear);
        assert_eq!(config.jump.coyote_time, 0.2);
        assert_eq!(config.slide, SlideConfig::default());
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = LocomotionConfig::default();
        let text = config.to_toml_string().expect("serialize");
        assert!(text.contains("[wall_run]"));
        assert_eq!(LocomotionConfig::parse_toml(&text).expect("parse"), config);
    }

    #[test]
    fn validation_reports_errors_and_warnings() {
        let mut config = LocomotionConfig::default();
        config.version = 2;
        config.jump.min_jump_height = 4.0;
        config.dash.max_charges = 0;
        config.dash.dash_duration = Real::NAN;
        config.slide.min_speed = 10.0;
        let validation = config.validate();
        assert_eq!(validation.errors.len(), 4, "{:?}", validation.errors);
        assert_eq!(validation.warnings.len(), 1);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = LocomotionConfig::parse_toml("[dash\nmax_charges = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_rejects_invalid_files() {
        let path = std::env::temp_dir().join(format!(
            "locomotion_invalid_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[dash]\nmax_charges = 0\n").expect("write");
        let err = LocomotionConfig::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, ConfigError::Invalid(ref errors) if errors.len() == 1));

        let missing = LocomotionConfig::load("/nonexistent/locomotion.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
