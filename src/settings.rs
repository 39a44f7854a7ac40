//! Simulation settings
//!
//! Loaded from an optional JSON file; any field left out keeps its default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest accepted invulnerability window
const MAX_INVULNERABILITY_SECS: f32 = 60.0;

/// Tunable gameplay and cadence parameters for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Screen / pacing ===
    pub screen_width: f32,
    pub screen_height: f32,
    /// Render/input loop target rate
    pub target_fps: u32,

    // === Camera / streaming ===
    /// Camera trails the player by at most this many units
    pub camera_threshold: f32,
    /// Generate a new segment when the player is this close to the world edge
    pub generation_lookahead: f32,
    /// Geometry whose right edge is this far behind the camera is reaped
    pub cleanup_distance: f32,
    /// Width of one generated segment
    pub segment_width: f32,
    /// Minimum gap kept between floating platforms
    pub platform_overlap_margin: f32,
    /// Rejection sampling budget per floating platform slot
    pub placement_attempts: u32,
    /// Probability that an accepted platform gets a row of coins
    pub coin_platform_chance: f64,

    // === Enemies ===
    /// Population cap (Active + BeingStomped)
    pub max_enemies: usize,
    pub min_spawn_platform_width: f32,
    /// Spawn window is `[camera_x + near, camera_x + screen_width + far]`
    pub spawn_window_near: f32,
    pub spawn_window_far: f32,
    /// Enemies this far behind the camera are retired
    pub enemy_retire_behind: f32,
    /// Enemies this far below the screen are retired
    pub enemy_retire_below: f32,

    // === Scoring / damage ===
    pub starting_lives: i32,
    pub stomp_bounty: u64,
    pub coin_bounty: u64,
    /// Grace window after a damaging hit (seconds)
    pub invulnerability_secs: f32,
    pub knockback_dx: f32,
    pub knockback_vy: f32,
    pub stomp_bounce_vy: f32,

    // === Worker cadence (milliseconds) ===
    pub stream_interval_ms: u64,
    pub coin_interval_ms: u64,
    pub enemy_interval_ms: u64,
    pub event_interval_ms: u64,
    /// How long shutdown waits for each worker to notice the stop flag
    pub shutdown_grace_ms: u64,

    /// Fixed seed for world generation (random when absent)
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            screen_width: 800.0,
            screen_height: 600.0,
            target_fps: 60,

            camera_threshold: 300.0,
            generation_lookahead: 1000.0,
            cleanup_distance: 500.0,
            segment_width: 800.0,
            platform_overlap_margin: 40.0,
            placement_attempts: 15,
            coin_platform_chance: 0.7,

            max_enemies: 5,
            min_spawn_platform_width: 120.0,
            spawn_window_near: 400.0,
            spawn_window_far: 300.0,
            enemy_retire_behind: 300.0,
            enemy_retire_below: 100.0,

            starting_lives: 3,
            stomp_bounty: 100,
            coin_bounty: 10,
            invulnerability_secs: 2.0,
            knockback_dx: -30.0,
            knockback_vy: -8.0,
            stomp_bounce_vy: -10.0,

            stream_interval_ms: 300,
            coin_interval_ms: 20,
            enemy_interval_ms: 30,
            event_interval_ms: 10,
            shutdown_grace_ms: 1000,

            seed: None,
        }
    }
}

impl SimConfig {
    /// Load settings from a JSON file and validate them
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, falling back to defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default settings");
            return Self::default();
        };
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded settings from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            }
        }

        if self.target_fps == 0 {
            return Err(invalid("target_fps", "must be at least 1"));
        }
        if self.max_enemies == 0 {
            return Err(invalid("max_enemies", "must be at least 1"));
        }
        if self.starting_lives < 1 {
            return Err(invalid("starting_lives", "must be at least 1"));
        }
        for (field, value) in [
            ("segment_width", self.segment_width),
            ("screen_width", self.screen_width),
            ("screen_height", self.screen_height),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(field, "must be a finite positive number"));
            }
        }
        for (field, value) in [
            ("camera_threshold", self.camera_threshold),
            ("generation_lookahead", self.generation_lookahead),
            ("cleanup_distance", self.cleanup_distance),
            ("platform_overlap_margin", self.platform_overlap_margin),
            ("min_spawn_platform_width", self.min_spawn_platform_width),
            ("spawn_window_near", self.spawn_window_near),
            ("spawn_window_far", self.spawn_window_far),
            ("enemy_retire_behind", self.enemy_retire_behind),
            ("enemy_retire_below", self.enemy_retire_below),
            ("invulnerability_secs", self.invulnerability_secs),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(invalid(field, "must be a finite non-negative number"));
            }
        }
        for (field, value) in [
            ("knockback_dx", self.knockback_dx),
            ("knockback_vy", self.knockback_vy),
            ("stomp_bounce_vy", self.stomp_bounce_vy),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, "must be a finite number"));
            }
        }
        if self.invulnerability_secs > MAX_INVULNERABILITY_SECS {
            return Err(invalid("invulnerability_secs", "must be at most 60 seconds"));
        }
        if !(0.0..=1.0).contains(&self.coin_platform_chance) {
            return Err(invalid("coin_platform_chance", "must be within 0..=1"));
        }
        Ok(())
    }

    /// One frame at the target rate
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }

    /// Grace window after a hit. Out-of-range values (only possible when
    /// `validate` was skipped) collapse to no window.
    pub fn invulnerability(&self) -> Duration {
        Duration::try_from_secs_f32(self.invulnerability_secs).unwrap_or(Duration::ZERO)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Resolve the run seed (random when not configured)
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_enemies, 5);
        assert_eq!(config.generation_lookahead, 1000.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "max_enemies": 3, "seed": 42 }"#).unwrap();
        assert_eq!(config.max_enemies, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.cleanup_distance, 500.0);
        assert_eq!(config.resolve_seed(), 42);
    }

    #[test]
    fn test_validate_rejects_zero_fps() {
        let config = SimConfig {
            target_fps: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "target_fps", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_distances() {
        let cases: [(&str, fn(&mut SimConfig)); 7] = [
            ("camera_threshold", |c| c.camera_threshold = -300.0),
            ("enemy_retire_behind", |c| c.enemy_retire_behind = -1000.0),
            ("enemy_retire_below", |c| c.enemy_retire_below = -1.0),
            ("spawn_window_near", |c| c.spawn_window_near = -50.0),
            ("spawn_window_far", |c| c.spawn_window_far = f32::NAN),
            ("min_spawn_platform_width", |c| c.min_spawn_platform_width = -1.0),
            ("segment_width", |c| c.segment_width = f32::NAN),
        ];
        for (name, tweak) in cases {
            let mut config = SimConfig::default();
            tweak(&mut config);
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, name),
                other => panic!("{name}: expected rejection, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_rejects_no_lives() {
        let config = SimConfig {
            starting_lives: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "starting_lives", .. })
        ));
    }

    #[test]
    fn test_huge_invulnerability_rejected_and_never_panics() {
        let config = SimConfig {
            invulnerability_secs: 1e30,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "invulnerability_secs", .. })
        ));
        assert_eq!(config.invulnerability(), Duration::ZERO);

        let config = SimConfig {
            invulnerability_secs: f32::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.invulnerability(), Duration::ZERO);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let path = Path::new("/nonexistent/scrollworld.json");
        assert!(matches!(SimConfig::load(path), Err(ConfigError::Io(_))));
        assert_eq!(SimConfig::load_or_default(Some(path)), SimConfig::default());
    }

    #[test]
    fn test_frame_duration() {
        let config = SimConfig::default();
        let frame = config.frame_duration();
        assert!(frame > Duration::from_millis(16) && frame < Duration::from_millis(17));
    }
}
