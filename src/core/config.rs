use crate::core::errors::ConfigError;
use crate::core::types::Bounds;
use crate::services::layout::{Anchor, LayoutOptions, MarkerStyle, Offset};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: Level,
}

/// Marker layout and rendering configuration
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub radius: f32,
    pub text_scale: f32,
    pub anchor: Anchor,
    pub offset: Offset,
    pub avoid_overlap: bool,
    pub fill_color: [u8; 3],
    /// Fraction in [0, 1] or byte value in [0, 255]
    pub fill_alpha: f32,
    pub connector_color: [u8; 3],
    pub connector_alpha: f32,
    pub outline_color: [u8; 3],
    pub outline_alpha: f32,
    pub draw_quads: bool,
    pub font_path: Option<PathBuf>,
}

/// Detection cleaning configuration
#[derive(Debug, Clone)]
pub struct CleaningConfig {
    pub min_confidence: f32,
    /// Extra exclusion zones in pixels, appended to the defaults
    pub exclude_zones: Vec<Bounds>,
    /// Apply the drawing-frame zones (margins, bars, title block)
    pub default_zones: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.60,
            exclude_zones: Vec::new(),
            default_zones: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    pub jpeg_quality: u8,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub layout: LayoutConfig,
    pub cleaning: CleaningConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| parse_level(&s))
            .unwrap_or(Level::INFO);

        let anchor = match env::var("BUBBLE_ANCHOR") {
            Ok(s) => s.parse()?,
            Err(_) => Anchor::TopRight,
        };

        let offset = match env::var("BUBBLE_OFFSET") {
            Ok(s) => s.parse()?,
            Err(_) => Offset::default(),
        };

        let exclude_zones = match env::var("EXCLUDE_ZONES") {
            Ok(s) => parse_exclude_zones(&s),
            Err(_) => Vec::new(),
        };

        Ok(Self {
            logging: LoggingConfig { log_level },
            layout: LayoutConfig {
                radius: env_or("BUBBLE_RADIUS", 18.0),
                text_scale: env_or("LABEL_SCALE", 1.2),
                anchor,
                offset,
                avoid_overlap: env_or("AVOID_OVERLAP", true),
                fill_color: env_color("BUBBLE_FILL", [0xee, 0x33, 0x33])?,
                fill_alpha: env_or("BUBBLE_FILL_ALPHA", 0.85),
                connector_color: env_color("CONNECTOR_COLOR", [0xee, 0x33, 0x33])?,
                connector_alpha: env_or("CONNECTOR_ALPHA", 1.0),
                outline_color: env_color("OUTLINE_COLOR", [0xee, 0x33, 0x33])?,
                outline_alpha: env_or("OUTLINE_ALPHA", 255.0),
                draw_quads: env_or("DRAW_QUADS", false),
                font_path: env::var("FONT_PATH")
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
            },
            cleaning: CleaningConfig {
                min_confidence: env_or("MIN_CONF", 0.60),
                exclude_zones,
                default_zones: env_or("DEFAULT_ZONES", true),
            },
            output: OutputConfig {
                out_dir: env::var("OUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("out")),
                jpeg_quality: env_or("JPEG_QUALITY", 95),
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;

        if !(layout.radius.is_finite() && layout.radius > 0.0) {
            return Err(ConfigError::InvalidRadius(layout.radius));
        }

        if !(layout.text_scale.is_finite() && layout.text_scale > 0.0) {
            return Err(ConfigError::InvalidTextScale(layout.text_scale));
        }

        for alpha in [layout.fill_alpha, layout.connector_alpha, layout.outline_alpha] {
            if !(0.0..=255.0).contains(&alpha) {
                return Err(ConfigError::InvalidAlpha(alpha));
            }
        }

        if !self.cleaning.min_confidence.is_finite() {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.cleaning.min_confidence,
            ));
        }

        for zone in &self.cleaning.exclude_zones {
            if zone.min_x > zone.max_x || zone.min_y > zone.max_y {
                return Err(ConfigError::InvalidExclusionZone(format!(
                    "({}, {}, {}, {}) has inverted corners",
                    zone.min_x, zone.min_y, zone.max_x, zone.max_y
                )));
            }
        }

        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::InvalidJpegQuality(self.output.jpeg_quality));
        }

        Ok(())
    }

    /// Layout options handed to the layout engine
    pub fn layout_options(&self) -> LayoutOptions {
        let layout = &self.layout;
        LayoutOptions {
            radius: layout.radius,
            text_scale: layout.text_scale,
            anchor: layout.anchor,
            offset: layout.offset,
            avoid_overlap: layout.avoid_overlap,
            style: MarkerStyle {
                fill_color: layout.fill_color,
                fill_alpha: layout.fill_alpha,
                connector_color: layout.connector_color,
                connector_alpha: layout.connector_alpha,
                outline_color: layout.outline_color,
                outline_alpha: layout.outline_alpha,
                draw_quads: layout.draw_quads,
                font_path: layout.font_path.clone(),
                ..MarkerStyle::default()
            },
        }
    }

    pub fn log_level(&self) -> Level {
        self.logging.log_level
    }

    pub fn min_confidence(&self) -> f32 {
        self.cleaning.min_confidence
    }

    pub fn out_dir(&self) -> &PathBuf {
        &self.output.out_dir
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.output.jpeg_quality
    }
}

impl Default for Config {
    fn default() -> Self {
        let options = LayoutOptions::default();
        let style = options.style;
        Self {
            logging: LoggingConfig {
                log_level: Level::INFO,
            },
            layout: LayoutConfig {
                radius: options.radius,
                text_scale: options.text_scale,
                anchor: options.anchor,
                offset: options.offset,
                avoid_overlap: options.avoid_overlap,
                fill_color: style.fill_color,
                fill_alpha: style.fill_alpha,
                connector_color: style.connector_color,
                connector_alpha: style.connector_alpha,
                outline_color: style.outline_color,
                outline_alpha: style.outline_alpha,
                draw_quads: style.draw_quads,
                font_path: style.font_path,
            },
            cleaning: CleaningConfig::default(),
            output: OutputConfig {
                out_dir: PathBuf::from("out"),
                jpeg_quality: 95,
            },
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_color(key: &str, default: [u8; 3]) -> Result<[u8; 3], ConfigError> {
    match env::var(key) {
        Ok(s) => parse_hex_color(&s),
        Err(_) => Ok(default),
    }
}

pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Parse `#rgb` or `#rrggbb` (leading `#` optional)
pub fn parse_hex_color(s: &str) -> Result<[u8; 3], ConfigError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || ConfigError::InvalidColor(s.to_string());

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (slot, c) in out.iter_mut().zip(hex.chars()) {
                let v = c.to_digit(16).ok_or_else(invalid)? as u8;
                *slot = v * 17;
            }
            Ok(out)
        }
        6 => {
            let mut out = [0u8; 3];
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
            }
            Ok(out)
        }
        _ => Err(invalid()),
    }
}

/// Parse `x1,y1,x2,y2;x1,y1,x2,y2;...`. Malformed segments are skipped.
pub fn parse_exclude_zones(s: &str) -> Vec<Bounds> {
    s.split(';')
        .map(str::trim)
        .filter(|seg| !seg.is_empty())
        .filter_map(|seg| {
            let values: Vec<f32> = seg
                .split(',')
                .map(|v| v.trim().parse::<f32>())
                .collect::<Result<_, _>>()
                .ok()?;
            match values.as_slice() {
                [x1, y1, x2, y2] => Some(Bounds {
                    min_x: *x1,
                    min_y: *y1,
                    max_x: *x2,
                    max_y: *y2,
                }),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout.radius, 18.0);
        assert_eq!(config.layout.anchor, Anchor::TopRight);
        assert_eq!(config.layout.offset, Offset { dx: 10.0, dy: -10.0 });
        assert_eq!(config.min_confidence(), 0.60);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.layout.radius = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRadius(_))));

        let mut config = Config::default();
        config.layout.fill_alpha = 300.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAlpha(_))));

        let mut config = Config::default();
        config.output.jpeg_quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidJpegQuality(0))));

        let mut config = Config::default();
        config.cleaning.exclude_zones = vec![Bounds {
            min_x: 10.0,
            min_y: 0.0,
            max_x: 5.0,
            max_y: 5.0,
        }];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidExclusionZone(_))
        ));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#e33").unwrap(), [0xee, 0x33, 0x33]);
        assert_eq!(parse_hex_color("00ff7f").unwrap(), [0x00, 0xff, 0x7f]);
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#zzz").is_err());
    }

    #[test]
    fn test_parse_exclude_zones_skips_malformed() {
        let zones = parse_exclude_zones("0,0,10,10; bad ;1,2,3;5,5,20,30");
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[1].max_y, 30.0);
        assert!(parse_exclude_zones("").is_empty());
    }

    #[test]
    fn test_layout_options_carry_style() {
        let mut config = Config::default();
        config.layout.draw_quads = true;
        config.layout.fill_color = [1, 2, 3];

        let options = config.layout_options();
        assert!(options.style.draw_quads);
        assert_eq!(options.style.fill_color, [1, 2, 3]);
        assert_eq!(options.radius, config.layout.radius);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARNING"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }
}
