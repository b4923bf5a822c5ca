use serde::{Deserialize, Serialize};

use crate::foundation::color::Rgb;
use crate::foundation::error::{UndulaError, UndulaResult};

/// Rendering style, selected once at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveStyle {
    /// Five fixed stroked layers.
    #[default]
    Classic,
    /// Randomized bundles of 2-5 filled curves that decay and respawn.
    Spawning,
}

/// Definition of one spawning-style bundle: its fill color, or the
/// support-line flag for the static gradient bar layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnDefinition {
    pub color: Rgb,
    #[serde(default)]
    pub support_line: bool,
}

impl SpawnDefinition {
    /// The default four-layer look: a white support line under blue, red and
    /// green bundles.
    pub fn default_set() -> Vec<SpawnDefinition> {
        vec![
            SpawnDefinition {
                color: Rgb::WHITE,
                support_line: true,
            },
            SpawnDefinition {
                color: Rgb::new(15, 82, 169),
                support_line: false,
            },
            SpawnDefinition {
                color: Rgb::new(173, 57, 76),
                support_line: false,
            },
            SpawnDefinition {
                color: Rgb::new(48, 220, 155),
                support_line: false,
            },
        ]
    }
}

/// Immutable engine configuration.
///
/// Logical `width`/`height` are required; everything else has the defaults
/// listed on each field. Numeric fields are validated at engine construction
/// so NaN can never reach the animation math.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Logical width in pixels.
    pub width: f64,
    /// Logical height in pixels.
    pub height: f64,
    #[serde(default)]
    pub style: WaveStyle,
    /// Device pixel ratio applied to the logical size. Default 1.
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,
    /// Initial animation speed. Default 0.2.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Initial amplitude. Default 1.
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    /// Angular frequency of the classic layers. Default 6.
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    /// Base stroke color for the classic layers. Default white.
    #[serde(default = "default_color")]
    pub color: Rgb,
    /// Host sizing hint: fill the container instead of fixed CSS pixels.
    /// Consumed by embedding glue, not by the core. Default false.
    #[serde(default)]
    pub cover: bool,
    /// Start the frame loop from the constructor. Default false.
    #[serde(default)]
    pub autostart: bool,
    /// Horizontal sampling step in graph space. Default 0.02.
    #[serde(default = "default_pixel_depth")]
    pub pixel_depth: f64,
    /// Fraction of the remaining distance covered per interpolation step.
    /// Default 0.1.
    #[serde(default = "default_lerp_speed")]
    pub lerp_speed: f64,
    /// Override for the spawning-style bundle definitions.
    #[serde(default)]
    pub spawn_definitions: Option<Vec<SpawnDefinition>>,
    /// Seed for the spawning-style randomization; fresh entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_pixel_ratio() -> f64 {
    1.0
}

fn default_speed() -> f64 {
    0.2
}

fn default_amplitude() -> f64 {
    1.0
}

fn default_frequency() -> f64 {
    6.0
}

fn default_color() -> Rgb {
    Rgb::WHITE
}

fn default_pixel_depth() -> f64 {
    0.02
}

fn default_lerp_speed() -> f64 {
    0.1
}

impl WaveConfig {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            style: WaveStyle::default(),
            pixel_ratio: default_pixel_ratio(),
            speed: default_speed(),
            amplitude: default_amplitude(),
            frequency: default_frequency(),
            color: default_color(),
            cover: false,
            autostart: false,
            pixel_depth: default_pixel_depth(),
            lerp_speed: default_lerp_speed(),
            spawn_definitions: None,
            seed: None,
        }
    }

    pub fn with_style(mut self, style: WaveStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    pub fn with_pixel_depth(mut self, pixel_depth: f64) -> Self {
        self.pixel_depth = pixel_depth;
        self
    }

    pub fn with_lerp_speed(mut self, lerp_speed: f64) -> Self {
        self.lerp_speed = lerp_speed;
        self
    }

    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn with_spawn_definitions(mut self, definitions: Vec<SpawnDefinition>) -> Self {
        self.spawn_definitions = Some(definitions);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Physical width after the pixel ratio is applied.
    pub fn device_width(&self) -> f64 {
        self.width * self.pixel_ratio
    }

    /// Physical height after the pixel ratio is applied.
    pub fn device_height(&self) -> f64 {
        self.height * self.pixel_ratio
    }

    pub fn validate(&self) -> UndulaResult<()> {
        fn positive(name: &str, v: f64) -> UndulaResult<()> {
            if !v.is_finite() || v <= 0.0 {
                return Err(UndulaError::config(format!(
                    "{name} must be positive and finite, got {v}"
                )));
            }
            Ok(())
        }

        fn finite(name: &str, v: f64) -> UndulaResult<()> {
            if !v.is_finite() {
                return Err(UndulaError::config(format!("{name} must be finite, got {v}")));
            }
            Ok(())
        }

        positive("width", self.width)?;
        positive("height", self.height)?;
        positive("pixel_ratio", self.pixel_ratio)?;
        positive("pixel_depth", self.pixel_depth)?;
        finite("speed", self.speed)?;
        finite("frequency", self.frequency)?;
        finite("amplitude", self.amplitude)?;
        if self.amplitude < 0.0 {
            return Err(UndulaError::config("amplitude must be >= 0"));
        }
        if !self.lerp_speed.is_finite() || self.lerp_speed <= 0.0 || self.lerp_speed > 1.0 {
            return Err(UndulaError::config(format!(
                "lerp_speed must be in (0, 1], got {}",
                self.lerp_speed
            )));
        }
        if let Some(defs) = &self.spawn_definitions
            && defs.is_empty()
        {
            return Err(UndulaError::config("spawn_definitions must not be empty"));
        }
        Ok(())
    }
}
