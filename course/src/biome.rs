//! Biomes and the per-level settings that turn raw samples into point heights/biomes.

use serde::{Deserialize, Serialize};

/// Raw mask value meaning "not set".
pub const EMPTY: f32 = 0.0;

/// True if a raw mask sample is set.
#[inline]
pub fn is_set(raw: f32) -> bool {
    (raw - EMPTY).abs() > f32::EPSILON
}

/// Surface type of a terrain point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Biome {
    #[default]
    None,
    Grass,
    Rough,
    Green,
    Sand,
    Hole,
    Water,
    Ice,
}

/// One key of a [`HeightCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

/// Piecewise-linear response curve applied to raw heights.
///
/// Inputs before the first key or after the last one take that key's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl HeightCurve {
    pub fn new(mut keys: Vec<CurveKey>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Identity over 0..=1.
    pub fn linear() -> Self {
        Self::new(vec![
            CurveKey { time: 0.0, value: 0.0 },
            CurveKey { time: 1.0, value: 1.0 },
        ])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time {
                let span = b.time - a.time;
                if span <= f32::EPSILON {
                    return b.value;
                }
                let f = (t - a.time) / span;
                return a.value + (b.value - a.value) * f;
            }
        }
        last.value
    }

    fn sort(&mut self) {
        self.keys.sort_by(|a, b| a.time.total_cmp(&b.time));
    }
}

/// Settings shared by every chunk of a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Biome of any point without a bunker or hole
    pub main_biome: Biome,
    pub use_curve: bool,
    pub height_curve: HeightCurve,
    pub height_multiplier: f32,
    pub do_bunkers: bool,
    /// Depth scale for bunker mask values
    pub bunker_multiplier: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            main_biome: Biome::Grass,
            use_curve: false,
            height_curve: HeightCurve::linear(),
            height_multiplier: 1.0,
            do_bunkers: true,
            bunker_multiplier: 1.0,
        }
    }
}

impl TerrainSettings {
    /// Clamp values that would produce inverted terrain and keep the curve ordered.
    pub fn validate_values(&mut self) {
        self.height_multiplier = self.height_multiplier.max(0.0);
        self.bunker_multiplier = self.bunker_multiplier.max(0.0);
        self.height_curve.sort();
    }

    /// Resolve the biome of a sample. Holes win over bunkers, bunkers over the base biome.
    ///
    /// `base` replaces the main biome when it is anything other than [`Biome::None`].
    pub fn resolve_biome(&self, base: Biome, raw_bunker: f32, raw_hole: f32) -> Biome {
        let mut biome = if base == Biome::None {
            self.main_biome
        } else {
            base
        };

        if self.do_bunkers && is_set(raw_bunker) {
            biome = Biome::Sand;
        }

        if is_set(raw_hole) {
            biome = Biome::Hole;
        }

        biome
    }

    /// Final height of a sample after the curve, the multiplier and bunker carving.
    pub fn resolve_height(&self, raw_height: f32, raw_bunker: f32) -> f32 {
        let mut height = raw_height;
        if self.use_curve {
            height = self.height_curve.evaluate(raw_height);
        }

        height *= self.height_multiplier;

        if self.do_bunkers {
            height -= raw_bunker * self.bunker_multiplier;
        }

        height
    }
}
