//! Audio effects graph
//!
//! Processing order is preamp gain, six-band equaliser, then master
//! volume. Samples are interleaved `f32` frames. Tempo and pitch are not
//! sample processing here; they collapse into a playback rate for the
//! media element that decodes the stream.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Equaliser band centre frequencies in Hz
pub const EQ_BANDS_HZ: [f64; 6] = [60.0, 170.0, 350.0, 1000.0, 3500.0, 10000.0];

pub const EQ_GAIN_LIMIT_DB: f32 = 12.0;
pub const PREAMP_LIMIT_DB: f32 = 12.0;
pub const TEMPO_RANGE: (f32, f32) = (0.5, 2.0);
pub const PITCH_LIMIT_SEMITONES: f32 = 12.0;

const EQ_Q: f64 = 1.0;
/// Gains closer to zero than this are treated as flat
const FLAT_DB: f32 = 0.01;

/// A processing stage over interleaved samples
pub trait DspNode: Send {
    fn process(&mut self, samples: &mut [f32], channels: usize);

    /// Drop any filter history (e.g. after a seek)
    fn reset(&mut self) {}
}

// ============================================================================
// Gain
// ============================================================================

/// Linear gain stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainNode {
    gain: f32,
}

impl GainNode {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    pub fn from_db(db: f32) -> Self {
        Self::new(db_to_linear(db))
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }
}

impl DspNode for GainNode {
    fn process(&mut self, samples: &mut [f32], _channels: usize) {
        if (self.gain - 1.0).abs() < f32::EPSILON {
            return;
        }
        for sample in samples.iter_mut() {
            *sample *= self.gain;
        }
    }
}

pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

// ============================================================================
// Biquad
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowShelf,
    Peaking,
    HighShelf,
}

/// Second-order IIR filter using the Audio EQ Cookbook (RBJ) formulas
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    kind: FilterKind,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    /// Per channel: x[n-1], x[n-2], y[n-1], y[n-2]
    state: Vec<[f64; 4]>,
}

impl BiquadFilter {
    pub fn new(kind: FilterKind, frequency: f64, gain_db: f64, q: f64, sample_rate: u32) -> Self {
        let fs = f64::from(sample_rate.max(1));
        // Keep the centre frequency below Nyquist
        let f0 = frequency.clamp(1.0, fs * 0.49);
        let a = 10f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * f0 / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos,
                1.0 - alpha / a,
            ),
            FilterKind::LowShelf => (
                a * ((a + 1.0) - (a - 1.0) * cos + sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
                a * ((a + 1.0) - (a - 1.0) * cos - sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cos + sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos),
                (a + 1.0) + (a - 1.0) * cos - sqrt_a_alpha,
            ),
            FilterKind::HighShelf => (
                a * ((a + 1.0) + (a - 1.0) * cos + sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
                a * ((a + 1.0) + (a - 1.0) * cos - sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cos + sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos),
                (a + 1.0) - (a - 1.0) * cos - sqrt_a_alpha,
            ),
        };

        Self {
            kind,
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            state: Vec::new(),
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }
}

impl DspNode for BiquadFilter {
    fn process(&mut self, samples: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        if self.state.len() != channels {
            self.state = vec![[0.0; 4]; channels];
        }

        for frame in samples.chunks_mut(channels) {
            for (sample, state) in frame.iter_mut().zip(self.state.iter_mut()) {
                let x = f64::from(*sample);
                let [x1, x2, y1, y2] = *state;
                let y = self.b0 * x + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
                *state = [x, x1, y, y1];
                *sample = y as f32;
            }
        }
    }

    fn reset(&mut self) {
        self.state.iter_mut().for_each(|s| *s = [0.0; 4]);
    }
}

// ============================================================================
// Equaliser
// ============================================================================

/// Six-band equaliser; the outer bands are shelves, the inner ones peaks
#[derive(Debug, Clone)]
pub struct Equalizer {
    sample_rate: u32,
    gains: [f32; 6],
    filters: Vec<Option<BiquadFilter>>,
}

impl Equalizer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            gains: [0.0; 6],
            filters: vec![None; EQ_BANDS_HZ.len()],
        }
    }

    pub fn gains(&self) -> [f32; 6] {
        self.gains
    }

    /// Set one band's gain in dB, clamped to ±12
    pub fn set_band(&mut self, index: usize, gain_db: f32) {
        let Some(&frequency) = EQ_BANDS_HZ.get(index) else {
            return;
        };
        let gain_db = clamp_finite(gain_db, -EQ_GAIN_LIMIT_DB, EQ_GAIN_LIMIT_DB, 0.0);
        self.gains[index] = gain_db;

        self.filters[index] = if gain_db.abs() < FLAT_DB {
            None
        } else {
            let kind = match index {
                0 => FilterKind::LowShelf,
                i if i == EQ_BANDS_HZ.len() - 1 => FilterKind::HighShelf,
                _ => FilterKind::Peaking,
            };
            Some(BiquadFilter::new(
                kind,
                frequency,
                f64::from(gain_db),
                EQ_Q,
                self.sample_rate,
            ))
        };
    }

    pub fn set_gains(&mut self, gains: [f32; 6]) {
        for (index, gain) in gains.into_iter().enumerate() {
            self.set_band(index, gain);
        }
    }

    /// Whether every band is flat (processing is a no-op)
    pub fn is_flat(&self) -> bool {
        self.filters.iter().all(Option::is_none)
    }
}

impl DspNode for Equalizer {
    fn process(&mut self, samples: &mut [f32], channels: usize) {
        for filter in self.filters.iter_mut().flatten() {
            filter.process(samples, channels);
        }
    }

    fn reset(&mut self) {
        for filter in self.filters.iter_mut().flatten() {
            filter.reset();
        }
    }
}

// ============================================================================
// Settings and graph
// ============================================================================

/// User-facing effect settings, persisted as JSON by the UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsSettings {
    pub preamp_db: f32,
    pub eq_gains_db: [f32; 6],
    /// Master volume, 0 to 1
    pub volume: f32,
    pub tempo: f32,
    pub pitch_semitones: f32,
}

impl Default for EffectsSettings {
    fn default() -> Self {
        Self {
            preamp_db: 0.0,
            eq_gains_db: [0.0; 6],
            volume: 1.0,
            tempo: 1.0,
            pitch_semitones: 0.0,
        }
    }
}

impl EffectsSettings {
    /// Copy with every value forced into its valid range
    pub fn sanitized(&self) -> Self {
        let mut eq_gains_db = self.eq_gains_db;
        for gain in eq_gains_db.iter_mut() {
            *gain = clamp_finite(*gain, -EQ_GAIN_LIMIT_DB, EQ_GAIN_LIMIT_DB, 0.0);
        }

        Self {
            preamp_db: clamp_finite(self.preamp_db, -PREAMP_LIMIT_DB, PREAMP_LIMIT_DB, 0.0),
            eq_gains_db,
            volume: clamp_finite(self.volume, 0.0, 1.0, 1.0),
            tempo: clamp_finite(self.tempo, TEMPO_RANGE.0, TEMPO_RANGE.1, 1.0),
            pitch_semitones: clamp_finite(
                self.pitch_semitones,
                -PITCH_LIMIT_SEMITONES,
                PITCH_LIMIT_SEMITONES,
                0.0,
            ),
        }
    }

    pub fn playback_rate(&self) -> PlaybackRate {
        PlaybackRate::new(self.tempo, self.pitch_semitones)
    }
}

/// Media element rate derived from tempo and pitch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackRate {
    pub rate: f64,
    /// Whether the decoder should keep pitch constant while changing speed
    pub preserves_pitch: bool,
}

impl PlaybackRate {
    /// `tempo * 2^(pitch/12)`; pitch is only preserved with no pitch shift
    pub fn new(tempo: f32, pitch_semitones: f32) -> Self {
        let tempo = f64::from(clamp_finite(tempo, TEMPO_RANGE.0, TEMPO_RANGE.1, 1.0));
        let pitch = f64::from(clamp_finite(
            pitch_semitones,
            -PITCH_LIMIT_SEMITONES,
            PITCH_LIMIT_SEMITONES,
            0.0,
        ));
        Self {
            rate: tempo * 2f64.powf(pitch / 12.0),
            preserves_pitch: pitch == 0.0,
        }
    }
}

/// Preamp → equaliser → master volume
#[derive(Debug, Clone)]
pub struct AudioGraph {
    preamp: GainNode,
    equalizer: Equalizer,
    master: GainNode,
    settings: EffectsSettings,
}

impl AudioGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            preamp: GainNode::new(1.0),
            equalizer: Equalizer::new(sample_rate),
            master: GainNode::new(1.0),
            settings: EffectsSettings::default(),
        }
    }

    /// Apply settings (clamped) to every node
    pub fn apply(&mut self, settings: &EffectsSettings) {
        let settings = settings.sanitized();
        self.preamp = GainNode::from_db(settings.preamp_db);
        self.equalizer.set_gains(settings.eq_gains_db);
        self.master.set_gain(settings.volume);
        self.settings = settings;
    }

    /// Settings currently in effect, after clamping
    pub fn settings(&self) -> &EffectsSettings {
        &self.settings
    }

    pub fn equalizer(&self) -> &Equalizer {
        &self.equalizer
    }

    pub fn playback_rate(&self) -> PlaybackRate {
        self.settings.playback_rate()
    }
}

impl DspNode for AudioGraph {
    fn process(&mut self, samples: &mut [f32], channels: usize) {
        self.preamp.process(samples, channels);
        self.equalizer.process(samples, channels);
        self.master.process(samples, channels);
    }

    fn reset(&mut self) {
        self.equalizer.reset();
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}
