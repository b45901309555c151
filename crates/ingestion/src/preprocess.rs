//! Per-axis sample preprocessing
//!
//! Optional unit-length normalization followed by a chain of scalar filters
//! applied to each vector component independently.

use std::collections::VecDeque;
use std::f64::consts::PI;

use contracts::{Axis, FilterSpec, PreprocessConfig, SensorSample, Vec3};

/// Moving-sum FIR filter with a uniform coefficient
#[derive(Debug, Clone)]
pub struct FirFilter {
    window: VecDeque<f64>,
    coefficient: f64,
}

impl FirFilter {
    /// History starts zero-filled
    pub fn new(length: usize, coefficient: f64) -> Self {
        let length = length.max(1);
        Self {
            window: VecDeque::from(vec![0.0; length]),
            coefficient,
        }
    }

    pub fn update(&mut self, input: f64) -> f64 {
        self.window.pop_front();
        self.window.push_back(input);
        self.window.iter().sum::<f64>() * self.coefficient
    }
}

/// First-order RC low-pass filter
#[derive(Debug, Clone)]
pub struct RcFilter {
    input_weight: f64,
    feedback_weight: f64,
    previous: f64,
}

impl RcFilter {
    pub fn new(cutoff_hz: f64, sample_time_s: f64) -> Self {
        let rc = 1.0 / (2.0 * PI * cutoff_hz);
        let denominator = sample_time_s + rc;
        Self {
            input_weight: sample_time_s / denominator,
            feedback_weight: rc / denominator,
            previous: 0.0,
        }
    }

    pub fn update(&mut self, input: f64) -> f64 {
        let output = self.input_weight * input + self.feedback_weight * self.previous;
        self.previous = output;
        output
    }
}

/// Scalar filter stage
#[derive(Debug, Clone)]
pub enum ScalarFilter {
    Fir(FirFilter),
    Rc(RcFilter),
}

impl ScalarFilter {
    pub fn from_spec(spec: FilterSpec) -> Self {
        match spec {
            FilterSpec::Fir {
                length,
                coefficient,
            } => Self::Fir(FirFilter::new(length, coefficient)),
            FilterSpec::Rc {
                cutoff_hz,
                sample_time_s,
            } => Self::Rc(RcFilter::new(cutoff_hz, sample_time_s)),
        }
    }

    pub fn update(&mut self, input: f64) -> f64 {
        match self {
            Self::Fir(filter) => filter.update(input),
            Self::Rc(filter) => filter.update(input),
        }
    }
}

/// Filter chain for one axis; one chain per vector component
#[derive(Debug, Clone, Default)]
struct AxisChain {
    components: [Vec<ScalarFilter>; 3],
}

impl AxisChain {
    fn new(specs: &[FilterSpec]) -> Self {
        let build = || specs.iter().copied().map(ScalarFilter::from_spec).collect();
        Self {
            components: [build(), build(), build()],
        }
    }

    fn apply(&mut self, values: Vec3) -> Vec3 {
        let mut out = values;
        for (value, chain) in out.iter_mut().zip(self.components.iter_mut()) {
            for stage in chain.iter_mut() {
                *value = stage.update(*value);
            }
        }
        out
    }
}

/// Preprocessor owned by one source adapter
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    normalize: bool,
    gyro: AxisChain,
    accel: AxisChain,
    mag: AxisChain,
}

impl Preprocessor {
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            normalize: config.normalize,
            gyro: AxisChain::new(&config.gyro),
            accel: AxisChain::new(&config.accel),
            mag: AxisChain::new(&config.mag),
        }
    }

    /// Preprocess one sample in place
    pub fn apply(&mut self, sample: SensorSample) -> SensorSample {
        let mut values = sample.values;
        if self.normalize {
            values = normalize(values);
        }

        let chain = match sample.axis {
            Axis::Gyro => &mut self.gyro,
            Axis::Accel => &mut self.accel,
            Axis::Mag => &mut self.mag,
        };

        SensorSample {
            values: chain.apply(values),
            ..sample
        }
    }
}

/// Scale to unit length; a zero vector is left unchanged
pub fn normalize(values: Vec3) -> Vec3 {
    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return values;
    }
    values.map(|v| v / norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fir_moving_sum() {
        let mut fir = FirFilter::new(10, 0.1);
        for i in 1..=9 {
            let out = fir.update(1.0);
            assert!((out - 0.1 * i as f64).abs() < 1e-12);
        }
        assert!((fir.update(1.0) - 1.0).abs() < 1e-12);
        assert!((fir.update(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rc_step_response() {
        let mut rc = RcFilter::new(1.0, 0.01);
        let rc_const = 1.0 / (2.0 * PI);
        let a = 0.01 / (0.01 + rc_const);

        assert!((rc.update(1.0) - a).abs() < 1e-12);

        let mut last = 0.0;
        for _ in 0..2000 {
            last = rc.update(1.0);
        }
        assert!((last - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity_preprocessor() {
        let mut pre = Preprocessor::new(&PreprocessConfig::default());
        let sample = SensorSample::new(Axis::Accel, 5, [1.0, 2.0, 3.0]);
        assert_eq!(pre.apply(sample), sample);
    }

    #[test]
    fn test_normalize_before_filters() {
        let config = PreprocessConfig {
            normalize: true,
            mag: vec![FilterSpec::Fir {
                length: 2,
                coefficient: 1.0,
            }],
            ..Default::default()
        };
        let mut pre = Preprocessor::new(&config);

        let out = pre.apply(SensorSample::new(Axis::Mag, 0, [0.0, 3.0, 4.0]));
        assert!((out.values[1] - 0.6).abs() < 1e-12);
        assert!((out.values[2] - 0.8).abs() < 1e-12);

        let out = pre.apply(SensorSample::new(Axis::Mag, 1, [0.0, 0.0, 10.0]));
        assert!((out.values[2] - 1.8).abs() < 1e-12);

        // gyro chain untouched by mag filters
        let gyro = pre.apply(SensorSample::new(Axis::Gyro, 1, [0.0, 0.0, 2.0]));
        assert_eq!(gyro.values, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_zero_vector_not_normalized() {
        assert_eq!(normalize([0.0; 3]), [0.0; 3]);
    }
}
