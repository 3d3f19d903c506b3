//! Exact-length clip normalization

/// Mono samples of exactly the requested length
#[derive(Debug, Clone, PartialEq)]
pub struct FixedAudio {
    samples: Vec<f32>,
}

impl FixedAudio {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Hard-cut or zero-pad `samples` to exactly `target_samples`.
///
/// Longer input keeps its first `target_samples`; shorter input gets trailing
/// silence. No fading. Re-applying to fixed-length audio is a no-op.
pub fn fix_duration(samples: &[f32], target_samples: usize) -> FixedAudio {
    let keep = samples.len().min(target_samples);
    let mut fixed = Vec::with_capacity(target_samples);
    fixed.extend_from_slice(&samples[..keep]);
    fixed.resize(target_samples, 0.0);
    FixedAudio { samples: fixed }
}
