//! Monte-Carlo normalization weights.
//!
//! A weight scales simulated candidate yields to the integrated luminosity
//! of the data-taking run: `w = L * sigma / N_generated`. The weight is a
//! single scalar applied uniformly to every retained candidate of a sample.

use crate::domain::Candidate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One simulated sample and its generated-event count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McSample {
    pub name: String,
    pub n_generated: i64,
}

/// Whether each sample gets its own weight or all samples share one global
/// weight computed from the summed generated counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    PerSample,
    #[default]
    MergedSamples,
}

/// `weight = luminosity_fb * cross_section_fb / n_generated_total`.
///
/// A non-positive or non-finite normalization is an explicit degenerate
/// case: the weight is 0.0 with a warning, never an error.
pub fn calculate_mc_weight(luminosity_fb: f64, cross_section_fb: f64, n_generated_total: i64) -> f64 {
    if n_generated_total <= 0 {
        warn!(
            n_generated_total,
            "non-positive generated-event count, weight forced to 0.0"
        );
        return 0.0;
    }
    let weight = luminosity_fb * cross_section_fb / n_generated_total as f64;
    if !weight.is_finite() || weight < 0.0 {
        warn!(
            luminosity_fb,
            cross_section_fb, "degenerate normalization inputs, weight forced to 0.0"
        );
        return 0.0;
    }
    weight
}

/// Normalization inputs for a set of MC samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McNormalization {
    pub luminosity_fb: f64,
    pub cross_section_fb: f64,
    pub samples: Vec<McSample>,
    pub scheme: WeightScheme,
}

impl McNormalization {
    /// The single global weight over the summed generated counts.
    pub fn merged_weight(&self) -> f64 {
        let total: i64 = self.samples.iter().map(|sample| sample.n_generated).sum();
        calculate_mc_weight(self.luminosity_fb, self.cross_section_fb, total)
    }

    /// The weight for one named sample, `None` if the sample is unknown.
    pub fn weight_for_sample(&self, name: &str) -> Option<f64> {
        let sample = self.samples.iter().find(|sample| sample.name == name)?;
        Some(calculate_mc_weight(
            self.luminosity_fb,
            self.cross_section_fb,
            sample.n_generated,
        ))
    }

    /// The weight to apply under the configured scheme.
    pub fn weight_for(&self, sample_name: &str) -> Option<f64> {
        match self.scheme {
            WeightScheme::MergedSamples => Some(self.merged_weight()),
            WeightScheme::PerSample => self.weight_for_sample(sample_name),
        }
    }
}

/// A candidate paired with its normalization weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedCandidate {
    pub candidate: Candidate,
    pub weight: f64,
}

pub fn apply_weight(candidates: &[Candidate], weight: f64) -> Vec<WeightedCandidate> {
    candidates
        .iter()
        .cloned()
        .map(|candidate| WeightedCandidate { candidate, weight })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        apply_weight, calculate_mc_weight, McNormalization, McSample, WeightScheme,
    };
    use crate::domain::Candidate;

    fn normalization(scheme: WeightScheme) -> McNormalization {
        McNormalization {
            luminosity_fb: 12.1,
            cross_section_fb: 17_600.0,
            samples: vec![
                McSample {
                    name: "ZZTo4mu".to_string(),
                    n_generated: 1_000_000,
                },
                McSample {
                    name: "ZZTo4e".to_string(),
                    n_generated: 950_000,
                },
            ],
            scheme,
        }
    }

    #[test]
    fn weight_is_luminosity_times_cross_section_over_count() {
        let weight = calculate_mc_weight(12.1, 17_600.0, 1_000_000);
        assert!((weight - 0.212_96).abs() < 1.0e-9);
    }

    #[test]
    fn zero_generated_count_yields_zero_weight_without_error() {
        assert_eq!(calculate_mc_weight(12.1, 17_600.0, 0), 0.0);
        assert_eq!(calculate_mc_weight(12.1, 17_600.0, -5), 0.0);
    }

    #[test]
    fn degenerate_normalization_inputs_yield_zero_weight() {
        assert_eq!(calculate_mc_weight(f64::NAN, 17_600.0, 10), 0.0);
        assert_eq!(calculate_mc_weight(12.1, f64::INFINITY, 10), 0.0);
        assert_eq!(calculate_mc_weight(-12.1, 17_600.0, 10), 0.0);
    }

    #[test]
    fn merged_scheme_sums_generated_counts_before_weighting() {
        let merged = normalization(WeightScheme::MergedSamples);
        let expected = 12.1 * 17_600.0 / 1_950_000.0;
        assert!((merged.merged_weight() - expected).abs() < 1.0e-12);
        assert_eq!(merged.weight_for("ZZTo4mu"), Some(merged.merged_weight()));
        // The merged weight does not depend on which sample asks.
        assert_eq!(merged.weight_for("ZZTo4e"), merged.weight_for("ZZTo4mu"));
    }

    #[test]
    fn per_sample_scheme_uses_each_sample_count() {
        let per_sample = normalization(WeightScheme::PerSample);
        let four_mu = per_sample.weight_for("ZZTo4mu").expect("known sample");
        let four_e = per_sample.weight_for("ZZTo4e").expect("known sample");
        assert!((four_mu - 12.1 * 17_600.0 / 1.0e6).abs() < 1.0e-12);
        assert!(four_e > four_mu);
        assert_eq!(per_sample.weight_for("unknown"), None);
    }

    #[test]
    fn applying_a_weight_preserves_candidate_order() {
        let candidates = vec![
            Candidate {
                event_id: 3,
                z1_mass: 90.0,
                z2_mass: 30.0,
                four_lepton_mass: 124.0,
                lepton_indices: [0, 1, 2, 3],
            },
            Candidate {
                event_id: 9,
                z1_mass: 91.0,
                z2_mass: 28.0,
                four_lepton_mass: 126.0,
                lepton_indices: [0, 2, 1, 3],
            },
        ];
        let weighted = apply_weight(&candidates, 0.25);
        assert_eq!(weighted.len(), 2);
        assert_eq!(weighted[0].candidate.event_id, 3);
        assert_eq!(weighted[1].candidate.event_id, 9);
        assert!(weighted.iter().all(|entry| entry.weight == 0.25));
    }
}
