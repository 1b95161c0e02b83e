//! Statistical significance engine for two-variant experiments
//!
//! Pure functions only: callers supply already-aggregated per-variant
//! visitor/conversion counts, and everything here is freely parallelizable
//! across experiments. Degenerate inputs (zero visitors, zero pooled
//! variance) produce neutral outputs instead of errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MINIMUM_DURATION_DAYS, DEFAULT_MINIMUM_SAMPLE_SIZE};

/// Default confidence level in percent
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 95.0;

/// Aggregated counts for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSample {
    pub visitors: u64,
    pub conversions: u64,
}

impl VariantSample {
    pub fn new(visitors: u64, conversions: u64) -> Self {
        Self {
            visitors,
            conversions,
        }
    }

    /// Observed conversion rate, 0 when there are no visitors.
    pub fn conversion_rate(&self) -> f64 {
        if self.visitors == 0 {
            return 0.0;
        }
        self.conversions as f64 / self.visitors as f64
    }
}

/// Confidence interval for a conversion rate, clamped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub margin: f64,
}

/// Result of a two-variant significance test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificanceVerdict {
    pub is_significant: bool,
    pub p_value: f64,
    pub z_score: f64,
    pub confidence_level: f64,
    pub total_sample_size: u64,
    pub conversion_rate_1: f64,
    pub conversion_rate_2: f64,
    pub confidence_interval_1: ConfidenceInterval,
    pub confidence_interval_2: ConfidenceInterval,
    /// Percent change of the treatment rate over the baseline rate
    pub relative_lift: f64,
    pub absolute_lift: f64,
    pub has_enough_data: bool,
    pub recommendation: String,
    pub minimum_sample_size: u64,
}

/// Critical z value for a confidence level in percent. Unknown levels get
/// the 95% value.
fn z_critical(confidence_level: f64) -> f64 {
    if (confidence_level - 99.0).abs() < f64::EPSILON {
        2.576
    } else {
        1.96
    }
}

/// Pooled two-proportion z score. Zero when either visitor count or the
/// pooled variance is zero.
fn z_score(baseline: VariantSample, treatment: VariantSample) -> f64 {
    if baseline.visitors == 0 || treatment.visitors == 0 {
        return 0.0;
    }

    let pooled = (baseline.conversions + treatment.conversions) as f64
        / (baseline.visitors + treatment.visitors) as f64;
    let standard_error = (pooled
        * (1.0 - pooled)
        * (1.0 / baseline.visitors as f64 + 1.0 / treatment.visitors as f64))
        .sqrt();

    if standard_error == 0.0 {
        return 0.0;
    }

    (treatment.conversion_rate() - baseline.conversion_rate()) / standard_error
}

/// Two-tailed p-value from a z score.
///
/// Abramowitz & Stegun 26.2.17 rational-polynomial approximation of the
/// standard normal tail, accurate to about 1e-7 for |z| up to ~7.
fn p_value_two_tailed(z_score: f64) -> f64 {
    let z = z_score.abs();

    let t = 1.0 / (1.0 + 0.2316419 * z);
    let d = 0.3989423 * (-z * z / 2.0).exp();
    let tail = d
        * t
        * (0.3193815
            + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274))));

    2.0 * tail
}

/// Confidence interval for a variant's conversion rate.
pub fn confidence_interval(sample: VariantSample, confidence_level: f64) -> ConfidenceInterval {
    if sample.visitors == 0 {
        return ConfidenceInterval {
            lower: 0.0,
            upper: 0.0,
            margin: 0.0,
        };
    }

    let proportion = sample.conversion_rate();
    let standard_error = (proportion * (1.0 - proportion) / sample.visitors as f64).sqrt();
    let margin = z_critical(confidence_level) * standard_error;

    ConfidenceInterval {
        lower: (proportion - margin).max(0.0),
        upper: (proportion + margin).min(1.0),
        margin,
    }
}

/// Test whether the treatment variant converts differently from the
/// baseline.
///
/// `confidence_level` is in percent (90/95/99); `minimum_sample_size` is
/// the combined visitor count required before a winner may be declared.
pub fn test_significance(
    baseline: VariantSample,
    treatment: VariantSample,
    confidence_level: f64,
    minimum_sample_size: u64,
) -> SignificanceVerdict {
    let conversion_rate_1 = baseline.conversion_rate();
    let conversion_rate_2 = treatment.conversion_rate();

    let absolute_lift = conversion_rate_2 - conversion_rate_1;
    let relative_lift = if conversion_rate_1 > 0.0 {
        (absolute_lift / conversion_rate_1) * 100.0
    } else {
        0.0
    };

    let total_sample_size = baseline.visitors + treatment.visitors;
    let has_enough_data = total_sample_size >= minimum_sample_size;

    let mut z = 0.0;
    let mut p_value = 1.0;
    let mut is_significant = false;

    if baseline.visitors > 0 && treatment.visitors > 0 {
        z = z_score(baseline, treatment);
        p_value = p_value_two_tailed(z);

        let alpha = (100.0 - confidence_level) / 100.0;
        is_significant = p_value < alpha && has_enough_data;
    }

    let recommendation = recommend(
        has_enough_data,
        is_significant,
        p_value,
        relative_lift,
        minimum_sample_size,
        total_sample_size,
    );

    SignificanceVerdict {
        is_significant,
        p_value,
        z_score: z,
        confidence_level,
        total_sample_size,
        conversion_rate_1,
        conversion_rate_2,
        confidence_interval_1: confidence_interval(baseline, confidence_level),
        confidence_interval_2: confidence_interval(treatment, confidence_level),
        relative_lift,
        absolute_lift,
        has_enough_data,
        recommendation,
        minimum_sample_size,
    }
}

fn recommend(
    has_enough_data: bool,
    is_significant: bool,
    p_value: f64,
    relative_lift: f64,
    minimum_sample_size: u64,
    total_sample_size: u64,
) -> String {
    if !has_enough_data {
        let missing = minimum_sample_size.saturating_sub(total_sample_size);
        format!(
            "Continue test. Need {} more visitors to reach minimum sample size.",
            missing
        )
    } else if is_significant {
        if relative_lift > 0.0 {
            format!(
                "Variant 2 is a clear winner with {:.1}% improvement. Consider implementing this variant.",
                relative_lift
            )
        } else {
            "Variant 1 (baseline) performs significantly better. Keep the original.".to_string()
        }
    } else if p_value < 0.10 {
        format!(
            "Results are trending towards significance (p={:.3}). Consider running the test longer.",
            p_value
        )
    } else {
        "No significant difference detected. Consider stopping the test or trying a different variant."
            .to_string()
    }
}

/// Required per-variant sample size for detecting a relative effect.
///
/// Standard two-proportion formula; `minimum_detectable_effect` is the
/// relative lift over the baseline rate (0.10 = +10%).
pub fn calculate_sample_size(
    baseline_rate: f64,
    minimum_detectable_effect: f64,
    significance_level: f64,
    power: f64,
) -> u64 {
    let z_alpha = if (significance_level - 0.05).abs() < f64::EPSILON {
        1.96
    } else {
        2.576
    };
    let z_beta = if (power - 0.8).abs() < f64::EPSILON {
        0.84
    } else {
        1.036
    };

    let p1 = baseline_rate;
    let p2 = baseline_rate * (1.0 + minimum_detectable_effect);

    let numerator = (z_alpha * (2.0 * p1 * (1.0 - p1)).sqrt()
        + z_beta * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt())
    .powi(2);
    let denominator = (p2 - p1).powi(2);

    (numerator / denominator).ceil() as u64
}

/// True once the experiment has run for the minimum number of calendar
/// days. A peeking guard, not a statistical check.
pub fn has_minimum_duration(start: DateTime<Utc>, minimum_days: i64) -> bool {
    has_minimum_duration_at(start, Utc::now(), minimum_days)
}

fn has_minimum_duration_at(start: DateTime<Utc>, now: DateTime<Utc>, minimum_days: i64) -> bool {
    days_passed(start, now) >= minimum_days as f64
}

/// Whole days remaining until the minimum duration is reached, 0 once
/// passed.
pub fn days_until_minimum_duration(start: DateTime<Utc>, minimum_days: i64) -> i64 {
    days_until_minimum_duration_at(start, Utc::now(), minimum_days)
}

fn days_until_minimum_duration_at(
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    minimum_days: i64,
) -> i64 {
    let remaining = (minimum_days as f64 - days_passed(start, now)).ceil();
    remaining.max(0.0) as i64
}

fn days_passed(start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - start).num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0 * 24.0)
}

/// Convenience wrappers using the default duration gate.
pub fn has_default_minimum_duration(start: DateTime<Utc>) -> bool {
    has_minimum_duration(start, DEFAULT_MINIMUM_DURATION_DAYS)
}

/// Significance test with the default confidence level and sample floor.
pub fn test_significance_default(
    baseline: VariantSample,
    treatment: VariantSample,
) -> SignificanceVerdict {
    test_significance(
        baseline,
        treatment,
        DEFAULT_CONFIDENCE_LEVEL,
        DEFAULT_MINIMUM_SAMPLE_SIZE,
    )
}

/// Format a rate in [0, 1] as a percentage string.
pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}

/// Format a lift percentage with an explicit sign.
pub fn format_lift(value: f64, decimals: usize) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{:.*}%", sign, decimals, value)
}
