//! Experiment definitions and catalog
//!
//! Definitions are static application configuration: an experiment id, an
//! ordered list of variants, a default variant and optional allocation
//! weights. A catalog can be loaded from experiments.yml; when the file is
//! missing or malformed the built-in defaults are used instead.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

/// Tolerance when checking that weights sum to 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// Default minimum combined sample size before a winner can be declared
pub const DEFAULT_MINIMUM_SAMPLE_SIZE: u64 = 1000;

/// Default minimum experiment runtime in calendar days
pub const DEFAULT_MINIMUM_DURATION_DAYS: i64 = 14;

/// Well-known experiment ids shipped in the default catalog
pub const HOMEPAGE_HEADLINE: &str = "homepage-headline";
pub const PRIMARY_CTA: &str = "primary-cta";
pub const DEMO_FORM_LENGTH: &str = "demo-form-length";

/// Immutable configuration for a single experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    /// Unique identifier for the experiment
    pub id: String,
    /// Ordered list of variant identifiers
    pub variants: Vec<String>,
    /// Variant returned when no assignment can be made
    pub default_variant: String,
    /// Optional allocation weights, parallel to `variants`
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

impl ExperimentDefinition {
    /// Create a definition with uniform allocation.
    ///
    /// Fails when the variant list is empty, contains duplicates, or does
    /// not contain the default variant. Weight anomalies are deliberately
    /// NOT validated here: bad weights fall back to uniform allocation at
    /// bucketing time.
    pub fn new(
        id: impl Into<String>,
        variants: Vec<impl Into<String>>,
        default_variant: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        let default_variant = default_variant.into();

        if variants.is_empty() {
            return Err(Error::InvalidDefinition(format!(
                "{}: variants list is empty",
                id
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for variant in &variants {
            if !seen.insert(variant.as_str()) {
                return Err(Error::InvalidDefinition(format!(
                    "{}: duplicate variant '{}'",
                    id, variant
                )));
            }
        }

        if !variants.contains(&default_variant) {
            return Err(Error::InvalidDefinition(format!(
                "{}: default variant '{}' is not in the variants list",
                id, default_variant
            )));
        }

        Ok(Self {
            id,
            variants,
            default_variant,
            weights: None,
        })
    }

    /// Set allocation weights for this definition.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// True when weights are present, parallel to the variants and sum to
    /// 1.0 within tolerance. Anything else means uniform allocation.
    pub fn has_valid_weights(&self) -> bool {
        match &self.weights {
            Some(weights) if weights.len() == self.variants.len() => {
                let sum: f64 = weights.iter().sum();
                (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
            }
            _ => false,
        }
    }

    /// True when `variant` is a member of this definition.
    pub fn contains(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }
}

/// YAML catalog file structure
#[derive(Debug, Deserialize)]
struct YamlCatalog {
    experiments: Option<Vec<YamlExperiment>>,
}

#[derive(Debug, Deserialize)]
struct YamlExperiment {
    id: String,
    variants: Vec<String>,
    default_variant: Option<String>,
    weights: Option<Vec<f64>>,
}

/// Built-in catalog used when experiments.yml is absent or unreadable
static DEFAULT_CATALOG: Lazy<Vec<ExperimentDefinition>> = Lazy::new(|| {
    vec![
        ExperimentDefinition::new(
            HOMEPAGE_HEADLINE,
            vec!["variant-a", "variant-b", "variant-c"],
            "variant-a",
        )
        .expect("default catalog definition")
        .with_weights(vec![0.34, 0.33, 0.33]),
        ExperimentDefinition::new(
            PRIMARY_CTA,
            vec!["variant-a", "variant-b", "variant-c", "variant-d"],
            "variant-a",
        )
        .expect("default catalog definition")
        .with_weights(vec![0.25, 0.25, 0.25, 0.25]),
        ExperimentDefinition::new(DEMO_FORM_LENGTH, vec!["short", "long"], "short")
            .expect("default catalog definition")
            .with_weights(vec![0.5, 0.5]),
    ]
});

/// Lookup table of experiment definitions keyed by id.
#[derive(Debug, Clone)]
pub struct ExperimentCatalog {
    experiments: HashMap<String, ExperimentDefinition>,
}

impl Default for ExperimentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentCatalog {
    /// Load the catalog from experiments.yml or fall back to defaults.
    pub fn new() -> Self {
        Self::load_from_file("experiments.yml")
            .or_else(|_| Self::load_from_file("../experiments.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Built-in catalog.
    pub fn defaults() -> Self {
        Self::from_definitions(DEFAULT_CATALOG.clone())
    }

    /// Build a catalog from explicit definitions.
    pub fn from_definitions(definitions: Vec<ExperimentDefinition>) -> Self {
        let experiments = definitions
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        Self { experiments }
    }

    /// Load and validate a YAML catalog file. Entries that fail definition
    /// validation are skipped with a warning rather than failing the load.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let yaml: YamlCatalog = serde_yaml::from_str(&content)?;

        let entries = yaml
            .experiments
            .ok_or_else(|| Error::CatalogError(format!("{}: no experiments key", path.display())))?;

        let mut experiments = HashMap::new();
        for entry in entries {
            let default_variant = entry
                .default_variant
                .or_else(|| entry.variants.first().cloned())
                .unwrap_or_default();

            match ExperimentDefinition::new(entry.id.clone(), entry.variants, default_variant) {
                Ok(mut definition) => {
                    definition.weights = entry.weights;
                    experiments.insert(definition.id.clone(), definition);
                }
                Err(err) => {
                    warn!(experiment = %entry.id, error = %err, "Skipping invalid catalog entry");
                }
            }
        }

        if experiments.is_empty() {
            return Err(Error::CatalogError(format!(
                "{}: no valid experiment entries",
                path.display()
            )));
        }

        Ok(Self { experiments })
    }

    /// Get a definition by experiment id.
    pub fn get(&self, id: &str) -> Option<&ExperimentDefinition> {
        self.experiments.get(id)
    }

    /// Number of experiments in the catalog.
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// True when the catalog holds no experiments.
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// All experiment ids, sorted for stable display.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.experiments.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
