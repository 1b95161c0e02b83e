//! Significance report CLI.
//!
//! Usage:
//!   cargo run --bin ab_report -- --conversions-a 100 --visitors-a 1000 \
//!       --conversions-b 150 --visitors-b 1000

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use experiments::stats::{
    calculate_sample_size, format_lift, format_percentage, test_significance, SignificanceVerdict,
    VariantSample,
};

#[derive(Parser, Debug)]
#[command(name = "ab_report")]
#[command(about = "Significance report for a two-variant conversion experiment")]
struct Args {
    /// Conversions for variant A (baseline)
    #[arg(long)]
    conversions_a: u64,

    /// Visitors for variant A (baseline)
    #[arg(long)]
    visitors_a: u64,

    /// Conversions for variant B (treatment)
    #[arg(long)]
    conversions_b: u64,

    /// Visitors for variant B (treatment)
    #[arg(long)]
    visitors_b: u64,

    /// Confidence level in percent (90, 95 or 99)
    #[arg(long, default_value_t = 95.0)]
    confidence: f64,

    /// Minimum combined sample size before declaring a winner
    #[arg(long, env = "AB_MIN_SAMPLE_SIZE", default_value_t = 1000)]
    min_sample_size: u64,

    /// Baseline rate for the sample-size planner (defaults to variant A's
    /// observed rate)
    #[arg(long)]
    baseline_rate: Option<f64>,

    /// Minimum detectable effect for the sample-size planner, as a
    /// relative lift (0.1 = +10%)
    #[arg(long, default_value_t = 0.10)]
    mde: f64,

    /// Print the verdict as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("experiments=info".parse()?))
        .init();

    let args = Args::parse();

    let baseline = VariantSample::new(args.visitors_a, args.conversions_a);
    let treatment = VariantSample::new(args.visitors_b, args.conversions_b);

    let verdict = test_significance(baseline, treatment, args.confidence, args.min_sample_size);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    print_report(&verdict, baseline, treatment);

    let baseline_rate = args
        .baseline_rate
        .unwrap_or_else(|| baseline.conversion_rate());
    if baseline_rate > 0.0 {
        let per_variant = calculate_sample_size(baseline_rate, args.mde, 0.05, 0.8);
        println!();
        println!(
            "Planning: detecting a {} lift on a {} baseline needs {} visitors per variant.",
            format_lift(args.mde * 100.0, 0),
            format_percentage(baseline_rate, 1),
            per_variant
        );
    }

    Ok(())
}

fn print_report(verdict: &SignificanceVerdict, baseline: VariantSample, treatment: VariantSample) {
    let header = format!(
        "A/B report ({:.0}% confidence, min sample {})",
        verdict.confidence_level, verdict.minimum_sample_size
    );
    println!("{}", header);
    println!("{}", "-".repeat(header.chars().count()));

    println!(
        "{:10} {:>10} {:>12} {:>8} {:>20}",
        "Variant", "Visitors", "Conversions", "Rate", "Interval"
    );
    for (name, sample, rate, interval) in [
        (
            "A",
            baseline,
            verdict.conversion_rate_1,
            verdict.confidence_interval_1,
        ),
        (
            "B",
            treatment,
            verdict.conversion_rate_2,
            verdict.confidence_interval_2,
        ),
    ] {
        println!(
            "{:10} {:>10} {:>12} {:>8} {:>20}",
            name,
            sample.visitors,
            sample.conversions,
            format_percentage(rate, 2),
            format!(
                "[{} .. {}]",
                format_percentage(interval.lower, 2),
                format_percentage(interval.upper, 2)
            )
        );
    }

    println!();
    println!(
        "Lift: {} relative ({} absolute)",
        format_lift(verdict.relative_lift, 1),
        format_percentage(verdict.absolute_lift, 2)
    );
    println!(
        "z = {:.3}, p = {:.4}, significant: {}",
        verdict.z_score, verdict.p_value, verdict.is_significant
    );
    println!("Recommendation: {}", verdict.recommendation);
}
