//! Lorisk: loan default risk CLI
//!
//! Cleans raw loan extracts, builds model features, trains and applies a
//! Gaussian Naive Bayes default classifier.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use lorisk::cli::{Cli, Commands};
use lorisk::config::PipelineConfig;
use lorisk::pipeline::{
    add_features, add_target_variable, load_dataset, load_dictionary, make_dataset, normalize_types,
    predict_file, resolve_missing_values, sample_file, save_dataset, train_file, CleaningReport,
};
use lorisk::report::{
    display_cleaning_report, display_evaluation, display_feature_report, export_metrics,
    MetricsExport, PipelineSummary,
};
use lorisk::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_info, print_io,
    print_step_header, print_step_time, print_success,
};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config();

    if !cli.quiet {
        print_banner(env!("CARGO_PKG_VERSION"));
    }

    match &cli.command {
        Commands::Clean {
            input,
            output,
            dictionary,
        } => run_clean(input, output, &dictionary.dictionary, &config, cli.quiet),
        Commands::Features { input, output, .. } => run_features(input, output, &config, cli.quiet),
        Commands::MakeDataset {
            input_dir,
            output_dir,
            n_samples,
            dictionary,
            ..
        } => run_make_dataset(input_dir, output_dir, *n_samples, &dictionary.dictionary, &config, cli.quiet),
        Commands::Train {
            input,
            model_output,
            predictions,
            metrics,
            ..
        } => run_train(
            input,
            model_output,
            predictions.as_deref(),
            metrics.as_deref(),
            &config,
            cli.quiet,
        ),
        Commands::Predict { model, data, output } => run_predict(model, data, output, cli.quiet),
        Commands::Sample {
            n, input, output, ..
        } => run_sample(*n, input, output, &config, cli.quiet),
    }
}

fn run_clean(input: &Path, output: &Path, dictionary_path: &Path, config: &PipelineConfig, quiet: bool) -> Result<()> {
    if !quiet {
        print_io(input, output, &[("Dictionary", dictionary_path.display().to_string())]);
    }
    let mut summary = PipelineSummary::new();

    if !quiet {
        print_step_header(1, "Load");
    }
    let step_start = Instant::now();
    let dictionary = load_dictionary(dictionary_path)?;
    let df = load_dataset(input, config.infer_schema_length)?;
    summary.add_stage("Load", df.height(), df.width(), step_start.elapsed());
    if !quiet {
        print_success(&format!("Loaded {} rows, {} dictionary entries", df.height(), dictionary.len()));
        print_step_time(step_start.elapsed());
        print_step_header(2, "Target Labeling");
    }

    let step_start = Instant::now();
    let (df, labels) = add_target_variable(df).context("Failed to label loan status")?;
    summary.add_stage("Label", df.height(), df.width(), step_start.elapsed());
    if !quiet {
        print_success(&format!("{} defaults, {} non-defaults", labels.defaults, labels.non_defaults));
        print_step_time(step_start.elapsed());
        print_step_header(3, "Missing Value Resolution");
    }

    let step_start = Instant::now();
    let spinner = create_spinner("Resolving missing values...", quiet);
    let (mut df, missing) = resolve_missing_values(df, &dictionary).context("Failed to resolve missing values")?;
    finish_with_success(&spinner, "No missing values remain");
    summary.add_stage("Resolve missing", df.height(), df.width(), step_start.elapsed());
    if !quiet {
        print_step_time(step_start.elapsed());
        print_step_header(4, "Save Results");
    }

    save_dataset(&mut df, output)?;
    if !quiet {
        print_success(&format!("Saved to {}", output.display()));
        summary.display();
        display_cleaning_report(&CleaningReport { labels, missing });
        print_completion("Cleaning complete!");
    }
    Ok(())
}

fn run_features(input: &Path, output: &Path, config: &PipelineConfig, quiet: bool) -> Result<()> {
    if !quiet {
        print_io(
            input,
            output,
            &[
                ("Outlier policy", config.outlier_policy.to_string()),
                ("Normalize types", config.normalize_types.to_string()),
            ],
        );
    }
    let mut summary = PipelineSummary::new();

    let step_start = Instant::now();
    let df = load_dataset(input, config.infer_schema_length)?;
    summary.add_stage("Load", df.height(), df.width(), step_start.elapsed());

    let df = if config.normalize_types {
        let step_start = Instant::now();
        let df = normalize_types(df).context("Failed to normalize column types")?;
        summary.add_stage("Normalize types", df.height(), df.width(), step_start.elapsed());
        df
    } else {
        df
    };

    let step_start = Instant::now();
    let spinner = create_spinner("Building features...", quiet);
    let (mut df, report) = add_features(df, config.outlier_policy).context("Failed to build features")?;
    finish_with_success(&spinner, "Features built");
    summary.add_stage("Features", df.height(), df.width(), step_start.elapsed());

    save_dataset(&mut df, output)?;
    if !quiet {
        print_success(&format!("Saved to {}", output.display()));
        summary.display();
        display_feature_report(&report);
        print_completion("Feature building complete!");
    }
    Ok(())
}

fn run_make_dataset(
    input_dir: &Path,
    output_dir: &Path,
    n_samples: usize,
    dictionary_path: &Path,
    config: &PipelineConfig,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        print_io(
            input_dir,
            output_dir,
            &[
                ("Samples", if n_samples > 0 { n_samples.to_string() } else { "all rows".to_string() }),
                ("Outlier policy", config.outlier_policy.to_string()),
            ],
        );
    }

    let step_start = Instant::now();
    let spinner = create_spinner("Sampling, cleaning and building features...", quiet);
    let outcome = make_dataset(input_dir, output_dir, n_samples, dictionary_path, config)?;
    finish_with_success(&spinner, &format!("Saved to {}", outcome.paths.processed.display()));

    if !quiet {
        print_step_time(step_start.elapsed());
        if let Some(sampled) = &outcome.paths.sampled {
            print_info(&format!("Sample: {}", sampled.display()));
        }
        print_info(&format!("Cleaned: {}", outcome.paths.cleaned.display()));
        display_cleaning_report(&outcome.cleaning);
        display_feature_report(&outcome.features);
        print_completion("Dataset ready!");
    }
    Ok(())
}

fn run_train(
    input: &Path,
    model_output: &Path,
    predictions: Option<&Path>,
    metrics: Option<&Path>,
    config: &PipelineConfig,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        print_io(
            input,
            model_output,
            &[
                ("Seed", config.seed.to_string()),
                ("Train fraction", config.train_fraction.to_string()),
                ("Scaling", config.scaling.to_string()),
            ],
        );
    }

    let step_start = Instant::now();
    let spinner = create_spinner("Training model...", quiet);
    let outcome = train_file(input, model_output, predictions, config)?;
    finish_with_success(&spinner, &format!("Model saved to {}", model_output.display()));

    if let Some(path) = metrics {
        let export = MetricsExport::new(&input.display().to_string(), config, &outcome.split, &outcome.evaluation);
        export_metrics(&export, path)?;
    }

    if !quiet {
        print_step_time(step_start.elapsed());
        if let Some(path) = predictions {
            print_info(&format!("Predictions: {}", path.display()));
        }
        if let Some(path) = metrics {
            print_info(&format!("Metrics: {}", path.display()));
        }
        display_evaluation(&outcome.evaluation, &outcome.split);
        print_completion("Training complete!");
    }
    Ok(())
}

fn run_predict(model: &Path, data: &Path, output: &Path, quiet: bool) -> Result<()> {
    if !quiet {
        print_io(data, output, &[("Model", model.display().to_string())]);
    }

    let spinner = create_spinner("Predicting...", quiet);
    let rows = predict_file(model, data, output)?;
    finish_with_success(&spinner, &format!("{} prediction(s) saved to {}", rows, output.display()));

    if !quiet {
        print_completion("Prediction complete!");
    }
    Ok(())
}

fn run_sample(n: usize, input: &Path, output: &Path, config: &PipelineConfig, quiet: bool) -> Result<()> {
    if !quiet {
        print_io(input, output, &[("Rows", n.to_string()), ("Seed", config.seed.to_string())]);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let rows = sample_file(input, output, n, config.infer_schema_length, &mut rng)?;

    if !quiet {
        print_success(&format!("Sampled {} row(s)", rows));
        print_completion("Sampling complete!");
    }
    Ok(())
}
