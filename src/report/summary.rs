//! Terminal summary tables for pipeline runs

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::model::{Evaluation, Metric};
use crate::pipeline::features::FeatureReport;
use crate::pipeline::missing::DropReason;
use crate::pipeline::split::SplitReport;
use crate::pipeline::workflow::CleaningReport;

/// Shape of the data after one stage
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub elapsed: Duration,
}

/// Rows and columns through the stages of one run
#[derive(Debug, Default)]
pub struct PipelineSummary {
    pub stages: Vec<StageRecord>,
}

impl PipelineSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, name: &str, rows: usize, columns: usize, elapsed: Duration) {
        self.stages.push(StageRecord {
            name: name.to_string(),
            rows,
            columns,
            elapsed,
        });
    }

    pub fn display(&self) {
        print_section_title("📋", "PIPELINE SUMMARY");

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Rows").add_attribute(Attribute::Bold),
            Cell::new("Columns").add_attribute(Attribute::Bold),
            Cell::new("Time").add_attribute(Attribute::Bold),
        ]);

        for stage in &self.stages {
            table.add_row(vec![
                Cell::new(&stage.name),
                Cell::new(stage.rows),
                Cell::new(stage.columns),
                Cell::new(format!("{:.2}s", stage.elapsed.as_secs_f64())).fg(Color::DarkGrey),
            ]);
        }

        print_indented(&table);
    }
}

fn reason_label(reason: DropReason) -> &'static str {
    match reason {
        DropReason::Identifier => "Identifier",
        DropReason::SettlementOrHardship => "Settlement / hardship",
        DropReason::JointApplication => "Joint application",
        DropReason::PostOrigination => "Post-origination",
        DropReason::SparseRecency => "Sparse recency",
        DropReason::FreeText => "Free text",
    }
}

/// Print what the labeler and missing value resolver changed
pub fn display_cleaning_report(report: &CleaningReport) {
    print_section_title("🧹", "CLEANING SUMMARY");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);

    let labels = &report.labels;
    table.add_row(vec![Cell::new("Rows labeled"), Cell::new(labels.rows_after)]);
    table.add_row(vec![
        Cell::new("Rows without outcome"),
        Cell::new(labels.discarded()).fg(if labels.discarded() == 0 {
            Color::White
        } else {
            Color::Yellow
        }),
    ]);
    table.add_row(vec![
        Cell::new("Defaults"),
        Cell::new(labels.defaults).fg(Color::Red),
    ]);
    table.add_row(vec![
        Cell::new("Non-defaults"),
        Cell::new(labels.non_defaults).fg(Color::Green),
    ]);

    let missing = &report.missing;
    table.add_row(vec![
        Cell::new("Non-individual rows removed"),
        Cell::new(missing.non_individual_rows),
    ]);

    let reasons = [
        DropReason::Identifier,
        DropReason::SettlementOrHardship,
        DropReason::JointApplication,
        DropReason::PostOrigination,
        DropReason::SparseRecency,
        DropReason::FreeText,
    ];
    for reason in reasons {
        let count = missing.dropped.iter().filter(|(_, r)| *r == reason).count();
        if count > 0 {
            table.add_row(vec![
                Cell::new(format!("Dropped ({})", reason_label(reason))),
                Cell::new(count).fg(Color::Red),
            ]);
        }
    }

    table.add_row(vec![Cell::new("Zero-imputed"), Cell::new(missing.zero_imputed.len())]);
    table.add_row(vec![Cell::new("Presence flags"), Cell::new(missing.presence_flags.len())]);
    table.add_row(vec![
        Cell::new("Final columns"),
        Cell::new(missing.columns_after)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    print_indented(&table);

    if !missing.dictionary_misses.is_empty() {
        println!();
        println!(
            "      {} {}:",
            style("Dictionary fields not in dataset").yellow(),
            style(format!("({})", missing.dictionary_misses.len())).dim()
        );
        for column in &missing.dictionary_misses {
            println!("        {} {}", style("•").dim(), column);
        }
    }
}

/// Print the outlier and derived-column outcome of feature building
pub fn display_feature_report(report: &FeatureReport) {
    print_section_title("🛠️ ", "FEATURE SUMMARY");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Column").add_attribute(Attribute::Bold),
        Cell::new("Quantile value").add_attribute(Attribute::Bold),
        Cell::new("Rows removed").add_attribute(Attribute::Bold),
    ]);

    for (column, value, removed) in &report.clipped {
        table.add_row(vec![
            Cell::new(column),
            Cell::new(format!("{:.2}", value)),
            Cell::new(removed).fg(if *removed == 0 { Color::White } else { Color::Yellow }),
        ]);
    }

    if !report.clipped.is_empty() {
        print_indented(&table);
    }

    println!();
    println!(
        "      Rows: {} → {}",
        report.rows_before,
        style(report.rows_after).green().bold()
    );
    if report.undefined_ratios > 0 {
        println!(
            "      {} loan/income ratio(s) undefined (zero income)",
            style(report.undefined_ratios).yellow()
        );
    }
}

fn metric_cell(metric: Metric) -> Cell {
    match metric {
        Metric::Computed(v) => Cell::new(format!("{:.4}", v)).fg(Color::Cyan),
        Metric::Undefined => Cell::new("undefined").fg(Color::Yellow),
    }
}

/// Print confusion matrix and scores for the held-out partition
pub fn display_evaluation(evaluation: &Evaluation, split: &SplitReport) {
    print_section_title("🎯", "EVALUATION");

    println!(
        "      Train rows: {} (balanced {}/{})   Test rows: {}",
        split.train_rows,
        split.balanced_counts.0,
        split.balanced_counts.1,
        split.test_rows
    );
    println!();

    let [[tp, fn_], [fp, tn]] = evaluation.confusion.as_array();
    let mut confusion = Table::new();
    confusion.load_preset(UTF8_FULL_CONDENSED);
    confusion.set_header(vec![
        Cell::new(""),
        Cell::new("Predicted default").add_attribute(Attribute::Bold),
        Cell::new("Predicted repaid").add_attribute(Attribute::Bold),
    ]);
    confusion.add_row(vec![
        Cell::new("Actual default").add_attribute(Attribute::Bold),
        Cell::new(tp).fg(Color::Green),
        Cell::new(fn_).fg(Color::Red),
    ]);
    confusion.add_row(vec![
        Cell::new("Actual repaid").add_attribute(Attribute::Bold),
        Cell::new(fp).fg(Color::Red),
        Cell::new(tn).fg(Color::Green),
    ]);
    print_indented(&confusion);
    println!();

    let mut scores = Table::new();
    scores.load_preset(UTF8_FULL_CONDENSED);
    scores.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    scores.add_row(vec![Cell::new("ROC AUC"), metric_cell(evaluation.roc_auc)]);
    scores.add_row(vec![Cell::new("Accuracy"), metric_cell(evaluation.metrics.accuracy)]);
    scores.add_row(vec![Cell::new("Precision"), metric_cell(evaluation.metrics.precision)]);
    scores.add_row(vec![Cell::new("Recall"), metric_cell(evaluation.metrics.recall)]);
    print_indented(&scores);
}

fn print_section_title(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}
