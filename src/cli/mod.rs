//! Churn Guard CLI Module
//!
//! One subcommand per offline pipeline step, plus single-record scoring and
//! the HTTP server.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::ArtifactPaths;
use crate::explainability::{ExplainConfig, ExplainStep};
use crate::inference::{ChurnPredictor, RiskTier};
use crate::preprocessing::TrainingPreprocessor;
use crate::schema::{CustomerRecord, FeatureSchema};
use crate::server::{run_server, ServerConfig};
use crate::training::{Trainer, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "churn-guard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Telco customer churn pipeline: preprocess, train, explain, serve")]
#[command(long_about = None)]
pub struct Cli {
    /// Base directory for data/, models/ and app/
    #[arg(long, global = true, env = "CHURN_HOME")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Artifact locations for this invocation
    pub fn paths(&self) -> ArtifactPaths {
        match &self.home {
            Some(home) => ArtifactPaths::from_env(home),
            None => ArtifactPaths::default(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean and encode the raw customer table, fit the scaler
    Preprocess,

    /// Train the churn model on the processed table
    Train {
        /// Share of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Number of boosting rounds
        #[arg(long, default_value = "100")]
        n_estimators: usize,
    },

    /// Compute feature attributions and write the summary chart
    Explain {
        /// Rows sampled from the processed table
        #[arg(long, default_value = "1000")]
        sample_size: usize,

        /// Feature permutations per explained row
        #[arg(long, default_value = "25")]
        permutations: usize,
    },

    /// Score one customer record
    Predict {
        /// Raw record as JSON, or @path to a JSON file
        #[arg(short, long)]
        record: String,
    },

    /// Print the encoded feature layout
    Schema,

    /// Start the scoring server
    Serve {
        /// Server port
        #[arg(short, long, env = "CHURN_PORT", default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, env = "CHURN_HOST", default_value = "0.0.0.0")]
        host: String,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_preprocess(paths: &ArtifactPaths) -> anyhow::Result<()> {
    section("Preprocess");

    step_run(&format!("Encoding {}", paths.raw_data.display()));
    let report = TrainingPreprocessor::new(paths.clone()).run()?;
    step_done(&format!("{:.2}s", report.elapsed_secs));

    println!();
    println!("  {}", kv("Rows      ", &report.rows.to_string()));
    println!("  {}", kv("Churned   ", &format!(
        "{} ({:.1}%)",
        report.churned,
        100.0 * report.churned as f64 / report.rows.max(1) as f64
    )));
    println!("  {}", kv("Imputed   ", &format!(
        "{} {} values with median {:.2}",
        report.total_charges.coerced, report.total_charges.column, report.total_charges.fill_value
    )));
    if !report.constant_columns.is_empty() {
        println!("  {} constant columns: {}", "!".yellow(), report.constant_columns.join(", "));
    }
    step_ok(&format!("Wrote {}", paths.processed_data.display()));
    step_ok(&format!("Wrote {}", paths.scaler.display()));
    println!();
    Ok(())
}

pub fn cmd_train(paths: &ArtifactPaths, test_size: f64, n_estimators: usize) -> anyhow::Result<()> {
    section("Train");

    let mut config = TrainingConfig::default().with_test_size(test_size);
    config.booster.n_estimators = n_estimators;

    step_run(&format!("Boosting {} trees", n_estimators.to_string().cyan()));
    let start = Instant::now();
    let report = Trainer::new(config).run(paths)?;
    step_done(&format!("{:?}", start.elapsed()));

    let m = &report.metrics;
    let (before_neg, before_pos) = report.resampling.before;
    let (after_neg, after_pos) = report.resampling.after;
    let (held_neg, held_pos) = report.held_out_counts;

    println!();
    line_box_top();
    line_box(&kv("Train split   ", &format!("{} / {} (no churn / churn)", before_neg, before_pos)));
    line_box(&kv("After SMOTE   ", &format!("{} / {}", after_neg, after_pos)));
    line_box(&kv("Held out      ", &format!("{} / {}", held_neg, held_pos)));
    line_box_sep();
    line_box(&kv("Accuracy      ", &format!("{:.4}", m.accuracy)));
    line_box(&kv("Precision     ", &format!("{:.4}", m.precision)));
    let recall = format!("{:.4}", m.recall);
    let recall = if report.meets_recall_target() { recall.green() } else { recall.yellow() };
    line_box(&format!("{} {}", muted("Recall        "), recall));
    line_box(&kv("F1            ", &format!("{:.4}", m.f1_score)));
    line_box(&kv("ROC AUC       ", &m.roc_auc.map_or("n/a".to_string(), |a| format!("{:.4}", a))));
    line_box_sep();
    for (name, share) in report.top_features.iter().take(5) {
        line_box(&kv(&format!("{:<34}", name), &format!("{:.3}", share)));
    }
    line_box_bottom();

    println!();
    for row in m.confusion.to_string().lines() {
        println!("  {}", row);
    }
    if !report.meets_recall_target() {
        println!();
        println!(
            "  {} recall below target {:.2}",
            "!".yellow(),
            report.recall_target
        );
    }
    step_ok(&format!("Wrote {}", paths.model.display()));
    println!();
    Ok(())
}

pub fn cmd_explain(paths: &ArtifactPaths, sample_size: usize, permutations: usize) -> anyhow::Result<()> {
    section("Explain");

    let config = ExplainConfig::default()
        .with_sample_size(sample_size)
        .with_permutations(permutations);
    let top_k = config.top_k;

    step_run("Sampling Shapley attributions");
    let start = Instant::now();
    let summary = ExplainStep::new(config).run(paths)?;
    step_done(&format!("{} rows in {:?}", summary.n_samples, start.elapsed()));

    println!();
    println!("  {:<40} {:>10} {:>5}", muted("Feature"), muted("mean |φ|"), muted("dir"));
    println!("  {}", dim(&"─".repeat(57)));
    for f in summary.top(top_k) {
        let dir = match f.direction {
            d if d > 0 => "+".red(),
            d if d < 0 => "-".blue(),
            _ => "·".normal(),
        };
        println!("  {:<40} {:>10.4} {:>5}", f.feature, f.mean_abs, dir);
    }
    println!();
    step_ok(&format!("Wrote {}", paths.attribution_image.display()));
    println!();
    Ok(())
}

fn read_record(arg: &str) -> anyhow::Result<CustomerRecord> {
    let json = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => arg.to_string(),
    };
    Ok(serde_json::from_str(&json)?)
}

pub fn cmd_predict(paths: &ArtifactPaths, record: &str) -> anyhow::Result<()> {
    section("Predict");

    let record = read_record(record)?;
    step_run("Loading model");
    let predictor = ChurnPredictor::load(paths)?;
    step_done("");

    let prediction = predictor.predict(&record)?;
    let tier = match prediction.risk_tier {
        RiskTier::High => prediction.risk_tier.label().red().bold(),
        RiskTier::Moderate => prediction.risk_tier.label().yellow().bold(),
        RiskTier::Low => prediction.risk_tier.label().green().bold(),
    };

    println!();
    line_box_top();
    line_box(&kv("Churn probability", &format!("{:.1}%", prediction.probability * 100.0)));
    line_box(&format!("{} {}", muted("Risk             "), tier));
    if let Some(rec) = &prediction.recommendation {
        line_box_sep();
        line_box(rec);
    }
    line_box_bottom();
    println!();
    Ok(())
}

pub fn cmd_schema() -> anyhow::Result<()> {
    let schema = FeatureSchema::canonical();
    section("Feature layout");
    for (i, column) in schema.columns().iter().enumerate() {
        println!("  {:>3}  {}", dim(&i.to_string()), column);
    }
    section("Reference categories");
    for (field, reference) in schema.reference_categories() {
        println!("  {:<18} {}", muted(field), reference);
    }
    println!();
    Ok(())
}

pub async fn cmd_serve(paths: ArtifactPaths, host: &str, port: u16) -> anyhow::Result<()> {
    let config = ServerConfig {
        host: host.to_string(),
        port,
        paths,
        cors_origin: std::env::var("CORS_ORIGIN").ok(),
    };
    section("Serve");
    println!("  {}", kv("Listening on", &format!("http://{}:{}", host, port)));
    println!();
    run_server(config).await
}
