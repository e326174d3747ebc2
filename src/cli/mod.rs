// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2. The only
// printing in the program happens here.
//
//   1. `train` - builds the dataset and trains the autoencoder
//   2. `align`    - prints per-pair DTW statistics
//   3. `evaluate` - scores the weights saved by a `train` run
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{AlignArgs, Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "accent-shift",
    version = "0.1.0",
    about = "Train a denoising autoencoder that maps one speaker's MFCCs onto another's."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Align(args) => run_align(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;
    use crate::ml::trainer::StopReason;

    tracing::info!("Starting training on corpus '{}'", args.corpus);
    let output_dir = args.output_dir.clone();
    let report = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Dataset: {} pairs kept, {} skipped",
        report.summary.kept, report.summary.skipped
    );
    if let Some(last) = report.state.losses.last() {
        println!("Final average loss: {last:.4}");
    }
    match report.stop {
        StopReason::Completed => println!("Training complete. Results saved to '{output_dir}'."),
        StopReason::Cancelled => println!(
            "Training cancelled after {} epochs. Results saved to '{output_dir}'.",
            report.state.epochs_completed
        ),
    }
    Ok(())
}

fn run_align(args: AlignArgs) -> Result<()> {
    use crate::application::align_use_case::AlignUseCase;

    let use_case = AlignUseCase::new(args.corpus, args.num_coeffs, args.dtw_radius, args.alignment_policy)?;
    let reports = use_case.execute()?;

    println!(
        "{:>5} {:>7} {:>7} {:>12} {:>7} {:>7}",
        "pair", "source", "target", "distance", "path", "warped"
    );
    for r in &reports {
        println!(
            "{:>5} {:>7} {:>7} {:>12.3} {:>7} {:>7}",
            r.index, r.source_frames, r.target_frames, r.distance, r.path_len, r.warped_frames
        );
    }
    if let Some(longest) = reports.iter().map(|r| r.warped_frames).max() {
        println!("Longest warped sequence: {longest} frames");
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase::new(args.run_dir, args.corpus).execute()?;

    println!(
        "Dataset: {} pairs kept, {} skipped",
        report.examples, report.skipped
    );
    println!("Epochs trained: {}", report.epochs_trained);
    if let Some(last) = report.final_training_loss {
        println!("Final training loss: {last:.4}");
    }
    println!("Evaluation loss:     {:.4}", report.average_loss);
    Ok(())
}
