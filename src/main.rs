use std::io::Read;

use clap::Parser;
use serde::Serialize;

use draft_lens::{
    compute_heatmap, compute_statistics, Document, RiskSpan, Selection, StatisticsSnapshot,
};

#[derive(Parser)]
#[command(
    name = "draft-lens",
    about = "Readability statistics and sentence heat maps for prose",
    version
)]
struct Cli {
    /// File paths to analyze (reads stdin if none provided)
    files: Vec<String>,
}

#[derive(Serialize)]
struct Report {
    statistics: StatisticsSnapshot,
    heatmap: Vec<RiskSpan>,
}

fn analyze(text: &str) -> Report {
    let document = Document::from_plain_text(text);
    let statistics = compute_statistics(&document.full_text(), &document, Selection::none());
    let heatmap = compute_heatmap(&document);
    Report {
        statistics,
        heatmap,
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.files.is_empty() {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .expect("Failed to read stdin");
        let report = analyze(&input);
        println!("{}", serde_json::to_string_pretty(&report).unwrap());
    } else {
        for path in &cli.files {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading {path}: {e}");
                std::process::exit(1);
            });
            let report = analyze(&text);
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
        }
    }
}
