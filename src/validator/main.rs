//! Standalone checker for sticker store files.
//!
//! This tool validates the JSON sticker store used by the bot, reporting
//! duplicate, empty and undecodable tokens, and can rewrite the file without
//! duplicates.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

// Import from the main crate
use sticker_user_bot::store::{StickerStore, tail};
use sticker_user_bot::telegram::sticker::StickerRef;

/// Sticker store checker.
#[derive(Parser, Debug)]
#[command(name = "check_stickers")]
#[command(about = "Validates the sticker store file of the Telegram userbot")]
#[command(version)]
struct Args {
    /// Path to the sticker store to check.
    #[arg(short, long, default_value = "sticker_packs.json")]
    file: PathBuf,

    /// Rewrite the file without duplicate and empty entries.
    #[arg(long)]
    dedupe: bool,

    /// Show every entry, not only the problems.
    #[arg(short, long)]
    verbose: bool,
}

/// Problem found with a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Issue {
    Empty,
    Duplicate { first: usize },
    Undecodable(String),
}

/// Findings for a whole file.
#[derive(Debug, Default, PartialEq, Eq)]
struct Report {
    /// `(index, issue)` pairs in file order.
    issues: Vec<(usize, Issue)>,
    /// The list with duplicates and empty entries removed.
    deduped: Vec<String>,
}

impl Report {
    fn errors(&self) -> usize {
        self.issues
            .iter()
            .filter(|(_, issue)| matches!(issue, Issue::Empty | Issue::Undecodable(_)))
            .count()
    }

    fn duplicates(&self) -> usize {
        self.issues
            .iter()
            .filter(|(_, issue)| matches!(issue, Issue::Duplicate { .. }))
            .count()
    }
}

fn check(tokens: &[String]) -> Report {
    let mut report = Report::default();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (i, token) in tokens.iter().enumerate() {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            report.issues.push((i, Issue::Empty));
            continue;
        }

        if let Some(&first) = first_seen.get(trimmed) {
            report.issues.push((i, Issue::Duplicate { first }));
            continue;
        }
        first_seen.insert(trimmed, i);

        if let Err(e) = StickerRef::decode(trimmed) {
            report.issues.push((i, Issue::Undecodable(e.to_string())));
        }
        report.deduped.push(token.clone());
    }

    report
}

fn main() -> ExitCode {
    let args = Args::parse();
    let store = StickerStore::new(&args.file);

    println!("Checking: {}\n", args.file.display());

    // Load the store
    let tokens = match store.try_load() {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("✗ Failed to load sticker store: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = check(&tokens);

    if args.verbose {
        for (i, token) in tokens.iter().enumerate() {
            println!("[{i}] ...{}", tail(token, 16));
        }
        println!();
    }

    for (i, issue) in &report.issues {
        match issue {
            Issue::Empty => println!("  ✗ [{i}] Empty entry"),
            Issue::Duplicate { first } => println!("  ⚠ [{i}] Duplicate of [{first}]"),
            Issue::Undecodable(e) => println!("  ✗ [{i}] {e}"),
        }
    }

    if args.dedupe && report.deduped.len() != tokens.len() {
        if let Err(e) = store.try_save(&report.deduped) {
            eprintln!("✗ Failed to write de-duplicated store: {e}");
            return ExitCode::FAILURE;
        }
        println!(
            "\n✓ Removed {} entries, {} remain",
            tokens.len() - report.deduped.len(),
            report.deduped.len()
        );
    }

    println!();

    // Summary
    let total = tokens.len();
    let errors = report.errors();
    let duplicates = report.duplicates();

    if errors == 0 {
        println!("✓ All {total} stickers are usable!");
        if duplicates > 0 && !args.dedupe {
            println!("  ({duplicates} duplicate(s) - run with --dedupe to remove them)");
        }
        ExitCode::SUCCESS
    } else {
        println!("✗ Check failed: {errors} error(s) in {total} stickers");
        ExitCode::FAILURE
    }
}
