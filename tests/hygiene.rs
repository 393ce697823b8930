//! Source hygiene, checked at test time.
//!
//! Scans the production sources under `src/` (sibling `*_test.rs` files are
//! skipped) for constructs the engine must not contain. Every budget is zero:
//! interaction paths never panic, never drop errors unseen, and never block
//! the runtime thread.

use std::fs;
use std::path::Path;

struct SourceFile {
    path: String,
    content: String,
}

struct Budget {
    pattern: &'static str,
    max: usize,
    reason: &'static str,
}

const PANICS: &[Budget] = &[
    Budget { pattern: ".unwrap()", max: 0, reason: "propagate or degrade instead" },
    Budget { pattern: ".expect(", max: 0, reason: "propagate or degrade instead" },
    Budget { pattern: "panic!(", max: 0, reason: "interaction paths never panic" },
    Budget { pattern: "unreachable!(", max: 0, reason: "model the case in the type" },
    Budget { pattern: "todo!(", max: 0, reason: "unfinished code" },
    Budget { pattern: "unimplemented!(", max: 0, reason: "unfinished code" },
];

const SILENT_LOSS: &[Budget] = &[
    Budget { pattern: "let _ =", max: 0, reason: "inspect the result or log it" },
    Budget { pattern: ".ok()", max: 0, reason: "inspect the error or log it" },
];

const STRUCTURE: &[Budget] = &[
    Budget { pattern: "#[allow(dead_code)]", max: 0, reason: "delete unused code" },
    Budget { pattern: "std::thread::sleep", max: 0, reason: "blocks the runtime thread" },
];

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if !path_str.ends_with(".rs") || path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

/// Offending `path:line` locations for one pattern.
fn find(files: &[SourceFile], pattern: &str) -> Vec<String> {
    files
        .iter()
        .flat_map(|file| {
            file.content
                .lines()
                .enumerate()
                .filter(|(_, line)| line.contains(pattern))
                .map(|(n, _)| format!("  {}:{}", file.path, n + 1))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn check(budgets: &[Budget]) {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found under src/; run from the crate root");
    let failures: Vec<String> = budgets
        .iter()
        .filter_map(|b| {
            let hits = find(&files, b.pattern);
            (hits.len() > b.max).then(|| {
                format!("`{}` found {} times, max {} ({}):\n{}", b.pattern, hits.len(), b.max, b.reason, hits.join("\n"))
            })
        })
        .collect();
    assert!(failures.is_empty(), "hygiene budget exceeded:\n{}", failures.join("\n"));
}

#[test]
fn no_panics_in_production_code() {
    check(PANICS);
}

#[test]
fn no_silently_discarded_errors() {
    check(SILENT_LOSS);
}

#[test]
fn no_dead_code_or_blocking_sleeps() {
    check(STRUCTURE);
}
