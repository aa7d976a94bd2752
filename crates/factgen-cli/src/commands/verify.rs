use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use comfy_table::{Cell, Table as ComfyTable};

use factgen_core::manifest::{self, ManifestCheck};
use factgen_core::verify::IntegrityChecker;

use crate::args::{ReportFormat, VerifyArgs};

/// Check generated store_returns files against store_sales files, and the
/// files against factgen.manifest.json when the directory has one.
///
/// Exit codes:
///   0: every return matches its sale and every digest matches
///   1: issues found (or error)
pub fn run(args: &VerifyArgs) -> Result<()> {
    let sales = data_files(&args.dir, "store_sales")?;
    let returns = data_files(&args.dir, "store_returns")?;
    if sales.is_empty() || returns.is_empty() {
        bail!(
            "Need store_sales and store_returns .dat files in {} (found {} and {}). \
             Run `factgen generate` for both tables first.",
            args.dir.display(),
            sales.len(),
            returns.len(),
        );
    }

    let mut checker = IntegrityChecker::new();
    for path in &sales {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        checker.load_sales(BufReader::new(file), &path.display().to_string())?;
    }
    for path in &returns {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        checker.check_returns(BufReader::new(file), &path.display().to_string())?;
    }
    let report = checker.finish();
    let manifest_check = check_manifest(&args.dir, sales.iter().chain(&returns))?;

    match args.format {
        ReportFormat::Json => {
            let json = serde_json::json!({
                "integrity": report,
                "manifest": manifest_check,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        ReportFormat::Text => {
            println!("{}", report.summary());
            if let Some(check) = &manifest_check {
                println!("{}", check.summary());
            }
        }
        ReportFormat::Table => {
            let mut t = ComfyTable::new();
            t.set_header(vec![
                "Sales",
                "Returns",
                "Matched",
                "Issues",
                "Return ratio",
                "Returned sales",
                "Returns/sale",
            ]);
            t.add_row(vec![
                Cell::new(report.total_sales),
                Cell::new(report.total_returns),
                Cell::new(report.matched),
                Cell::new(format!(
                    "{} ({:.2}%)",
                    report.issue_count,
                    report.failure_rate() * 100.0
                )),
                Cell::new(format!("{:.2}%", report.return_ratio() * 100.0)),
                Cell::new(report.sales_with_returns),
                Cell::new(format!("{:.2}", report.returns_per_returned_sale())),
            ]);
            println!("{}", t);
            if !report.issues.is_empty() {
                let mut t = ComfyTable::new();
                t.set_header(vec!["Issue", "Ticket", "Item", "Details"]);
                for issue in &report.issues {
                    t.add_row(vec![
                        Cell::new(issue.kind),
                        Cell::new(issue.ticket_number),
                        Cell::new(issue.item_sk),
                        Cell::new(&issue.details),
                    ]);
                }
                println!("{}", t);
                if report.issue_count > report.issues.len() as u64 {
                    println!(
                        "... and {} more",
                        report.issue_count - report.issues.len() as u64
                    );
                }
            }
            if let Some(check) = &manifest_check {
                let mut t = ComfyTable::new();
                t.set_header(vec!["File", "Manifest"]);
                for file in &check.stale {
                    t.add_row(vec![Cell::new(file), Cell::new("missing or changed")]);
                }
                for file in &check.unrecorded {
                    t.add_row(vec![Cell::new(file), Cell::new("not recorded")]);
                }
                if check.is_clean() {
                    println!("Manifest: {} files, all digests match", check.recorded);
                } else {
                    println!("{}", t);
                }
            }
        }
    }

    let manifest_clean = manifest_check.as_ref().map_or(true, ManifestCheck::is_clean);
    if !report.is_clean() || !manifest_clean {
        process::exit(1);
    }
    Ok(())
}

/// Compare `files` with the directory's manifest, if it has one.
fn check_manifest<'a>(
    dir: &Path,
    files: impl Iterator<Item = &'a PathBuf>,
) -> Result<Option<ManifestCheck>> {
    let path = dir.join(manifest::MANIFEST_FILE_NAME);
    if !path.exists() {
        tracing::debug!("No manifest in {}, skipping digest check", dir.display());
        return Ok(None);
    }
    let recorded = manifest::read_manifest(&path)?;
    let names: Vec<String> = files
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    Ok(Some(manifest::check_directory(&recorded, dir, &names)?))
}

/// `.dat` files in `dir` whose names start with `table`, sorted by name.
fn data_files(dir: &Path, table: &str) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| {
                n.ends_with(".dat")
                    && (n == format!("{}.dat", table) || n.starts_with(&format!("{}_", table)))
            });
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
