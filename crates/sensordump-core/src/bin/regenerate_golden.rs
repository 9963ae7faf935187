use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sensordump_core::{ConversionConfig, convert_text_dump};

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<(), String> {
    let root = PathBuf::from("tests").join("golden");
    let entries =
        fs::read_dir(&root).map_err(|err| format!("failed to read {}: {}", root.display(), err))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| format!("failed to read entry: {}", err))?;
        let path = entry.path();
        if path.is_dir() && path.join("input.txt").exists() {
            dirs.push(path);
        }
    }
    dirs.sort();
    for dir in dirs {
        regenerate_one(&dir)?;
    }
    Ok(())
}

/// Rewrite `expected.ply` and `expected_report.json` for one fixture directory.
fn regenerate_one(dir: &Path) -> Result<(), String> {
    let input = dir.join("input.txt");
    let ply = dir.join("expected.ply");
    let report = convert_text_dump(&ConversionConfig::new(&input, &ply))
        .map_err(|err| format!("conversion failed for {}: {}", input.display(), err))?;
    let json = serde_json::to_string(&report)
        .map_err(|err| format!("JSON serialization failed: {}", err))?;
    let output = dir.join("expected_report.json");
    fs::write(&output, json + "\n")
        .map_err(|err| format!("failed to write {}: {}", output.display(), err))?;
    println!("regenerated {}", dir.display());
    Ok(())
}
