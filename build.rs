use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const TEMPLATE_DIR: &str = "templates";
const TEMPLATE_EXTENSIONS: [&str; 2] = ["html", "txt"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", TEMPLATE_DIR);
    for file in template_files(Path::new(TEMPLATE_DIR)) {
        println!("cargo:rerun-if-changed={}", file);
    }

    // Surfaced in the `x-build-id` response header.
    let stamp = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs().to_string(),
        Err(_) => "dev".to_string(),
    };
    println!("cargo:rustc-env=RACE_BUILD_ID={}", stamp);
}

/// Askama template files under `root`, recursively. Empty when the directory is missing.
fn template_files(root: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(root) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(template_files(&path));
            continue;
        }
        let is_template = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext));
        if is_template {
            found.push(path.display().to_string());
        }
    }
    found
}
