use std::path::Path;
use std::process::Command;

// Packaged builds have no .git; they pass the revision in the environment.
const OVERRIDE: &str = "TALLY_BUILD_SHA";

fn git_describe(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let rev = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (!rev.is_empty()).then_some(rev)
}

fn main() {
    println!("cargo:rerun-if-env-changed={OVERRIDE}");

    let manifest = std::env::var_os("CARGO_MANIFEST_DIR").unwrap_or_else(|| ".".into());
    let workspace = Path::new(&manifest).join("..");
    let head = workspace.join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let rev = std::env::var(OVERRIDE)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| git_describe(&workspace))
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env={OVERRIDE}={rev}");
}
