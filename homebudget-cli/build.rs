use std::path::{Path, PathBuf};
use std::process::Command;

/// Run git in `repo` and return trimmed stdout, or `None` if git is missing,
/// fails, or prints nothing.
fn git(repo: &Path, args: &[&str]) -> Option<String> {
    let out = Command::new("git").arg("-C").arg(repo).args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
    Some(text)
}

/// `<short sha>` of HEAD, with `-dirty` when tracked files have local edits.
fn build_revision(repo: &Path) -> Option<String> {
    let sha = git(repo, &["rev-parse", "--short", "HEAD"]).filter(|s| !s.is_empty())?;
    let dirty = git(repo, &["status", "--porcelain", "--untracked-files=no"])
        .is_some_and(|status| !status.is_empty());
    Some(if dirty { format!("{sha}-dirty") } else { sha })
}

fn main() {
    let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let workspace = manifest_dir.join("..");

    let head = workspace.join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let revision = build_revision(&workspace).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=HOMEBUDGET_BUILD_SHA={revision}");
}
