use std::process::Command;

/// Embeds `GIT_VERSION` ("<pkg version>" or "<pkg version>+<git describe>") for the startup log line.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let describe = Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty());

    let version = match describe {
        Some(rev) => format!("{}+{}", pkg_version, rev),
        None => pkg_version,
    };

    println!("cargo:rustc-env=GIT_VERSION={}", version);
}
