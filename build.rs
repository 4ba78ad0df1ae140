use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RUSTC");

    let version = rustc_version().unwrap_or_else(|| {
        env::var("CARGO_PKG_RUST_VERSION").unwrap_or_else(|_| "unknown".to_owned())
    });
    println!("cargo:rustc-env=VONAGE_RUSTC_VERSION={version}");
}

/// `1.85.0` from `rustc 1.85.0 (4d91de4e4 2025-02-17)`.
fn rustc_version() -> Option<String> {
    let rustc = env::var_os("RUSTC").unwrap_or_else(|| "rustc".into());
    let output = Command::new(rustc).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    stdout.split_whitespace().nth(1).map(str::to_owned)
}
