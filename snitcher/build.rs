use std::env;
use std::process::Command;

// Records the compiler version for the User-Agent header.
fn main() {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .as_deref()
        .and_then(parse_version)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=SNITCHER_RUSTC_VERSION={version}");
    println!("cargo:rerun-if-env-changed=RUSTC");
}

/// `rustc 1.82.0 (f6e511eec 2024-10-15)` -> `1.82.0`
fn parse_version(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .nth(1)
        .filter(|v| v.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .map(String::from)
}
