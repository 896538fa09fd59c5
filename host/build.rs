fn main() {
    // Shown in `--version` so bug reports name the build target.
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=PYTHONNET_SETUP_TARGET={target}");
    println!("cargo:rerun-if-changed=build.rs");
}
