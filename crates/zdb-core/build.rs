//! Build script for zdb-core
//!
//! Checks that the toolchain is new enough before compilation. The crate uses
//! `let`-`else` and `Option::is_some_and`, both stable since Rust 1.70.
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    let Ok(rustc_version) = rustc_version::version() else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
        return;
    };

    let min_rust_version = rustc_version::Version::new(1, 70, 0);
    if rustc_version < min_rust_version {
        panic!("zdb-core requires Rust {min_rust_version} or newer, found {rustc_version}");
    }
}
