//! Generates `include/euromillions.h` for the mobile shells.

use std::path::PathBuf;

fn main() {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let bindings = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("EUROMILLIONS_H")
        .generate();

    // Header generation is best-effort.
    match bindings {
        Ok(bindings) => {
            let include_dir = crate_dir.join("include");
            if let Err(err) = std::fs::create_dir_all(&include_dir) {
                println!("cargo:warning=cannot create {}: {err}", include_dir.display());
                return;
            }
            bindings.write_to_file(include_dir.join("euromillions.h"));
        }
        Err(err) => println!("cargo:warning=cbindgen failed: {err}"),
    }
}
