// build.rs
use lalrbt_gen::GenOptions;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    let input_file = manifest_dir.join("src/java.g");
    println!("cargo:rerun-if-changed={}", input_file.display());
    lalrbt_gen::generate(&input_file, &out_dir, "parser_data", &GenOptions::default())?;
    Ok(())
}
