//! Prints the JSON schema of `config.toml` for editors and packaging.
use anyhow::Result;
use wayscan::Config;

fn main() -> Result<()> {
    let schema = Config::json_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
