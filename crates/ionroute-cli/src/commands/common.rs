//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use ionroute_arch::{ArchitectureSpec, named};
use ionroute_compile::CompilationSettings;
use ionroute_ir::Circuit;

/// Load a circuit from a JSON file.
pub fn load_circuit(path: &str) -> Result<Circuit> {
    let source = read(path)?;
    let circuit =
        Circuit::from_json(&source).map_err(|e| anyhow::anyhow!("Parse error in {path}: {e}"))?;
    debug!(path, n_qubits = circuit.num_qubits(), "loaded circuit");
    Ok(circuit)
}

/// Resolve a built-in architecture name or load a JSON/YAML file.
pub fn load_arch(name_or_path: &str) -> Result<ArchitectureSpec> {
    if let Some(spec) = named::by_name(name_or_path) {
        debug!(name = name_or_path, "using built-in architecture");
        return Ok(spec);
    }
    if !Path::new(name_or_path).exists() {
        anyhow::bail!(
            "Unknown architecture: '{name_or_path}'. Available: {}",
            named::NAMES.join(", ")
        );
    }
    let spec: ArchitectureSpec = load_config(name_or_path)?;
    spec.validate()
        .with_context(|| format!("Invalid architecture in {name_or_path}"))?;
    debug!(path = name_or_path, n_zones = spec.n_zones(), "loaded architecture");
    Ok(spec)
}

/// Load compilation settings, defaults when no file is given.
pub fn load_settings(path: Option<&str>) -> Result<CompilationSettings> {
    let settings = match path {
        Some(path) => load_config(path)?,
        None => CompilationSettings::default(),
    };
    settings.validate()?;
    debug!(?settings, "compilation settings");
    Ok(settings)
}

/// Deserialize a YAML (`.yaml`/`.yml`) or JSON file.
fn load_config<T: DeserializeOwned>(path: &str) -> Result<T> {
    let source = read(path)?;
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml_ng::from_str(&source)
            .with_context(|| format!("Failed to parse YAML: {path}")),
        _ => serde_json::from_str(&source).with_context(|| format!("Failed to parse JSON: {path}")),
    }
}

fn read(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}
