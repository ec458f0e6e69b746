//! Route command implementation.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use ionroute_compile::compile;

use super::common::{load_arch, load_circuit, load_settings};

/// Execute the route command.
pub fn execute(
    input: &str,
    arch: &str,
    settings: Option<&str>,
    output: Option<&str>,
    validate: bool,
) -> Result<()> {
    println!(
        "{} Routing {} onto {}",
        style("→").cyan().bold(),
        style(input).green(),
        style(arch).yellow()
    );

    let circuit = load_circuit(input)?;
    let spec = load_arch(arch)?;
    let settings = load_settings(settings)?;
    println!(
        "  Loaded: {} qubits, {} instructions, {} two-qubit gates",
        circuit.num_qubits(),
        circuit.instructions().len(),
        circuit.num_two_qubit_gates()
    );

    let start = Instant::now();
    let routed = compile(&spec, &circuit, &settings)?;
    let elapsed = start.elapsed();
    info!(
        circuit = %routed.name(),
        shuttles = routed.n_shuttles(),
        pswaps = routed.n_pswaps(),
        ?elapsed,
        "routed"
    );

    println!(
        "{} Routing complete in {:.1?}",
        style("✓").green().bold(),
        elapsed
    );
    println!(
        "  Result: {} shuttles, {} swaps",
        routed.n_shuttles(),
        routed.n_pswaps()
    );

    if validate {
        routed.validate(&spec)?;
        println!("  Validation: {}", style("passed").green());
    }

    let output_path = match output {
        Some(path) => path.to_string(),
        None => {
            let stem = Path::new(input)
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy();
            format!("{stem}_routed.json")
        }
    };
    fs::write(&output_path, routed.to_json()?)
        .with_context(|| format!("Failed to write file: {output_path}"))?;
    println!("  Output: {}", style(&output_path).green());

    Ok(())
}
