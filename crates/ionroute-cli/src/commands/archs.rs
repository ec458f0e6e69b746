//! Archs command implementation.

use anyhow::Result;
use console::style;

use ionroute_arch::named;

/// Execute the archs command.
pub fn execute() -> Result<()> {
    println!("{} Built-in architectures:\n", style("ionroute").cyan().bold());

    for name in named::NAMES {
        let Some(spec) = named::by_name(name) else {
            continue;
        };
        println!("  {} {}", style("●").green(), style(name).bold());
        println!(
            "    Zones: {} ({} gate, {} memory)",
            spec.n_zones(),
            spec.gate_zones().len(),
            spec.memory_zones().len()
        );
        println!("    Gate capacity: {}", spec.total_gate_capacity());
        println!("    Max qubits: {}", spec.n_qubits_max());
        println!();
    }

    Ok(())
}
