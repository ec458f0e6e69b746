//! Inspect command implementation.

use anyhow::Result;
use console::style;

use super::common::load_arch;

/// Execute the inspect command.
pub fn execute(arch: &str) -> Result<()> {
    let spec = load_arch(arch)?;

    println!(
        "{} {} ({} zones, up to {} qubits)\n",
        style("→").cyan().bold(),
        style(arch).green(),
        spec.n_zones(),
        spec.n_qubits_max()
    );

    println!("  {:<6} {:<8} {:>5} {:>10} {:>5}", "zone", "kind", "gate", "transport", "swap");
    for (id, zone) in spec.zones().iter().enumerate() {
        let kind = if zone.memory_only { "memory" } else { "gate" };
        println!(
            "  {:<6} {:<8} {:>5} {:>10} {:>5}",
            id, kind, zone.gate_capacity, zone.transport_capacity, zone.swap_cost
        );
    }

    println!("\n  Connections:");
    for connection in spec.connections() {
        println!(
            "    z{}.{} <-> z{}.{}",
            connection.a.zone, connection.a.port, connection.b.zone, connection.b.port
        );
    }

    Ok(())
}
