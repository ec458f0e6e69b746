//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - qubit routing for multi-zone trapped-ion traps",
        style("ionroute").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  ionroute-ir       Circuit intermediate representation");
    println!("  ionroute-arch     Trap architectures and live placement");
    println!("  ionroute-compile  Gate selection and routing");
    println!("  ionroute-cli      Command-line interface");
    println!();
    println!("License: {}", style("Apache-2.0").dim());
}
