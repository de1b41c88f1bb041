//! Device enumeration.

use serialframe_port::list_ports;

use crate::error::CliResult;
use crate::output::render_ports;

/// Prints the serial devices present on this machine.
pub fn run(json: bool) -> CliResult<()> {
    let ports = list_ports()?;
    let rendered = render_ports(&ports, json);
    if !rendered.is_empty() {
        println!("{}", rendered);
    }
    Ok(())
}
