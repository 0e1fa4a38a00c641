// Simulator entry point.
// (C) Ryan Jeffrey <ryan@ryanmj.xyz>, 2022
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at
// your option) any later version.

// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU
// General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

extern crate mc16;

use mc16::config::Config;
use mc16::system::System;
use std::process;

fn main() {
    if let Err(e) = run() {
        eprintln!("mc16: {}", e);
        process::exit(1);
    }
}

fn run() -> mc16::util::Result<()> {
    let config = Config::init()?;
    println!("Running emulator with the following configuration:\n{}\n", config);

    let mut system = System::new(&config)?;
    system.run()?;

    println!("\nHalted after {} ticks.", system.control_unit().tick_count());
    println!("{}", system.data_path());
    Ok(())
}
