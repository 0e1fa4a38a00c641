// An instructional cycle-accurate emulator for a microcoded 16 bit
// processor, with an assembler for its assembly language.
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

#[cfg(test)]
#[macro_use]
extern crate assert_hex;
extern crate serde;
extern crate serde_derive;
extern crate serde_json;
extern crate toml;

#[macro_use]
pub mod util;

pub mod alu;
pub mod circuit;
pub mod config;
pub mod control;
pub mod data_path;
pub mod io_handler;
pub mod isa;
pub mod lexer;
pub mod memory;
pub mod register;
pub mod sign_expand;
pub mod system;
pub mod translator;

#[cfg(test)]
mod components_test;
#[cfg(test)]
mod machine_test;
