// The assembled machine: configuration, datapath and control unit.
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

use config::Config;
use control::ControlUnit;
use data_path::DataPath;
use isa;
use util::Result;

pub struct System {
    /// The wire graph and its components.
    data_path: DataPath,
    /// The microprogrammed sequencer driving it.
    control_unit: ControlUnit,
}

impl System {
    /// Build a machine from the configuration: construct the datapath and
    /// control unit, read the code file and load it at the start address.
    /// # Arguments
    /// * `config` - Emulator configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let code = isa::read_code(config.code_path())?;
        Self::with_program(config, &code)
    }

    /// Build a machine around an in-memory program. Used by `new` and by
    /// the end-to-end tests, which have no code file.
    /// # Arguments
    /// * `config` - Emulator configuration.
    /// * `code` - Machine words to load at the start address.
    pub fn with_program(config: &Config, code: &[u16]) -> Result<Self> {
        let mut data_path = DataPath::new(config)?;
        data_path.load_program(code, config.start_address())?;
        data_path.set_pc(config.start_address());
        Ok(Self {
            data_path: data_path,
            control_unit: ControlUnit::new(config)?,
        })
    }

    /// Run the fetch-execute loop until a top level HALT. Fatal conditions
    /// propagate as errors.
    pub fn run(&mut self) -> Result<()> {
        self.control_unit.run(&mut self.data_path)
    }

    pub fn data_path(&self) -> &DataPath {
        &self.data_path
    }

    pub fn data_path_mut(&mut self) -> &mut DataPath {
        &mut self.data_path
    }

    pub fn control_unit(&self) -> &ControlUnit {
        &self.control_unit
    }
}
