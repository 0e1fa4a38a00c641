// Emulator configuration.
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

extern crate serde;
extern crate serde_derive;
extern crate toml;

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use self::serde_derive::Deserialize;
use util::Result;

// Struct definitions.

/// One scripted keystroke: the tick it arrives on and the character it
/// carries.
#[derive(Debug, Clone, Deserialize)]
pub struct InterruptToken {
    pub tick: u64,
    pub symbol: char,
}

/// Configuration of the emulator. The TOML file named by
/// `--config_file_path` provides the machine parameters; the positional
/// command line arguments provide the run parameters and override the file.
#[derive(Deserialize)]
pub struct Config {
    /// Amount of memory the machine will have, in 16 bit words.
    #[serde(default = "default_memory_size")]
    memory_size: u16,
    /// Upper bound on simulator ticks, so a buggy program cannot spin
    /// forever.
    #[serde(default = "default_tick_limit")]
    tick_limit: u64,
    /// Path of the per-tick trace log. Empty means stdout.
    #[serde(default)]
    tick_log_path: String,
    /// Keystroke schedule driving the interrupt line.
    #[serde(default = "default_interrupt_schedule")]
    interrupt_schedule: Vec<InterruptToken>,

    /// Path to the machine code file to execute.
    #[serde(skip)]
    code_path: String,
    /// Memory cell the program is loaded at (and the initial PC).
    #[serde(skip)]
    start_address: u16,
    /// Whether the control unit services interrupt requests.
    #[serde(skip)]
    interrupts_enabled: bool,
    /// Path to the configuration file, when one was given.
    #[serde(skip)]
    config_file_path: String,
}

// Struct impls.

impl Config {
    pub fn new() -> Config {
        Config {
            memory_size: default_memory_size(),
            tick_limit: default_tick_limit(),
            tick_log_path: String::new(),
            interrupt_schedule: default_interrupt_schedule(),
            code_path: String::new(),
            start_address: 0,
            interrupts_enabled: false,
            config_file_path: String::new(),
        }
    }

    /// Build the configuration from the process arguments.
    pub fn init() -> Result<Config> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::from_args(&args)
    }

    /// Build the configuration from an argument list. The configuration
    /// file (if any) is read first so that command line values override it.
    /// # Arguments
    /// * `args` - Command line arguments, program name excluded.
    pub fn from_args(args: &[String]) -> Result<Config> {
        let mut config = Self::new();

        if let Some(path) = find_cmd_config_path(args)? {
            config.config_file_path = path;
            config.read_config_file()?;
        }

        config.parse_cmd_args(args)?;

        if config.code_path.is_empty() {
            berr!("{}", usage("a code file is required"));
        }
        Ok(config)
    }

    pub fn memory_size(&self) -> u16 {
        self.memory_size
    }

    pub fn tick_limit(&self) -> u64 {
        self.tick_limit
    }

    pub fn tick_log_path(&self) -> Option<&str> {
        if self.tick_log_path.is_empty() {
            None
        } else {
            Some(&self.tick_log_path)
        }
    }

    pub fn interrupt_schedule(&self) -> Vec<(u64, char)> {
        self.interrupt_schedule
            .iter()
            .map(|token| (token.tick, token.symbol))
            .collect()
    }

    pub fn code_path(&self) -> &str {
        &self.code_path
    }

    pub fn start_address(&self) -> u16 {
        self.start_address
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    pub fn set_interrupt_schedule(&mut self, schedule: Vec<InterruptToken>) {
        self.interrupt_schedule = schedule;
    }

    // Private.

    fn read_config_file(&mut self) -> Result<()> {
        // Keep the data that must survive the assignment.
        let config_file_path = self.config_file_path.clone();
        let contents = match fs::read_to_string(Path::new(&config_file_path)) {
            Ok(r) => r,
            Err(e) => berr!("Could not read config file {}: {}", config_file_path, e),
        };
        *self = match toml::from_str(&contents) {
            Ok(r) => r,
            Err(e) => berr!("Could not parse config file {}: {}", config_file_path, e),
        };
        self.config_file_path = config_file_path;
        Ok(())
    }

    fn parse_cmd_args(&mut self, args: &[String]) -> Result<()> {
        let mut positionals: Vec<&String> = Vec::new();
        let mut skips = 0i32;
        for (num, arg) in args.iter().enumerate() {
            if skips > 0 {
                skips -= 1;
                continue;
            }

            match arg.as_str() {
                "--mem" => {
                    self.memory_size = args_get_next_uint(args, num, "mem")? as u16;
                    skips += 1;
                }
                "--tick_limit" => {
                    self.tick_limit = args_get_next_uint(args, num, "tick_limit")?;
                    skips += 1;
                }
                "--tick_log" => {
                    self.tick_log_path = args_get_next_arg(args, num, "tick_log")?.clone();
                    skips += 1;
                }
                "--config_file_path" => {
                    // Already consumed before the config file was read.
                    args_get_next_arg(args, num, "config_file_path")?;
                    skips += 1;
                }
                _ if arg.starts_with("--") => {
                    berr!("{}", usage(&format!("invalid command line argument: {}", arg)));
                }
                _ => positionals.push(arg),
            }
        }

        if positionals.len() != 3 {
            berr!(
                "{}",
                usage(&format!(
                    "expected 3 positional arguments, got {}",
                    positionals.len()
                ))
            );
        }

        self.code_path = positionals[0].clone();
        self.start_address = match positionals[1].parse::<u16>() {
            Ok(v) => v,
            Err(e) => berr!(
                "{}",
                usage(&format!("bad start address {}: {}", positionals[1], e))
            ),
        };
        self.interrupts_enabled = match positionals[2].as_str() {
            "True" => true,
            "False" => false,
            other => berr!(
                "{}",
                usage(&format!(
                    "interrupts_enabled must be the literal True or False, got {}",
                    other
                ))
            ),
        };
        Ok(())
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Code file: {}
Start address: {}
Interrupts enabled: {}
Memory (words): {}
Tick limit: {}
Tick log: {}
Configuration file: {}",
            self.code_path,
            self.start_address,
            self.interrupts_enabled,
            self.memory_size,
            self.tick_limit,
            if self.tick_log_path.is_empty() {
                "<stdout>"
            } else {
                self.tick_log_path.as_str()
            },
            if self.config_file_path.is_empty() {
                "<none>"
            } else {
                self.config_file_path.as_str()
            }
        )
    }
}

// Local functions.

fn default_memory_size() -> u16 {
    512
}

fn default_tick_limit() -> u64 {
    10_000
}

/// The fixed demonstration keystroke schedule.
fn default_interrupt_schedule() -> Vec<InterruptToken> {
    [(1, 'h'), (10, 'e'), (20, 'l'), (25, 'l'), (100, 'o')]
        .iter()
        .map(|&(tick, symbol)| InterruptToken {
            tick: tick,
            symbol: symbol,
        })
        .collect()
}

fn usage(complaint: &str) -> String {
    format!(
        "{}

Usage: mc16 <code_file> <start_address> <interrupts_enabled(True|False)> [OPTIONS]
--config_file_path  Path to a TOML configuration file
--mem               Size of memory in words (default=512)
--tick_limit        Maximum tick count before aborting (default=10000)
--tick_log          Path of the per-tick trace log (default=stdout)",
        complaint
    )
}

fn args_check_size(args: &[String], num: usize, what: &str) -> Result<()> {
    if num + 1 >= args.len() {
        berr!("Invalid command line argument: {} takes an argument.", what);
    }
    Ok(())
}

fn args_get_next_arg<'a>(args: &'a [String], num: usize, what: &str) -> Result<&'a String> {
    args_check_size(args, num, what)?;
    Ok(&args[num + 1])
}

fn args_get_next_uint(args: &[String], num: usize, what: &str) -> Result<u64> {
    args_check_size(args, num, what)?;
    match args[num + 1].parse::<u64>() {
        Ok(v) => Ok(v),
        Err(e) => berr!(
            "Invalid command line argument for {}: {}, err: {}.",
            what,
            args[num + 1],
            e
        ),
    }
}

/// Scan for `--config_file_path` ahead of the main argument pass, so the
/// file can be read before command line overrides apply.
fn find_cmd_config_path(args: &[String]) -> Result<Option<String>> {
    for (num, arg) in args.iter().enumerate() {
        if arg.as_str() == "--config_file_path" {
            return Ok(Some(args_get_next_arg(args, num, "config_file_path")?.clone()));
        }
    }
    Ok(None)
}
