// Utility types and functions.
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

use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{Read, Write};

/// Result type used throughout the emulator. Every error condition in the
/// machine is fatal, so errors are only ever propagated up to `main`.
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

// Macros.

/// Bail out of the current function with a boxed `SimError` built from
/// format arguments.
#[macro_export]
macro_rules! berr {
    ($($arg:tt)*) => {
        return Err(Box::new($crate::util::SimError::new(format!($($arg)*))))
    };
}

// Public struct definitions.

/// Diagnostic error raised by the machine's components. Carries a
/// description naming the offending component and its inputs.
#[derive(PartialEq, Eq, Clone)]
pub struct SimError {
    descr: String,
}

/// File object. Wrapper around fs::File but caches the path for diagnostics.
pub struct File {
    /// Underlying file object.
    file: fs::File,
    /// Path to the object.
    path: String,
}

// Struct impls.

impl SimError {
    pub fn new(descr: String) -> Self {
        Self { descr: descr }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.descr)
    }
}

impl fmt::Debug for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for SimError {}

impl File {
    /// Open a file for reading. Return File on success and an error on failure.
    /// # Arguments
    /// * `path` - Path to file.
    pub fn open(path: &str) -> Result<Self> {
        match fs::File::open(path) {
            Ok(r) => Ok(Self {
                file: r,
                path: path.to_string(),
            }),
            Err(e) => Err(Box::new(SimError::new(format!(
                "Could not open file {}: {}",
                path, e
            )))),
        }
    }

    /// Create (or truncate) a file for writing.
    /// # Arguments
    /// * `path` - Path to file.
    pub fn create(path: &str) -> Result<Self> {
        match fs::File::create(path) {
            Ok(r) => Ok(Self {
                file: r,
                path: path.to_string(),
            }),
            Err(e) => Err(Box::new(SimError::new(format!(
                "Could not create file {}: {}",
                path, e
            )))),
        }
    }

    /// Read `self`'s contents into a string.
    pub fn read_string(&mut self) -> Result<String> {
        let mut result = String::new();
        match self.file.read_to_string(&mut result) {
            Ok(_) => Ok(result),
            Err(e) => Err(Box::new(SimError::new(format!(
                "Failed to read file {}: {}",
                self.path, e
            )))),
        }
    }

    /// Write `buf`'s contents into `self` (as binary data).
    /// # Arguments
    /// * `buf` - Byte buffer to write to `self`.
    pub fn write_buf(&mut self, buf: &[u8]) -> Result<()> {
        match self.file.write_all(buf) {
            Ok(_) => Ok(()),
            Err(e) => Err(Box::new(SimError::new(format!(
                "Could not write byte buffer to {}: {}",
                self.path, e
            )))),
        }
    }

    /// Write a single newline-terminated line into `self`.
    /// # Arguments
    /// * `line` - Line contents, without the newline.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_buf(line.as_bytes())?;
        self.write_buf(b"\n")
    }
}

// Public function definitions.

/// Return a file's contents as a string.
/// # Arguments
/// * `path` - Path to the file.
pub fn read_file_string(path: &str) -> Result<String> {
    File::open(path)?.read_string()
}

/// Write a string to a file, creating or truncating it.
/// # Arguments
/// * `path` - Path to the file.
/// * `contents` - New file contents.
pub fn write_file_string(path: &str, contents: &str) -> Result<()> {
    File::create(path)?.write_buf(contents.as_bytes())
}
