//! Run configuration for harnesses and the verifier.
//!
//! YAML with precedence CLI > file > defaults. Divisors and alignment are
//! validated once here, never per element.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{KernelError, Result};
use crate::fixtures::BENCH_ITEMS;
use crate::kernel::{Divisor, Executor};
use crate::lanes::{detected_backend, SimdBackend};

/// Backend value meaning "use the detected backend".
pub const AUTO_BACKEND: &str = "auto";

/// Settings for one benchmark or verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Elements per buffer.
    #[serde(default = "default_items")]
    pub items: usize,

    /// Byte alignment of aligned buffers; the register width when unset.
    #[serde(default)]
    pub byte_alignment: Option<usize>,

    /// Extra byte offset for the deliberately misaligned comparison run.
    #[serde(default)]
    pub byte_offset: usize,

    /// Compound kernel divisor for `f32`.
    #[serde(default = "default_float_divisor")]
    pub float_divisor: f32,

    /// Compound kernel divisor for `i32`.
    #[serde(default = "default_int_divisor")]
    pub int_divisor: i32,

    /// `auto` or a backend name (`scalar`, `sse2`, `avx2`, `avx512`, `neon`).
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_version() -> u32 {
    1
}
fn default_items() -> usize {
    BENCH_ITEMS
}
fn default_float_divisor() -> f32 {
    f32::DEFAULT_DIVISOR
}
fn default_int_divisor() -> i32 {
    i32::DEFAULT_DIVISOR
}
fn default_backend() -> String {
    AUTO_BACKEND.to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            items: default_items(),
            byte_alignment: None,
            byte_offset: 0,
            float_divisor: default_float_divisor(),
            int_divisor: default_int_divisor(),
            backend: default_backend(),
        }
    }
}

impl RunConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| KernelError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map_or(0, |l| l.line());
            KernelError::ConfigParse { line, message: e.to_string() }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Checks every value that would otherwise fail later.
    pub fn validate(&self) -> Result<()> {
        if self.float_divisor.is_zero() {
            return Err(invalid("float_divisor", KernelError::ZeroDivisor));
        }
        if self.int_divisor.is_zero() {
            return Err(invalid("int_divisor", KernelError::ZeroDivisor));
        }
        if let Some(alignment) = self.byte_alignment {
            if !alignment.is_power_of_two() || alignment < std::mem::align_of::<f32>() {
                return Err(KernelError::ConfigInvalid {
                    key: "byte_alignment".to_string(),
                    message: format!("{alignment} is not a power of two >= 4"),
                });
            }
        }
        if self.byte_offset % std::mem::align_of::<f32>() != 0 {
            return Err(KernelError::ConfigInvalid {
                key: "byte_offset".to_string(),
                message: format!("{} is not a multiple of 4", self.byte_offset),
            });
        }
        self.requested_backend().map_err(|e| invalid("backend", e))?;
        Ok(())
    }

    /// Backend named in the file, `None` for `auto`.
    pub fn requested_backend(&self) -> Result<Option<SimdBackend>> {
        if self.backend.trim().eq_ignore_ascii_case(AUTO_BACKEND) {
            return Ok(None);
        }
        self.backend.parse().map(Some)
    }

    /// Backend the run will use.
    pub fn backend(&self) -> Result<SimdBackend> {
        Ok(self.requested_backend()?.unwrap_or_else(detected_backend))
    }

    /// Alignment for aligned buffers.
    pub fn alignment(&self) -> Result<usize> {
        match self.byte_alignment {
            Some(alignment) => Ok(alignment),
            None => Ok(self.backend()?.register_width_bytes().max(std::mem::align_of::<f32>())),
        }
    }

    /// `f32` executor with this configuration's backend and divisor.
    pub fn float_executor(&self) -> Result<Executor<f32>> {
        Ok(Executor::new()
            .with_backend(self.backend()?)?
            .with_divisor(Divisor::new(self.float_divisor)?))
    }

    /// `i32` executor with this configuration's backend and divisor.
    pub fn int_executor(&self) -> Result<Executor<i32>> {
        Ok(Executor::new()
            .with_backend(self.backend()?)?
            .with_divisor(Divisor::new(self.int_divisor)?))
    }
}

fn invalid(key: &str, err: KernelError) -> KernelError {
    KernelError::ConfigInvalid { key: key.to_string(), message: err.to_string() }
}
