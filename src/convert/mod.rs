//! Format conversion
//!
//! Optional rewriting of a candidate into a library-friendly format
//! before it is published. Converters never touch the source file; the
//! transfer engine hands them a scratch path to write into.

mod command;

pub use command::*;

use crate::classify::MediaKind;
use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// A format converter applied during transfer
pub trait Converter: Send + Sync {
    /// Human-readable converter name, used in logs and errors
    fn name(&self) -> &str;

    /// Whether this converter wants the given candidate
    fn handles(&self, kind: MediaKind, source: &Path) -> bool;

    /// Extension of the files this converter produces
    fn output_extension(&self) -> &str;

    /// Write the converted payload to `output`. The source is read-only.
    fn convert(&self, source: &Path, output: &Path) -> Result<()>;
}

/// Ordered collection of converters; the first match wins
pub struct ConverterSet {
    converters: Vec<Box<dyn Converter>>,
}

impl ConverterSet {
    /// A set that converts nothing
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// The built-in converters, skipping any whose tool is missing
    pub fn with_defaults() -> Self {
        let mut set = Self::empty();
        let heic = CommandConverter::heic_to_jpeg();
        if heic.is_available() {
            set.register(Box::new(heic));
        } else {
            debug!("HEIC converter disabled, no conversion tool on PATH");
        }
        set
    }

    /// Append a converter; earlier registrations take precedence
    pub fn register(&mut self, converter: Box<dyn Converter>) {
        debug!("Registered converter: {}", converter.name());
        self.converters.push(converter);
    }

    /// First converter that claims the candidate, if any
    pub fn find(&self, kind: MediaKind, source: &Path) -> Option<&dyn Converter> {
        self.converters
            .iter()
            .find(|c| c.handles(kind, source))
            .map(|c| c.as_ref())
    }

    /// Whether any converters are registered
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Number of registered converters
    pub fn len(&self) -> usize {
        self.converters.len()
    }
}

impl Default for ConverterSet {
    fn default() -> Self {
        Self::empty()
    }
}
