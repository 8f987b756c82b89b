//! External tool converters
//!
//! Shells out to an image tool already on the system rather than linking
//! codec libraries. The command template names the source and output with
//! `{src}` and `{out}` placeholders.

use crate::classify::MediaKind;
use crate::convert::Converter;
use crate::error::{IngestError, Result};
use std::path::Path;
use std::process::Command;

/// Converter backed by an external command
pub struct CommandConverter {
    name: String,
    program: String,
    args: Vec<String>,
    input_extensions: Vec<&'static str>,
    output_extension: &'static str,
}

impl CommandConverter {
    /// HEIC/HEIF to JPEG using the platform image tool
    pub fn heic_to_jpeg() -> Self {
        // sips ships with macOS; elsewhere ImageMagick is the common choice
        #[cfg(target_os = "macos")]
        let (program, args) = (
            "sips",
            vec![
                "-s".to_string(),
                "format".to_string(),
                "jpeg".to_string(),
                "{src}".to_string(),
                "--out".to_string(),
                "{out}".to_string(),
            ],
        );

        #[cfg(not(target_os = "macos"))]
        let (program, args) = (
            "magick",
            vec!["{src}".to_string(), "{out}".to_string()],
        );

        Self {
            name: "heic-to-jpeg".to_string(),
            program: program.to_string(),
            args,
            input_extensions: vec!["heic", "heif"],
            output_extension: "jpg",
        }
    }

    /// Whether the backing tool can be spawned
    pub fn is_available(&self) -> bool {
        Command::new(&self.program).arg("--version").output().is_ok()
    }

    fn build_command(&self, source: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            match arg.as_str() {
                "{src}" => cmd.arg(source),
                "{out}" => cmd.arg(output),
                other => cmd.arg(other),
            };
        }
        cmd
    }
}

impl Converter for CommandConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn handles(&self, kind: MediaKind, source: &Path) -> bool {
        if kind != MediaKind::Photo {
            return false;
        }
        source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let ext = e.to_lowercase();
                self.input_extensions.iter().any(|i| *i == ext)
            })
            .unwrap_or(false)
    }

    fn output_extension(&self) -> &str {
        self.output_extension
    }

    fn convert(&self, source: &Path, output: &Path) -> Result<()> {
        let result = self
            .build_command(source, output)
            .output()
            .map_err(|e| {
                IngestError::conversion(
                    source,
                    &self.name,
                    format!("cannot run {}: {}", self.program, e),
                )
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(IngestError::conversion(
                source,
                &self.name,
                format!("{} exited with {}: {}", self.program, result.status, stderr.trim()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heic_converter_claims_heic_photos_only() {
        let c = CommandConverter::heic_to_jpeg();

        assert!(c.handles(MediaKind::Photo, Path::new("IMG_0001.HEIC")));
        assert!(c.handles(MediaKind::Photo, Path::new("img.heif")));
        assert!(!c.handles(MediaKind::Photo, Path::new("img.jpg")));
        assert!(!c.handles(MediaKind::Video, Path::new("img.heic")));
        assert!(!c.handles(MediaKind::Photo, Path::new("noext")));
    }

    #[test]
    fn test_output_extension() {
        assert_eq!(CommandConverter::heic_to_jpeg().output_extension(), "jpg");
    }

    #[test]
    fn test_missing_tool_reports_conversion_error() {
        let c = CommandConverter {
            name: "bogus".to_string(),
            program: "mediaingest-no-such-tool".to_string(),
            args: vec!["{src}".to_string(), "{out}".to_string()],
            input_extensions: vec!["heic"],
            output_extension: "jpg",
        };

        let err = c
            .convert(Path::new("a.heic"), Path::new("a.jpg"))
            .unwrap_err();
        assert!(matches!(err, IngestError::Conversion { .. }));
    }
}
