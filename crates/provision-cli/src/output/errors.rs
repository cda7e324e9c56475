//! Error message formatting with actionable suggestions.
//!
//! Resolution failures are expanded into one line per missing resource,
//! product requirement and conflict so the whole report is visible at once.

use std::error::Error;

use provision_core::error::{ProvisionError, ResolutionError};

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    #[cfg(test)]
    fn plain() -> Self {
        Self {
            colors: ColorSupport::disabled(),
        }
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &ProvisionError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let Some(report) = error.as_resolution() {
            self.push_report(&mut output, report);
        }

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        output
    }

    fn push_report(&self, output: &mut String, report: &ResolutionError) {
        for missing in &report.missing_requirements {
            output.push_str(&format!("  {} {}\n", self.colors.dim("missing"), missing));
        }
        for product in &report.missing_products {
            output.push_str(&format!("  {} {}\n", self.colors.dim("requires"), product));
        }
        for (name, chains) in &report.conflicts {
            output.push_str(&format!("  {} {}\n", self.colors.dim("conflict"), name));
            for chain in chains {
                output.push_str(&format!("    {chain}\n"));
            }
        }
    }

    /// Format a simple error message
    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_core::error::{ConflictChain, MissingRequirement};

    #[test]
    fn test_format_includes_suggestion() {
        let error = ProvisionError::malformed_name("a/1/2", "more than one '/'");
        let formatted = ErrorFormatter::plain().format_error(&error);

        assert!(formatted.starts_with("error: Malformed resource name 'a/1/2'"));
        assert!(formatted.contains("help: Request features as"));
    }

    #[test]
    fn test_format_lists_report_lines() {
        let mut report = ResolutionError::default();
        report.top_level_not_resolved.push("A".to_string());
        report.add_missing_requirement(MissingRequirement::new("G", Some("A".to_string())));
        report.conflicts.insert(
            "S".to_string(),
            vec![ConflictChain {
                chain: vec!["F1".to_string()],
                candidates: vec!["S-1.0".to_string()],
                preferred: None,
            }],
        );

        let formatted = ErrorFormatter::plain().format_error(&report.into());
        assert!(formatted.contains("resource=A"));
        assert!(formatted.contains("  missing G (required by A)\n"));
        assert!(formatted.contains("  conflict S\n    F1 -> [S-1.0]\n"));
    }

    #[test]
    fn test_format_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let formatted = ErrorFormatter::plain().format_error(&ProvisionError::io("Failed to read x", io));

        assert!(formatted.contains("caused by: no such file"));
    }
}
