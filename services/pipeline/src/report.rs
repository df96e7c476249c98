//! Per-variable outcomes and the end-of-run report.

use std::fmt;
use std::path::PathBuf;

/// Classified failure cause, one per error family the pipeline can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Archive unreachable after retries.
    SourceUnavailable,
    /// Unrecognized parameter id.
    InvalidVariable,
    /// Requested window outside dataset coverage.
    OutOfBounds,
    /// Unusable render configuration.
    RenderSpecInvalid,
    /// Anything else: decode, cache, filesystem.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::SourceUnavailable => "SourceUnavailable",
            FailureKind::InvalidVariable => "InvalidVariable",
            FailureKind::OutOfBounds => "OutOfBounds",
            FailureKind::RenderSpecInvalid => "RenderSpecInvalid",
            FailureKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// A variable that completed the full pipeline.
#[derive(Debug, Clone)]
pub struct VariableSuccess {
    pub variable: String,
    pub artifacts: Vec<PathBuf>,
    /// Whole-region scalar mean, when any cell had valid samples.
    pub region_mean: Option<f64>,
}

/// A variable that reached the Failed state.
#[derive(Debug, Clone)]
pub struct VariableFailure {
    pub variable: String,
    pub kind: FailureKind,
    /// Pipeline stage that failed, for the summary line.
    pub stage: &'static str,
    pub message: String,
}

/// Aggregated outcome of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub successes: Vec<VariableSuccess>,
    pub failures: Vec<VariableFailure>,
}

impl PipelineReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Human-readable run summary: which variables succeeded (with
    /// artifact paths) and which failed (with kind and message).
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Pipeline finished: {} succeeded, {} failed\n",
            self.successes.len(),
            self.failures.len()
        ));

        for success in &self.successes {
            match success.region_mean {
                Some(mean) => out.push_str(&format!(
                    "  ok   {} (region mean {:.2})\n",
                    success.variable, mean
                )),
                None => out.push_str(&format!("  ok   {} (no valid samples)\n", success.variable)),
            }
            for artifact in &success.artifacts {
                out.push_str(&format!("         {}\n", artifact.display()));
            }
        }

        for failure in &self.failures {
            out.push_str(&format!(
                "  FAIL {} [{}] during {}: {}\n",
                failure.variable, failure.kind, failure.stage, failure.message
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_both_outcomes() {
        let report = PipelineReport {
            successes: vec![VariableSuccess {
                variable: "ALLSKY_SFC_LW_DWN".to_string(),
                artifacts: vec![PathBuf::from("out/lw.png")],
                region_mean: Some(300.0),
            }],
            failures: vec![VariableFailure {
                variable: "BOGUS".to_string(),
                kind: FailureKind::InvalidVariable,
                stage: "fetch",
                message: "unknown parameter: BOGUS".to_string(),
            }],
        };

        let summary = report.summary();
        assert!(summary.contains("1 succeeded, 1 failed"));
        assert!(summary.contains("out/lw.png"));
        assert!(summary.contains("[InvalidVariable]"));
        assert!(report.has_failures());
    }

    #[test]
    fn test_empty_report_has_no_failures() {
        assert!(!PipelineReport::default().has_failures());
    }
}
