//! Pipeline orchestration: source -> slice -> aggregate -> render, per
//! variable, with failures isolated so one variable never aborts the
//! others.

use std::path::PathBuf;
use std::sync::Arc;

use cube_processor::{aggregate, export_csv, slice, SliceError};
use futures::stream::{self, StreamExt};
use power_client::{DataSource, SourceError};
use power_common::{DateRange, RegionalMeanGrid};
use renderer::{render, render_pair, RenderError, RenderSpec};
use tracing::{debug, error, info};

use crate::config::{PipelineConfig, ResolvedConfig};
use crate::report::{FailureKind, PipelineReport, VariableFailure, VariableSuccess};

/// Per-variable pipeline state machine. Every run walks Idle through
/// Done in order; Failed is terminal and reachable from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Fetching,
    Slicing,
    Aggregating,
    Rendering,
    Done,
    Failed,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetch",
            Stage::Slicing => "slice",
            Stage::Aggregating => "aggregate",
            Stage::Rendering => "render",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

fn advance(variable: &str, stage: &mut Stage, next: Stage) {
    debug!(variable, from = stage.name(), to = next.name(), "Stage transition");
    *stage = next;
}

/// Successful run of one variable, keeping the grid and spec around for
/// the optional combined render.
struct VariableRun {
    success: VariableSuccess,
    grid: RegionalMeanGrid,
    spec: RenderSpec,
}

/// Execute the full pipeline for every configured variable.
///
/// Variables run on a bounded worker pool; results are reported in
/// config order regardless of completion order.
pub async fn run(
    config: &PipelineConfig,
    source: Arc<dyn DataSource>,
) -> anyhow::Result<PipelineReport> {
    let resolved = config.resolve()?;
    std::fs::create_dir_all(&resolved.output_directory)?;

    info!(
        variables = resolved.variables.len(),
        start = %resolved.range.start,
        end = %resolved.range.end,
        workers = resolved.max_concurrent,
        "Starting pipeline run"
    );

    let tasks = resolved
        .variables
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, variable)| {
            let source = source.clone();
            let resolved = &resolved;
            async move {
                let outcome = run_variable(source, config, resolved, variable).await;
                (index, outcome)
            }
        });

    let mut outcomes: Vec<(usize, Result<VariableRun, VariableFailure>)> = stream::iter(tasks)
        .buffer_unordered(resolved.max_concurrent)
        .collect()
        .await;
    outcomes.sort_by_key(|(index, _)| *index);

    let mut report = PipelineReport::default();
    let mut runs: Vec<VariableRun> = Vec::new();

    for (_, outcome) in outcomes {
        match outcome {
            Ok(run) => runs.push(run),
            Err(failure) => {
                error!(
                    variable = %failure.variable,
                    kind = %failure.kind,
                    stage = failure.stage,
                    error = %failure.message,
                    "Variable pipeline failed"
                );
                report.failures.push(failure);
            }
        }
    }

    // Duo panel of the first two completed variables (LW next to SW in
    // the default setup).
    if resolved.combined && runs.len() >= 2 {
        match render_combined(&runs[0], &runs[1], &resolved) {
            Ok(path) => runs[0].success.artifacts.push(path),
            Err(failure) => report.failures.push(failure),
        }
    }

    report
        .successes
        .extend(runs.into_iter().map(|run| run.success));

    Ok(report)
}

async fn run_variable(
    source: Arc<dyn DataSource>,
    config: &PipelineConfig,
    resolved: &ResolvedConfig,
    variable: String,
) -> Result<VariableRun, VariableFailure> {
    let mut stage = Stage::Idle;

    let fail = |stage: &mut Stage, kind: FailureKind, variable: &str, message: String| -> VariableFailure {
        let failed_at = stage.name();
        *stage = Stage::Failed;
        VariableFailure {
            variable: variable.to_string(),
            kind,
            stage: failed_at,
            message,
        }
    };

    advance(&variable, &mut stage, Stage::Fetching);
    let cube = source
        .fetch(&variable, &resolved.range, Some(&resolved.bbox))
        .await
        .map_err(|e| fail(&mut stage, classify_source(&e), &variable, e.to_string()))?;

    advance(&variable, &mut stage, Stage::Slicing);
    let sliced = slice(&cube, &resolved.range, &resolved.bbox)
        .map_err(|e| fail(&mut stage, classify_slice(&e), &variable, e.to_string()))?;

    advance(&variable, &mut stage, Stage::Aggregating);
    let grid = aggregate(&sliced);

    advance(&variable, &mut stage, Stage::Rendering);
    let base = artifact_basename(&variable, &resolved.range);
    let png_path = resolved.output_directory.join(format!("{base}.png"));
    let csv_path = resolved.output_directory.join(format!("{base}.csv"));

    let spec = RenderSpec {
        variable: variable.clone(),
        min_value: resolved.scale_min,
        max_value: resolved.scale_max,
        colormap: config.colormap_for(&variable).to_string(),
        pixel_scale: resolved.pixel_scale,
        output_path: png_path.clone(),
    };

    render(&grid, &spec)
        .map_err(|e| fail(&mut stage, classify_render(&e), &variable, e.to_string()))?;
    export_csv(&grid, &csv_path)
        .map_err(|e| fail(&mut stage, FailureKind::Internal, &variable, e.to_string()))?;

    advance(&variable, &mut stage, Stage::Done);
    info!(variable = %variable, png = %png_path.display(), "Variable pipeline complete");

    Ok(VariableRun {
        success: VariableSuccess {
            variable,
            artifacts: vec![png_path, csv_path],
            region_mean: grid.region_mean(),
        },
        grid,
        spec,
    })
}

fn render_combined(
    left: &VariableRun,
    right: &VariableRun,
    resolved: &ResolvedConfig,
) -> Result<PathBuf, VariableFailure> {
    let name = format!(
        "{}_{}_{}_{}.png",
        left.success.variable,
        right.success.variable,
        resolved.range.start.format("%Y%m%d"),
        resolved.range.end.format("%Y%m%d"),
    );
    let path = resolved.output_directory.join(name);

    render_pair(&left.grid, &left.spec, &right.grid, &right.spec, &path).map_err(|e| {
        VariableFailure {
            variable: format!("{}+{}", left.success.variable, right.success.variable),
            kind: classify_render(&e),
            stage: Stage::Rendering.name(),
            message: e.to_string(),
        }
    })
}

/// Deterministic artifact base name from variable and date range.
fn artifact_basename(variable: &str, range: &DateRange) -> String {
    format!(
        "{}_{}_{}",
        variable,
        range.start.format("%Y%m%d"),
        range.end.format("%Y%m%d")
    )
}

fn classify_source(error: &SourceError) -> FailureKind {
    match error {
        SourceError::Unavailable { .. } => FailureKind::SourceUnavailable,
        SourceError::InvalidVariable(_) => FailureKind::InvalidVariable,
        _ => FailureKind::Internal,
    }
}

fn classify_slice(error: &SliceError) -> FailureKind {
    match error {
        SliceError::OutOfBounds { .. } => FailureKind::OutOfBounds,
        _ => FailureKind::Internal,
    }
}

fn classify_render(error: &RenderError) -> FailureKind {
    match error {
        RenderError::InvalidSpec(_) => FailureKind::RenderSpecInvalid,
        _ => FailureKind::Internal,
    }
}
