//! Rasterization of regional mean grids into PNG map artifacts.

use std::path::{Path, PathBuf};

use power_common::RegionalMeanGrid;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::colormap::{Color, Colormap};
use crate::error::RenderError;
use crate::png;

/// Pixel columns separating the two panels of a paired render.
const PAIR_GUTTER_PX: usize = 8;

/// Rendering parameters for one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSpec {
    /// Variable id, recorded for logging only.
    pub variable: String,
    /// Color-scale lower bound (maps to the colormap start).
    pub min_value: f64,
    /// Color-scale upper bound (maps to the colormap end).
    pub max_value: f64,
    /// Colormap id, e.g. "viridis".
    pub colormap: String,
    /// Square pixel block size per grid cell.
    pub pixel_scale: usize,
    /// Artifact destination.
    pub output_path: PathBuf,
}

impl RenderSpec {
    /// Validate the spec and resolve its colormap.
    fn validated_colormap(&self) -> Result<Colormap, RenderError> {
        if self.min_value >= self.max_value {
            return Err(RenderError::InvalidSpec(format!(
                "color-scale bounds are inverted: min {} >= max {}",
                self.min_value, self.max_value
            )));
        }
        if self.pixel_scale == 0 {
            return Err(RenderError::InvalidSpec("pixel_scale must be > 0".into()));
        }
        Colormap::from_name(&self.colormap)
            .ok_or_else(|| RenderError::InvalidSpec(format!("unknown colormap: {}", self.colormap)))
    }
}

/// Render a grid to the spec's output path.
///
/// Output is deterministic for identical (grid, spec) pairs. The file is
/// encoded fully in memory, written to a temp sibling, then renamed into
/// place, so an interrupted run never leaves a partial artifact.
pub fn render(grid: &RegionalMeanGrid, spec: &RenderSpec) -> Result<PathBuf, RenderError> {
    let cmap = spec.validated_colormap()?;
    let (pixels, width, height) = rasterize(grid, spec, &cmap);

    let encoded = png::encode(&pixels, width, height)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    write_atomic(&spec.output_path, &encoded)?;

    info!(
        variable = %spec.variable,
        colormap = cmap.name(),
        width,
        height,
        path = %spec.output_path.display(),
        "Rendered map"
    );
    Ok(spec.output_path.clone())
}

/// Render two grids side by side into one artifact, left then right,
/// separated by a transparent gutter. Both panels must share a pixel
/// height (same latitude extent and pixel scale).
pub fn render_pair(
    left: &RegionalMeanGrid,
    left_spec: &RenderSpec,
    right: &RegionalMeanGrid,
    right_spec: &RenderSpec,
    output_path: &Path,
) -> Result<PathBuf, RenderError> {
    let left_cmap = left_spec.validated_colormap()?;
    let right_cmap = right_spec.validated_colormap()?;

    let (left_px, lw, lh) = rasterize(left, left_spec, &left_cmap);
    let (right_px, rw, rh) = rasterize(right, right_spec, &right_cmap);

    if lh != rh {
        return Err(RenderError::InvalidSpec(format!(
            "paired panels differ in pixel height: {lh} vs {rh}"
        )));
    }

    let width = lw + PAIR_GUTTER_PX + rw;
    let mut pixels = vec![0u8; width * lh * 4];
    for y in 0..lh {
        let row = y * width * 4;
        pixels[row..row + lw * 4].copy_from_slice(&left_px[y * lw * 4..(y + 1) * lw * 4]);
        let right_start = row + (lw + PAIR_GUTTER_PX) * 4;
        pixels[right_start..right_start + rw * 4]
            .copy_from_slice(&right_px[y * rw * 4..(y + 1) * rw * 4]);
    }

    let encoded =
        png::encode(&pixels, width, lh).map_err(|e| RenderError::Encode(e.to_string()))?;
    write_atomic(output_path, &encoded)?;

    info!(
        left = %left_spec.variable,
        right = %right_spec.variable,
        path = %output_path.display(),
        "Rendered paired map"
    );
    Ok(output_path.to_path_buf())
}

/// Expand grid cells into pixel blocks, north at the top.
fn rasterize(
    grid: &RegionalMeanGrid,
    spec: &RenderSpec,
    cmap: &Colormap,
) -> (Vec<u8>, usize, usize) {
    let scale = spec.pixel_scale;
    let width = grid.width() * scale;
    let height = grid.height() * scale;
    let range = spec.max_value - spec.min_value;

    let mut pixels = vec![0u8; width * height * 4];

    for row in 0..grid.height() {
        // Latitude axis is ascending; image rows go north to south.
        let j = grid.height() - 1 - row;
        for i in 0..grid.width() {
            let color = match grid.mean_at(j, i) {
                Some(mean) => cmap.sample((mean - spec.min_value) / range),
                None => Color::transparent(),
            };
            fill_block(&mut pixels, width, i * scale, row * scale, scale, color);
        }
    }

    (pixels, width, height)
}

fn fill_block(pixels: &mut [u8], width: usize, x0: usize, y0: usize, scale: usize, color: Color) {
    for y in y0..y0 + scale {
        for x in x0..x0 + scale {
            let offset = (y * width + x) * 4;
            pixels[offset] = color.r;
            pixels[offset + 1] = color.g;
            pixels[offset + 2] = color.b;
            pixels[offset + 3] = color.a;
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, bytes).map_err(|source| RenderError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x3() -> RegionalMeanGrid {
        RegionalMeanGrid::new(
            "ALLSKY_SFC_LW_DWN",
            "W/m^2",
            vec![35.0, 36.0],
            vec![-85.0, -84.0, -83.0],
            vec![250.0, 275.0, 300.0, 310.0, 0.0, 350.0],
            vec![10, 10, 10, 10, 0, 10],
        )
        .unwrap()
    }

    fn spec(dir: &Path, name: &str) -> RenderSpec {
        RenderSpec {
            variable: "ALLSKY_SFC_LW_DWN".to_string(),
            min_value: 200.0,
            max_value: 400.0,
            colormap: "viridis".to_string(),
            pixel_scale: 4,
            output_path: dir.join(name),
        }
    }

    #[test]
    fn test_render_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec(dir.path(), "lw.png");

        let path = render(&grid_2x3(), &spec).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);
        assert!(!dir.path().join("lw.png.tmp").exists());
    }

    #[test]
    fn test_render_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let grid = grid_2x3();

        let first = std::fs::read(render(&grid, &spec(dir.path(), "a.png")).unwrap()).unwrap();
        let second = std::fs::read(render(&grid, &spec(dir.path(), "b.png")).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec(dir.path(), "lw.png");
        std::fs::write(&spec.output_path, b"stale").unwrap();

        render(&grid_2x3(), &spec).unwrap();
        let bytes = std::fs::read(&spec.output_path).unwrap();
        assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec(dir.path(), "lw.png");
        spec.min_value = 400.0;
        spec.max_value = 200.0;

        let err = render(&grid_2x3(), &spec).unwrap_err();
        assert!(matches!(err, RenderError::InvalidSpec(_)));
        assert!(!spec.output_path.exists());
    }

    #[test]
    fn test_unknown_colormap_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec(dir.path(), "lw.png");
        spec.colormap = "jet".to_string();

        assert!(matches!(
            render(&grid_2x3(), &spec),
            Err(RenderError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_no_data_cells_are_transparent() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec(dir.path(), "lw.png");
        spec.pixel_scale = 1;

        let cmap = spec.validated_colormap().unwrap();
        let (pixels, width, height) = rasterize(&grid_2x3(), &spec, &cmap);
        assert_eq!((width, height), (3, 2));

        // Grid row j=1 renders as image row 0; the no-data cell is at
        // grid (j=1, i=1) -> image (row 0, col 1).
        let offset = 4;
        assert_eq!(pixels[offset + 3], 0);
        // A valid neighbor (row 0, col 0) is opaque
        assert_eq!(pixels[3], 255);
    }

    #[test]
    fn test_render_pair_composes_panels() {
        let dir = tempfile::tempdir().unwrap();
        let grid = grid_2x3();
        let lw = spec(dir.path(), "lw.png");
        let mut sw = spec(dir.path(), "sw.png");
        sw.variable = "ALLSKY_SFC_SW_DWN".to_string();
        sw.colormap = "magma".to_string();

        let out = dir.path().join("pair.png");
        let path = render_pair(&grid, &lw, &grid, &sw, &out).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);

        // Deterministic too
        let again = dir.path().join("pair2.png");
        render_pair(&grid, &lw, &grid, &sw, &again).unwrap();
        assert_eq!(bytes, std::fs::read(&again).unwrap());
    }

    #[test]
    fn test_render_pair_height_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let tall = RegionalMeanGrid::new(
            "X",
            "",
            vec![35.0, 36.0, 37.0],
            vec![-85.0],
            vec![1.0, 2.0, 3.0],
            vec![1, 1, 1],
        )
        .unwrap();

        let err = render_pair(
            &grid_2x3(),
            &spec(dir.path(), "a.png"),
            &tall,
            &spec(dir.path(), "b.png"),
            &dir.path().join("pair.png"),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::InvalidSpec(_)));
    }
}
