//! CSV export of regional mean grids.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use power_common::RegionalMeanGrid;
use tracing::info;

/// Write a grid as CSV: `lat,lon,mean,valid_count`, one row per cell in
/// row-major order. No-data cells keep their count and leave the mean
/// column empty.
///
/// The file is written to a temp sibling then renamed into place, same
/// discipline as the image artifacts.
pub fn export_csv(grid: &RegionalMeanGrid, path: &Path) -> std::io::Result<()> {
    let tmp_path = path.with_extension("csv.tmp");

    {
        let mut out = BufWriter::new(File::create(&tmp_path)?);
        writeln!(out, "lat,lon,mean,valid_count")?;

        for (j, &lat) in grid.lats().iter().enumerate() {
            for (i, &lon) in grid.lons().iter().enumerate() {
                match grid.mean_at(j, i) {
                    Some(mean) => {
                        writeln!(out, "{lat:.4},{lon:.4},{mean:.6},{}", grid.valid_count_at(j, i))?
                    }
                    None => writeln!(out, "{lat:.4},{lon:.4},,0")?,
                }
            }
        }

        out.flush()?;
    }

    std::fs::rename(&tmp_path, path)?;
    info!(path = %path.display(), cells = grid.width() * grid.height(), "Wrote CSV");
    Ok(())
}
