//! Reference cloud file loading.
//!
//! Plain ASCII format: one `x y z` triple per line, meters, `#` starts
//! a comment. Loaded once at daemon start when
//! `reference_cloud_file_name` is configured.

use std::path::Path;

use crate::core::types::{Point3, PointCloud};
use crate::error::{LocalizationError, Result};

/// Load a reference cloud from an ASCII x/y/z file.
pub fn load_cloud_file(path: &Path) -> Result<PointCloud> {
    let content = std::fs::read_to_string(path)?;
    let mut cloud = PointCloud::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut values = line.split_whitespace().map(str::parse::<f32>);
        let (x, y, z) = match (values.next(), values.next(), values.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => (x, y, z),
            _ => {
                return Err(LocalizationError::CloudFormat(format!(
                    "{}:{}: expected three floats",
                    path.display(),
                    line_no + 1
                )))
            }
        };
        cloud.push(Point3::new(x, y, z));
    }

    if cloud.is_empty() {
        return Err(LocalizationError::CloudFormat(format!(
            "{}: no points",
            path.display()
        )));
    }
    Ok(cloud)
}
