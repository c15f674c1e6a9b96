//! Wire message types.
//!
//! Clouds travel in a minimal binary layout: named fields over a packed
//! little-endian payload, single row, `point_step` bytes per point. The
//! canonical layout is x/y/z FLOAT32 at offsets 0/4/8, point_step 12.

use serde::{Deserialize, Serialize};

use crate::core::types::{Point3, PointCloud, Pose2D};
use crate::error::{LocalizationError, Result};

/// Field datatype tag for 32-bit floats.
pub const FIELD_FLOAT32: u8 = 7;

/// Bytes per point in the canonical x/y/z layout.
pub const XYZ_POINT_STEP: u32 = 12;

/// One named field of a cloud payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

/// Packed point cloud message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudMsg {
    pub seq: u32,
    pub stamp_us: u64,
    pub frame_id: String,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub point_step: u32,
    pub row_step: u32,
    pub data: Vec<u8>,
}

impl PointCloudMsg {
    /// Encode a cloud in the canonical x/y/z layout.
    pub fn from_cloud(cloud: &PointCloud, frame_id: impl Into<String>, stamp_us: u64) -> Self {
        let width = cloud.len() as u32;
        let mut data = Vec::with_capacity(cloud.len() * XYZ_POINT_STEP as usize);
        for p in cloud.iter() {
            data.extend_from_slice(&p.x.to_le_bytes());
            data.extend_from_slice(&p.y.to_le_bytes());
            data.extend_from_slice(&p.z.to_le_bytes());
        }
        Self {
            seq: 0,
            stamp_us,
            frame_id: frame_id.into(),
            height: 1,
            width,
            fields: xyz_fields(),
            point_step: XYZ_POINT_STEP,
            row_step: width * XYZ_POINT_STEP,
            data,
        }
    }

    /// Decode the payload back into a cloud.
    ///
    /// Accepts any point_step of at least 12 as long as x/y/z FLOAT32
    /// fields are present; extra fields are ignored.
    pub fn to_cloud(&self) -> Result<PointCloud> {
        let x_off = self.field_offset("x")?;
        let y_off = self.field_offset("y")?;
        let z_off = self.field_offset("z")?;

        let step = self.point_step as usize;
        if step < XYZ_POINT_STEP as usize {
            return Err(LocalizationError::CloudFormat(format!(
                "point_step {} too small for x/y/z floats",
                step
            )));
        }
        let count = self.width as usize * self.height as usize;
        if self.data.len() < count * step {
            return Err(LocalizationError::CloudFormat(format!(
                "payload holds {} bytes, {} points need {}",
                self.data.len(),
                count,
                count * step
            )));
        }

        let mut cloud = PointCloud::with_capacity(count);
        for i in 0..count {
            let base = i * step;
            cloud.push(Point3::new(
                read_f32(&self.data, base + x_off)?,
                read_f32(&self.data, base + y_off)?,
                read_f32(&self.data, base + z_off)?,
            ));
        }
        Ok(cloud)
    }

    fn field_offset(&self, name: &str) -> Result<usize> {
        let field = self
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| LocalizationError::CloudFormat(format!("missing field '{}'", name)))?;
        if field.datatype != FIELD_FLOAT32 {
            return Err(LocalizationError::CloudFormat(format!(
                "field '{}' is not FLOAT32",
                name
            )));
        }
        Ok(field.offset as usize)
    }
}

fn xyz_fields() -> Vec<PointField> {
    ["x", "y", "z"]
        .iter()
        .enumerate()
        .map(|(i, name)| PointField {
            name: name.to_string(),
            offset: (i * 4) as u32,
            datatype: FIELD_FLOAT32,
            count: 1,
        })
        .collect()
}

fn read_f32(data: &[u8], offset: usize) -> Result<f32> {
    let bytes: [u8; 4] = data
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            LocalizationError::CloudFormat(format!("payload truncated at offset {}", offset))
        })?;
    Ok(f32::from_le_bytes(bytes))
}

/// Corrected pose message with a monotonically increasing sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseMsg {
    pub seq: u64,
    pub stamp_us: u64,
    pub frame_id: String,
    pub pose: Pose2D,
}

/// Frame-to-frame transform broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformMsg {
    pub parent_frame: String,
    pub child_frame: String,
    pub stamp_us: u64,
    pub transform: Pose2D,
}
