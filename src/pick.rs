//! Export the colors of one chart square from a point cloud.
//!
//! The square is given by four picked points (indices into the cloud). Every
//! point whose XY position lies within the bounding box of those corners is
//! selected, and the selected colors are written as `<name>.csv`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::PickConfig;
use crate::data::export::write_samples;
use crate::data::filter::select_in_footprint;
use crate::data::loader::load_point_cloud;
use crate::data::model::{ColorSamples, PointCloud};
use crate::error::ChartError;

/// Points of the cloud inside the square spanned by the picked corners.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub corners: [[f64; 3]; 4],
    pub indices: Vec<usize>,
    pub colors: ColorSamples,
}

/// Resolve the four picked point ids and select the enclosed points.
pub fn select_square(cloud: &PointCloud, picked: &[usize]) -> crate::error::Result<Selection> {
    let ids: [usize; 4] = picked
        .try_into()
        .map_err(|_| ChartError::CornerCount(picked.len()))?;

    let mut corners = [[0.0; 3]; 4];
    for (corner, &id) in corners.iter_mut().zip(&ids) {
        *corner = cloud.position(id)?;
    }
    log::info!("point_ids: {ids:?}");
    log::info!("coordinates: {corners:?}");

    let indices = select_in_footprint(cloud, &corners);
    let colors = cloud.colors_at(&indices);
    log::info!("{} points inside the square", indices.len());

    Ok(Selection {
        corners,
        indices,
        colors,
    })
}

/// Load the cloud, select the square and write its colors.
///
/// Returns the path of the written CSV together with the selection.
pub fn run(config: &PickConfig, picked: &[usize]) -> Result<(PathBuf, Selection)> {
    let cloud = load_point_cloud(&config.cloud)?;
    let selection = select_square(&cloud, picked)?;

    let name = match config.name.trim() {
        "" => "output",
        name => name,
    };
    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating {}", config.out_dir.display()))?;
    let path = config.out_dir.join(format!("{name}.csv"));
    write_samples(&path, &selection.colors)?;
    log::info!("Saved RGB values to {}", path.display());

    Ok((path, selection))
}

#[cfg(test)]
mod tests {
    use palette::Srgb;

    use super::*;

    /// 3x3 grid of points one unit apart, red channel encodes the index.
    fn grid() -> PointCloud {
        let mut positions = Vec::new();
        let mut colors = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                positions.push([x as f64, y as f64, 0.0]);
                colors.push(Srgb::new((y * 3 + x) as f64 / 10.0, 0.0, 0.0));
            }
        }
        PointCloud::new(positions, colors).unwrap()
    }

    #[test]
    fn selects_points_inside_picked_corners() {
        // Corners at (0,0), (1,0), (1,1), (0,1).
        let selection = select_square(&grid(), &[0, 1, 4, 3]).unwrap();
        assert_eq!(selection.indices, vec![0, 1, 3, 4]);
        assert_eq!(selection.colors.len(), 4);
        assert_eq!(selection.colors.colors[3], Srgb::new(0.4, 0.0, 0.0));
        assert_eq!(selection.corners[2], [1.0, 1.0, 0.0]);
    }

    #[test]
    fn exactly_four_corners_are_required() {
        for picked in [&[0, 1, 2][..], &[0, 1, 2, 3, 4][..], &[][..]] {
            assert_eq!(
                select_square(&grid(), picked).unwrap_err(),
                ChartError::CornerCount(picked.len())
            );
        }
    }

    #[test]
    fn out_of_range_pick_is_an_error() {
        assert_eq!(
            select_square(&grid(), &[0, 1, 2, 9]).unwrap_err(),
            ChartError::PointOutOfRange { index: 9, len: 9 }
        );
    }
}
