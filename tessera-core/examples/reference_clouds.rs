use log::info;
use tessera_core::{
    containers::{ChunkedCloud, Cloud, CloudMut, IndexedCloud, ReferenceCloud},
    nalgebra::Point3,
    CloudError,
};

fn main() -> Result<(), CloudError> {
    pretty_env_logger::init();

    // A cloud that owns its points. Points are stored in fixed-size blocks, so this never needs one
    // contiguous allocation for all points
    let mut cloud: ChunkedCloud = (0..100)
        .map(|i| Point3::new(i as f64, (i % 10) as f64, 0.0))
        .collect();
    cloud.enable_scalar_field()?;
    info!("Source cloud has {} points", cloud.size());

    // A view selects points of the source by index. Here: every point in the first row
    {
        let mut first_row = ReferenceCloud::new(&mut cloud);
        for index in (0..100).step_by(10) {
            first_row.add_index(index)?;
        }
        info!(
            "First row has {} points, bounds {:?}",
            first_row.size(),
            first_row.bounding_box()
        );

        // Scalar values written through the view end up in the source
        for local_index in 0..first_row.size() {
            first_row.set_scalar_value(local_index, local_index as f32)?;
        }
    }
    info!("Scalar value of point 90 is {}", cloud.scalar_value(90)?);

    // Any number of views can read from the same source at once
    let mut left = ReferenceCloud::new(&cloud);
    left.add_index_range(0..50)?;
    let mut right = ReferenceCloud::new(&cloud);
    right.add_index_range(50..100)?;

    // Walk a view with its built-in cursor and remove every point with an odd y coordinate
    left.reset_iterator();
    while let Some(point) = left.current_point() {
        if point.y as usize % 2 == 1 {
            left.remove_current()?;
        } else {
            left.forward_iterator();
        }
    }
    info!("{} points with even y remain in the left half", left.size());

    // Views over the same source can be merged
    left.append(&right)?;
    info!(
        "Merged view has {} points, bounds {:?}",
        left.size(),
        left.bounding_box()
    );

    let farthest = left
        .points()
        .max_by(|a, b| a.coords.norm().total_cmp(&b.coords.norm()));
    info!("Farthest point from the origin: {:?}", farthest);

    Ok(())
}
