use std::error::Error;

mod canvas;
use canvas::{Canvas, SvgCanvas};
mod combinatorial_map;
use combinatorial_map::CombinatorialMap;
mod face_indexer;
use face_indexer::{configure, FaceIndexer};
mod circle_packing;
use circle_packing::CirclePacker;
mod utils;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // surgery demo: glue three triangles into a strip and reduce
    let mut g = CombinatorialMap::ring(3)?;
    let second = CombinatorialMap::ring(3)?;
    let third = CombinatorialMap::ring(3)?;
    g.glue(&second, 1)?;
    g.rotate(1)?;
    g.glue(&third, 2)?;
    g.normal_form()?;
    g.check_maps()?;
    println!(
        "reduced map: {} boundary darts, {} interior darts, {} active",
        g.boundary_count(),
        g.interior_count(),
        g.active_darts().len()
    );

    // packing pipeline: subdivide a square, pack it and lay it out
    let square = CombinatorialMap::ring(4)?;
    let threshold = square.dart_count();
    let wrapped = configure(&square, &[1, 1, 1, 1])?;
    let indexer = FaceIndexer::new(wrapped, threshold)?;
    let mut packer = CirclePacker::from_indexer(&indexer)?;
    packer.set_tolerance(1e-4);
    packer.make_packing()?;
    let coordinates = packer.layout()?;

    let mut board = SvgCanvas::new();
    packer.draw(&coordinates, &mut board, true)?;
    board.save("packing.svg")?;
    println!("wrote packing.svg with {} circles", coordinates.len());
    Ok(())
}
