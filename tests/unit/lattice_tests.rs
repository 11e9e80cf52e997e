// Tiling layout properties checked through the public lattice API

use imageseal::watermark::{generate, CanvasExtent, GlyphBox, TileLattice, TileSpec};
use rstest::rstest;

fn spec(spacing_margin: f32, angle_degrees: f32) -> TileSpec {
    TileSpec {
        spacing_margin,
        angle_degrees,
    }
}

#[rstest]
#[case(800.0, 600.0, 0.0)]
#[case(800.0, 600.0, -30.0)]
#[case(1920.0, 1080.0, 45.0)]
#[case(612.0, 792.0, 90.0)]
#[case(37.0, 1500.0, -135.0)]
fn test_placements_stay_on_canvas(#[case] width: f32, #[case] height: f32, #[case] angle: f32) {
    let placements = generate(
        CanvasExtent::new(width, height),
        GlyphBox::new(120.0, 30.0),
        spec(100.0, angle),
    )
    .unwrap();

    assert!(!placements.is_empty());
    for p in &placements {
        assert!(p.center_x > -120.0 && p.center_x < width + 120.0, "{:?}", p);
        assert!(p.center_y > -120.0 && p.center_y < height + 120.0, "{:?}", p);
        assert_eq!(p.angle_degrees, angle);
    }
}

#[test]
fn test_unrotated_grid_spacing() {
    let placements = generate(
        CanvasExtent::new(1000.0, 1000.0),
        GlyphBox::new(100.0, 20.0),
        spec(50.0, 0.0),
    )
    .unwrap();

    let mut xs: Vec<f32> = placements.iter().map(|p| p.center_x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    xs.dedup();
    let mut ys: Vec<f32> = placements.iter().map(|p| p.center_y).collect();
    ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
    ys.dedup();

    for pair in xs.windows(2) {
        assert!((pair[1] - pair[0] - 150.0).abs() < 1e-3);
    }
    for pair in ys.windows(2) {
        assert!((pair[1] - pair[0] - 70.0).abs() < 1e-3);
    }
    // Every column has the same rows.
    assert_eq!(placements.len(), xs.len() * ys.len());
}

#[test]
fn test_count_never_exceeds_upper_bound() {
    let lattice = TileLattice::new(
        CanvasExtent::new(3000.0, 2000.0),
        GlyphBox::new(10.0, 10.0),
        spec(5.0, 17.0),
    )
    .unwrap();
    assert!(lattice.placements().count() <= lattice.upper_bound());
}

