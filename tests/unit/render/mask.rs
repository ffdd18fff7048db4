use super::*;
use crate::geometry::shape::PieceShapeGenerator;

fn neighbours(mask: &PieceMask, x: u32, y: u32, reach: i64) -> impl Iterator<Item = Coverage> + '_ {
    (-reach..=reach).flat_map(move |dy| {
        (-reach..=reach).filter_map(move |dx| {
            let nx = i64::from(x) + dx;
            let ny = i64::from(y) + dy;
            (nx >= 0 && ny >= 0 && (dx, dy) != (0, 0)).then(|| mask.at(nx as u32, ny as u32))
        })
    })
}

#[test]
fn pad_covers_the_stroke_width() {
    assert_eq!(f64::from(BORDER_PAD), BORDER_WIDTH.ceil());
    let shape = PieceShapeGenerator.generate(50).unwrap();
    let mask = PieceMask::rasterize(&shape);
    assert_eq!(mask.extent(), 60);
    assert_eq!(mask.canvas(), 60 + 2 * BORDER_PAD);
}

#[test]
fn mask_matches_shape_containment() {
    let shape = PieceShapeGenerator.generate(30).unwrap();
    let mask = PieceMask::rasterize(&shape);
    let pad = f64::from(mask.pad());
    for y in 0..mask.canvas() {
        for x in 0..mask.canvas() {
            let centre = Point::new(f64::from(x) - pad + 0.5, f64::from(y) - pad + 0.5);
            assert_eq!(mask.is_inside(x, y), shape.contains(centre), "({x}, {y})");
        }
    }
}

#[test]
fn same_size_masks_are_identical() {
    let a = PieceMask::rasterize(&PieceShapeGenerator.generate(50).unwrap());
    let b = PieceMask::rasterize(&PieceShapeGenerator.generate(50).unwrap());
    assert_eq!(a, b);
}

#[test]
fn body_is_inside_and_corners_are_outside() {
    let mask = PieceMask::rasterize(&PieceShapeGenerator.generate(50).unwrap());
    let p = mask.pad();
    assert_eq!(mask.at(p + 25, p + 35), Coverage::Inside);
    assert_eq!(mask.at(0, 0), Coverage::Outside);
    assert_eq!(mask.at(p + 59, p + 59), Coverage::Outside);
    assert_eq!(mask.at(500, 0), Coverage::Outside);
    // body area is 50x50; tabs add more
    assert!(mask.count(Coverage::Inside) > 2500);
    assert!(mask.count(Coverage::Inside) < 60 * 60);
}

#[test]
fn outline_is_stroked_on_every_side() {
    let mask = PieceMask::rasterize(&PieceShapeGenerator.generate(50).unwrap());
    let p = mask.pad();
    // left edge of the body at mid height
    assert_eq!(mask.at(p, p + 35), Coverage::Inside);
    assert_eq!(mask.at(p - 1, p + 35), Coverage::Border);
    // bottom edge of the body
    assert_eq!(mask.at(p + 25, p + 59), Coverage::Inside);
    assert_eq!(mask.at(p + 25, p + 60), Coverage::Border);
    // tip of the top tab
    assert_eq!(mask.at(p + 25, p), Coverage::Inside);
    assert_eq!(mask.at(p + 25, p - 1), Coverage::Border);
    // tip of the right tab
    assert_eq!(mask.at(p + 59, p + 35), Coverage::Inside);
    assert_eq!(mask.at(p + 60, p + 35), Coverage::Border);

    // every outside pixel touching the shape carries the stroke
    for y in 0..mask.canvas() {
        for x in 0..mask.canvas() {
            if mask.at(x, y) == Coverage::Inside {
                continue;
            }
            if neighbours(&mask, x, y, 1).any(|c| c == Coverage::Inside) {
                assert_eq!(mask.at(x, y), Coverage::Border, "unstroked ({x}, {y})");
            }
        }
    }
    // and the canvas edge itself stays clear
    for i in 0..mask.canvas() {
        assert_ne!(mask.at(i, 0), Coverage::Inside);
        assert_ne!(mask.at(0, i), Coverage::Inside);
    }
}

#[test]
fn border_hugs_the_outline() {
    let mask = PieceMask::rasterize(&PieceShapeGenerator.generate(50).unwrap());
    assert!(mask.count(Coverage::Border) > 0);
    for y in 0..mask.canvas() {
        for x in 0..mask.canvas() {
            if mask.at(x, y) != Coverage::Border {
                continue;
            }
            let touches_inside = neighbours(&mask, x, y, 3).any(|c| c == Coverage::Inside);
            assert!(touches_inside, "stray border pixel at ({x}, {y})");
        }
    }
}

#[test]
fn outline_distance_uses_the_nearest_segment() {
    let segs = [
        Line::new((0.0, 0.0), (10.0, 0.0)),
        Line::new((10.0, 0.0), (10.0, 10.0)),
    ];
    assert!((min_distance(&segs, Point::new(5.0, 3.0)) - 3.0).abs() < 1e-9);
    assert!((min_distance(&segs, Point::new(13.0, 4.0)) - 3.0).abs() < 1e-9);
    assert!((min_distance(&segs, Point::new(-3.0, -4.0)) - 5.0).abs() < 1e-9);
}
