use super::*;

#[test]
fn test_resolution_zoom_zero_spans_the_world() {
    // One 256px tile covers the full 2 * ORIGIN_SHIFT extent.
    let res = resolution(0);
    assert!((res * 256.0 - 2.0 * ORIGIN_SHIFT).abs() < 1e-6);
}

#[test]
fn test_resolution_halves_per_zoom() {
    for z in 0..15 {
        assert!((resolution(z) / resolution(z + 1) - 2.0).abs() < 1e-12);
    }
}

#[test]
fn test_resolution_zoom_11() {
    // 2 * 20037508.342789244 / (256 * 2048)
    assert!((resolution(11) - 76.43702828517625).abs() < 1e-9);
}

#[test]
fn test_tile_bounds_world_tile() {
    let b = tile_bounds(0, 0, 0);
    assert!((b.min_x + ORIGIN_SHIFT).abs() < 1e-6);
    assert!((b.max_x - ORIGIN_SHIFT).abs() < 1e-6);
    assert!((b.min_y + ORIGIN_SHIFT).abs() < 1e-6);
    assert!((b.max_y - ORIGIN_SHIFT).abs() < 1e-6);
}

#[test]
fn test_tile_bounds_y_flip() {
    // XYZ y=0 is the northernmost row, so its max_y touches the top of the
    // world and the bottom row touches the bottom.
    let top = tile_bounds(3, 0, 0);
    let bottom = tile_bounds(3, 0, 7);

    assert!((top.max_y - ORIGIN_SHIFT).abs() < 1e-6);
    assert!((bottom.min_y + ORIGIN_SHIFT).abs() < 1e-6);
    assert!(top.min_y > bottom.max_y);
}

#[test]
fn test_tile_bounds_adjacent_tiles_share_edges() {
    let a = tile_bounds(10, 511, 340);
    let right = tile_bounds(10, 512, 340);
    let below = tile_bounds(10, 511, 341);

    assert!((a.max_x - right.min_x).abs() < 1e-9);
    assert!((a.min_y - below.max_y).abs() < 1e-9);
}

#[test]
fn test_tile_at_origin() {
    // (0, 0) lies exactly on the four-tile corner at zoom 1; the convention
    // rounds toward the north-west tile's south-east neighbour.
    assert_eq!(tile_at(0.0, 0.0, 0), (0, 0));
    assert_eq!(tile_at(0.0, 0.0, 1), (1, 1));
}

#[test]
fn test_tile_at_known_location() {
    // Seattle, 47.6N 122.3W at zoom 11.
    let (x, y) = tile_at(-122.3, 47.6, 11);
    assert_eq!((x, y), (328, 715));
}

#[test]
fn test_tile_at_clamps_out_of_range() {
    let n = (1u32 << 5) - 1;
    assert_eq!(tile_at(-200.0, 0.0, 5).0, 0);
    assert_eq!(tile_at(200.0, 0.0, 5).0, n);
    assert_eq!(tile_at(0.0, 89.9, 5).1, 0);
    assert_eq!(tile_at(0.0, -89.9, 5).1, n);
}

#[test]
fn test_tile_at_within_bounds_for_valid_input() {
    for z in [0u8, 4, 9, 12] {
        let n = 1u32 << z;
        for &(lon, lat) in &[(-179.9, 84.9), (179.9, -84.9), (0.0, 0.0), (-122.3, 47.6)] {
            let (x, y) = tile_at(lon, lat, z);
            assert!(x < n, "x={} out of range at z={}", x, z);
            assert!(y < n, "y={} out of range at z={}", y, z);
        }
    }
}

#[test]
fn test_mercator_to_geographic_roundtrip_axes() {
    let (lon, lat) = mercator_to_geographic(0.0, 0.0);
    assert!(lon.abs() < 1e-9);
    assert!(lat.abs() < 1e-9);

    let (lon, _) = mercator_to_geographic(ORIGIN_SHIFT, 0.0);
    assert!((lon - 180.0).abs() < 1e-9);

    let (_, lat) = mercator_to_geographic(0.0, ORIGIN_SHIFT);
    assert!((lat - 85.05112878).abs() < 1e-6);
}

#[test]
fn test_tile_roundtrip_is_contained() {
    // Geographic bbox -> tiles -> tile bounds -> geographic must contain the
    // original bbox (up to one-tile dilation).
    let (lon_min, lat_min, lon_max, lat_max) = (-123.2, 46.1, -120.8, 48.9);
    let z = 8;

    let (x0, y1) = tile_at(lon_min, lat_min, z);
    let (x1, y0) = tile_at(lon_max, lat_max, z);

    let nw = tile_bounds(z, x0, y0);
    let se = tile_bounds(z, x1, y1);

    let (cover_lon_min, cover_lat_max) = mercator_to_geographic(nw.min_x, nw.max_y);
    let (cover_lon_max, cover_lat_min) = mercator_to_geographic(se.max_x, se.min_y);

    assert!(cover_lon_min <= lon_min && lon_max <= cover_lon_max);
    assert!(cover_lat_min <= lat_min && lat_max <= cover_lat_max);

    // The dilation is bounded by one tile in each direction.
    let tile_degrees = 360.0 / (1u32 << z) as f64;
    assert!(lon_min - cover_lon_min <= tile_degrees);
    assert!(cover_lon_max - lon_max <= tile_degrees);
}

#[test]
fn test_pack_unpack_roundtrip() {
    for &(x, y) in &[(0u32, 0u32), (1, 2), (65535, 65535), (328, 715)] {
        let packed = pack_tile(x, y);
        assert_eq!(unpack_tile(packed), (x, y));
    }
}

#[test]
fn test_packed_ordering_is_x_major() {
    // Sorting packed tiles orders by x first, then y, which the manifest
    // relies on for binary search.
    assert!(pack_tile(1, 0) > pack_tile(0, 65535));
    assert!(pack_tile(5, 10) < pack_tile(5, 11));
}

#[test]
fn test_tile_parent() {
    let t = TileCoord { z: 11, x: 328, y: 715 };
    let p = t.parent();
    assert_eq!((p.z, p.x, p.y), (10, 164, 357));
}

#[test]
fn test_mercator_bounds_intersects() {
    let a = MercatorBounds { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 10.0 };
    let b = MercatorBounds { min_x: 5.0, min_y: 5.0, max_x: 15.0, max_y: 15.0 };
    let c = MercatorBounds { min_x: 10.0, min_y: 0.0, max_x: 20.0, max_y: 10.0 };

    assert!(a.intersects(&b));
    // Touching edges do not count as intersection.
    assert!(!a.intersects(&c));
}
