//! Shadow Atlas Tests
//!
//! Tests for:
//! - TextureLayout placement order and exact-fit behaviour
//! - Allocations never overlap and stay inside the atlas
//! - Size rounding to the layout granularity

use penumbra::renderer::command::Rect;
use penumbra::renderer::shadow::atlas::TextureLayout;

fn place_all(layout: &mut TextureLayout, sizes: &[u32]) -> Vec<Rect> {
    sizes
        .iter()
        .filter_map(|&size| {
            layout
                .add_element(size, size)
                .map(|(x, y)| Rect::new(x, y, size, size))
        })
        .collect()
}

// ============================================================================
// Placement
// ============================================================================

#[test]
fn four_quarter_tiles_fill_the_atlas() {
    let mut layout = TextureLayout::new(1, 1, 2048, 2048);

    let placed: Vec<_> = (0..4).map(|_| layout.add_element(1024, 1024)).collect();
    assert_eq!(
        placed,
        vec![
            Some((0, 0)),
            Some((1024, 0)),
            Some((0, 1024)),
            Some((1024, 1024)),
        ]
    );
    assert_eq!(layout.add_element(1, 1), None);
}

#[test]
fn oversized_element_is_rejected() {
    let mut layout = TextureLayout::new(1, 1, 2048, 2048);
    assert_eq!(layout.add_element(2049, 16), None);
    assert_eq!(layout.add_element(16, 4096), None);
    // A failed insert leaves the layout untouched.
    assert_eq!(layout.add_element(2048, 2048), Some((0, 0)));
}

#[test]
fn large_tile_leaves_no_room_for_a_second_large_tile() {
    let mut layout = TextureLayout::new(1, 1, 2048, 2048);
    assert!(layout.add_element(1510, 1510).is_some());
    assert_eq!(layout.add_element(1510, 1510), None);
    assert_eq!(layout.add_element(610, 610), None);
    assert!(layout.add_element(238, 238).is_some());
}

#[test]
fn sizes_round_up_to_granularity() {
    let mut layout = TextureLayout::new(8, 8, 32, 32);
    assert_eq!(layout.add_element(5, 5), Some((0, 0)));
    // The first element occupied a full 8x8 cell.
    assert_eq!(layout.add_element(8, 8), Some((8, 0)));
}

#[test]
fn size_reports_layout_extent() {
    let layout = TextureLayout::new(1, 1, 1024, 512);
    assert_eq!(layout.size(), (1024, 512));
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn allocations_never_overlap() {
    let mut layout = TextureLayout::new(1, 1, 2048, 2048);
    let sizes = [
        810, 522, 522, 310, 310, 310, 138, 138, 1010, 74, 74, 42, 42, 42, 266, 600, 90, 33,
    ];
    let placed = place_all(&mut layout, &sizes);
    assert!(placed.len() > 4);

    for (i, a) in placed.iter().enumerate() {
        assert!(a.right() <= 2048 && a.bottom() <= 2048, "tile {a:?} leaves atlas");
        for b in &placed[i + 1..] {
            assert!(!a.overlaps(b), "tiles overlap: {a:?} and {b:?}");
        }
    }
}

#[test]
fn descending_sizes_pack_without_overlap() {
    let mut layout = TextureLayout::new(1, 1, 1024, 1024);
    let mut sizes: Vec<u32> = (1..=40).map(|i| 10 + (i * 37) % 300).collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));

    let placed = place_all(&mut layout, &sizes);
    let area: u32 = placed.iter().map(|r| r.width * r.height).sum();
    assert!(area <= 1024 * 1024);

    for (i, a) in placed.iter().enumerate() {
        for b in &placed[i + 1..] {
            assert!(!a.overlaps(b));
        }
    }
}
