//! Property tests for the packed tile layout and the grid that stores it.

use proptest::prelude::*;
use taiga_grid::prelude::*;

fn biome_strategy() -> impl Strategy<Value = Biome> {
    prop::sample::select(Biome::ALL.to_vec())
}

/// A raw handle that fits `kind`, with `0` meaning an empty slot.
fn slot_strategy(kind: SlotKind) -> impl Strategy<Value = u32> {
    0..=kind.max_handle()
}

fn tile_strategy() -> impl Strategy<Value = (Biome, [u32; 4])> {
    (
        biome_strategy(),
        slot_strategy(SlotKind::Player),
        slot_strategy(SlotKind::Npc),
        slot_strategy(SlotKind::Item),
        slot_strategy(SlotKind::Flora),
    )
        .prop_map(|(b, p, n, i, f)| (b, [p, n, i, f]))
}

fn build(biome: Biome, raws: [u32; 4]) -> Tile {
    let mut tile = Tile::new(biome);
    for (kind, raw) in SlotKind::ALL.into_iter().zip(raws) {
        tile.set_slot(kind, Handle::from_raw(raw)).unwrap();
    }
    tile
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn packed_tiles_keep_every_field((biome, raws) in tile_strategy()) {
        let tile = build(biome, raws);
        let decoded = Tile::decode(&tile.encode());
        prop_assert_eq!(decoded, tile);
        prop_assert_eq!(decoded.biome(), biome);
        for (kind, raw) in SlotKind::ALL.into_iter().zip(raws) {
            prop_assert_eq!(decoded.slot(kind).map_or(0, Handle::raw), raw);
        }
        prop_assert_eq!(decoded.is_vacant(), raws == [0; 4]);
    }

    #[test]
    fn oversized_handles_are_rejected(
        kind in prop::sample::select(vec![SlotKind::Player, SlotKind::Npc]),
        excess in 1u32..1000,
    ) {
        let raw = kind.max_handle() + excess;
        let mut tile = Tile::new(Biome::Boreal);
        let err = tile.set_slot(kind, Handle::from_raw(raw)).unwrap_err();
        prop_assert_eq!(
            err,
            GridError::HandleOutOfRange { kind, handle: raw, max: kind.max_handle() }
        );
        prop_assert!(tile.is_vacant(), "a rejected write leaves the tile alone");
    }

    #[test]
    fn grid_writes_only_touch_their_cell(
        width in 1i32..24,
        height in 1i32..24,
        x in -4i32..28,
        y in -4i32..28,
        (biome, raws) in tile_strategy(),
    ) {
        let mut grid = Grid::new(width, height);
        let before = grid.digest();
        let at = Coord::new(x, y);
        let tile = build(biome, raws);
        let written = grid.write(at, tile);
        prop_assert_eq!(written, grid.in_bounds(at));
        if written {
            prop_assert_eq!(grid.at(at), Some(tile));
            let others_untouched = grid
                .within(Rect::from_corners(Coord::new(0, 0), Coord::new(width - 1, height - 1)))
                .filter(|(c, _)| *c != at)
                .all(|(_, t)| t == Tile::default());
            prop_assert!(others_untouched);
        } else {
            prop_assert_eq!(grid.at(at), None);
            prop_assert_eq!(grid.digest(), before);
        }
    }
}
