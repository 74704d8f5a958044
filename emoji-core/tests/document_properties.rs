//! Property tests for id allocation, serialization and grid layout.

use emoji_core::{CanvasDocument, GridLayout, PlacementId, Size, Url};
use proptest::prelude::*;

fn arb_glyph() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["👙", "🌂", "👑", "👘", "👔", "👠", "a", "\"quoted\""])
        .prop_map(str::to_string)
}

fn arb_placement() -> impl Strategy<Value = (String, i64, i64, i64)> {
    (arb_glyph(), -10_000i64..10_000, -10_000i64..10_000, 1i64..500)
}

fn arb_background() -> impl Strategy<Value = Option<Url>> {
    prop_oneof![
        Just(None),
        "[a-z]{1,12}".prop_map(|name| Url::parse(&format!("https://example.com/{name}.png")).ok()),
    ]
}

proptest! {
    #[test]
    fn prop_ids_strictly_increase(placements in prop::collection::vec(arb_placement(), 0..50)) {
        let mut doc = CanvasDocument::new();
        let ids: Vec<PlacementId> = placements
            .into_iter()
            .map(|(text, x, y, size)| doc.add_placement(text, x, y, size))
            .collect();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_round_trip_preserves_fields_and_counter(
        background in arb_background(),
        placements in prop::collection::vec(arb_placement(), 0..30),
        moves in prop::collection::vec((0usize..30, -50i64..50, -50i64..50), 0..20),
    ) {
        let mut doc = CanvasDocument::new();
        doc.set_background_reference(background);
        let mut ids = Vec::new();
        for (text, x, y, size) in placements {
            ids.push(doc.add_placement(text, x, y, size));
        }
        for (index, dx, dy) in moves {
            if let Some(id) = ids.get(index) {
                doc.move_placement(*id, dx, dy);
            }
        }

        let bytes = doc.to_bytes().expect("serialize");
        let mut restored = CanvasDocument::try_from_bytes(&bytes).expect("deserialize");
        prop_assert_eq!(restored.placements(), doc.placements());
        prop_assert_eq!(restored.background_reference(), doc.background_reference());

        let max_before = doc.placements().iter().map(|p| p.id()).max();
        let next = restored.add_placement("👑", 0, 0, 40);
        if let Some(max) = max_before {
            prop_assert!(next > max);
        }
    }

    #[test]
    fn prop_unknown_id_is_noop(
        placements in prop::collection::vec(arb_placement(), 0..10),
        dx in -100i64..100,
        factor in 0.1f64..10.0,
    ) {
        let mut doc = CanvasDocument::new();
        for (text, x, y, size) in placements {
            doc.add_placement(text, x, y, size);
        }
        let before = doc.clone();
        let missing = PlacementId::new(10_000);
        prop_assert!(!doc.move_placement(missing, dx, dx));
        prop_assert!(!doc.scale_placement(missing, factor));
        prop_assert_eq!(doc, before);
    }

    #[test]
    fn prop_reciprocal_scaling_stays_bounded(size in 10i64..400, factor in 1.05f64..2.0, rounds in 1usize..200) {
        let mut doc = CanvasDocument::new();
        let id = doc.add_placement("👑", 0, 0, size);
        for _ in 0..rounds {
            doc.scale_placement(id, factor);
            doc.scale_placement(id, 1.0 / factor);
        }
        let end = doc.placement(id).map(|p| p.size).expect("placement");
        prop_assert!((end - size).abs() <= 1, "size drifted from {} to {}", size, end);
    }

    #[test]
    fn prop_grid_cells_fit_and_do_not_overlap(
        count in 0usize..40,
        width in 1.0f64..2000.0,
        height in 1.0f64..2000.0,
    ) {
        let layout = GridLayout::new(count, Size::new(width, height));
        let item = layout.item_size();
        let centers: Vec<_> = layout.locations().collect();
        prop_assert_eq!(centers.len(), count);
        prop_assert!(layout.rows() * layout.columns() >= count);

        let eps = 1e-6;
        for c in &centers {
            prop_assert!(c.x - item.width / 2.0 >= -eps && c.x + item.width / 2.0 <= width + eps);
            prop_assert!(c.y - item.height / 2.0 >= -eps && c.y + item.height / 2.0 <= height + eps);
        }
        for (i, a) in centers.iter().enumerate() {
            for b in &centers[i + 1..] {
                let apart_x = (a.x - b.x).abs() >= item.width - eps;
                let apart_y = (a.y - b.y).abs() >= item.height - eps;
                prop_assert!(apart_x || apart_y);
            }
        }
    }
}

#[test]
fn test_empty_input_decodes_to_empty_document() {
    let doc = CanvasDocument::from_bytes_or_default(&[]);
    assert!(doc.placements().is_empty());
    assert!(doc.background_reference().is_none());
}
