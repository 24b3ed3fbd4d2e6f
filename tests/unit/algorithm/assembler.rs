//! Tests for grid planning, reuse policies, cancellation and compositing

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgba, RgbaImage};
    use photomosaic::algorithm::assembler::{
        Assembler, MosaicConfig, ReusePolicy, cell_rng,
    };
    use photomosaic::algorithm::matcher::MatchConfig;
    use photomosaic::algorithm::store::SignatureStore;
    use photomosaic::analysis::signature::Signature;
    use photomosaic::math::color::ColorSample;
    use photomosaic::{MosaicError, Result};
    use rand::Rng;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    /// Four-pixel target whose pixels are exactly the cell colors of a 2×2 grid
    fn quad_target() -> DynamicImage {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, Rgba(RED));
        image.put_pixel(1, 0, Rgba(GREEN));
        image.put_pixel(0, 1, Rgba(BLUE));
        image.put_pixel(1, 1, Rgba(WHITE));
        DynamicImage::ImageRgba8(image)
    }

    fn color_store(accuracy: u32) -> SignatureStore {
        let entries = [("red", RED), ("green", GREEN), ("blue", BLUE), ("white", WHITE)]
            .into_iter()
            .map(|(id, [r, g, b, _])| {
                (
                    id.to_string(),
                    Signature::uniform(ColorSample::rgb(r, g, b), accuracy),
                )
            });
        let Ok(store) = SignatureStore::from_entries(accuracy, entries) else {
            unreachable!("test store rejected");
        };
        store
    }

    fn grey_store(count: usize) -> SignatureStore {
        let entries = (0..count).map(|i| {
            (
                format!("grey_{i}"),
                Signature::uniform(ColorSample::rgb(90, 90, 90), 1),
            )
        });
        let Ok(store) = SignatureStore::from_entries(1, entries) else {
            unreachable!("test store rejected");
        };
        store
    }

    fn nearest_config() -> MosaicConfig {
        MosaicConfig {
            columns: 2,
            rows: 2,
            accuracy: 1,
            matching: MatchConfig {
                min_pool: 1,
                ..MatchConfig::default()
            },
            ..MosaicConfig::default()
        }
    }

    fn solid_tile(id: &str) -> Result<DynamicImage> {
        let color = match id {
            "red" => RED,
            "green" => GREEN,
            "blue" => BLUE,
            "white" => WHITE,
            _ => [0, 0, 0, 255],
        };
        // Non-square so every tile goes through the crop step
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            12,
            7,
            Rgba(color),
        )))
    }

    fn assert_pixel_near(image: &RgbaImage, x: u32, y: u32, expected: [u8; 4]) {
        let actual = image.get_pixel(x, y).0;
        for (a, e) in actual.iter().zip(expected) {
            assert!(a.abs_diff(e) <= 1, "pixel ({x}, {y}) is {actual:?}, expected {expected:?}");
        }
    }

    // Tests zero-valued parameters are rejected up front
    // Verified by removing the accuracy check
    #[test]
    fn test_config_validation() {
        assert!(MosaicConfig::default().validate().is_ok());
        for config in [
            MosaicConfig {
                columns: 0,
                ..MosaicConfig::default()
            },
            MosaicConfig {
                rows: 0,
                ..MosaicConfig::default()
            },
            MosaicConfig {
                accuracy: 0,
                ..MosaicConfig::default()
            },
            MosaicConfig {
                scale: 0,
                ..MosaicConfig::default()
            },
        ] {
            assert!(matches!(
                config.validate(),
                Err(MosaicError::InvalidParameter { .. })
            ));
        }
    }

    // Tests scale multiplies the canvas and is bounded
    // Verified by ignoring scale in the geometry
    #[test]
    fn test_geometry_for_scale() {
        let config = MosaicConfig {
            columns: 4,
            rows: 2,
            scale: 3,
            ..MosaicConfig::default()
        };
        let Ok(geometry) = config.geometry_for(40, 20) else {
            unreachable!("valid geometry rejected");
        };
        assert_eq!((geometry.width(), geometry.height()), (120, 60));
        assert_eq!((geometry.cell_width(), geometry.cell_height()), (30, 30));

        let oversized = MosaicConfig {
            scale: 2,
            ..config
        };
        assert!(matches!(
            oversized.geometry_for(40_000, 20),
            Err(MosaicError::InvalidParameter {
                parameter: "scale",
                ..
            })
        ));
    }

    // Tests the working copy has one accuracy block per cell
    // Verified by sizing the working copy to the grid alone
    #[test]
    fn test_working_copy_size() {
        let assembler = Assembler::new(MosaicConfig {
            columns: 5,
            rows: 3,
            accuracy: 4,
            ..MosaicConfig::default()
        });
        let target = DynamicImage::ImageRgba8(RgbaImage::new(100, 60));
        let working = assembler.working_copy(&target);
        assert_eq!(working.dimensions(), (20, 12));

        let signature = assembler.cell_signature(&working, 4, 2);
        assert!(signature.matches_accuracy(4));
    }

    // Tests each cell receives its exact color when the pool is one
    // Verified by reading cell signatures column-major
    #[test]
    fn test_plan_nearest_colors() {
        let assembler = Assembler::new(nearest_config());
        let Ok(plan) = assembler.plan(&quad_target(), &color_store(1)) else {
            unreachable!("planning failed");
        };
        assert_eq!(plan.candidate_at(0, 0), Some(0));
        assert_eq!(plan.candidate_at(1, 0), Some(1));
        assert_eq!(plan.candidate_at(0, 1), Some(2));
        assert_eq!(plan.candidate_at(1, 1), Some(3));
        assert_eq!(plan.candidate_at(2, 0), None);
        assert_eq!(plan.distinct_candidates(), 4);
    }

    // Tests equal seeds give equal plans despite parallel matching
    // Verified by sharing one generator across worker threads
    #[test]
    fn test_plan_reproducible_with_seed() {
        let config = MosaicConfig {
            columns: 6,
            rows: 4,
            accuracy: 1,
            seed: 17,
            ..MosaicConfig::default()
        };
        let target = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 4, Rgba([90, 90, 90, 255])));
        let store = grey_store(8);

        let first = Assembler::new(config).plan(&target, &store);
        let second = Assembler::new(config).plan(&target, &store);
        let (Ok(first), Ok(second)) = (first, second) else {
            unreachable!("planning failed");
        };
        assert_eq!(first.assignments, second.assignments);
        // Eight equal candidates over 24 cells should not collapse to one
        assert!(first.distinct_candidates() > 1);
    }

    // Tests per-cell generators are stable and distinct
    // Verified by ignoring the cell index
    #[test]
    fn test_cell_rng() {
        let a: u64 = cell_rng(5, 3).random();
        let b: u64 = cell_rng(5, 3).random();
        let c: u64 = cell_rng(5, 4).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    // Tests exclusive mode uses every candidate before repeating any
    // Verified by never releasing consumed candidates
    #[test]
    fn test_exclusive_rotation() {
        let config = MosaicConfig {
            columns: 4,
            rows: 2,
            accuracy: 1,
            reuse: ReusePolicy::Exclusive,
            seed: 11,
            matching: MatchConfig {
                min_pool: 1,
                ..MatchConfig::default()
            },
            ..MosaicConfig::default()
        };
        let target = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([90, 90, 90, 255])));
        let Ok(plan) = Assembler::new(config).plan(&target, &grey_store(4)) else {
            unreachable!("exclusive planning failed");
        };

        for row in plan.assignments.rows() {
            let mut used: Vec<usize> = row.iter().copied().collect();
            used.sort_unstable();
            assert_eq!(used, vec![0, 1, 2, 3]);
        }
    }

    // Tests exclusive mode releases candidates when the pool runs low
    // Verified by erroring once the available count drops below the pool size
    #[test]
    fn test_exclusive_releases_when_low() {
        let config = MosaicConfig {
            columns: 3,
            rows: 3,
            accuracy: 1,
            reuse: ReusePolicy::Exclusive,
            ..MosaicConfig::default()
        };
        let target = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([90, 90, 90, 255])));
        let result = Assembler::new(config).plan(&target, &grey_store(4));
        assert!(result.is_ok());
    }

    // Tests a raised flag stops planning before any cell
    // Verified by checking the flag only after matching
    #[test]
    fn test_cancellation() {
        let flag = Arc::new(AtomicBool::new(true));
        for reuse in [ReusePolicy::Reuse, ReusePolicy::Exclusive] {
            let assembler = Assembler::new(MosaicConfig {
                reuse,
                ..nearest_config()
            })
            .with_cancellation(Arc::clone(&flag));
            let result = assembler.plan(&quad_target(), &color_store(1));
            assert!(matches!(
                result,
                Err(MosaicError::Cancelled {
                    completed: 0,
                    total: 4
                })
            ));
        }
    }

    // Tests a store built at another accuracy is refused
    // Verified by letting the matcher report each cell
    #[test]
    fn test_store_accuracy_mismatch() {
        let assembler = Assembler::new(MosaicConfig {
            accuracy: 2,
            ..nearest_config()
        });
        let result = assembler.plan(&quad_target(), &color_store(1));
        assert!(matches!(
            result,
            Err(MosaicError::SignatureMismatch {
                expected: 4,
                found: 1,
                ..
            })
        ));
    }

    // Tests pool exhaustion names the failing cell
    // Verified by dropping the cell context
    #[test]
    fn test_exhaustion_reports_cell() {
        let assembler = Assembler::new(MosaicConfig {
            matching: MatchConfig::default(),
            ..nearest_config()
        });
        let Ok(store) = SignatureStore::from_entries(
            1,
            vec![("only".to_string(), Signature::uniform(ColorSample::rgb(0, 0, 0), 1))],
        ) else {
            unreachable!("test store rejected");
        };
        let result = assembler.plan(&quad_target(), &store);
        assert!(matches!(
            result,
            Err(MosaicError::PoolExhausted { cell: Some(_), .. })
        ));
    }

    // Tests rendered tiles fill their cells at the scaled size
    // Verified by pasting tiles at unscaled offsets
    #[test]
    fn test_render_places_tiles() {
        let assembler = Assembler::new(MosaicConfig {
            scale: 10,
            ..nearest_config()
        });
        let store = color_store(1);
        let Ok(canvas) = assembler.assemble(&quad_target(), &store, &solid_tile) else {
            unreachable!("assembly failed");
        };

        assert_eq!(canvas.dimensions(), (20, 20));
        assert_pixel_near(&canvas, 5, 5, RED);
        assert_pixel_near(&canvas, 15, 5, GREEN);
        assert_pixel_near(&canvas, 5, 15, BLUE);
        assert_pixel_near(&canvas, 15, 15, WHITE);
        assert_pixel_near(&canvas, 19, 19, WHITE);
    }

    // Tests unreadable tiles leave their cells transparent
    // Verified by propagating the load error
    #[test]
    fn test_render_skips_unreadable_tiles() {
        let assembler = Assembler::new(MosaicConfig {
            scale: 4,
            ..nearest_config()
        });
        let store = color_store(1);
        let Ok(plan) = assembler.plan(&quad_target(), &store) else {
            unreachable!("planning failed");
        };

        let tiles = |id: &str| -> Result<DynamicImage> {
            if id == "white" {
                return Err(MosaicError::UnknownCandidate {
                    index: 3,
                    store_size: 4,
                });
            }
            solid_tile(id)
        };
        let Ok(canvas) = assembler.render(&plan, &store, &tiles) else {
            unreachable!("rendering failed");
        };

        assert_eq!(canvas.get_pixel(6, 6).0, [0, 0, 0, 0]);
        assert_pixel_near(&canvas, 1, 1, RED);
    }

    // Tests every planned candidate is loaded exactly once
    // Verified by loading the tile again for each cell
    #[test]
    fn test_render_loads_each_tile_once() {
        let config = MosaicConfig {
            columns: 5,
            rows: 4,
            accuracy: 1,
            scale: 3,
            seed: 21,
            ..MosaicConfig::default()
        };
        let target = DynamicImage::ImageRgba8(RgbaImage::from_pixel(11, 9, Rgba([90, 90, 90, 255])));
        let store = grey_store(4);
        let assembler = Assembler::new(config);
        let Ok(plan) = assembler.plan(&target, &store) else {
            unreachable!("planning failed");
        };

        let loads: RefCell<HashMap<String, usize>> = RefCell::new(HashMap::new());
        let tiles = |id: &str| -> Result<DynamicImage> {
            *loads.borrow_mut().entry(id.to_string()).or_insert(0) += 1;
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                9,
                5,
                Rgba([90, 90, 90, 255]),
            )))
        };
        let Ok(canvas) = assembler.render(&plan, &store, &tiles) else {
            unreachable!("rendering failed");
        };

        let loads = loads.into_inner();
        // Twenty cells reuse four candidates, so repeated loads would show up
        assert_eq!(loads.len(), plan.distinct_candidates());
        assert!(loads.values().all(|&count| count == 1), "{loads:?}");
        // Remainder cells in the last row and column are filled too
        assert_eq!(canvas.dimensions(), (33, 27));
        assert_pixel_near(&canvas, 32, 26, [90, 90, 90, 255]);
    }
}
