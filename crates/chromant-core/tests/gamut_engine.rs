//! End-to-end gamut engine tests: generation, persistence, sharing, mapping.
//!
//! Run with: `cargo test -p chromant-core --test gamut_engine`

use std::sync::Arc;

use glam::Vec3;

use chromant_core::gamut::cache;
use chromant_core::{
    ColorRegistry, Converter, GamutConfig, GamutMapper, GamutStore, LocusDataset, PerceptualModel,
};

/// Small grids keep generation fast.
fn test_config() -> GamutConfig {
    GamutConfig {
        cache_dir: None,
        resolution_j: 32,
        resolution_s: 16,
        resolution_h: 73,
        edge_samples: 32,
        search_step: 0.005,
    }
}

fn store(config: GamutConfig) -> GamutStore {
    GamutStore::new(Arc::new(ColorRegistry::builtin()), config)
}

#[test]
fn test_saturation_limit_is_bounded_by_edge() {
    let store = store(test_config());
    for model in PerceptualModel::ALL {
        for space in ["sRGB", "Rec2020"] {
            let table = store.table(model, space);
            assert!(!table.is_empty(), "{model}_{space}");

            for hi in 0..=40 {
                let h = hi as f32 / 40.0;
                let (_, s_edge) = table.lightness_edge_js(h);
                for ji in 0..=20 {
                    let j = ji as f32 / 20.0;
                    let s = table.saturation_limit(j, h);
                    assert!(s >= 0.0, "{model}_{space} J={j} h={h}");
                    assert!(s <= s_edge + 1e-5, "{model}_{space} J={j} h={h}: {s} > {s_edge}");
                }
            }
        }
    }
}

#[test]
fn test_lightness_limit_is_white_at_zero_saturation() {
    let store = store(test_config());
    let table = store.table(PerceptualModel::Appearance, "sRGB");
    for hi in 0..=10 {
        let h = hi as f32 / 10.0;
        assert!((table.lightness_limit(0.0, h) - 1.0).abs() < 1e-6);
        // Beyond the edge saturation the limit is the edge lightness.
        let (j_edge, s_edge) = table.lightness_edge_js(h);
        assert!((table.lightness_limit(s_edge * 2.0, h) - j_edge).abs() < 1e-6);
    }
}

#[test]
fn test_concurrent_requests_share_one_table() {
    let store = store(test_config());
    let tables: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| store.table(PerceptualModel::LightnessChroma, "sRGB")))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for table in &tables[1..] {
        assert!(Arc::ptr_eq(&tables[0], table));
    }
}

#[test]
fn test_cache_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config().with_cache_dir(dir.path());

    let generated = store(config.clone()).table(PerceptualModel::Appearance, "DisplayP3");
    let loaded = cache::load_table(
        dir.path(),
        PerceptualModel::Appearance,
        "DisplayP3",
        generated.resolution(),
    )
    .unwrap();
    assert_eq!(*generated, loaded);
}

#[test]
fn test_corrupt_cache_file_is_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config().with_cache_dir(dir.path());
    let path = cache::cache_path(dir.path(), PerceptualModel::LightnessChroma, "sRGB");
    std::fs::write(&path, "<GamutTable version=\"1\"><Model>Lab").unwrap();

    let table = store(config.clone()).table(PerceptualModel::LightnessChroma, "sRGB");
    assert!(!table.is_empty());

    // The bad file was replaced by a loadable one.
    let reloaded = cache::load_table(
        dir.path(),
        PerceptualModel::LightnessChroma,
        "sRGB",
        table.resolution(),
    )
    .unwrap();
    assert_eq!(*table, reloaded);
}

#[test]
fn test_resolution_change_invalidates_cache() {
    let dir = tempfile::tempdir().unwrap();
    let coarse = test_config()
        .with_cache_dir(dir.path())
        .with_resolution(8, 4, 13);
    let fine = test_config().with_cache_dir(dir.path());

    let first = store(coarse).table(PerceptualModel::LightnessChroma, "AdobeRGB");
    let second = store(fine).table(PerceptualModel::LightnessChroma, "AdobeRGB");
    assert_eq!(first.resolution(), (8, 4, 13));
    assert_eq!(second.resolution(), (32, 16, 73));
}

#[test]
fn test_mapped_wide_gamut_colors_land_in_srgb() {
    let registry = Arc::new(ColorRegistry::builtin());
    let store = GamutStore::with_locus(registry.clone(), test_config(), LocusDataset::empty());

    let prophoto = registry.matrix_cs_to_xyz("ProPhoto").unwrap();
    let d50_to_d65 = registry.cat("D50", "D65").unwrap();
    let to_srgb = registry.matrix_xyz_to_cs("sRGB").unwrap();

    for model in PerceptualModel::ALL {
        let converter = Converter::new(model, &registry, "D65", "D65").unwrap();
        let mapper = GamutMapper::new(store.table(model, "sRGB")).unwrap();

        for r in 0..6 {
            for g in 0..6 {
                for b in 0..6 {
                    let rgb = Vec3::new(r as f32, g as f32, b as f32) / 5.0;
                    let xyz = d50_to_d65.apply_f32(prophoto.apply_f32(rgb));

                    let mapped = mapper.map(converter.to_jsh(xyz));
                    let out = to_srgb.apply_f32(converter.to_xyz(mapped));
                    assert!(
                        out.min_element() > -0.02 && out.max_element() < 1.02,
                        "{model}: {rgb:?} -> {out:?}"
                    );
                }
            }
        }
    }
}
