//! Integration tests rendering the sample scene files

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use umbra_render::{Frame, RenderError, RenderSettings, Renderer, SceneDescription};

fn scenes_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenes")
}

fn sample_scenes() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(scenes_dir())
        .expect("scenes directory should exist")
        .map(|entry| entry.expect("readable entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths
}

/// Render a description at a thumbnail size, keeping its other settings
fn thumbnail(description: &SceneDescription, width: u32, height: u32) -> Frame {
    let mut description = description.clone();
    description.settings = RenderSettings {
        width,
        height,
        ..description.settings
    };
    let (graph, lights) = description.build().expect("scene should build");
    Renderer::new(description.settings.clone())
        .render(
            &graph,
            &lights,
            &description.camera(),
            &AtomicBool::new(false),
        )
        .expect("render should finish")
}

#[test]
fn every_sample_scene_renders() {
    let scenes = sample_scenes();
    assert!(scenes.len() >= 3, "expected sample scenes in {:?}", scenes_dir());

    for path in scenes {
        let description = SceneDescription::load(&path)
            .unwrap_or_else(|e| panic!("{} failed to load: {e}", path.display()));
        let frame = thumbnail(&description, 24, 16);

        assert_eq!(frame.stats.total(), 24 * 16, "{}", path.display());
        assert!(frame.stats.hits > 0, "{} rendered no geometry", path.display());
        assert!(
            frame.colour.iter().all(|c| c.is_finite()),
            "{} produced non-finite colour",
            path.display()
        );
    }
}

#[test]
fn sample_scenes_need_no_normalization() {
    for path in sample_scenes() {
        let (graph, _) = SceneDescription::load(&path).unwrap().build().unwrap();
        assert!(
            graph.normalizations().is_empty(),
            "{}: {:?}",
            path.display(),
            graph.normalizations()
        );
    }
}

#[test]
fn barrel_file_matches_builtin_demo() {
    let from_file = SceneDescription::load(scenes_dir().join("barrel.json")).unwrap();
    let demo = SceneDescription::demo();

    let a = thumbnail(&from_file, 16, 9);
    let b = thumbnail(&demo, 16, 9);

    assert_eq!(a.stats, b.stats);
    for (x, y) in a.colour.iter().zip(&b.colour) {
        assert!((*x - *y).abs().max_element() < 1e-3);
    }
}

#[test]
fn cancelled_scene_render_reports_cancellation() {
    let description = SceneDescription::demo();
    let (graph, lights) = description.build().unwrap();
    let result = Renderer::new(RenderSettings {
        width: 8,
        height: 8,
        ..RenderSettings::default()
    })
    .render(
        &graph,
        &lights,
        &description.camera(),
        &AtomicBool::new(true),
    );
    assert!(matches!(result, Err(RenderError::Cancelled)));
}

#[test]
fn frame_passes_save_as_png() {
    let frame = thumbnail(&SceneDescription::demo(), 20, 10);
    let dir = std::env::temp_dir().join(format!("umbra-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let colour = dir.join("colour.png");
    let depth = dir.join("depth.png");
    let normals = dir.join("normals.png");
    frame.save_png(&colour).unwrap();
    frame.depth_image().save(&depth).unwrap();
    frame.normal_image().save(&normals).unwrap();

    for path in [&colour, &depth, &normals] {
        let image = image::open(path).expect("written image should decode");
        assert_eq!((image.width(), image.height()), (20, 10));
    }

    std::fs::remove_dir_all(&dir).ok();
}
