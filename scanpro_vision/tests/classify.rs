use std::path::PathBuf;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use rstest::rstest;
use scanpro_core::{ClassifyError, Classifier, NormalizedGrid, ObjectClass, Renderer};
use scanpro_vision::{HeatmapRenderer, HeuristicClassifier};

fn flat_png(dir: &tempfile::TempDir, value: u8) -> PathBuf {
    let path = dir.path().join(format!("flat_{value}.png"));
    GrayImage::from_pixel(16, 12, Luma([value]))
        .save(&path)
        .unwrap();
    path
}

#[rstest]
#[case(255, ObjectClass::HighlyReflective, 0.10)]
#[case(201, ObjectClass::HighlyReflective, 0.10)]
#[case(200, ObjectClass::ModeratelyDense, 0.40)]
#[case(101, ObjectClass::ModeratelyDense, 0.40)]
#[case(100, ObjectClass::DenseOrUnknown, 0.75)]
#[case(0, ObjectClass::DenseOrUnknown, 0.75)]
fn brightness_decision_table(
    #[case] value: u8,
    #[case] object: ObjectClass,
    #[case] threat: f64,
) {
    let dir = tempfile::tempdir().unwrap();
    let r = HeuristicClassifier::new()
        .classify(&flat_png(&dir, value))
        .unwrap();
    assert_eq!(r.object, object);
    assert_eq!(r.threat_score, threat);
    assert_eq!(r.brightness, Some(f64::from(value)));
    assert_eq!(r.sharpness, 0.0);
}

#[test]
fn luma_rounding_matches_fixed_point_at_threshold() {
    // Float BT.601 gives 100.5 here and would round across the 100 threshold.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teal.png");
    RgbImage::from_pixel(8, 8, Rgb([0, 138, 171])).save(&path).unwrap();
    let r = HeuristicClassifier::new().classify(&path).unwrap();
    assert_eq!(r.brightness, Some(100.0));
    assert_eq!(r.object, ObjectClass::DenseOrUnknown);
}

#[test]
fn classification_is_pure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.png");
    RgbImage::from_fn(32, 32, |x, y| {
        let v = ((x * 37 + y * 91) % 256) as u8;
        Rgb([v, v / 2, 255 - v])
    })
    .save(&path)
    .unwrap();
    let c = HeuristicClassifier::new();
    let a = c.classify(&path).unwrap();
    let b = c.classify(&path).unwrap();
    assert_eq!(a, b);
    assert!(a.sharpness > 0.0);
}

#[test]
fn unreadable_image_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.png");
    std::fs::write(&path, b"not an image").unwrap();
    let err = HeuristicClassifier::new().classify(&path).unwrap_err();
    assert!(matches!(err, ClassifyError::ImageDecode(_)));

    let missing = dir.path().join("missing.png");
    assert!(matches!(
        HeuristicClassifier::new().classify(&missing),
        Err(ClassifyError::ImageDecode(_))
    ));
}

#[test]
fn bytes_and_files_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = flat_png(&dir, 150);
    let bytes = std::fs::read(&path).unwrap();
    let c = HeuristicClassifier::new();
    assert_eq!(c.classify_bytes(&bytes).unwrap(), c.classify(&path).unwrap());
    assert!(c.classify_bytes(b"\x89PNG junk").is_err());
}

#[test]
fn rendered_grid_with_missing_cell_classifies_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    // Same 4 x 3 grid as the normalizer test: only x = 2, y = 1 is missing.
    let grid = NormalizedGrid::from_rows(&[
        vec![0.2, 0.4, 0.6],
        vec![0.3, 0.5],
        vec![0.4, 0.6, 0.8],
        vec![0.5, 0.7, 0.9],
    ])
    .unwrap();
    assert_eq!(grid.invalid_count(), 1);
    let renderer = HeatmapRenderer::new(dir.path().join("heatmaps")).with_size(60, 80);
    let path = renderer.render(&grid).unwrap();
    assert!(path.exists());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("heatmap_") && name.ends_with(".png"), "{name}");

    // Each cell is 20 x 20 px; the missing one is painted white.
    let img = image::open(&path).unwrap().to_rgb8();
    assert_eq!(*img.get_pixel(50, 30), Rgb([255, 255, 255]));
    assert_ne!(*img.get_pixel(10, 30), Rgb([255, 255, 255]));

    let r = HeuristicClassifier::new().classify(&path).unwrap();
    let b = r.brightness.unwrap();
    assert!(b.is_finite() && b > 0.0 && b < 255.0, "brightness {b}");
    assert!(r.sharpness.is_finite());
}

#[test]
fn render_to_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let grid = NormalizedGrid::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    let path = dir.path().join("a/b/out.png");
    HeatmapRenderer::new(dir.path())
        .with_size(8, 8)
        .render_to(&grid, &path)
        .unwrap();
    let img = image::open(&path).unwrap();
    assert_eq!((img.width(), img.height()), (8, 8));
    assert!(matches!(img, DynamicImage::ImageRgb8(_)));
}
