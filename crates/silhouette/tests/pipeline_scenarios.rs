use image::{Rgba, RgbaImage};
use silhouette::{
    ContourExtractor, ExternalContourExtractor, ForegroundSegmenter, Pipeline, SilhouetteError,
    ThresholdSegmenter, normalize, normalize_tree,
};

const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[test]
fn transparent_image_has_no_foreground() {
    let image = RgbaImage::new(10, 10);
    let mask = ThresholdSegmenter::default().segment(&image);
    assert_eq!(mask.foreground_count(), 0);
    assert!(matches!(normalize(&mask, 0), Err(SilhouetteError::EmptyForeground)));
}

#[test]
fn small_square_becomes_four_corner_contour() {
    let mut image = RgbaImage::new(4, 4);
    for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
        image.put_pixel(x, y, OPAQUE_BLACK);
    }

    let mask = ThresholdSegmenter::default().segment(&image);
    assert_eq!(mask.foreground_count(), 4);
    for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
        assert!(mask.is_foreground(x, y));
    }

    let canonical = normalize(&mask, 0).expect("Should normalize");
    assert_eq!(canonical.side(), 2);
    assert_eq!(canonical.foreground_count(), 4);

    let contours: Vec<_> = ExternalContourExtractor
        .extract_contours(canonical.as_gray())
        .expect("Should find a contour")
        .collect();
    assert_eq!(contours.len(), 1);
    let mut corners = contours[0].points.clone();
    corners.sort();
    assert_eq!(corners, vec![[0, 0], [0, 1], [1, 0], [1, 1]]);
}

#[test]
fn two_blobs_yield_two_contours() {
    let mut image = RgbaImage::new(20, 12);
    for y in 1..5 {
        for x in 1..6 {
            image.put_pixel(x, y, OPAQUE_BLACK);
        }
    }
    for y in 6..11 {
        for x in 10..18 {
            image.put_pixel(x, y, OPAQUE_BLACK);
        }
    }

    let output = Pipeline::builder().build().process(&image).expect("Should process");
    assert_eq!(output.contours.len(), 2);
    assert!(output.contours.iter().all(|c| c.len() == 4));
}

#[test]
fn canonical_output_is_square_and_contains_all_content() {
    let mut image = RgbaImage::from_pixel(30, 17, Rgba([250, 250, 250, 255]));
    let subject = [(3, 2), (4, 2), (20, 9), (27, 14), (12, 5)];
    for &(x, y) in &subject {
        image.put_pixel(x, y, Rgba([90, 10, 200, 255]));
    }

    let canonical = Pipeline::builder().padding(1).build().normalize(&image).expect("Should normalize");
    assert_eq!(canonical.width(), canonical.height());
    assert_eq!(canonical.foreground_count(), subject.len());
    // 25 wide content + 2 padding
    assert_eq!(canonical.side(), 27);
}

#[test]
fn normalize_tree_mirrors_directory_layout() {
    let input = tempfile::tempdir().expect("Temp dir");
    let output = tempfile::tempdir().expect("Temp dir");

    let nested = input.path().join("evil");
    std::fs::create_dir_all(&nested).expect("Create dir");

    let mut subject = RgbaImage::new(5, 5);
    subject.put_pixel(2, 2, OPAQUE_BLACK);
    subject.put_pixel(3, 2, OPAQUE_BLACK);
    subject.save(nested.join("imp.png")).expect("Write input");
    RgbaImage::new(5, 5).save(input.path().join("blank.png")).expect("Write input");
    std::fs::write(input.path().join("notes.txt"), "ignored").expect("Write input");

    let report = normalize_tree(
        &Pipeline::builder().build(),
        input.path(),
        output.path(),
        &["png".to_string()],
    )
    .expect("Should walk tree");

    assert_eq!(report.converted, vec![output.path().join("evil/imp.png")]);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("blank.png"));

    let written = image::open(output.path().join("evil/imp.png")).expect("Readable").to_rgba8();
    assert_eq!(written.dimensions(), (2, 2));
}
