mod common;

use anyhow::Result;
use approx::assert_abs_diff_eq;
use bbox::RectNum;
use common::{write_annotated_image, Object};
use facemask_train::{
    config::FaceDetectorConfig,
    data::{build_samples, load_annotations, train_test_split, FaceDataset, SampleOptions},
    train::face,
};
use std::{fs, path::Path};

fn options(duplicate: bool) -> SampleOptions {
    SampleOptions {
        image_size: 32,
        image_channels: 3,
        duplicate,
    }
}

fn write_two_files(dir: &Path) -> Result<()> {
    write_annotated_image(
        dir,
        "a",
        40,
        20,
        &[
            Object {
                name: "with_mask",
                bndbox: [4, 2, 20, 10],
            },
            Object {
                name: "without_mask",
                bndbox: [22, 4, 36, 18],
            },
        ],
    )?;
    write_annotated_image(
        dir,
        "b",
        30,
        30,
        &[Object {
            name: "with_mask",
            bndbox: [0, 0, 15, 15],
        }],
    )?;
    Ok(())
}

#[test]
fn duplication_controls_sample_count() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_two_files(dir.path())?;
    let records = load_annotations(dir.path().join("annotations"), dir.path().join("images"))?;
    assert_eq!(records.len(), 2);

    let samples = build_samples(&records, options(true))?;
    assert_eq!(samples.len(), 3);
    assert_eq!(
        samples.iter().map(|sample| sample.label.as_str()).collect::<Vec<_>>(),
        ["with_mask", "without_mask", "with_mask"]
    );

    let samples = build_samples(&records, options(false))?;
    assert_eq!(samples.len(), 2);
    assert_eq!(
        samples.iter().map(|sample| sample.label.as_str()).collect::<Vec<_>>(),
        ["with_mask", "with_mask"]
    );
    Ok(())
}

#[test]
fn boundaries_are_relative_to_the_original_size() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_annotated_image(
        dir.path(),
        "wide",
        200,
        100,
        &[Object {
            name: "with_mask",
            bndbox: [50, 20, 150, 80],
        }],
    )?;

    let records = load_annotations(dir.path().join("annotations"), dir.path().join("images"))?;
    let record = &records[0];
    assert_eq!(record.size.w(), 200);
    assert_eq!(record.size.h(), 100);
    assert_eq!(record.objects[0].rect.xyxy(), [50.0, 20.0, 150.0, 80.0]);

    let samples = build_samples(
        &records,
        SampleOptions {
            image_size: 224,
            image_channels: 3,
            duplicate: false,
        },
    )?;
    let [xmin, ymin, xmax, ymax] = samples[0].boundary;
    assert_abs_diff_eq!(xmin, 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(ymin, 0.20, epsilon = 1e-12);
    assert_abs_diff_eq!(xmax, 0.75, epsilon = 1e-12);
    assert_abs_diff_eq!(ymax, 0.80, epsilon = 1e-12);

    let image = &samples[0].image;
    assert_eq!(image.size(), vec![3, 224, 224]);
    assert_abs_diff_eq!(image.double_value(&[1, 10, 10]), 128.0 / 255.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn boundaries_stay_in_unit_square() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_two_files(dir.path())?;
    let records = load_annotations(dir.path().join("annotations"), dir.path().join("images"))?;

    for sample in build_samples(&records, options(true))? {
        let [xmin, ymin, xmax, ymax] = sample.boundary;
        assert!(xmin >= 0.0 && ymin >= 0.0);
        assert!(xmax <= 1.0 && ymax <= 1.0);
        assert!(xmin < xmax && ymin < ymax);
    }
    Ok(())
}

#[test]
fn one_hot_width_equals_observed_classes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_two_files(dir.path())?;
    let records = load_annotations(dir.path().join("annotations"), dir.path().join("images"))?;

    let dataset = FaceDataset::new(build_samples(&records, options(true))?)?;
    assert_eq!(dataset.num_classes(), 2);
    assert_eq!(dataset.labels.size(), vec![3, 2]);

    let dataset = FaceDataset::new(build_samples(&records, options(false))?)?;
    assert_eq!(dataset.num_classes(), 1);
    assert_eq!(dataset.labels.size(), vec![2, 1]);
    Ok(())
}

#[test]
fn split_is_reproducible() -> Result<()> {
    let first = train_test_split(37, 0.2, 694_201_337)?;
    let second = train_test_split(37, 0.2, 694_201_337)?;
    assert_eq!(first, second);
    assert_eq!(first.test.len(), 8);
    assert_eq!(first.train.len(), 29);
    Ok(())
}

#[test]
fn missing_image_aborts_loading() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_two_files(dir.path())?;
    fs::remove_file(dir.path().join("images").join("b.png"))?;

    assert!(load_annotations(dir.path().join("annotations"), dir.path().join("images")).is_err());
    Ok(())
}

#[test]
fn malformed_annotation_aborts_loading() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_two_files(dir.path())?;
    fs::write(
        dir.path().join("annotations").join("c.xml"),
        "<annotation><filename>a.png</filename>",
    )?;

    let err = load_annotations(dir.path().join("annotations"), dir.path().join("images"))
        .unwrap_err();
    assert!(format!("{:#}", err).contains("c.xml"));
    Ok(())
}

#[test]
fn inverted_box_aborts_loading() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_annotated_image(
        dir.path(),
        "inverted",
        20,
        20,
        &[Object {
            name: "with_mask",
            bndbox: [15, 2, 5, 10],
        }],
    )?;

    assert!(load_annotations(dir.path().join("annotations"), dir.path().join("images")).is_err());
    Ok(())
}

#[test]
fn empty_box_aborts_loading() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_annotated_image(
        dir.path(),
        "line",
        200,
        100,
        &[Object {
            name: "with_mask",
            bndbox: [50, 20, 50, 80],
        }],
    )?;

    let err = load_annotations(dir.path().join("annotations"), dir.path().join("images"))
        .unwrap_err();
    assert!(format!("{:#}", err).contains("line.xml"));
    Ok(())
}

#[test]
fn box_outside_the_image_aborts_loading() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_annotated_image(
        dir.path(),
        "overflow",
        200,
        100,
        &[Object {
            name: "with_mask",
            bndbox: [150, 20, 260, 80],
        }],
    )?;

    assert!(load_annotations(dir.path().join("annotations"), dir.path().join("images")).is_err());
    Ok(())
}

#[test]
fn box_touching_the_border_is_accepted() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_annotated_image(
        dir.path(),
        "full",
        200,
        100,
        &[Object {
            name: "with_mask",
            bndbox: [0, 0, 200, 100],
        }],
    )?;

    let records = load_annotations(dir.path().join("annotations"), dir.path().join("images"))?;
    assert_eq!(records[0].objects[0].rect.xyxy(), [0.0, 0.0, 200.0, 100.0]);
    Ok(())
}

#[test]
fn load_dataset_from_config() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_two_files(dir.path())?;

    let config = FaceDetectorConfig {
        input: dir.path().to_owned(),
        image_size: 32,
        duplicate: true,
        ..Default::default()
    };
    let dataset = face::load_dataset(&config)?;
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.images.size(), vec![3, 3, 32, 32]);
    assert_eq!(
        dataset.encoder.classes().iter().collect::<Vec<_>>(),
        ["with_mask", "without_mask"]
    );
    Ok(())
}
