#![allow(dead_code)]

use anyhow::Result;
use image::{Rgb, RgbImage};
use std::{fs, path::Path};

/// An object entry written into an annotation file.
pub struct Object<'a> {
    pub name: &'a str,
    pub bndbox: [u32; 4],
}

/// Writes `annotations/<stem>.xml` and a solid `images/<stem>.png` of `width x height`.
pub fn write_annotated_image(
    dataset_dir: &Path,
    stem: &str,
    width: u32,
    height: u32,
    objects: &[Object<'_>],
) -> Result<()> {
    let image_dir = dataset_dir.join("images");
    let annotation_dir = dataset_dir.join("annotations");
    fs::create_dir_all(&image_dir)?;
    fs::create_dir_all(&annotation_dir)?;

    let filename = format!("{}.png", stem);
    RgbImage::from_pixel(width, height, Rgb([64, 128, 192])).save(image_dir.join(&filename))?;

    let objects: String = objects
        .iter()
        .map(|object| {
            let [xmin, ymin, xmax, ymax] = object.bndbox;
            format!(
                "<object><name>{}</name><pose>Unspecified</pose><bndbox>\
                 <xmin>{}</xmin><ymin>{}</ymin><xmax>{}</xmax><ymax>{}</ymax>\
                 </bndbox></object>",
                object.name, xmin, ymin, xmax, ymax
            )
        })
        .collect();
    let document = format!(
        "<annotation><folder>images</folder><filename>{}</filename>\
         <size><width>{}</width><height>{}</height><depth>3</depth></size>\
         <segmented>0</segmented>{}</annotation>",
        filename, width, height, objects
    );
    fs::write(annotation_dir.join(format!("{}.xml", stem)), document)?;
    Ok(())
}

/// Writes `count` solid images of `value` into `dir/class`.
pub fn write_class_images(dir: &Path, class: &str, count: usize, value: u8) -> Result<()> {
    let class_dir = dir.join(class);
    fs::create_dir_all(&class_dir)?;
    for index in 0..count {
        RgbImage::from_pixel(16, 16, Rgb([value, value, value]))
            .save(class_dir.join(format!("{:03}.png", index)))?;
    }
    Ok(())
}
