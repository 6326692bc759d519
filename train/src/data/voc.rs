//! Per-image XML annotations in the PASCAL VOC layout.

use crate::common::*;

/// An object entry, a pixel box labeled by class name.
pub type ObjectLabel = Label<TLBR<f64>, String>;

/// The `<annotation>` document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Annotation {
    pub filename: String,
    pub size: Size,
    #[serde(default)]
    pub object: Vec<Object>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
    pub depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Object {
    pub name: String,
    pub bndbox: BndBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BndBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Annotation {
    pub fn parse(text: &str) -> Result<Self> {
        let annotation = serde_xml_rs::from_str(text)?;
        Ok(annotation)
    }

    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read annotation file '{}'", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("failed to parse annotation file '{}'", path.display()))
    }
}

/// An annotation resolved against the image directory.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub annotation_file: PathBuf,
    pub image_file: PathBuf,
    /// The original image size declared by the annotation.
    pub size: HW<usize>,
    /// Object entries in document order.
    pub objects: Vec<ObjectLabel>,
}

impl AnnotationRecord {
    pub fn new(annotation: Annotation, annotation_file: PathBuf, image_dir: &Path) -> Result<Self> {
        let Annotation {
            filename,
            size: Size { width, height, .. },
            object,
        } = annotation;

        let size = HW::try_from_hw([height, width]).with_context(|| {
            format!(
                "invalid image size {}x{} in '{}'",
                width,
                height,
                annotation_file.display()
            )
        })?;

        let image_file = image_dir.join(&filename);
        ensure!(
            image_file.is_file(),
            "image file '{}' referenced by '{}' does not exist",
            image_file.display(),
            annotation_file.display()
        );

        let objects: Vec<_> = object
            .into_iter()
            .map(|Object { name, bndbox }| -> Result<_> {
                let BndBox {
                    xmin,
                    ymin,
                    xmax,
                    ymax,
                } = bndbox;
                let describe = || {
                    format!(
                        "invalid bounding box ({}, {}, {}, {}) of '{}' in '{}'",
                        xmin,
                        ymin,
                        xmax,
                        ymax,
                        name,
                        annotation_file.display()
                    )
                };

                let rect = TLBR::try_from_xyxy([xmin, ymin, xmax, ymax]).with_context(describe)?;
                ensure!(!rect.is_empty(), "{}: the box is empty", describe());
                ensure!(
                    rect.is_inside(height as f64, width as f64),
                    "{}: the box exceeds the {}x{} image",
                    describe(),
                    width,
                    height
                );
                Ok(Label { rect, class: name })
            })
            .try_collect()?;

        Ok(Self {
            annotation_file,
            image_file,
            size,
            objects,
        })
    }
}

/// Loads every `*.xml` file in `annotation_dir` in sorted path order.
///
/// Any unreadable document, missing field or missing image aborts the load.
pub fn load_annotations<P1, P2>(annotation_dir: P1, image_dir: P2) -> Result<Vec<AnnotationRecord>>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let annotation_dir = annotation_dir.as_ref();
    let image_dir = image_dir.as_ref();
    ensure!(
        annotation_dir.is_dir(),
        "annotation directory '{}' does not exist",
        annotation_dir.display()
    );

    super::directory::glob_sorted(annotation_dir, "*.xml")?
        .into_iter()
        .map(|path| {
            let annotation = Annotation::open(&path)?;
            AnnotationRecord::new(annotation, path, image_dir)
        })
        .try_collect()
}
