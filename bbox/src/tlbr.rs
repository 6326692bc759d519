use super::Rect;
use crate::{common::*, Transform, HW};

/// Bounding box in TLBR format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + Num,
{
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        TLBR {
            t: self.t * transform.sy + transform.ty,
            l: self.l * transform.sx + transform.tx,
            b: self.b * transform.sy + transform.ty,
            r: self.r * transform.sx + transform.tx,
        }
    }
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Maps a pixel box on an `image_size` image to ratio units.
    ///
    /// The box is first stretched onto a `target x target` canvas, then each
    /// coordinate is divided by `target`, i.e. `(raw * scale) / target`. The
    /// outcome equals `raw / image_dimension` up to floating point rounding.
    pub fn to_ratio(&self, image_size: &HW<T>, target: T) -> Self {
        let canvas = HW::square(target);
        let scaled = self.transform(&Transform::from_sizes_exact(image_size, &canvas));

        TLBR {
            t: scaled.t / target,
            l: scaled.l / target,
            b: scaled.b / target,
            r: scaled.r / target,
        }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;
    use approx::assert_abs_diff_eq;

    #[test]
    fn xyxy_order() {
        let bbox = TLBR::try_from_xyxy([50.0, 20.0, 150.0, 80.0]).unwrap();
        assert_eq!(
            [bbox.t(), bbox.l(), bbox.b(), bbox.r()],
            [20.0, 50.0, 80.0, 150.0]
        );
        assert_eq!(bbox.xyxy(), [50.0, 20.0, 150.0, 80.0]);
        assert!(TLBR::try_from_xyxy([150.0, 20.0, 50.0, 80.0]).is_err());
    }

    #[test]
    fn degenerate_and_outside_boxes() {
        let line = TLBR::try_from_xyxy([50.0, 20.0, 50.0, 80.0]).unwrap();
        assert!(line.is_empty());
        assert!(!TLBR::try_from_xyxy([50.0, 20.0, 51.0, 80.0]).unwrap().is_empty());

        let outside = TLBR::try_from_xyxy([150.0, 20.0, 260.0, 80.0]).unwrap();
        assert!(!outside.is_inside(100.0, 200.0));
        let edge = TLBR::try_from_xyxy([0.0, 0.0, 200.0, 100.0]).unwrap();
        assert!(edge.is_inside(100.0, 200.0));
    }

    #[test]
    fn ratio_of_wide_image() {
        let size = HW::from_hw([100.0, 200.0]);
        let bbox = TLBR::try_from_xyxy([50.0, 20.0, 150.0, 80.0]).unwrap();
        let [xmin, ymin, xmax, ymax] = bbox.to_ratio(&size, 224.0).xyxy();

        assert_abs_diff_eq!(xmin, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(ymin, 0.20, epsilon = 1e-12);
        assert_abs_diff_eq!(xmax, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(ymax, 0.80, epsilon = 1e-12);
    }

    #[test]
    fn ratio_matches_plain_division_up_to_rounding() {
        // the scale-then-divide path and `raw / dim` may differ in the last ulp
        let sizes = [(333.0, 517.0), (1.0, 1.0), (480.0, 640.0), (97.0, 13.0)];

        for &(h, w) in &sizes {
            let size = HW::from_hw([h, w]);
            let bbox = TLBR::try_from_xyxy([0.0, 0.0, w * 0.37, h * 0.91]).unwrap();

            for &target in &[224.0, 300.0, 17.0] {
                let ratio = bbox.to_ratio(&size, target);
                let [xmin, ymin, xmax, ymax] = bbox.xyxy();
                assert_abs_diff_eq!(ratio.l(), xmin / w, epsilon = 1e-12);
                assert_abs_diff_eq!(ratio.t(), ymin / h, epsilon = 1e-12);
                assert_abs_diff_eq!(ratio.r(), xmax / w, epsilon = 1e-12);
                assert_abs_diff_eq!(ratio.b(), ymax / h, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn ratio_stays_in_unit_square() {
        let size = HW::from_hw([375.0, 500.0]);
        let bbox = TLBR::try_from_xyxy([10.0, 5.0, 490.0, 370.0]).unwrap();
        let ratio = bbox.to_ratio(&size, 224.0);

        assert!(ratio.is_inside(1.0, 1.0));
        assert!(ratio.l() < ratio.r() && ratio.t() < ratio.b());
    }

    #[test]
    fn full_extent_box_may_overshoot_by_one_ulp() {
        // 375 * (224 / 375) / 224 rounds to 1.0000000000000002, while 375 / 375 is exact
        let size = HW::from_hw([375.0, 500.0]);
        let bbox = TLBR::try_from_xyxy([0.0, 0.0, 500.0, 375.0]).unwrap();
        let ratio = bbox.to_ratio(&size, 224.0);

        assert_eq!(ratio.r(), 1.0);
        assert_eq!(ratio.b(), 1.0 + f64::EPSILON);
        assert_abs_diff_eq!(ratio.b(), 1.0, epsilon = 1e-15);
    }
}
