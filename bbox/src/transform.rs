use super::{Rect, TLBR};
use crate::{common::*, HW};

/// Per-axis scaling followed by translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.t() - src.t() * sy;
        let tx = tgt.l() - src.l() * sx;

        Self { sy, sx, ty, tx }
    }

    /// Stretches the `src_size` canvas onto the `tgt_size` canvas, ignoring
    /// the aspect ratio.
    pub fn from_sizes_exact(src_size: &HW<T>, tgt_size: &HW<T>) -> Self {
        let zero = T::zero();
        let src = TLBR {
            t: zero,
            l: zero,
            b: src_size.h(),
            r: src_size.w(),
        };
        let tgt = TLBR {
            t: zero,
            l: zero,
            b: tgt_size.h(),
            r: tgt_size.w(),
        };
        Self::from_rects(&src, &tgt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_resize_exact() {
        let transform =
            Transform::from_sizes_exact(&HW::from_hw([100.0, 200.0]), &HW::square(224.0));
        let expect = Transform {
            sx: 224.0 / 200.0,
            sy: 224.0 / 100.0,
            tx: 0.0,
            ty: 0.0,
        };
        assert_eq!(transform, expect);
    }
}
