use crate::common::*;
use num_traits::Zero;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    /// Builds a rectangle from corners in `[xmin, ymin, xmax, ymax]` order.
    fn try_from_xyxy(xyxy: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized,
    {
        let [xmin, ymin, xmax, ymax] = xyxy;
        Self::try_from_tlbr([ymin, xmin, ymax, xmax])
    }
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    /// Corners in `[xmin, ymin, xmax, ymax]` order.
    fn xyxy(&self) -> [Self::Type; 4] {
        [self.l(), self.t(), self.r(), self.b()]
    }

    /// Returns true if the rectangle has zero height or width.
    fn is_empty(&self) -> bool {
        let zero = Self::Type::zero();
        self.h() <= zero || self.w() <= zero
    }

    /// Checks whether the rectangle lies in the `[0, w] x [0, h]` canvas.
    fn is_inside(&self, h: Self::Type, w: Self::Type) -> bool {
        let zero = Self::Type::zero();
        self.t() >= zero && self.l() >= zero && self.b() <= h && self.r() <= w
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}
