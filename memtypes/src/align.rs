/// Something (usually addresses or sizes) that is alignable to a certain
/// alignment represented in the same type and usually a power of two.
pub trait Alignable {
    type Alignment;

    /// Return the smallest `x` that is a multiple of `alignment` such that `x >= num`.
    fn align_up(self, alignment: Self::Alignment) -> Self;

    /// Return the largest `x` that is a multiple of `alignment` such that `x <= num`.
    fn align_down(self, alignment: Self::Alignment) -> Self;

    /// Return whether the value already is a multiple of `alignment`.
    fn is_aligned(self, alignment: Self::Alignment) -> bool;
}

macro_rules! align_impl {
    ($t:ty) => {
        impl Alignable for $t {
            type Alignment = $t;

            fn align_up(self, alignment: $t) -> $t {
                if alignment == 0 {
                    self
                } else {
                    let mask = alignment - 1;
                    assert!(alignment & mask == 0, "alignment must be power of two");
                    let padding = alignment - (self & mask);
                    self + (padding & mask)
                }
            }

            fn align_down(self, alignment: $t) -> $t {
                if alignment == 0 {
                    self
                } else {
                    let mask = alignment - 1;
                    assert!(alignment & mask == 0, "alignment must be power of two");
                    self - (self & mask)
                }
            }

            fn is_aligned(self, alignment: $t) -> bool {
                self.align_down(alignment) == self
            }
        }
    };
}

align_impl!(usize);
align_impl!(u64);
align_impl!(u32);
align_impl!(u16);
align_impl!(u8);
