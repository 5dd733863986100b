//! Plain-old-data marker.

/// Marker trait for types whose all-zeros bit pattern is a valid value.
///
/// [`Array`](crate::Array) relies on this to hand out zero-initialized
/// elements without running constructors. `Copy` is a supertrait, so Pod
/// elements carry no drop glue and can be overwritten or discarded
/// freely.
///
/// Implemented for the primitive integers and floats, `bool`, `char`,
/// `()`, and arrays of Pod elements. Not implemented for references,
/// function pointers, or niche types such as `NonZeroU32`: those are
/// `Copy`, but zero is not a value for them.
///
/// # Safety
///
/// Implementors guarantee that the all-zeros bit pattern is a valid value
/// of `Self`. A `#[repr(C)]` struct whose fields are all `Pod` qualifies:
///
/// ```
/// use keel_buffer::{Array, Pod};
///
/// #[derive(Clone, Copy)]
/// #[repr(C)]
/// struct Cell {
///     id: u32,
///     weight: f32,
/// }
///
/// // Safety: zero id and zero weight form a valid Cell.
/// unsafe impl Pod for Cell {}
///
/// let cells: Array<Cell> = Array::new(16);
/// assert_eq!(cells[0].id, 0);
/// ```
pub unsafe trait Pod: Copy {}

macro_rules! impl_pod {
    ($($ty:ty),* $(,)?) => {
        $(
            // Safety: all-zeros is a valid value of this type.
            unsafe impl Pod for $ty {}
        )*
    };
}

impl_pod!(
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    f32, f64, bool, char, (),
);

// Safety: an array is zero-valid exactly when its element type is.
unsafe impl<T: Pod, const N: usize> Pod for [T; N] {}
