/// A macro for constructing address-stable buffers akin to `vec![..]`.
#[macro_export]
macro_rules! buffer_mut {
    ($elem:expr; $n:expr) => (
        $crate::BufferMut::full($elem, $n)
    );
    ($($x:expr),+ $(,)?) => (
        $crate::BufferMut::copy_from([$($x),+])
    );
}
