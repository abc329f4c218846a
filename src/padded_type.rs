use std::ops::Deref;
use std::sync::atomic::AtomicUsize;

// a value padded to fill one cache line, 64 bytes
// keeps the completion counter off the line the queue mutex lives on
#[repr(align(64))]
pub struct PaddedType<T> {
    value: T,
}

impl<T> PaddedType<T> {
    pub const fn new(value: T) -> Self {
        PaddedType { value }
    }
}

impl<T> Deref for PaddedType<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

pub type PaddedAtomicUsize = PaddedType<AtomicUsize>;
