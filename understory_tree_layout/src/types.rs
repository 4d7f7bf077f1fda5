// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity handles for registered objects.

use alloc::rc::Rc;
use alloc::sync::Arc;

/// Opaque identity of an object stored in a [`TreeLayout`](crate::TreeLayout).
///
/// Two handles compare equal only if they were derived from the same
/// allocation. The value is meaningless outside of comparisons and is never
/// dereferenced.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Identity of the value behind a reference.
    ///
    /// For an `Rc<T>` this matches [`Identity::identity`] of that `Rc`, so a
    /// borrowed `&T` obtained from it can be checked for membership.
    #[inline]
    pub fn of_ref<T: ?Sized>(value: &T) -> Self {
        Self(core::ptr::from_ref(value).cast::<()>().addr())
    }
}

/// Objects that can be keyed by identity.
///
/// Implemented for shared pointers, where identity is the allocation and not
/// the pointee's value.
pub trait Identity {
    /// Returns the identity of this object.
    fn identity(&self) -> ObjectId;
}

impl<T: ?Sized> Identity for Rc<T> {
    #[inline]
    fn identity(&self) -> ObjectId {
        ObjectId::of_ref::<T>(self)
    }
}

impl<T: ?Sized> Identity for Arc<T> {
    #[inline]
    fn identity(&self) -> ObjectId {
        ObjectId::of_ref::<T>(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_have_distinct_identity() {
        let a = Rc::new(5_u32);
        let b = Rc::new(5_u32);
        assert_eq!(a, b);
        assert_ne!(a.identity(), b.identity());
        assert_eq!(a.identity(), Rc::clone(&a).identity());
    }

    #[test]
    fn borrowed_value_matches_rc_identity() {
        let a: Rc<dyn core::fmt::Debug> = Rc::new("x");
        assert_eq!(ObjectId::of_ref(&*a), a.identity());
        let b = Arc::new(1_i8);
        assert_eq!(ObjectId::of_ref(&*b), b.identity());
    }

    #[test]
    fn zero_sized_values_are_distinct() {
        let a = Rc::new(());
        let b = Rc::new(());
        assert_ne!(a.identity(), b.identity());
    }
}
