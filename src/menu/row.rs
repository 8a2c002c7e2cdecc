//! # Row Capability
//!
//! Anything the menu can display implements [`Row`]: a stable identity plus
//! the display fields for the current version of that entity.

/// A selectable entity delivered to the menu on its update stream.
pub trait Row {
    /// Stable key, identical across updates to the same logical entity.
    fn identity(&self) -> &str;

    /// Display fields in column order, or `None` to remove this identity
    /// from the menu.
    fn fields(&self) -> Option<Vec<String>>;

    /// Whether this update removes its identity. Must agree with
    /// [`Row::fields`] returning `None`; override it when the answer is
    /// cheaper than building the fields.
    fn is_removed(&self) -> bool {
        self.fields().is_none()
    }
}

impl<R: Row + ?Sized> Row for Box<R> {
    fn identity(&self) -> &str {
        (**self).identity()
    }

    fn fields(&self) -> Option<Vec<String>> {
        (**self).fields()
    }

    fn is_removed(&self) -> bool {
        (**self).is_removed()
    }
}
