//! Markup-tree capability interface.
//!
//! The grid walker and the detail-page extractor only need a handful of
//! navigation operations. Any tree-producing HTML parser can back them by
//! implementing [`MarkupNode`] for its element handle; the engine never
//! sees concrete node types.

/// An element in a parsed markup document (or the document root).
pub trait MarkupNode: Sized + Clone {
    /// First descendant element named `tag`, in document order.
    fn first(&self, tag: &str) -> Option<Self>;

    /// All descendant elements named `tag`, in document order.
    fn all(&self, tag: &str) -> Vec<Self>;

    /// Attribute value, if present.
    fn attr(&self, name: &str) -> Option<String>;

    /// Concatenated text content of this element and its descendants.
    fn text(&self) -> String;

    /// Whether an element or non-blank text node follows this one among
    /// its siblings.
    fn has_next_sibling(&self) -> bool;

    /// All descendants named `tag` that satisfy `predicate`.
    fn all_where<P>(&self, tag: &str, predicate: P) -> Vec<Self>
    where
        P: Fn(&Self) -> bool,
    {
        self.all(tag).into_iter().filter(|n| predicate(n)).collect()
    }
}
