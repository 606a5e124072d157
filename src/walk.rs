/// Order in which [`walk`] visits entries.
///
/// Only [`Walk::InOrder`] is implemented, the remaining orders are
/// rejected with [`Error::Unsupported`].
///
/// [`walk`]: crate::Rbt::walk
/// [`Error::Unsupported`]: crate::Error::Unsupported
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Walk {
    PreOrder,
    /// Ascending key order.
    #[default]
    InOrder,
    PostOrder,
    LevelOrder,
}
