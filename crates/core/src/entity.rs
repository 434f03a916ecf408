//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Implemented by records whose equality is defined by identity rather than
/// by field values (two snapshots of the same user are the same entity).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether `other` denotes the same entity, regardless of its state.
    fn same_identity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
