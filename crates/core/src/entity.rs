//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Identities are assigned by the store on insert and never change afterwards.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
