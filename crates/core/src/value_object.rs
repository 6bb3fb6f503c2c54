//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two access levels
/// labelled `"Read"` are the same access level, while two software entries with
/// the same name are still different entries (they are entities with ids).
///
/// To "modify" a value object, build a new one. Constructors are the place to
/// enforce the value's invariants, so an instance that exists is always valid.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
