// ABOUTME: Sealed trait pattern for runtime traits.
// ABOUTME: Keeps runtime capability traits implementable only inside this crate.

/// Implemented only by the crate's runtime backends, so the capability traits
/// can grow methods without breaking downstream code.
pub trait Sealed {}
