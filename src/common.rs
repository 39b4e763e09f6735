//! Common types and definitions.

/// An address in the target's address space.
///
/// The stub treats addresses as opaque 64-bit quantities; narrower targets
/// simply never see the upper bits set.
pub type MemAddr = u64;
