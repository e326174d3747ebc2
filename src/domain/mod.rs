// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types shared by every other layer:
// feature matrices, the error taxonomy and the traits behind
// which external collaborators (feature extraction, vocoding,
// file output) hide.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Feature matrices and padded examples
pub mod features;

// Error taxonomy for the whole pipeline
pub mod error;

// Collaborator abstractions
pub mod traits;
