// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Wires the other layers together for one goal at a time.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination and error context
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The full preprocessing + training workflow
pub mod train_use_case;

// Alignment-only report over a corpus
pub mod align_use_case;

// Reload a finished run and score it
pub mod evaluate_use_case;
