//! Domain layer - Core decision logic and models.
//!
//! Pure types and functions: operation selection, cost gating, cursor
//! rotation and intent eligibility. No I/O happens here.

pub mod batch;
pub mod cost;
pub mod cursor;
pub mod intent;
pub mod operation;
pub mod position;

// Re-export core types for convenience
pub use batch::GrindBatch;
pub use cost::{CostAssessment, CostGate, GasMultiplier};
pub use cursor::Cursor;
pub use intent::{EligibilityPolicy, Ineligible, Intent, IntentId};
pub use operation::{GrindOp, OperationSelector, PartialLadderPolicy};
pub use position::{Ladder, PoolId, PositionSnapshot};
