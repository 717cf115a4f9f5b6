//! Accumulator for validated (pool, operation) pairs.

use serde::Serialize;

use super::operation::GrindOp;
use super::position::PoolId;

/// Two parallel sequences with matching indices, submitted in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrindBatch {
    pool_ids: Vec<PoolId>,
    ops: Vec<GrindOp>,
}

impl GrindBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pool_id: PoolId, op: GrindOp) {
        self.pool_ids.push(pool_id);
        self.ops.push(op);
    }

    pub fn pool_ids(&self) -> &[PoolId] {
        &self.pool_ids
    }

    pub fn ops(&self) -> &[GrindOp] {
        &self.ops
    }

    /// On-chain `uint8` codes, index-aligned with `pool_ids`.
    pub fn op_codes(&self) -> Vec<u8> {
        self.ops.iter().map(|op| op.code()).collect()
    }

    pub fn len(&self) -> usize {
        self.pool_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool_ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolId, GrindOp)> + '_ {
        self.pool_ids.iter().copied().zip(self.ops.iter().copied())
    }
}

impl FromIterator<(PoolId, GrindOp)> for GrindBatch {
    fn from_iter<I: IntoIterator<Item = (PoolId, GrindOp)>>(iter: I) -> Self {
        let mut batch = Self::new();
        for (pool_id, op) in iter {
            batch.push(pool_id, op);
        }
        batch
    }
}
