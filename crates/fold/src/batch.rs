//! Batch selection and validation shared by both folds.

use campaign_primitives::{
    datums::SetNode,
    errors::{CampaignError, CampaignResult},
};
use campaign_sorted_set::store::{NodeRecord, SetStore};

/// Checks that `batch` is the contiguous run of at most `max` nodes right after `current`.
pub fn validate_batch(current: &SetNode, batch: &[SetNode], max: usize) -> CampaignResult<()> {
    let Some(expected) = current.next else {
        return Err(CampaignError::InvalidBatch("fold is already closed".to_string()));
    };
    let Some(first) = batch.first() else {
        return Err(CampaignError::InvalidBatch("empty batch".to_string()));
    };
    if batch.len() > max {
        return Err(CampaignError::InvalidBatch(format!(
            "{} nodes exceed the batch limit of {max}",
            batch.len()
        )));
    }
    if first.key != Some(expected) {
        return Err(CampaignError::InvalidBatch(format!(
            "batch starts at {:?}, fold expects {expected}",
            first.key
        )));
    }
    for pair in batch.windows(2) {
        if pair[0].next.is_none() || pair[0].next != pair[1].key {
            return Err(CampaignError::InvalidBatch(format!(
                "{:?} is followed by {:?}, not {:?}",
                pair[0].key, pair[0].next, pair[1].key
            )));
        }
    }
    Ok(())
}

/// The next run of up to `max` nodes after `current`.
pub fn next_batch<'a>(
    store: &'a SetStore,
    current: &SetNode,
    max: usize,
) -> CampaignResult<Vec<&'a NodeRecord>> {
    let first = current
        .next
        .ok_or_else(|| CampaignError::InvalidBatch("fold is already closed".to_string()))?;
    store.run_from(&first, max)
}

pub(crate) fn nodes_of(batch: &[&NodeRecord]) -> Vec<SetNode> {
    batch.iter().map(|r| r.node.clone()).collect()
}
