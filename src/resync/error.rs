#[derive(thiserror::Error, Debug)]
#[error("resync gap: expected first_update_id {expected}, got {got}")]
pub struct ResyncGap {
    pub expected: u64,
    pub got: u64,
}

#[derive(thiserror::Error, Debug)]
#[error("resync buffer overflow: {pending} deltas pending, max {max}")]
pub struct ResyncOverflow {
    pub pending: usize,
    pub max: usize,
}
