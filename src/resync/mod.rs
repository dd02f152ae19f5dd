pub mod error;

use std::collections::VecDeque;

use crate::event::OrderbookEvent;
use error::{ResyncGap, ResyncOverflow};

/// Reconciles a paginated REST snapshot with a live stream of update-id
/// tagged deltas (Binance's depth protocol). Deltas arriving before the
/// snapshot are buffered; once the snapshot arrives the buffer is walked and
/// flushed in order. After that, every subsequent delta is validated for
/// strict contiguity.
pub struct ResyncBuffer {
    pending: VecDeque<OrderbookEvent>,
    max_buffer: usize,
    last_update_id: u64,
    handled_first_event: bool,
    synchronized: bool,
}

impl ResyncBuffer {
    pub fn new(max_buffer: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            max_buffer,
            last_update_id: 0,
            handled_first_event: false,
            synchronized: false,
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Appends a pre-snapshot delta to the buffer. Fatal if the buffer is
    /// already full: a full buffer signals the snapshot fetch is taking far
    /// longer than expected.
    pub fn buffer_delta(&mut self, event: OrderbookEvent) -> Result<(), ResyncOverflow> {
        if self.pending.len() >= self.max_buffer {
            return Err(ResyncOverflow {
                pending: self.pending.len(),
                max: self.max_buffer,
            });
        }
        self.pending.push_back(event);
        Ok(())
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.handled_first_event = false;
        self.synchronized = false;
    }

    /// Applies a REST snapshot and drains the buffer, returning the
    /// in-order event sequence (snapshot first) to emit downstream. On a
    /// detected gap the whole attempt is discarded and the buffer reset so
    /// the caller can re-arm the snapshot fetch; no partial, possibly-gapped
    /// prefix is ever emitted.
    pub fn apply_snapshot(
        &mut self,
        snapshot: OrderbookEvent,
    ) -> Result<Vec<OrderbookEvent>, ResyncGap> {
        let cursor = snapshot
            .cursor
            .expect("binance snapshot events always carry a resync cursor");
        self.last_update_id = cursor.last_update_id;
        self.handled_first_event = false;

        let mut to_emit = vec![snapshot];
        let pending = std::mem::take(&mut self.pending);

        for event in pending {
            let cursor = event
                .cursor
                .expect("binance delta events always carry a resync cursor");

            if !self.handled_first_event {
                if cursor.last_update_id < self.last_update_id + 1 {
                    // stale: fully predates the snapshot, drop silently
                    continue;
                }
                if cursor.first_update_id > self.last_update_id + 1 {
                    let gap = ResyncGap {
                        expected: self.last_update_id + 1,
                        got: cursor.first_update_id,
                    };
                    self.reset();
                    return Err(gap);
                }
                self.handled_first_event = true;
                self.last_update_id = cursor.last_update_id;
                to_emit.push(event);
                continue;
            }

            if cursor.first_update_id != self.last_update_id + 1 {
                let gap = ResyncGap {
                    expected: self.last_update_id + 1,
                    got: cursor.first_update_id,
                };
                self.reset();
                return Err(gap);
            }

            self.last_update_id = cursor.last_update_id;
            to_emit.push(event);
        }

        self.synchronized = true;
        Ok(to_emit)
    }

    /// Validates a post-sync delta for strict contiguity. On success,
    /// advances the cursor and returns the event to emit. On a gap, resets
    /// the buffer (forcing the caller to re-arm the snapshot fetch) and
    /// returns `ResyncGap`.
    pub fn apply_delta(&mut self, event: OrderbookEvent) -> Result<OrderbookEvent, ResyncGap> {
        let cursor = event
            .cursor
            .expect("binance delta events always carry a resync cursor");

        if cursor.first_update_id != self.last_update_id + 1 {
            let gap = ResyncGap {
                expected: self.last_update_id + 1,
                got: cursor.first_update_id,
            };
            self.reset();
            return Err(gap);
        }

        self.last_update_id = cursor.last_update_id;
        Ok(event)
    }
}
