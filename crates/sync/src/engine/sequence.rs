/// Orders authoritative snapshots by request issue order.
///
/// Every fetch and submission takes a number from [`issue`](Self::issue)
/// before it starts. A completion is applied only if its number is greater
/// than the last one applied, so a slow response can never overwrite a newer
/// one that already landed.
#[derive(Debug, Default)]
pub struct SnapshotSequencer {
    issued: u64,
    applied: u64,
}

impl SnapshotSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Returns `true` (and records `seq`) if a response with this number may
    /// be applied.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;
        true
    }

    pub fn last_applied(&self) -> u64 {
        self.applied
    }
}
