//! Common utilities.

/// Tolerance used when comparing resource amounts against capacities.
pub const CAPACITY_EPSILON: f64 = 1e-9;

/// Explicit generator of object identifiers.
///
/// Produces a strictly increasing sequence starting from zero. The data center owns one generator per kind of
/// object (hosts, VMs), so that identifiers are reproducible between runs.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Returns the number of identifiers produced so far.
    pub fn issued(&self) -> u32 {
        self.next
    }
}
