//! Scroll convergence detection.
//!
//! Every incrementally loaded surface here (result feed, review panel, about
//! panel) follows the same pattern: command the container to its bottom,
//! probe whether content grew, and stop once repeated probes stop producing
//! growth. `GrowthProbe` tracks the run of identical observations; the
//! observation type is whatever the caller probes (height alone, or a
//! height + child-count pair).

/// Detects convergence as a run of identical consecutive observations.
#[derive(Debug)]
pub struct GrowthProbe<T> {
    last: Option<T>,
    run: u32,
    threshold: u32,
}

impl<T: PartialEq> GrowthProbe<T> {
    /// `threshold` is the run length that counts as converged: observing the
    /// same value `threshold` times in a row stops the scroll loop.
    pub fn new(threshold: u32) -> Self {
        Self {
            last: None,
            run: 0,
            threshold: threshold.max(1),
        }
    }

    /// Record one probe. Returns true once the container has converged.
    pub fn observe(&mut self, value: T) -> bool {
        if self.last.as_ref() == Some(&value) {
            self.run += 1;
        } else {
            self.last = Some(value);
            self.run = 1;
        }
        self.run >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_on_the_third_repeated_height() {
        let mut probe = GrowthProbe::new(3);
        assert!(!probe.observe(100));
        assert!(!probe.observe(200));
        assert!(!probe.observe(200));
        // Third consecutive 200: converged.
        assert!(probe.observe(200));
    }

    #[test]
    fn growth_resets_the_run() {
        let mut probe = GrowthProbe::new(3);
        assert!(!probe.observe(100));
        assert!(!probe.observe(100));
        assert!(!probe.observe(250));
        assert!(!probe.observe(250));
        assert!(probe.observe(250));
    }

    #[test]
    fn pair_observation_requires_both_to_stall() {
        let mut probe = GrowthProbe::new(2);
        assert!(!probe.observe((100, 5)));
        // Height stalled but the child count still grew.
        assert!(!probe.observe((100, 8)));
        assert!(!probe.observe((100, 9)));
        assert!(probe.observe((100, 9)));
    }
}
