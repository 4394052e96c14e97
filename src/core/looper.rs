use crate::core::transport::{Transport, TransportState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    pub start: f32,
    pub end: f32,
    pub active: bool,
}

/// A user-defined `[start, end)` region that playback snaps back into.
///
/// Regions are built in two steps (mark the start, then mark or drag the
/// end); until commit the pending bounds are only a preview. The engine never
/// owns the clock, it watches the freshly ticked position once per frame and
/// calls back into the transport when the boundary is crossed.
#[derive(Debug, Default)]
pub struct LoopEngine {
    region: Option<LoopRegion>,
    defining: bool,
    pending_start: f32,
    provisional_end: Option<f32>,
}

impl LoopEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(&self) -> Option<LoopRegion> {
        self.region
    }

    pub fn is_defining(&self) -> bool {
        self.defining
    }

    /// The in-progress bounds while defining, for timeline preview.
    pub fn preview(&self) -> Option<(f32, f32)> {
        self.defining
            .then(|| (self.pending_start, self.provisional_end.unwrap_or(self.pending_start)))
    }

    /// First click: capture the start, enter define mode. Any previously
    /// active region stops being enforced immediately.
    pub fn begin_region_at(&mut self, t: f32) {
        self.pending_start = t.max(0.0);
        self.provisional_end = None;
        self.defining = true;
        if let Some(region) = self.region.as_mut() {
            region.active = false;
        }
    }

    /// Live preview of the end while still in define mode; nothing commits.
    pub fn set_provisional_end(&mut self, t: f32) {
        if self.defining {
            self.provisional_end = Some(t.max(0.0));
        }
    }

    /// Second click: normalize the bounds (swap if dragged backwards),
    /// activate, and jump playback to the region start. A zero-size region
    /// is discarded instead of committed.
    pub fn commit_region(&mut self, transport: &mut Transport, end_override: Option<f32>) {
        if !self.defining {
            return;
        }
        self.defining = false;
        let end = end_override
            .or(self.provisional_end)
            .unwrap_or_else(|| transport.position());
        let (start, end) = if end < self.pending_start {
            (end, self.pending_start)
        } else {
            (self.pending_start, end)
        };
        self.provisional_end = None;
        if end - start <= f32::EPSILON {
            return;
        }
        self.region = Some(LoopRegion {
            start,
            end,
            active: true,
        });
        transport.seek(start);
    }

    /// Forget the region and any in-progress definition.
    pub fn reset(&mut self) {
        self.region = None;
        self.defining = false;
        self.provisional_end = None;
    }

    /// Keep the region but flip enforcement; re-enabling jumps to the start.
    pub fn toggle_active(&mut self, transport: &mut Transport) {
        if let Some(region) = self.region.as_mut() {
            region.active = !region.active;
            if region.active {
                let start = region.start;
                transport.seek(start);
            }
        }
    }

    /// Level-triggered boundary check, run every frame right after the
    /// ticker publishes the new position. `>=` rather than `==`: frames are
    /// coarse and the crossing lands past the boundary, never on it.
    pub fn poll(&self, transport: &mut Transport) {
        let Some(region) = self.region else { return };
        if !region.active || transport.state() != TransportState::Playing {
            return;
        }
        debug_assert!(region.start < region.end);
        if transport.position() >= region.end {
            transport.seek(region.start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport {
        let (tx, _) = rtrb::RingBuffer::new(64);
        let mut transport = Transport::new(tx);
        transport.set_ready(60.0);
        transport
    }

    #[test]
    fn test_two_step_definition_commits_normalized() {
        let mut transport = transport();
        let mut looper = LoopEngine::new();

        looper.begin_region_at(20.0);
        assert!(looper.is_defining());
        looper.set_provisional_end(10.0);
        assert_eq!(looper.preview(), Some((20.0, 10.0)));

        // dragged backwards: commit swaps the bounds
        looper.commit_region(&mut transport, None);
        let region = looper.region().unwrap();
        assert_eq!((region.start, region.end), (10.0, 20.0));
        assert!(region.active);
        assert!(!looper.is_defining());
        // commit seeks to the start
        assert_eq!(transport.position(), 10.0);
    }

    #[test]
    fn test_degenerate_region_is_discarded() {
        let mut transport = transport();
        let mut looper = LoopEngine::new();
        looper.begin_region_at(5.0);
        looper.commit_region(&mut transport, Some(5.0));
        assert!(looper.region().is_none());
        assert!(!looper.is_defining());
    }

    #[test]
    fn test_begin_deactivates_previous_region() {
        let mut transport = transport();
        let mut looper = LoopEngine::new();
        looper.begin_region_at(0.0);
        looper.commit_region(&mut transport, Some(4.0));
        assert!(looper.region().unwrap().active);

        looper.begin_region_at(10.0);
        assert!(!looper.region().unwrap().active);
    }

    #[test]
    fn test_loop_reentry_at_frame_granularity() {
        let mut transport = transport();
        let mut looper = LoopEngine::new();
        looper.begin_region_at(10.0);
        looper.commit_region(&mut transport, Some(20.0));

        transport.seek(19.9);
        transport.play();

        let mut wrapped = false;
        for _ in 0..30 {
            transport.update(1.0 / 60.0);
            looper.poll(&mut transport);
            let pos = transport.position();
            assert!(
                pos < 20.0 + 1.0 / 60.0 * 4.0,
                "position {pos} escaped the region"
            );
            if pos == 10.0 {
                wrapped = true;
            }
            assert!(!(pos > 20.0), "stuck past the loop end at {pos}");
        }
        assert!(wrapped, "never snapped back to the loop start");
        // and it keeps advancing inside the region afterwards
        transport.update(1.0 / 60.0);
        assert!(transport.position() > 10.0 && transport.position() < 20.0);
    }

    #[test]
    fn test_inactive_region_is_not_enforced() {
        let mut transport = transport();
        let mut looper = LoopEngine::new();
        looper.begin_region_at(1.0);
        looper.commit_region(&mut transport, Some(2.0));
        looper.toggle_active(&mut transport);

        transport.seek(1.9);
        transport.play();
        transport.update(0.5);
        looper.poll(&mut transport);
        assert!(transport.position() > 2.0);
    }

    #[test]
    fn test_toggle_back_on_seeks_to_start() {
        let mut transport = transport();
        let mut looper = LoopEngine::new();
        looper.begin_region_at(3.0);
        looper.commit_region(&mut transport, Some(6.0));
        looper.toggle_active(&mut transport);
        transport.seek(30.0);

        looper.toggle_active(&mut transport);
        assert!(looper.region().unwrap().active);
        assert_eq!(transport.position(), 3.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut transport = transport();
        let mut looper = LoopEngine::new();
        looper.begin_region_at(0.0);
        looper.commit_region(&mut transport, Some(5.0));
        looper.reset();
        assert!(looper.region().is_none());
        assert!(!looper.is_defining());
    }
}
