pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 64.0;

/// Playhead position (as a fraction of the visible width) that triggers an
/// autoscroll, and where the playhead lands after one.
const FOLLOW_TRIGGER: f32 = 0.95;
const FOLLOW_MARGIN: f32 = 0.10;

/// Maps timeline seconds to pixels and back.
///
/// At zoom 1 the whole piece fits the visible width; zooming stretches the
/// content and the scroll offset picks the visible window. Zooming keeps the
/// content point under the cursor fixed, and while playing the viewport can
/// follow the playhead without fighting the user's own scrolling.
#[derive(Debug)]
pub struct TimelineViewport {
    duration: f32,
    /// Visible width in pixels == content width at zoom 1.
    base_width: f32,
    zoom: f32,
    scroll_x: f32,
    follow: bool,
    /// A manual scroll suspends following until the user asks for it again.
    follow_suspended: bool,
}

impl TimelineViewport {
    pub fn new() -> Self {
        Self {
            duration: 0.0,
            base_width: 0.0,
            zoom: MIN_ZOOM,
            scroll_x: 0.0,
            follow: true,
            follow_suspended: false,
        }
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration.max(0.0);
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Called every frame with the actual panel width before any mapping.
    pub fn set_base_width(&mut self, width: f32) {
        self.base_width = width.max(0.0);
        self.clamp_scroll();
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn scroll_x(&self) -> f32 {
        self.scroll_x
    }

    pub fn content_width(&self) -> f32 {
        self.base_width * self.zoom
    }

    /// Timeline seconds to an x offset inside the visible panel.
    pub fn time_to_x(&self, t: f32) -> f32 {
        if self.duration <= 0.0 {
            return -self.scroll_x;
        }
        (t / self.duration) * self.content_width() - self.scroll_x
    }

    /// Inverse of `time_to_x`, clamped into the piece.
    pub fn x_to_time(&self, x: f32) -> f32 {
        if self.duration <= 0.0 || self.content_width() <= 0.0 {
            return 0.0;
        }
        ((x + self.scroll_x) / self.content_width() * self.duration).clamp(0.0, self.duration)
    }

    /// Set the zoom level directly (e.g. restored from prefs), anchored at
    /// the left edge of the view.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom_anchored(zoom, 0.0);
    }

    /// Multiply the zoom by a wheel/pinch factor, keeping the content point
    /// under the cursor where it is.
    pub fn zoom_around(&mut self, factor: f32, anchor_x: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.zoom_anchored(self.zoom * factor, anchor_x);
    }

    fn zoom_anchored(&mut self, zoom: f32, anchor_x: f32) {
        let zoom = if zoom.is_finite() { zoom } else { MIN_ZOOM };
        let anchor_time = self.x_to_time(anchor_x);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        // new offset that keeps the same time under the anchor
        if self.duration > 0.0 {
            self.scroll_x = (anchor_time / self.duration) * self.content_width() - anchor_x;
        }
        self.clamp_scroll();
    }

    /// User-initiated scroll; suspends playhead following.
    pub fn scroll_by(&mut self, dx: f32) {
        if dx == 0.0 {
            return;
        }
        self.scroll_x += dx;
        self.clamp_scroll();
        self.follow_suspended = true;
    }

    pub fn follow_enabled(&self) -> bool {
        self.follow && !self.follow_suspended
    }

    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
        if follow {
            self.follow_suspended = false;
        }
    }

    /// Clear a manual-scroll suspension, e.g. when the user starts playback.
    pub fn resume_follow(&mut self) {
        self.follow_suspended = false;
    }

    /// Keep the playhead visible while playing: once it crosses the right
    /// trigger edge (or leaves the view entirely), scroll so it re-enters at
    /// the left margin.
    pub fn follow_playhead(&mut self, t: f32) {
        if !self.follow_enabled() || self.base_width <= 0.0 || self.duration <= 0.0 {
            return;
        }
        let x = self.time_to_x(t);
        if x > FOLLOW_TRIGGER * self.base_width || x < 0.0 {
            self.scroll_x =
                (t / self.duration) * self.content_width() - FOLLOW_MARGIN * self.base_width;
            self.clamp_scroll();
        }
    }

    fn clamp_scroll(&mut self) {
        let max_scroll = (self.content_width() - self.base_width).max(0.0);
        self.scroll_x = self.scroll_x.clamp(0.0, max_scroll);
    }
}

impl Default for TimelineViewport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> TimelineViewport {
        let mut viewport = TimelineViewport::new();
        viewport.set_duration(100.0);
        viewport.set_base_width(1000.0);
        viewport
    }

    #[test]
    fn test_mapping_round_trips_and_clamps() {
        let viewport = viewport();
        assert_eq!(viewport.time_to_x(0.0), 0.0);
        assert_eq!(viewport.time_to_x(50.0), 500.0);
        assert_eq!(viewport.x_to_time(500.0), 50.0);
        assert_eq!(viewport.x_to_time(-50.0), 0.0);
        assert_eq!(viewport.x_to_time(5000.0), 100.0);
        for t in [0.0, 13.7, 99.9] {
            let x = viewport.time_to_x(t);
            assert!((viewport.x_to_time(x) - t).abs() < 1e-3);
        }
    }

    #[test]
    fn test_zoom_keeps_anchor_point_fixed() {
        let mut viewport = viewport();
        viewport.set_zoom(2.0);
        viewport.scroll_by(300.0);
        let anchor_x = 400.0;
        let before = viewport.x_to_time(anchor_x);

        viewport.zoom_around(1.5, anchor_x);
        let after = viewport.x_to_time(anchor_x);
        assert!((before - after).abs() < 1e-3, "{before} != {after}");

        viewport.zoom_around(0.5, anchor_x);
        let after = viewport.x_to_time(anchor_x);
        assert!((before - after).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_clamps_to_bounds() {
        let mut viewport = viewport();
        viewport.zoom_around(0.0001, 0.0);
        assert_eq!(viewport.zoom(), MIN_ZOOM);
        viewport.zoom_around(1e9, 0.0);
        assert_eq!(viewport.zoom(), MAX_ZOOM);
        // at fit-to-width there is nothing to scroll
        viewport.set_zoom(1.0);
        assert_eq!(viewport.scroll_x(), 0.0);
    }

    #[test]
    fn test_follow_scrolls_playhead_back_to_margin() {
        let mut viewport = viewport();
        viewport.set_zoom(4.0);
        // playhead still well inside the view: no scroll
        viewport.follow_playhead(10.0);
        assert_eq!(viewport.scroll_x(), 0.0);

        // crossing 95% of the width snaps it back to the 10% margin
        viewport.follow_playhead(24.0);
        assert!((viewport.time_to_x(24.0) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_manual_scroll_suspends_follow() {
        let mut viewport = viewport();
        viewport.set_zoom(4.0);
        viewport.scroll_by(200.0);
        assert!(!viewport.follow_enabled());

        let scroll = viewport.scroll_x();
        viewport.follow_playhead(90.0);
        assert_eq!(viewport.scroll_x(), scroll);

        viewport.resume_follow();
        assert!(viewport.follow_enabled());
        viewport.follow_playhead(90.0);
        assert_ne!(viewport.scroll_x(), scroll);
    }

    #[test]
    fn test_disabling_follow_wins_over_resume() {
        let mut viewport = viewport();
        viewport.set_follow(false);
        viewport.resume_follow();
        assert!(!viewport.follow_enabled());
        viewport.set_follow(true);
        assert!(viewport.follow_enabled());
    }

    #[test]
    fn test_degenerate_viewport_is_safe() {
        let mut viewport = TimelineViewport::new();
        assert_eq!(viewport.x_to_time(100.0), 0.0);
        assert_eq!(viewport.time_to_x(5.0), 0.0);
        viewport.follow_playhead(1.0);
        viewport.zoom_around(2.0, 50.0);
    }
}
