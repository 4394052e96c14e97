/// How far the position may move before it is mirrored to the prefs store
/// again. Persistence is a restore-scroll-after-reload convenience, it does
/// not need frame accuracy.
const PERSIST_STEP_SECS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type TickListener = Box<dyn FnMut(f32)>;

/// Broadcast cache of the transport's current position.
///
/// The transport clock changes every frame, but most of the UI only needs to
/// *read* the value when it happens to render. The ticker decouples the two:
/// the frame loop pushes the clock in with `set`, consumers either pull
/// `snapshot` or subscribe for a synchronous nudge. Listeners must stay cheap
/// (flag a repaint, not do work).
///
/// Constructed once at app start and owned by the app; there is exactly one
/// instance feeding all consumers.
pub struct PositionTicker {
    position: f32,
    listeners: Vec<(SubscriptionId, TickListener)>,
    next_id: u64,
    persist: Option<Box<dyn FnMut(f32)>>,
    last_persisted: f32,
}

impl PositionTicker {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            listeners: Vec::new(),
            next_id: 0,
            persist: None,
            last_persisted: 0.0,
        }
    }

    /// Restore the last known position from a previous run. Does not notify.
    pub fn restore(&mut self, seconds: f32) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.position = seconds;
        self.last_persisted = seconds;
    }

    pub fn snapshot(&self) -> f32 {
        self.position
    }

    /// Snapshot floored to the nearest `1/fps` step, never above the raw
    /// value. Consumers that only need ~30fps stability key their repaints on
    /// this so they skip frames the raw 60Hz driver would force on them.
    pub fn quantised_snapshot(&self, fps: f32) -> f32 {
        if fps <= 0.0 {
            return self.position;
        }
        (self.position * fps).floor() / fps
    }

    pub fn subscribe(&mut self, listener: TickListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(l, _)| *l != id);
    }

    /// Hook invoked (throttled) with the position so it survives a restart.
    /// Failures inside the hook are the hook's business; the ticker itself
    /// never errors.
    pub fn set_persist_hook(&mut self, hook: Box<dyn FnMut(f32)>) {
        self.persist = Some(hook);
    }

    /// Publish a new position, synchronously notifying every subscriber.
    pub fn set(&mut self, seconds: f32) {
        self.position = seconds;
        for (_, listener) in self.listeners.iter_mut() {
            listener(seconds);
        }
        if let Some(persist) = self.persist.as_mut()
            && (seconds - self.last_persisted).abs() >= PERSIST_STEP_SECS
        {
            self.last_persisted = seconds;
            persist(seconds);
        }
    }
}
