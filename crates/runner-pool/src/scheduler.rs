//! Transition scheduling: decouples lifecycle timing from any engine update loop.
//!
//! A transition is started by scheduling a [`TransitionToken`] to fire after a
//! fixed duration. The host advances the scheduler once per frame and hands
//! the due tokens back to the pool, which checks them against the instance's
//! pending token before applying anything.

/// Which half of the lifecycle a transition belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionPhase {
    /// Spawn-in: completes into `Active`.
    Enter,
    /// Despawn-out: completes into `Inactive`.
    Exit,
}

/// Handle for one pending transition.
///
/// `generation` is the instance's reuse counter and `serial` is unique per
/// instance, so a token outliving its transition can never match again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransitionToken {
    /// Pool slot of the instance.
    pub slot: u32,
    /// Reuse generation of the instance when the transition started.
    pub generation: u32,
    /// Per-instance transition counter.
    pub serial: u64,
    /// Enter or exit.
    pub phase: TransitionPhase,
}

/// Deferred delivery of transition completions.
pub trait TransitionScheduler {
    /// Fire `token` once `after` seconds of scheduler time have elapsed.
    fn schedule(&mut self, after: f32, token: TransitionToken);

    /// Drop a pending token. Returns `false` if it was not pending.
    fn cancel(&mut self, token: TransitionToken) -> bool;

    /// Advance time by `dt` seconds and return every token that came due,
    /// earliest first, ties in scheduling order.
    fn advance(&mut self, dt: f32) -> Vec<TransitionToken>;

    /// Number of tokens still waiting.
    fn pending(&self) -> usize;

    /// Drop every pending token.
    fn clear(&mut self);
}

#[derive(Clone, Debug)]
struct Scheduled {
    due: f64,
    order: u64,
    token: TransitionToken,
}

/// Fixed-interval scheduler driven by explicit `advance` calls.
#[derive(Clone, Debug, Default)]
pub struct TransitionClock {
    now: f64,
    next_order: u64,
    pending: Vec<Scheduled>,
}

impl TransitionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds advanced since creation.
    pub fn now(&self) -> f64 {
        self.now
    }
}

impl TransitionScheduler for TransitionClock {
    fn schedule(&mut self, after: f32, token: TransitionToken) {
        let due = self.now + f64::from(after.max(0.0));
        self.pending.push(Scheduled {
            due,
            order: self.next_order,
            token,
        });
        self.next_order += 1;
    }

    fn cancel(&mut self, token: TransitionToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.token != token);
        self.pending.len() != before
    }

    fn advance(&mut self, dt: f32) -> Vec<TransitionToken> {
        self.now += f64::from(dt.max(0.0));
        let now = self.now;

        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|s| s.due <= now);
        self.pending = waiting;

        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.order.cmp(&b.order)));
        due.into_iter().map(|s| s.token).collect()
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(slot: u32, phase: TransitionPhase) -> TransitionToken {
        TransitionToken {
            slot,
            generation: 1,
            serial: 0,
            phase,
        }
    }

    #[test]
    fn test_token_fires_only_after_duration() {
        let mut clock = TransitionClock::new();
        clock.schedule(0.5, token(0, TransitionPhase::Enter));

        assert!(clock.advance(0.25).is_empty());
        assert_eq!(clock.pending(), 1);

        let fired = clock.advance(0.25);
        assert_eq!(fired, vec![token(0, TransitionPhase::Enter)]);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_due_order_then_schedule_order() {
        let mut clock = TransitionClock::new();
        clock.schedule(1.0, token(0, TransitionPhase::Exit));
        clock.schedule(0.5, token(1, TransitionPhase::Enter));
        clock.schedule(0.5, token(2, TransitionPhase::Enter));

        let fired = clock.advance(2.0);
        let slots: Vec<u32> = fired.iter().map(|t| t.slot).collect();
        assert_eq!(slots, vec![1, 2, 0]);
    }

    #[test]
    fn test_cancelled_token_never_fires() {
        let mut clock = TransitionClock::new();
        let t = token(3, TransitionPhase::Exit);
        clock.schedule(0.5, t);
        assert!(clock.cancel(t));
        assert!(!clock.cancel(t), "second cancel finds nothing");
        assert!(clock.advance(1.0).is_empty());
    }

    #[test]
    fn test_zero_duration_fires_on_next_advance() {
        let mut clock = TransitionClock::new();
        clock.schedule(0.0, token(0, TransitionPhase::Enter));
        assert_eq!(clock.advance(0.0).len(), 1);
    }

    #[test]
    fn test_negative_dt_does_not_rewind() {
        let mut clock = TransitionClock::new();
        clock.advance(1.0);
        clock.advance(-5.0);
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut clock = TransitionClock::new();
        clock.schedule(0.1, token(0, TransitionPhase::Enter));
        clock.schedule(0.2, token(1, TransitionPhase::Enter));
        clock.clear();
        assert_eq!(clock.pending(), 0);
        assert!(clock.advance(1.0).is_empty());
    }
}
