//! Flood-controlled outbound scheduling.
//!
//! One watermark per session: each queued line reserves the later of
//! "now" and the watermark, then advances the watermark by the flood
//! interval. Lines submitted into an idle queue go out immediately;
//! bursts are spaced at least one interval apart; submission order is
//! preserved because the session driver stages one reservation at a
//! time. Handshake lines skip the reservation entirely and leave the
//! watermark untouched.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::message::Message;

/// The monotonically advancing send-slot watermark.
#[derive(Debug, Clone)]
pub struct FloodSchedule {
    interval: Duration,
    watermark: Option<Instant>,
}

impl FloodSchedule {
    /// Create a schedule with the given minimum spacing between lines.
    pub fn new(interval: Duration) -> FloodSchedule {
        FloodSchedule {
            interval,
            watermark: None,
        }
    }

    /// Reserve the next send slot: `max(now, watermark)`, advancing the
    /// watermark one interval past the slot.
    pub fn reserve(&mut self, now: Instant) -> Instant {
        let slot = match self.watermark {
            Some(watermark) if watermark > now => watermark,
            _ => now,
        };
        self.watermark = Some(slot + self.interval);
        slot
    }

    /// Forget the watermark (new connection).
    pub fn reset(&mut self) {
        self.watermark = None;
    }
}

/// One line waiting to be written, with its optional completion signal.
#[derive(Debug)]
pub(crate) struct OutboundLine {
    pub message: Message,
    pub notify: Option<oneshot::Sender<()>>,
}

impl OutboundLine {
    /// Signal the submitter that the line hit the transport.
    pub fn done(self) {
        if let Some(notify) = self.notify {
            let _ = notify.send(());
        }
    }
}

/// FIFO of flood-scheduled lines for one connection.
#[derive(Debug)]
pub(crate) struct Outbox {
    queue: VecDeque<OutboundLine>,
    schedule: FloodSchedule,
}

impl Outbox {
    pub fn new(interval: Duration) -> Outbox {
        Outbox {
            queue: VecDeque::new(),
            schedule: FloodSchedule::new(interval),
        }
    }

    pub fn push(&mut self, line: OutboundLine) {
        self.queue.push_back(line);
    }

    pub fn pop(&mut self) -> Option<OutboundLine> {
        self.queue.pop_front()
    }

    /// Reserve the send slot for a just-popped line.
    pub fn reserve(&mut self, now: Instant) -> Instant {
        self.schedule.reserve(now)
    }

    /// Drop everything still queued; pending completion signals resolve
    /// as dropped.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_queue_sends_immediately() {
        let mut schedule = FloodSchedule::new(Duration::from_millis(100));
        let now = Instant::now();
        assert_eq!(schedule.reserve(now), now);
    }

    #[test]
    fn burst_is_spaced_by_interval() {
        let interval = Duration::from_millis(100);
        let mut schedule = FloodSchedule::new(interval);
        let now = Instant::now();

        let first = schedule.reserve(now);
        let second = schedule.reserve(now);
        let third = schedule.reserve(now);

        assert_eq!(first, now);
        assert_eq!(second, now + interval);
        assert_eq!(third, now + 2 * interval);
    }

    #[test]
    fn watermark_does_not_delay_after_idle() {
        let interval = Duration::from_millis(100);
        let mut schedule = FloodSchedule::new(interval);
        let now = Instant::now();

        let _ = schedule.reserve(now);
        // Long after the watermark passed, a new line goes out at once.
        let later = now + Duration::from_secs(5);
        assert_eq!(schedule.reserve(later), later);
        // And the next burst line is spaced from that new slot.
        assert_eq!(schedule.reserve(later), later + interval);
    }

    #[test]
    fn outbox_preserves_order() {
        let mut outbox = Outbox::new(Duration::from_millis(10));
        for text in ["one", "two", "three"] {
            outbox.push(OutboundLine {
                message: Message::privmsg("#c", text),
                notify: None,
            });
        }

        let drained: Vec<String> = std::iter::from_fn(|| outbox.pop())
            .map(|line| line.message.tail.unwrap())
            .collect();
        assert_eq!(drained, vec!["one", "two", "three"]);
    }

    #[test]
    fn cleared_lines_drop_their_notify() {
        let (tx, mut rx) = oneshot::channel();
        let mut outbox = Outbox::new(Duration::from_millis(10));
        outbox.push(OutboundLine {
            message: Message::privmsg("#c", "never sent"),
            notify: Some(tx),
        });

        outbox.clear();
        assert!(rx.try_recv().is_err());
    }
}
