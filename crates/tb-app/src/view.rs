//! Redraw notifications toward whatever renders the simulation.

use std::sync::mpsc::{Receiver, Sender, channel};

/// Receiver of "state changed" notifications. Implementations must not block:
/// they are called from the stepping worker as well as the event thread.
pub trait ViewObserver: Send + Sync {
    fn repaint(&self);

    fn set_time(&self, time: f32);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ViewObserver for NullObserver {
    fn repaint(&self) {}

    fn set_time(&self, _time: f32) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewEvent {
    Repaint,
    Time(f32),
}

/// Forwards notifications over a channel, e.g. to a UI thread that polls it
/// once per frame.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: Sender<ViewEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<ViewEvent>) {
        let (tx, rx) = channel();
        (Self { tx }, rx)
    }
}

impl ViewObserver for ChannelObserver {
    fn repaint(&self) {
        // A gone receiver just means nobody is watching any more.
        let _ = self.tx.send(ViewEvent::Repaint);
    }

    fn set_time(&self, time: f32) {
        let _ = self.tx.send(ViewEvent::Time(time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_observer_forwards_in_order() {
        let (observer, rx) = ChannelObserver::new();
        observer.set_time(1.5);
        observer.repaint();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![ViewEvent::Time(1.5), ViewEvent::Repaint]);
    }

    #[test]
    fn dropped_receiver_is_harmless() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.repaint();
    }
}
