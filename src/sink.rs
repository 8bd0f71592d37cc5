//! Display-sink boundary between the streaming worker and the UI.
//!
//! The worker never touches widgets; it talks to a [`TextSink`] and the UI
//! applies the resulting [`UiEvent`]s to its pane buffers.

use crossbeam_channel::Sender;

use crate::stream::{ChatRequest, StreamOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Translate,
    Summary,
    Chat,
}

/// One streaming request queued by the UI for the worker thread.
#[derive(Debug)]
pub struct StreamJob {
    pub pane: Pane,
    pub request: ChatRequest,
}

#[derive(Debug)]
pub enum UiEvent {
    Clear(Pane),
    Append(Pane, String),
    ScrollToEnd(Pane),
    StreamEnded(Pane, StreamOutcome),
}

/// What a command handler needs from a text display.
pub trait TextSink {
    fn clear(&mut self);
    fn append(&mut self, text: &str);
    fn scroll_to_end(&mut self);
}

/// [`TextSink`] that forwards to the UI thread over a channel.
pub struct ChannelSink {
    pane: Pane,
    tx: Sender<UiEvent>,
}

impl ChannelSink {
    pub fn new(pane: Pane, tx: Sender<UiEvent>) -> Self {
        Self { pane, tx }
    }
}

impl TextSink for ChannelSink {
    fn clear(&mut self) {
        let _ = self.tx.send(UiEvent::Clear(self.pane));
    }

    fn append(&mut self, text: &str) {
        let _ = self.tx.send(UiEvent::Append(self.pane, text.to_string()));
    }

    fn scroll_to_end(&mut self) {
        let _ = self.tx.send(UiEvent::ScrollToEnd(self.pane));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn channel_sink_forwards_in_order() {
        let (tx, rx) = unbounded();
        let mut sink = ChannelSink::new(Pane::Translate, tx);
        sink.clear();
        sink.append("Hi");
        sink.scroll_to_end();

        assert!(matches!(rx.recv().unwrap(), UiEvent::Clear(Pane::Translate)));
        assert!(matches!(rx.recv().unwrap(), UiEvent::Append(Pane::Translate, t) if t == "Hi"));
        assert!(matches!(
            rx.recv().unwrap(),
            UiEvent::ScrollToEnd(Pane::Translate)
        ));
    }

    #[test]
    fn sink_survives_a_dropped_receiver() {
        let (tx, rx) = unbounded();
        drop(rx);
        let mut sink = ChannelSink::new(Pane::Chat, tx);
        sink.append("ignored");
    }
}
