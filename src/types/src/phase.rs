#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListenerPhase {
    #[default]
    Connecting,
    Subscribing,
    Streaming,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Connected,
    Subscribed,
    Disconnected,
}

impl ListenerPhase {
    /// Terminated is final. Events that do not apply to the current phase are ignored.
    pub fn next(self, event: PhaseEvent) -> ListenerPhase {
        match (self, event) {
            (ListenerPhase::Terminated, _) => ListenerPhase::Terminated,
            (_, PhaseEvent::Disconnected) => ListenerPhase::Terminated,
            (ListenerPhase::Connecting, PhaseEvent::Connected) => ListenerPhase::Subscribing,
            (ListenerPhase::Subscribing, PhaseEvent::Subscribed) => ListenerPhase::Streaming,
            (phase, _) => phase,
        }
    }
}
