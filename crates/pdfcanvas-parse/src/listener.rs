//! Event listener trait and fan-out dispatcher.
//!
//! The processor delivers every [`CanvasEvent`] to a single
//! [`EventListener`]. [`EventDispatcher`] is itself a listener that forwards
//! events to any number of attached listeners, optionally filtered by
//! [`EventType`].

use pdfcanvas_core::CanvasWarning;

use crate::error::ProcessorError;
use crate::events::{CanvasEvent, EventType};

/// Callback interface for content-stream events.
///
/// Events arrive synchronously and in content-stream order. Returning an
/// error aborts processing of the current page and the error propagates
/// out of [`CanvasProcessor::process_content`](crate::CanvasProcessor::process_content).
pub trait EventListener {
    fn on_event(&mut self, event: &CanvasEvent) -> Result<(), ProcessorError>;

    /// Event types this listener wants; `None` means all of them.
    fn supported_events(&self) -> Option<Vec<EventType>> {
        None
    }

    /// Called for each non-fatal warning when warning collection is on.
    fn on_warning(&mut self, _warning: &CanvasWarning) {}
}

impl<L: EventListener + ?Sized> EventListener for &mut L {
    fn on_event(&mut self, event: &CanvasEvent) -> Result<(), ProcessorError> {
        (**self).on_event(event)
    }

    fn supported_events(&self) -> Option<Vec<EventType>> {
        (**self).supported_events()
    }

    fn on_warning(&mut self, warning: &CanvasWarning) {
        (**self).on_warning(warning)
    }
}

impl<L: EventListener + ?Sized> EventListener for Box<L> {
    fn on_event(&mut self, event: &CanvasEvent) -> Result<(), ProcessorError> {
        (**self).on_event(event)
    }

    fn supported_events(&self) -> Option<Vec<EventType>> {
        (**self).supported_events()
    }

    fn on_warning(&mut self, warning: &CanvasWarning) {
        (**self).on_warning(warning)
    }
}

struct Attached<'l> {
    listener: Box<dyn EventListener + 'l>,
    /// `None` accepts every event type.
    filter: Option<Vec<EventType>>,
}

impl Attached<'_> {
    fn accepts(&self, event_type: EventType) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|types| types.contains(&event_type))
    }
}

/// Fans events out to attached listeners in attachment order.
#[derive(Default)]
pub struct EventDispatcher<'l> {
    listeners: Vec<Attached<'l>>,
}

impl<'l> EventDispatcher<'l> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Attach a listener. Its own [`supported_events`](EventListener::supported_events)
    /// decides which events it receives.
    pub fn attach(&mut self, listener: impl EventListener + 'l) -> &mut Self {
        let filter = listener.supported_events();
        self.listeners.push(Attached {
            listener: Box::new(listener),
            filter,
        });
        self
    }

    /// Attach a listener that only receives the given event types,
    /// overriding whatever the listener declares.
    pub fn attach_filtered(
        &mut self,
        listener: impl EventListener + 'l,
        types: impl IntoIterator<Item = EventType>,
    ) -> &mut Self {
        self.listeners.push(Attached {
            listener: Box::new(listener),
            filter: Some(types.into_iter().collect()),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventDispatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventListener for EventDispatcher<'_> {
    fn on_event(&mut self, event: &CanvasEvent) -> Result<(), ProcessorError> {
        let event_type = event.event_type();
        for attached in &mut self.listeners {
            if attached.accepts(event_type) {
                attached.listener.on_event(event)?;
            }
        }
        Ok(())
    }

    fn on_warning(&mut self, warning: &CanvasWarning) {
        for attached in &mut self.listeners {
            attached.listener.on_warning(warning);
        }
    }
}

/// Listener that stores every event and warning it receives.
#[derive(Debug, Default)]
pub struct EventCollector {
    pub events: Vec<CanvasEvent>,
    pub warnings: Vec<CanvasWarning>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected events of one type.
    pub fn of_type(&self, event_type: EventType) -> impl Iterator<Item = &CanvasEvent> + '_ {
        self.events
            .iter()
            .filter(move |e| e.event_type() == event_type)
    }
}

impl EventListener for EventCollector {
    fn on_event(&mut self, event: &CanvasEvent) -> Result<(), ProcessorError> {
        self.events.push(event.clone());
        Ok(())
    }

    fn on_warning(&mut self, warning: &CanvasWarning) {
        self.warnings.push(warning.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfcanvas_core::WarningCode;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records `(listener id, event type)` into a shared log.
    struct Recorder {
        id: usize,
        log: Rc<RefCell<Vec<(usize, EventType)>>>,
        only: Option<Vec<EventType>>,
    }

    impl EventListener for Recorder {
        fn on_event(&mut self, event: &CanvasEvent) -> Result<(), ProcessorError> {
            self.log.borrow_mut().push((self.id, event.event_type()));
            Ok(())
        }

        fn supported_events(&self) -> Option<Vec<EventType>> {
            self.only.clone()
        }
    }

    struct Failing;

    impl EventListener for Failing {
        fn on_event(&mut self, _event: &CanvasEvent) -> Result<(), ProcessorError> {
            Err(ProcessorError::listener("refused"))
        }
    }

    fn recorder(id: usize, log: &Rc<RefCell<Vec<(usize, EventType)>>>) -> Recorder {
        Recorder {
            id,
            log: Rc::clone(log),
            only: None,
        }
    }

    #[test]
    fn dispatches_in_attachment_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.attach(recorder(1, &log)).attach(recorder(2, &log));

        dispatcher.on_event(&CanvasEvent::BeginText).unwrap();
        dispatcher.on_event(&CanvasEvent::EndText).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                (1, EventType::BeginText),
                (2, EventType::BeginText),
                (1, EventType::EndText),
                (2, EventType::EndText),
            ]
        );
    }

    #[test]
    fn filtered_listener_skips_other_types() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.attach_filtered(recorder(1, &log), [EventType::EndText]);
        dispatcher.attach(recorder(2, &log));

        dispatcher.on_event(&CanvasEvent::BeginText).unwrap();
        dispatcher.on_event(&CanvasEvent::EndText).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                (2, EventType::BeginText),
                (1, EventType::EndText),
                (2, EventType::EndText),
            ]
        );
    }

    #[test]
    fn supported_events_is_honored_by_attach() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.attach(Recorder {
            id: 7,
            log: Rc::clone(&log),
            only: Some(vec![EventType::BeginText]),
        });

        dispatcher.on_event(&CanvasEvent::EndText).unwrap();
        dispatcher.on_event(&CanvasEvent::BeginText).unwrap();

        assert_eq!(*log.borrow(), vec![(7, EventType::BeginText)]);
    }

    #[test]
    fn first_error_stops_dispatch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.attach(Failing).attach(recorder(2, &log));

        let err = dispatcher.on_event(&CanvasEvent::BeginText).unwrap_err();
        assert!(matches!(err, ProcessorError::Listener(_)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn warnings_reach_every_listener() {
        let mut first = EventCollector::new();
        let mut second = EventCollector::new();
        {
            let mut dispatcher = EventDispatcher::new();
            dispatcher
                .attach_filtered(&mut first, [EventType::RenderPath])
                .attach(&mut second);
            dispatcher.on_warning(&CanvasWarning::new(WarningCode::MissingFont, "F9"));
            dispatcher.on_event(&CanvasEvent::BeginText).unwrap();
        }
        assert_eq!(first.warnings.len(), 1);
        assert_eq!(second.warnings.len(), 1);
        assert!(first.events.is_empty());
        assert_eq!(second.of_type(EventType::BeginText).count(), 1);
    }
}
