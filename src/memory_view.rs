//! Headless question-entry view.
//!
//! Implements every handle trait from [`crate::view`] against plain in-memory
//! state. `qbank serve` uses it in place of a window, and the test-suite uses
//! it to observe what an import did to the view.

use std::cell::RefCell;
use std::rc::Rc;

use crate::preview::{PreviewImage, EMPTY_SIZE_LABEL};
use crate::view::{
    EntryViewFactory, EntryViewHandles, FocusTarget, ImageSurface, TextField, ViewRegistry,
    WindowHandle,
};

#[derive(Default)]
struct MemoryViewState {
    alive: bool,
    question_id: String,
    history: Vec<String>,
    image_size: Option<(u32, u32)>,
    display_size: Option<(u32, u32)>,
    size_label: String,
    failure: Option<String>,
    focus_count: usize,
    raise_count: usize,
    close_handler: Option<Box<dyn FnOnce()>>,
}

/// One open in-memory view. Clones observe the same view.
#[derive(Clone)]
pub struct MemoryView {
    state: Rc<RefCell<MemoryViewState>>,
}

struct MemoryHandle(Rc<RefCell<MemoryViewState>>);

impl WindowHandle for MemoryHandle {
    fn is_alive(&self) -> bool {
        self.0.borrow().alive
    }

    fn raise(&mut self) {
        self.0.borrow_mut().raise_count += 1;
    }

    fn on_close(&mut self, handler: Box<dyn FnOnce()>) {
        self.0.borrow_mut().close_handler = Some(handler);
    }
}

impl TextField for MemoryHandle {
    fn replace_text(&mut self, text: &str) {
        let mut state = self.0.borrow_mut();
        state.question_id = text.to_string();
        state.history.push(text.to_string());
    }

    fn text(&self) -> String {
        self.0.borrow().question_id.clone()
    }
}

impl ImageSurface for MemoryHandle {
    fn show_image(&mut self, image: &PreviewImage) {
        let mut state = self.0.borrow_mut();
        state.image_size = Some(image.original_size());
        state.display_size = Some(image.display_size());
        state.size_label = image.size_label();
        state.failure = None;
    }

    fn show_failed(&mut self, reason: &str) {
        let mut state = self.0.borrow_mut();
        state.image_size = None;
        state.display_size = None;
        state.size_label = EMPTY_SIZE_LABEL.to_string();
        state.failure = Some(reason.to_string());
    }
}

impl FocusTarget for MemoryHandle {
    fn focus(&mut self) {
        self.0.borrow_mut().focus_count += 1;
    }
}

impl MemoryView {
    /// Builds a view and registers it with `registry`.
    pub fn open(registry: &ViewRegistry) -> Self {
        let state = Rc::new(RefCell::new(MemoryViewState {
            alive: true,
            size_label: EMPTY_SIZE_LABEL.to_string(),
            ..Default::default()
        }));
        registry.register(EntryViewHandles {
            window: Box::new(MemoryHandle(state.clone())),
            id_field: Box::new(MemoryHandle(state.clone())),
            image: Box::new(MemoryHandle(state.clone())),
            focus: Box::new(MemoryHandle(state.clone())),
        });
        Self { state }
    }

    /// Closes the window the way a user would, running its close handler.
    pub fn close(&self) {
        let handler = {
            let mut state = self.state.borrow_mut();
            state.alive = false;
            state.close_handler.take()
        };
        if let Some(handler) = handler {
            handler();
        }
    }

    /// Destroys the window without running its close handler.
    pub fn destroy(&self) {
        self.state.borrow_mut().alive = false;
    }

    pub fn is_alive(&self) -> bool {
        self.state.borrow().alive
    }

    pub fn question_id(&self) -> String {
        self.state.borrow().question_id.clone()
    }

    /// Every id written to the id field, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state.borrow().history.clone()
    }

    /// Original size of the image currently shown.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.state.borrow().image_size
    }

    pub fn display_size(&self) -> Option<(u32, u32)> {
        self.state.borrow().display_size
    }

    pub fn size_label(&self) -> String {
        self.state.borrow().size_label.clone()
    }

    /// Reason shown on the placeholder, if the last image failed to load.
    pub fn failure(&self) -> Option<String> {
        self.state.borrow().failure.clone()
    }

    pub fn focus_count(&self) -> usize {
        self.state.borrow().focus_count
    }

    pub fn raise_count(&self) -> usize {
        self.state.borrow().raise_count
    }
}

/// Opens [`MemoryView`]s on demand. Clones share the list of opened views.
#[derive(Clone, Default)]
pub struct MemoryViewFactory {
    views: Rc<RefCell<Vec<MemoryView>>>,
}

impl MemoryViewFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of views opened so far.
    pub fn opened(&self) -> usize {
        self.views.borrow().len()
    }

    pub fn last(&self) -> Option<MemoryView> {
        self.views.borrow().last().cloned()
    }

    pub fn views(&self) -> Vec<MemoryView> {
        self.views.borrow().clone()
    }
}

impl EntryViewFactory for MemoryViewFactory {
    fn open_entry_view(&mut self, registry: &ViewRegistry) {
        let view = MemoryView::open(registry);
        self.views.borrow_mut().push(view);
    }
}
