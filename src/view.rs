//! Binding between the import bridge and the question-entry view.
//!
//! The GUI owns the view; the bridge only keeps the handle table below, which
//! lives on the GUI thread and is never shared with the listener. The view
//! publishes its handles once at construction via [`ViewRegistry::register`],
//! and the close handler installed there clears them again.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::preview::PreviewImage;

pub trait WindowHandle {
    /// `false` once the underlying window has been destroyed.
    fn is_alive(&self) -> bool;
    /// Bring the window to the foreground and give it focus.
    fn raise(&mut self);
    /// Install the handler the toolkit runs when the user closes the window.
    fn on_close(&mut self, handler: Box<dyn FnOnce()>);
}

pub trait TextField {
    /// Replace the whole content and move the cursor to the end.
    fn replace_text(&mut self, text: &str);
    fn text(&self) -> String;
}

pub trait ImageSurface {
    fn show_image(&mut self, image: &PreviewImage);
    /// Clear any previous image and show a "failed to load" placeholder.
    fn show_failed(&mut self, reason: &str);
}

pub trait FocusTarget {
    fn focus(&mut self);
}

/// The addressable parts of one question-entry view.
pub struct EntryViewHandles {
    pub window: Box<dyn WindowHandle>,
    pub id_field: Box<dyn TextField>,
    pub image: Box<dyn ImageSurface>,
    /// Field that receives focus after an import (the tag query box).
    pub focus: Box<dyn FocusTarget>,
}

/// Opens a new question-entry view. The view is expected to call
/// [`ViewRegistry::register`] while it is being built.
pub trait EntryViewFactory {
    fn open_entry_view(&mut self, registry: &ViewRegistry);
}

#[derive(Default)]
struct Slot {
    generation: u64,
    handles: Option<EntryViewHandles>,
}

enum TargetState {
    Missing,
    Stale,
    Live,
}

/// Handle table for the active question-entry view. Cloning shares the table.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    slot: Rc<RefCell<Slot>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a view's handles and hooks its close event to unregister it.
    /// Returns the registration generation.
    pub fn register(&self, mut handles: EntryViewHandles) -> u64 {
        let generation = {
            let mut slot = self.slot.borrow_mut();
            slot.generation += 1;
            slot.generation
        };

        // Weak so the window's handler does not keep the table alive.
        let weak = Rc::downgrade(&self.slot);
        handles.window.on_close(Box::new(move || {
            if let Some(slot) = weak.upgrade() {
                ViewRegistry { slot }.unregister_generation(generation);
            }
        }));

        let previous = self.slot.borrow_mut().handles.replace(handles);
        drop(previous);
        debug!(generation, "question entry view registered");
        generation
    }

    /// Clears the registration. The next import opens a new view.
    pub fn unregister(&self) {
        let Ok(mut slot) = self.slot.try_borrow_mut() else {
            warn!("question entry view unregister while the registry is in use; ignored");
            return;
        };
        let previous = slot.handles.take();
        drop(slot);
        if previous.is_some() {
            debug!("question entry view unregistered");
        }
    }

    /// Unregisters only if `generation` is still the current registration, so
    /// a late close event from an old window leaves a newer view in place.
    fn unregister_generation(&self, generation: u64) {
        let Ok(mut slot) = self.slot.try_borrow_mut() else {
            return;
        };
        if slot.generation != generation {
            return;
        }
        let previous = slot.handles.take();
        drop(slot);
        if previous.is_some() {
            debug!(generation, "question entry view closed");
        }
    }

    pub fn is_registered(&self) -> bool {
        self.slot.borrow().handles.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.slot.borrow().generation
    }

    /// Makes sure a live view is registered: raises an existing one, or drops
    /// a stale registration and opens a new view through `factory`.
    ///
    /// Returns whether a view is registered afterwards.
    pub fn ensure_exists(&self, factory: &mut dyn EntryViewFactory) -> bool {
        let state = {
            let mut slot = self.slot.borrow_mut();
            match slot.handles.as_mut() {
                None => TargetState::Missing,
                Some(handles) if !handles.window.is_alive() => TargetState::Stale,
                Some(handles) => {
                    handles.window.raise();
                    TargetState::Live
                }
            }
        };

        match state {
            TargetState::Live => return true,
            TargetState::Stale => {
                debug!("question entry window is gone; dropping stale registration");
                let stale = self.slot.borrow_mut().handles.take();
                drop(stale);
            }
            TargetState::Missing => {}
        }

        factory.open_entry_view(self);
        let registered = self.is_registered();
        if !registered {
            warn!("question entry view did not register after opening");
        }
        registered
    }

    /// Runs `f` against the registered view, if any.
    pub fn with_target<R>(&self, f: impl FnOnce(&mut EntryViewHandles) -> R) -> Option<R> {
        let mut slot = self.slot.borrow_mut();
        slot.handles.as_mut().map(f)
    }
}
