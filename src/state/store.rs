//! State Store
//!
//! Holds the single [`AppState`] instance, notifies exact-path subscribers on
//! every write and coalesces view renders to one pass per frame.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};

use super::app_state::AppState;
use super::frame::FrameScheduler;
use super::path::{read, Section, StateChange, StatePath, StateValue};

/// Subscriber callback: `(new_value, old_value, path)`
pub type Listener = Rc<dyn Fn(&StateValue, &StateValue, StatePath)>;

/// Receives one call per affected section when a frame is flushed
pub trait SectionRenderer {
    /// `pending` holds every path written since the previous frame.
    fn render_section(&self, section: Section, pending: &BTreeSet<StatePath>);
}

struct StoreInner {
    state: RefCell<AppState>,
    listeners: RefCell<HashMap<StatePath, Vec<(u64, Listener)>>>,
    next_listener_id: Cell<u64>,
    render_queue: RefCell<BTreeSet<StatePath>>,
    render_scheduled: Cell<bool>,
    renderer: RefCell<Option<Weak<dyn SectionRenderer>>>,
    frames: Box<dyn FrameScheduler>,
}

/// Shared handle to the application state.
///
/// Cloning is cheap and every clone sees the same state. All access happens
/// on the UI task, so no borrow is held while subscribers or renderers run
/// and they are free to write back into the store.
#[derive(Clone)]
pub struct StateStore {
    inner: Rc<StoreInner>,
}

impl StateStore {
    pub fn new(initial: AppState, frames: impl FrameScheduler + 'static) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(initial),
                listeners: RefCell::new(HashMap::new()),
                next_listener_id: Cell::new(0),
                render_queue: RefCell::new(BTreeSet::new()),
                render_scheduled: Cell::new(false),
                renderer: RefCell::new(None),
                frames: Box::new(frames),
            }),
        }
    }

    /// Attach the view that section renders are delivered to
    pub fn set_renderer(&self, renderer: Weak<dyn SectionRenderer>) {
        *self.inner.renderer.borrow_mut() = Some(renderer);
    }

    /// Current value at `path`
    pub fn get(&self, path: StatePath) -> StateValue {
        read(&self.inner.state.borrow(), path)
    }

    /// Borrow the whole state for a structured read
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Write one value, notify its subscribers, then queue a render
    pub fn set(&self, change: StateChange) {
        let path = change.path();
        let (old, new) = self.write(change);
        self.notify(path, &new, &old);
        self.schedule_render(path);
    }

    /// Write several values in order.
    ///
    /// Each old value is captured right before its own write, so a later
    /// entry observes earlier entries of the same batch. Subscribers run
    /// only after every write has been applied.
    pub fn update(&self, changes: impl IntoIterator<Item = StateChange>) {
        let applied: Vec<(StatePath, StateValue, StateValue)> = changes
            .into_iter()
            .map(|change| {
                let path = change.path();
                let (old, new) = self.write(change);
                (path, new, old)
            })
            .collect();

        for (path, new, old) in &applied {
            self.notify(*path, new, old);
            self.schedule_render(*path);
        }
    }

    /// Register `callback` for writes to exactly `path`
    pub fn subscribe(
        &self,
        path: StatePath,
        callback: impl Fn(&StateValue, &StateValue, StatePath) + 'static,
    ) -> Subscription {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .entry(path)
            .or_default()
            .push((id, Rc::new(callback)));

        Subscription {
            store: Rc::downgrade(&self.inner),
            path,
            id,
        }
    }

    /// Whether a frame has been requested and not yet flushed
    pub fn render_pending(&self) -> bool {
        self.inner.render_scheduled.get()
    }

    /// Run one coalesced render pass and return the sections it covered.
    ///
    /// Writes made by the renderer land in a fresh queue and request the
    /// next frame.
    pub fn flush_renders(&self) -> Vec<Section> {
        let pending = std::mem::take(&mut *self.inner.render_queue.borrow_mut());
        self.inner.render_scheduled.set(false);

        let sections: BTreeSet<Section> = pending.iter().map(|path| path.section()).collect();
        let renderer = self
            .inner
            .renderer
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade());

        if let Some(renderer) = renderer {
            for section in &sections {
                renderer.render_section(*section, &pending);
            }
        }

        sections.into_iter().collect()
    }

    fn write(&self, change: StateChange) -> (StateValue, StateValue) {
        let mut state = self.inner.state.borrow_mut();
        let old = read(&state, change.path());
        let new = change.apply(&mut state);
        (old, new)
    }

    fn notify(&self, path: StatePath, new: &StateValue, old: &StateValue) {
        let callbacks: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .get(&path)
            .map(|entries| entries.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();

        for callback in callbacks {
            callback(new, old, path);
        }
    }

    fn schedule_render(&self, path: StatePath) {
        self.inner.render_queue.borrow_mut().insert(path);

        if !self.inner.render_scheduled.get() {
            self.inner.render_scheduled.set(true);
            self.inner.frames.request_frame(self);
        }
    }
}

/// Handle returned by [`StateStore::subscribe`]
pub struct Subscription {
    store: Weak<StoreInner>,
    path: StatePath,
    id: u64,
}

impl Subscription {
    /// Remove this callback and no other
    pub fn unsubscribe(self) {
        if let Some(inner) = self.store.upgrade() {
            if let Some(entries) = inner.listeners.borrow_mut().get_mut(&self.path) {
                entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
