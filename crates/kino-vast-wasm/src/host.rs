//! Browser timers and navigation

use crate::video::Waker;
use kino_vast::{HostEnv, TimerId, TimerReason};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use wasm_bindgen::{closure::Closure, JsCast};

struct PendingTimer {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

/// `setTimeout` timers and `window.open`
pub struct WebHost {
    window: Option<web_sys::Window>,
    next_id: u32,
    timers: HashMap<TimerId, PendingTimer>,
    fired: Rc<RefCell<VecDeque<(TimerId, TimerReason)>>>,
    wake: Waker,
}

impl WebHost {
    pub fn new(wake: Waker) -> Self {
        Self {
            window: web_sys::window(),
            next_id: 0,
            timers: HashMap::new(),
            fired: Rc::new(RefCell::new(VecDeque::new())),
            wake,
        }
    }

    /// Next timer that fired, forgetting its callback
    pub fn take_fired(&mut self) -> Option<(TimerId, TimerReason)> {
        let fired = self.fired.borrow_mut().pop_front()?;
        self.timers.remove(&fired.0);
        Some(fired)
    }
}

impl HostEnv for WebHost {
    fn start_timer(&mut self, delay: Duration, reason: TimerReason) -> TimerId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = TimerId(self.next_id);

        let Some(window) = self.window.as_ref() else {
            warn!(?reason, "No window, timer will never fire");
            return id;
        };

        let fired = self.fired.clone();
        let wake = self.wake.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            fired.borrow_mut().push_back((id, reason));
            wake();
        });
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);

        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            millis,
        ) {
            Ok(handle) => {
                debug!(id = id.0, ?reason, millis, "Timer started");
                self.timers.insert(
                    id,
                    PendingTimer {
                        handle,
                        _callback: callback,
                    },
                );
            }
            Err(err) => warn!(?reason, error = ?err, "setTimeout failed"),
        }
        id
    }

    fn clear_timer(&mut self, id: TimerId) {
        let Some(timer) = self.timers.remove(&id) else {
            return;
        };
        if let Some(window) = self.window.as_ref() {
            window.clear_timeout_with_handle(timer.handle);
        }
        self.fired.borrow_mut().retain(|(fired, _)| *fired != id);
    }

    fn open_url(&mut self, url: &Url) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if let Err(err) = window.open_with_url_and_target(url.as_str(), "_blank") {
            warn!(url = %url, error = ?err, "Could not open click-through");
        }
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        if let Some(window) = self.window.as_ref() {
            for timer in self.timers.values() {
                window.clear_timeout_with_handle(timer.handle);
            }
        }
    }
}
