//! Content script: the in-page fallback redirector.
//!
//! Every detection source (history hooks, `popstate`, DOM mutations, the
//! poll) reports the visible URL; a changed URL schedules one debounced
//! check. Autoplay escalation runs on destination hosts once the redirect
//! logic has nothing left to do.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use fy_core::config::RedirectConfig;
use fy_core::fallback::{
    AutoplayDriver, BoundedWait, CheckOutcome, FallbackRedirector, NavigationSource, Page, PageError,
    PlayerCommand, PlayerEvent, ScheduledCommand, WaitStatus,
};
use fy_core::store::EnablementStore;
use js_sys::{Date, Function, Reflect};
use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Event, HtmlVideoElement, MessageEvent, MutationObserver, MutationObserverInit, Window};

use crate::chrome::{describe, ChromeStorage};

struct ContentScript {
    window: Window,
    redirector: RefCell<FallbackRedirector>,
    autoplay: RefCell<AutoplayDriver>,
    pending_check: Cell<Option<i32>>,
    video_wait: RefCell<Option<Rc<VideoWait>>>,
}

/// A wait for the video element with the observer and timer that drive it.
struct VideoWait {
    wait: RefCell<BoundedWait>,
    observer: RefCell<Option<MutationObserver>>,
    timer: Cell<Option<i32>>,
}

impl VideoWait {
    fn release(&self, window: &Window) {
        if let Some(observer) = self.observer.borrow_mut().take() {
            observer.disconnect();
        }
        if let Some(handle) = self.timer.take() {
            window.clear_timeout_with_handle(handle);
        }
    }
}

impl Page for ContentScript {
    fn href(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn replace(&self, url: &str) -> Result<(), PageError> {
        self.window
            .location()
            .replace(url)
            .map_err(|e| PageError::Navigation(describe(&e)))
    }
}

/// Start the fallback in this page. `options` is an optional JSON
/// configuration; invalid options fall back to the defaults.
#[wasm_bindgen]
pub fn start_content_script(options: Option<String>) -> Result<(), JsValue> {
    let config = match options.as_deref().map(RedirectConfig::from_json) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            warn!(target: "content", "Ignoring options: {}", err);
            RedirectConfig::default()
        }
        None => RedirectConfig::default(),
    };
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;

    let script = Rc::new(ContentScript {
        window,
        redirector: RefCell::new(FallbackRedirector::new(&config)),
        autoplay: RefCell::new(AutoplayDriver::new(config.fallback.quality_stagger())),
        pending_check: Cell::new(None),
        video_wait: RefCell::new(None),
    });

    let store = EnablementStore::new(Rc::new(ChromeStorage));
    let s = script.clone();
    store.on_change(move |enabled| {
        s.redirector.borrow_mut().set_enabled(enabled);
        if !enabled {
            s.cancel_video_wait();
        }
    });

    script.hook_history("pushState", NavigationSource::PushState)?;
    script.hook_history("replaceState", NavigationSource::ReplaceState)?;
    script.listen_popstate()?;
    script.observe_mutations()?;
    script.start_poll(config.fallback.poll_interval())?;
    script.listen_player_messages()?;

    spawn_local(async move {
        let enabled = store.get().await;
        let outcome = script.redirector.borrow_mut().start(enabled, &*script);
        script.handle(outcome);
    });
    Ok(())
}

impl ContentScript {
    fn notify(self: &Rc<Self>, source: NavigationSource) {
        let href = self.href();
        let delay = self.redirector.borrow_mut().note_url(&href, source);
        if let Some(delay) = delay {
            self.schedule_check(delay, source);
        }
    }

    fn schedule_check(self: &Rc<Self>, delay: Duration, source: NavigationSource) {
        if let Some(handle) = self.pending_check.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        let s = self.clone();
        let callback = Closure::once_into_js(move || {
            s.pending_check.set(None);
            let outcome = s.redirector.borrow_mut().check(&*s, source);
            s.handle(outcome);
        });
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis(delay))
        {
            Ok(handle) => self.pending_check.set(Some(handle)),
            Err(err) => warn!(target: "content", "Could not schedule check: {}", describe(&err)),
        }
    }

    fn handle(self: &Rc<Self>, outcome: CheckOutcome) {
        match outcome {
            CheckOutcome::AwaitVideo => self.wait_for_video(),
            other => debug!(target: "content", "Check result: {:?}", other),
        }
    }

    // =========================================================================
    // Navigation detection
    // =========================================================================

    fn hook_history(self: &Rc<Self>, method: &str, source: NavigationSource) -> Result<(), JsValue> {
        let history = self.window.history()?;
        let original: Function = Reflect::get(&history, &JsValue::from_str(method))?.dyn_into()?;
        let target = history.clone();
        let s = self.clone();
        let patched = Closure::<dyn Fn(JsValue, JsValue, JsValue) -> JsValue>::new(
            move |state: JsValue, title: JsValue, url: JsValue| match original.call3(&target, &state, &title, &url) {
                Ok(result) => {
                    s.notify(source);
                    result
                }
                Err(err) => wasm_bindgen::throw_val(err),
            },
        );
        Reflect::set(&history, &JsValue::from_str(method), patched.as_ref())?;
        patched.forget();
        Ok(())
    }

    fn listen_popstate(self: &Rc<Self>) -> Result<(), JsValue> {
        let s = self.clone();
        let callback = Closure::<dyn Fn(Event)>::new(move |_event: Event| s.notify(NavigationSource::PopState));
        self.window
            .add_event_listener_with_callback("popstate", callback.as_ref().unchecked_ref())?;
        callback.forget();
        Ok(())
    }

    fn observe_mutations(self: &Rc<Self>) -> Result<(), JsValue> {
        let s = self.clone();
        let callback = Closure::<dyn Fn(JsValue, JsValue)>::new(move |_records: JsValue, _observer: JsValue| {
            s.notify(NavigationSource::Mutation)
        });
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        callback.forget();
        self.observe_document(&observer)
    }

    fn start_poll(self: &Rc<Self>, interval: Duration) -> Result<(), JsValue> {
        let s = self.clone();
        let callback = Closure::<dyn Fn()>::new(move || s.notify(NavigationSource::Poll));
        self.window
            .set_interval_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), millis(interval))?;
        callback.forget();
        Ok(())
    }

    fn observe_document(&self, observer: &MutationObserver) -> Result<(), JsValue> {
        let root = self
            .window
            .document()
            .and_then(|d| d.document_element())
            .ok_or_else(|| JsValue::from_str("No document element"))?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer.observe_with_options(&root, &init)
    }

    // =========================================================================
    // Autoplay
    // =========================================================================

    fn find_video(&self) -> Option<HtmlVideoElement> {
        let element = self.window.document()?.query_selector("video").ok()??;
        element.dyn_into().ok()
    }

    /// Wait for the player to mount a video element, bounded by the
    /// configured timeout. A wait still pending is cancelled first.
    fn wait_for_video(self: &Rc<Self>) {
        self.cancel_video_wait();
        if let Some(video) = self.find_video() {
            self.drive_video(video);
            return;
        }

        let timeout = self.redirector.borrow().config().video_wait_timeout();
        let pending = Rc::new(VideoWait {
            wait: RefCell::new(BoundedWait::new(timeout)),
            observer: RefCell::new(None),
            timer: Cell::new(None),
        });
        let started = Date::now();

        let s = self.clone();
        let p = pending.clone();
        let callback = Closure::<dyn Fn(JsValue, JsValue)>::new(move |_records: JsValue, _observer: JsValue| {
            let video = s.find_video();
            let elapsed = Duration::from_millis((Date::now() - started).max(0.0) as u64);
            let status = p.wait.borrow_mut().observe(video.is_some(), elapsed);
            if status == WaitStatus::Pending {
                return;
            }
            s.finish_video_wait(&p);
            if let (WaitStatus::Found, Some(video)) = (status, video) {
                s.drive_video(video);
            }
        });
        let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(err) => {
                warn!(target: "content", "Cannot observe for video: {}", describe(&err));
                return;
            }
        };
        callback.forget();
        if let Err(err) = self.observe_document(&observer) {
            warn!(target: "content", "Cannot observe for video: {}", describe(&err));
            return;
        }
        *pending.observer.borrow_mut() = Some(observer);

        let s = self.clone();
        let p = pending.clone();
        let expire = Closure::once_into_js(move || {
            p.timer.set(None);
            if p.wait.borrow_mut().expire() == WaitStatus::TimedOut {
                debug!(target: "content", "No video element after {:?}", timeout);
            }
            s.finish_video_wait(&p);
        });
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(expire.unchecked_ref(), millis(timeout))
        {
            Ok(handle) => pending.timer.set(Some(handle)),
            Err(err) => warn!(target: "content", "Could not schedule video timeout: {}", describe(&err)),
        }
        *self.video_wait.borrow_mut() = Some(pending);
    }

    fn cancel_video_wait(&self) {
        let Some(pending) = self.video_wait.borrow_mut().take() else {
            return;
        };
        pending.wait.borrow_mut().cancel();
        pending.release(&self.window);
        debug!(target: "content", "Video wait cancelled");
    }

    /// Drop the observer and the timeout of a settled wait.
    fn finish_video_wait(&self, pending: &Rc<VideoWait>) {
        pending.release(&self.window);
        let mut current = self.video_wait.borrow_mut();
        if current.as_ref().is_some_and(|c| Rc::ptr_eq(c, pending)) {
            *current = None;
        }
    }

    /// Muted start, then unmute and request quality once it plays.
    fn drive_video(self: &Rc<Self>, video: HtmlVideoElement) {
        info!(target: "content", "Starting muted playback");
        video.set_muted(true);
        match video.play() {
            Ok(promise) => spawn_local(async move {
                if let Err(err) = JsFuture::from(promise).await {
                    debug!(target: "content", "Playback not started: {}", describe(&err));
                }
            }),
            Err(err) => warn!(target: "content", "play() failed: {}", describe(&err)),
        }

        let s = self.clone();
        let target = video.clone();
        let on_playing = Closure::<dyn Fn(Event)>::new(move |_event: Event| {
            let step = s.autoplay.borrow_mut().on_playing();
            if step.unmute {
                target.set_muted(false);
                debug!(target: "content", "Unmuted");
            }
            s.post_all(step.commands);
        });
        match video.add_event_listener_with_callback("playing", on_playing.as_ref().unchecked_ref()) {
            Ok(()) => on_playing.forget(),
            Err(err) => warn!(target: "content", "Cannot watch playback: {}", describe(&err)),
        }
    }

    fn listen_player_messages(self: &Rc<Self>) -> Result<(), JsValue> {
        let s = self.clone();
        let callback = Closure::<dyn Fn(MessageEvent)>::new(move |event: MessageEvent| {
            let Some(data) = event.data().as_string() else {
                return;
            };
            let Some(player_event) = PlayerEvent::parse(&data) else {
                return;
            };
            let active = {
                let redirector = s.redirector.borrow();
                redirector.enabled() && redirector.config().autoplay
            };
            if !active {
                return;
            }
            let commands = s.autoplay.borrow_mut().on_player_event(&player_event);
            s.post_all(commands);
        });
        self.window
            .add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())?;
        callback.forget();
        Ok(())
    }

    // =========================================================================
    // Player messaging
    // =========================================================================

    fn post_all(self: &Rc<Self>, commands: Vec<ScheduledCommand>) {
        for scheduled in commands {
            if scheduled.delay.is_zero() {
                self.post(&scheduled.command);
                continue;
            }
            let s = self.clone();
            let command = scheduled.command;
            let callback = Closure::once_into_js(move || s.post(&command));
            if let Err(err) = self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                millis(scheduled.delay),
            ) {
                warn!(target: "content", "Could not schedule player command: {}", describe(&err));
            }
        }
    }

    fn post(&self, command: &PlayerCommand) {
        let message = match command.to_json() {
            Ok(json) => JsValue::from_str(&json),
            Err(err) => {
                warn!(target: "content", "Could not encode player command: {}", err);
                return;
            }
        };
        match self.window.post_message(&message, "*") {
            Ok(()) => debug!(target: "content", "Sent {}", command.func),
            Err(err) => debug!(target: "content", "postMessage failed: {}", describe(&err)),
        }
    }
}

fn millis(duration: Duration) -> i32 {
    duration.as_millis().min(i32::MAX as u128) as i32
}
