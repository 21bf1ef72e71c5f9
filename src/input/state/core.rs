//! Session input state: selection, action menu and recognition results.

use std::sync::Arc;

use crate::input::menu::Menu;
use crate::input::selection::Selection;
use crate::recognition::{ProviderKind, RecognitionRequest, RecognitionResult};
use crate::util::{Point, Rect};

/// Result text shown right after a selection is committed.
pub const READY_MESSAGE: &str = "Selection ready. Choose an option.";
/// Result text shown after a successful copy.
pub const COPIED_MESSAGE: &str = "Text copied!";

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// Menu "Close" or a termination signal.
    Closed,
    /// Escape pressed.
    Cancelled,
}

impl SessionExit {
    pub fn exit_code(self) -> u8 {
        match self {
            SessionExit::Closed => 0,
            SessionExit::Cancelled => 2,
        }
    }
}

/// Overlay currently under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveMonitor {
    pub id: u32,
    /// Logical size of the overlay.
    pub size: (u32, u32),
}

/// The committed selection, cropped and encoded.
#[derive(Debug, Clone)]
pub struct CapturedRegion {
    pub monitor: u32,
    pub png: Arc<Vec<u8>>,
    /// Logical top-left of the selection on its overlay.
    pub anchor: Point,
}

/// Work the backend performs on behalf of the input state.
#[derive(Debug, Clone)]
pub enum PendingAction {
    /// Crop `rect` out of the monitor's frozen image and call
    /// [`InputState::open_menu`].
    Commit { monitor: u32, rect: Rect },
    Recognize(RecognitionRequest),
    CopyText(String),
    Notify(String),
}

/// Behavior switches taken from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOptions {
    pub auto_copy: bool,
    pub notify: bool,
    /// Provider run on every commit without waiting for a button.
    pub auto_provider: Option<ProviderKind>,
}

/// Everything pointer and keyboard events mutate.
///
/// The backend feeds events in, drains [`take_pending`](Self::take_pending)
/// after each dispatch and redraws when `needs_redraw` is set.
pub struct InputState {
    pub(super) selection: Selection,
    pub(super) menu: Menu,
    pub(super) pointer: Point,
    pub(super) active: Option<ActiveMonitor>,
    pub(super) results: Vec<RecognitionResult>,
    pub(super) result_text: String,
    /// Text from the last successful recognition, if any.
    pub(super) recognized_text: Option<String>,
    pub(super) captured: Option<CapturedRegion>,
    /// Bumped on every new selection; stale recognition replies are dropped.
    pub(super) generation: u64,
    pub(super) options: InputOptions,
    pub(super) pending: Vec<PendingAction>,
    pub(super) exit: Option<SessionExit>,
    /// Whether the display needs to be redrawn
    pub needs_redraw: bool,
}

impl InputState {
    pub fn new(options: InputOptions) -> Self {
        Self {
            selection: Selection::new(),
            menu: Menu::new(&ProviderKind::ALL),
            pointer: Point::default(),
            active: None,
            results: Vec::new(),
            result_text: String::new(),
            recognized_text: None,
            captured: None,
            generation: 0,
            options,
            pending: Vec::new(),
            exit: None,
            needs_redraw: false,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn active_monitor(&self) -> Option<ActiveMonitor> {
        self.active
    }

    pub fn results(&self) -> &[RecognitionResult] {
        &self.results
    }

    pub fn result_text(&self) -> &str {
        &self.result_text
    }

    pub fn captured(&self) -> Option<&CapturedRegion> {
        self.captured.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn exit_requested(&self) -> Option<SessionExit> {
        self.exit
    }

    /// Ends the session from outside the input path (signals).
    pub fn request_exit(&mut self, exit: SessionExit) {
        if self.exit.is_none() {
            self.exit = Some(exit);
        }
    }

    /// Drains the actions queued since the last call.
    pub fn take_pending(&mut self) -> Vec<PendingAction> {
        std::mem::take(&mut self.pending)
    }

    /// Clears the one-frame pressed highlight once it has been rendered.
    pub fn frame_rendered(&mut self) {
        if self.menu.clear_pressed() {
            self.needs_redraw = true;
        }
    }

    /// Shows the action menu for a freshly cropped region.
    ///
    /// This is the only place a new selection supersedes the previous one:
    /// outstanding requests become stale and the old region and text go.
    ///
    /// `monitor_size` is the logical size of the overlay the region came from;
    /// the menu opens at the pointer and stays inside those bounds.
    pub fn open_menu(&mut self, region: CapturedRegion, monitor_size: (u32, u32)) {
        self.generation += 1;
        self.results.clear();
        self.recognized_text = None;
        self.result_text = READY_MESSAGE.to_string();
        self.captured = Some(region);
        self.menu.open_at(self.pointer, monitor_size);
        self.needs_redraw = true;

        if let Some(kind) = self.options.auto_provider {
            self.start_recognition(kind);
        }
    }

    /// Queues a recognition of the captured region with `kind`.
    pub(super) fn start_recognition(&mut self, kind: ProviderKind) {
        let Some(captured) = &self.captured else {
            return;
        };
        self.pending.push(PendingAction::Recognize(RecognitionRequest {
            kind,
            generation: self.generation,
            png: Arc::clone(&captured.png),
        }));
        self.result_text = format!("Recognizing with {}...", kind.label());
        self.needs_redraw = true;
    }

    /// Applies a finished recognition. Replies for an older selection are
    /// ignored.
    pub fn on_recognition_complete(
        &mut self,
        kind: ProviderKind,
        generation: u64,
        result: Result<Vec<RecognitionResult>, String>,
    ) {
        if generation != self.generation || self.captured.is_none() {
            log::debug!(
                "Discarding stale {} result (generation {}, current {})",
                kind,
                generation,
                self.generation
            );
            return;
        }

        match result {
            Ok(results) => {
                let text = crate::recognition::joined_text(&results);
                log::info!("{} recognized {} fragment(s)", kind.label(), results.len());
                self.results = results;
                self.result_text = text.clone();
                if !text.is_empty() {
                    if self.options.auto_copy {
                        self.pending.push(PendingAction::CopyText(text.clone()));
                    }
                    if self.options.notify {
                        self.pending.push(PendingAction::Notify(text.clone()));
                    }
                    self.recognized_text = Some(text);
                } else {
                    self.recognized_text = None;
                }
            }
            Err(reason) => {
                log::warn!("{} failed: {}", kind.label(), reason);
                self.results.clear();
                self.recognized_text = None;
                self.result_text = format!("{} failed: {}", kind.label(), reason);
            }
        }
        self.needs_redraw = true;
    }
}
