//! Jumping from a reference back to the code that loads it.

use parking_lot::Mutex;

use crate::model::{MethodRef, SourcePosition, StringReference};

/// Outcome of a [`CodeView::show`] request, handed to its completion callback.
///
/// The callback may set `has_moved_caret` once it has positioned the caret itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowCompletion {
    pub success: bool,
    pub has_moved_caret: bool,
}

/// Host code view able to display a method and place a caret in it.
pub trait CodeView {
    /// Display `method`, then invoke `on_complete` before returning.
    fn show(
        &self,
        method: &MethodRef,
        new_tab: bool,
        on_complete: &mut dyn FnMut(&mut ShowCompletion),
    );

    /// Source position of the statement containing `offset`, if debug info maps it.
    fn find_by_offset(&self, method: &MethodRef, offset: u32) -> Option<SourcePosition>;

    fn move_caret_to(&self, position: &SourcePosition);
}

/// Show the referrer of `reference` and place the caret on the loading statement.
///
/// Returns `true` when the view ended up focused on a concrete position. A method with
/// no debug info for the offset is not an error; the caret simply stays put.
pub fn navigate(view: &dyn CodeView, reference: &StringReference, new_tab: bool) -> bool {
    let referrer = reference.referrer();
    let mut moved = false;
    view.show(referrer, new_tab, &mut |completion: &mut ShowCompletion| {
        if completion.success && !completion.has_moved_caret {
            completion.has_moved_caret = go_to(view, referrer, reference.offset());
        }
        moved = completion.success && completion.has_moved_caret;
    });
    moved
}

fn go_to(view: &dyn CodeView, method: &MethodRef, offset: u32) -> bool {
    match view.find_by_offset(method, offset) {
        Some(position) => {
            view.move_caret_to(&position);
            true
        }
        None => false,
    }
}

#[derive(Debug, Default)]
struct ViewState {
    tabs: usize,
    active: Option<MethodRef>,
    caret: Option<SourcePosition>,
}

/// In-memory [`CodeView`] that maps offsets through the method's own sequence points.
#[derive(Debug, Default)]
pub struct DebugInfoCodeView {
    state: Mutex<ViewState>,
}

impl DebugInfoCodeView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab_count(&self) -> usize {
        self.state.lock().tabs
    }

    pub fn active_method(&self) -> Option<MethodRef> {
        self.state.lock().active.clone()
    }

    pub fn caret(&self) -> Option<SourcePosition> {
        self.state.lock().caret.clone()
    }
}

impl CodeView for DebugInfoCodeView {
    fn show(
        &self,
        method: &MethodRef,
        new_tab: bool,
        on_complete: &mut dyn FnMut(&mut ShowCompletion),
    ) {
        {
            let mut state = self.state.lock();
            if new_tab || state.tabs == 0 {
                state.tabs += 1;
            }
            state.active = Some(method.clone());
            state.caret = None;
        }
        // Lock released: the callback calls back into this view.
        let mut completion = ShowCompletion { success: true, has_moved_caret: false };
        on_complete(&mut completion);
    }

    fn find_by_offset(&self, method: &MethodRef, offset: u32) -> Option<SourcePosition> {
        method.method().find_sequence_point(offset).map(|sp| sp.position())
    }

    fn move_caret_to(&self, position: &SourcePosition) {
        self.state.lock().caret = Some(position.clone());
    }
}
