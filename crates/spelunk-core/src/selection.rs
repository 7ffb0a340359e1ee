//! # Selection Guard
//!
//! Debug hosts expose a single process-wide "currently selected
//! thread/frame"; evaluating a value that lives in another thread's stack
//! means switching that selection, and the switch is visible to every other
//! caller. Nothing here is a lock, since there is no contention, only
//! contamination of caller-visible state. The discipline is scoped
//! save/restore: capture the focus on entry, restore it on *every* exit
//! path, success or failure.
//!
//! All focus changes in this crate go through [`FocusGuard`]; nothing
//! touches the host's ambient selection directly.

use tracing::warn;

use crate::error::Result;

/// A (thread, frame) selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus
{
    /// Host thread identifier
    pub thread: u64,
    /// Frame number within the thread, newest = 0
    pub frame: u32,
}

impl Focus
{
    pub fn new(thread: u64, frame: u32) -> Self
    {
        Focus { thread, frame }
    }
}

/// The host capability for reading and switching the ambient selection.
pub trait FocusHost
{
    fn focus(&self) -> Focus;

    fn set_focus(&mut self, focus: Focus) -> Result<()>;
}

/// RAII save/restore of the host selection.
///
/// Restores the captured focus on drop, which covers early returns and `?`
/// propagation. A failed restore is logged rather than panicked: the drop
/// path must never abort an unwind.
pub struct FocusGuard<'h, H: FocusHost + ?Sized>
{
    host: &'h mut H,
    saved: Focus,
}

impl<'h, H: FocusHost + ?Sized> FocusGuard<'h, H>
{
    /// Capture the current selection.
    pub fn save(host: &'h mut H) -> Self
    {
        let saved = host.focus();
        FocusGuard { host, saved }
    }

    /// The selection captured at guard creation.
    pub fn saved(&self) -> Focus
    {
        self.saved
    }

    /// Switch the host selection; the original is still restored on drop.
    pub fn switch(&mut self, focus: Focus) -> Result<()>
    {
        self.host.set_focus(focus)
    }

    pub fn host(&mut self) -> &mut H
    {
        self.host
    }
}

impl<H: FocusHost + ?Sized> Drop for FocusGuard<'_, H>
{
    fn drop(&mut self)
    {
        if self.host.focus() != self.saved {
            if let Err(err) = self.host.set_focus(self.saved) {
                warn!(%err, "failed to restore thread/frame focus");
            }
        }
    }
}

/// Run `body` under a temporary selection, restoring the previous one on
/// all exit paths.
pub fn with_focus<H, T, F>(host: &mut H, focus: Focus, body: F) -> Result<T>
where
    H: FocusHost + ?Sized,
    F: FnOnce(&mut H) -> Result<T>,
{
    let mut guard = FocusGuard::save(host);
    guard.switch(focus)?;
    body(guard.host())
}
