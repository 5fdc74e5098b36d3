//! External text hooks.
//!
//! A hook rewrites text after placeholder replacement and before markup parsing,
//! typically to hand the text to a third-party placeholder engine. Hooks are
//! untrusted: an `Err` or a panic from a hook leaves the text unchanged.

use crate::error::HookError;
use crate::placeholders::PlayerContext;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// A late-bound placeholder engine consulted for every rendered template when enabled.
pub trait PlaceholderEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Expands engine specific placeholders for the given player.
    fn expand(&self, text: &str, player: &PlayerContext) -> Result<String, HookError>;
}

/// Runs `hook` on `text`, returning the original text on error or panic.
pub fn apply_guarded<F>(name: &str, hook: F, text: &str) -> String
where
    F: FnOnce(&str) -> Result<String, HookError>,
{
    match catch_unwind(AssertUnwindSafe(|| hook(text))) {
        Ok(Ok(expanded)) => expanded,
        Ok(Err(e)) => {
            warn!("Text hook {} failed, keeping original text: {}", name, e);
            text.to_string()
        }
        Err(panic_info) => {
            let message = panic_message(panic_info.as_ref());
            warn!(
                "{}",
                HookError::Panicked(name.to_string(), message)
            );
            text.to_string()
        }
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_hook() {
        let out = apply_guarded("upper", |t| Ok(t.to_uppercase()), "abc");
        assert_eq!(out, "ABC");
    }

    #[test]
    fn test_failing_hook_keeps_text() {
        let out = apply_guarded(
            "broken",
            |_| Err(HookError::Failed("broken".into(), "offline".into())),
            "abc",
        );
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_panicking_hook_keeps_text() {
        let out = apply_guarded("panicky", |_| panic!("engine exploded"), "abc");
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
