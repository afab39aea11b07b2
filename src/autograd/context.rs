//! Gradient-tracking mode for the current thread
//!
//! Operations only record graph nodes while tracking is enabled. Inference
//! and evaluation passes suspend it with [`no_grad`], which hands back a
//! guard that restores the previous mode when dropped.

use std::cell::Cell;

thread_local! {
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Check if operations currently record graph nodes
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(Cell::get)
}

/// Guard returned by [`no_grad`] and [`enable_grad`]
///
/// Dropping it restores the mode that was active when it was created,
/// including on early return or unwinding.
#[must_use = "tracking is restored as soon as the guard is dropped"]
pub struct GradModeGuard {
    previous: bool,
    // Mode is per-thread, so the guard must be dropped on the thread that made it
    _not_send: std::marker::PhantomData<*const ()>,
}

impl GradModeGuard {
    fn set(enabled: bool) -> Self {
        let previous = GRAD_ENABLED.with(|mode| mode.replace(enabled));
        Self {
            previous,
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Drop for GradModeGuard {
    fn drop(&mut self) {
        GRAD_ENABLED.with(|mode| mode.set(self.previous));
    }
}

/// Suspend gradient tracking until the guard is dropped
pub fn no_grad() -> GradModeGuard {
    GradModeGuard::set(false)
}

/// Re-enable gradient tracking until the guard is dropped
pub fn enable_grad() -> GradModeGuard {
    GradModeGuard::set(true)
}

/// Run `f` with gradient tracking suspended
pub fn with_no_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = no_grad();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_previous_mode() {
        assert!(is_grad_enabled());
        {
            let _outer = no_grad();
            assert!(!is_grad_enabled());
            {
                let _inner = enable_grad();
                assert!(is_grad_enabled());
            }
            assert!(!is_grad_enabled());
        }
        assert!(is_grad_enabled());
    }

    #[test]
    fn test_with_no_grad_restores_on_early_return() {
        fn early(flag: bool) -> Option<bool> {
            with_no_grad(|| {
                if flag {
                    return None;
                }
                Some(is_grad_enabled())
            })
        }

        assert_eq!(early(true), None);
        assert!(is_grad_enabled());
        assert_eq!(early(false), Some(false));
        assert!(is_grad_enabled());
    }

    #[test]
    fn test_mode_restored_after_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = no_grad();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(is_grad_enabled());
    }
}
