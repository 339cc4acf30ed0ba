use crate::artifacts::checkout::action::Action;
use crate::artifacts::checkout::options::{NotifyCallback, NotifyFlags};
use crate::errors::{CheckoutError, Result};
use tracing::debug;

/// Report every action whose classification is enabled in `flags`, in plan
/// order. Returns how many notifications were delivered; a non-zero return
/// from the callback stops the walk and cancels the checkout.
pub fn notify_all(
    actions: &[Action],
    flags: NotifyFlags,
    callback: Option<&mut NotifyCallback<'_>>,
) -> Result<usize> {
    let Some(callback) = callback else {
        return Ok(0);
    };

    let mut delivered = 0;
    for action in actions {
        let Some(kind) = action.notify_kind() else {
            continue;
        };
        if !flags.intersects(kind.as_flag()) {
            continue;
        }

        delivered += 1;
        let code = callback(kind, &action.path, action.notify_files());
        if code != 0 {
            debug!(path = %action.path.display(), code, "checkout cancelled by notify callback");
            return Err(CheckoutError::Cancelled { code });
        }
    }

    Ok(delivered)
}
