/*!
 * Signal State Around Fork
 *
 * Signal masks and dispositions are process-wide (the mask per thread),
 * so every launch runs its block-fork-restore sequence under one lock.
 */

use crate::core::errors::{SystemError, SystemResult};
use nix::sys::signal::{pthread_sigmask, signal, SigHandler, SigSet, SigmaskHow, Signal};
use parking_lot::{const_mutex, Mutex, MutexGuard};
use tracing::warn;

static LAUNCH_LOCK: Mutex<()> = const_mutex(());

/// Serialize launches within this process
///
/// Held from pipe/descriptor setup until the parent has restored its
/// signal mask after fork.
pub(crate) fn launch_lock() -> MutexGuard<'static, ()> {
    LAUNCH_LOCK.lock()
}

/// All signals blocked on the calling thread; the previous mask is kept
pub(crate) struct BlockedSignals {
    previous: SigSet,
    restored: bool,
}

impl BlockedSignals {
    pub(crate) fn block_all() -> SystemResult<Self> {
        let mut previous = SigSet::empty();
        pthread_sigmask(
            SigmaskHow::SIG_SETMASK,
            Some(&SigSet::all()),
            Some(&mut previous),
        )
        .map_err(|errno| SystemError::os_call("pthread_sigmask", "while blocking signals", errno))?;

        Ok(Self {
            previous,
            restored: false,
        })
    }

    /// Put the previous mask back (parent side)
    pub(crate) fn restore(mut self) -> SystemResult<()> {
        self.restored = true;
        pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None).map_err(|errno| {
            SystemError::os_call("pthread_sigmask", "while restoring signal mask", errno)
        })
    }

    /// Put the previous mask back in a forked child
    ///
    /// Allocation-free and infallible from the caller's view.
    pub(crate) fn restore_in_child(&self) {
        let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None);
    }
}

impl Drop for BlockedSignals {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(errno) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
                warn!(%errno, "failed to restore signal mask");
            }
        }
    }
}

/// Stop child terminations from leaving zombies in this process
///
/// Process-wide and never undone: later `Process::join` calls on
/// children of this process fail with ECHILD once those children exit.
pub(crate) fn ignore_child_termination() -> SystemResult<()> {
    // SAFETY: SIG_IGN installs no handler code
    unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }
        .map(drop)
        .map_err(|errno| SystemError::os_call("signal", "while ignoring SIGCHLD", errno))
}

/// Default dispositions a freshly forked child must start from
pub(crate) fn reset_child_dispositions(reset_sigchld: bool) {
    // SAFETY: SIG_DFL installs no handler code; sigaction is async-signal-safe
    unsafe {
        let _ = signal(Signal::SIGTERM, SigHandler::SigDfl);
        let _ = signal(Signal::SIGINT, SigHandler::SigDfl);
        if reset_sigchld {
            let _ = signal(Signal::SIGCHLD, SigHandler::SigDfl);
        }
    }
}
