//! [`GuardedState`] — a single reader-writer lock plus the rollback
//! discipline mutating operations must follow (spec §5, §9).

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Wraps the state a schema engine protects with its single big lock
/// (definitions, entity map, primary/unique indices — spec §5).
///
/// Readers take a shared lock for the duration of a scan (queries hold it
/// only as long as it takes to copy out candidate ids; the scan itself
/// runs over an owned copy so a long-running query never blocks writers
/// indefinitely). Writers take the exclusive lock only for the critical
/// section that reorders indices and the entity map, releasing it before
/// any I/O.
pub struct GuardedState<T> {
    inner: RwLock<T>,
}

impl<T> GuardedState<T> {
    /// Wrap `value` behind the lock.
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    /// Acquire a shared read lock, e.g. for `get`/`list_of_type`/a query scan.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Run a read-only closure under the shared lock.
    pub fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.read())
    }

    /// Acquire the exclusive writer lock directly. Prefer
    /// [`GuardedState::mutate_with_rollback`] for any mutation that is
    /// followed by a persistence step; use this only for mutations with no
    /// external durability step of their own (none exist in the engine
    /// today, but the escape hatch is kept for testing).
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    /// Apply the rollback discipline:
    ///
    /// 1. Acquire the writer lock and run `mutate`, which both performs the
    ///    in-memory change and returns an `undo` closure capturing whatever
    ///    state is needed to invert it exactly.
    /// 2. Release the lock.
    /// 3. Run `persist`.
    /// 4. On `Err`, reacquire the writer lock, run `undo`, and propagate
    ///    the error. On `Ok`, return the mutation's output unchanged.
    pub fn mutate_with_rollback<Out, Err>(
        &self,
        mutate: impl FnOnce(&mut T) -> (Out, Box<dyn FnOnce(&mut T) + Send>),
        persist: impl FnOnce(&Out) -> Result<(), Err>,
    ) -> Result<Out, Err> {
        let (out, undo) = {
            let mut guard = self.inner.write();
            mutate(&mut guard)
        };

        match persist(&out) {
            Ok(()) => Ok(out),
            Err(e) => {
                let mut guard = self.inner.write();
                undo(&mut guard);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_restores_prior_state_on_persist_failure() {
        let state = GuardedState::new(vec![1, 2, 3]);

        let result: Result<(), &'static str> = state.mutate_with_rollback(
            |v| {
                v.push(4);
                let undo: Box<dyn FnOnce(&mut Vec<i32>) + Send> = Box::new(|v| {
                    v.pop();
                });
                ((), undo)
            },
            |_| Err("disk full"),
        );

        assert_eq!(result, Err("disk full"));
        assert_eq!(*state.read(), vec![1, 2, 3]);
    }

    #[test]
    fn successful_persist_keeps_mutation() {
        let state = GuardedState::new(vec![1, 2, 3]);

        let result: Result<(), &'static str> = state.mutate_with_rollback(
            |v| {
                v.push(4);
                let undo: Box<dyn FnOnce(&mut Vec<i32>) + Send> = Box::new(|v| {
                    v.pop();
                });
                ((), undo)
            },
            |_| Ok(()),
        );

        assert!(result.is_ok());
        assert_eq!(*state.read(), vec![1, 2, 3, 4]);
    }
}
