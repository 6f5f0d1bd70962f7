use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, internally-mutable context handed to every hook of a flow.
///
/// Lock guards obtained from this struct are blocking and MUST NOT be held
/// across `.await` suspension points.
#[derive(Debug)]
pub struct Ctx<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> Ctx<T> {
  pub fn new(data: T) -> Self {
    Ctx(Arc::new(RwLock::new(data)))
  }

  /// Acquires a read lock. The guard must be dropped before any `.await`.
  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  /// Acquires a write lock. The guard must be dropped before any `.await`.
  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Attempts to acquire a read lock without blocking.
  pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
    self.0.try_read()
  }

  /// Attempts to acquire a write lock without blocking.
  pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
    self.0.try_write()
  }
}

impl<T: Send + Sync + 'static> Clone for Ctx<T> {
  fn clone(&self) -> Self {
    Ctx(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for Ctx<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
