use tokio::task::JoinHandle;

/// Aborts the wrapped background task when dropped, so a component's
/// driver tasks never outlive the component.
pub(crate) struct TaskGuard {
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
