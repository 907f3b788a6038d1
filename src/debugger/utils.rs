use std::thread;

/// Name of a thread hosting the debug engine.
pub const ENGINE_THREAD: &str = "sdbg-engine";

/// Return true if current thread is an engine thread.
pub fn is_engine_thread() -> bool {
    thread::current().name() == Some(ENGINE_THREAD)
}

/// Execute `f` on the engine thread.
///
/// All debugee control operations and events must be processed by a single thread.
/// If called from other thread, engine thread is spawned and caller is blocked
/// until `f` completes.
pub fn on_engine_thread<F, R>(f: F) -> anyhow::Result<R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    if is_engine_thread() {
        return Ok(f());
    }

    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name(ENGINE_THREAD.to_string())
            .spawn_scoped(scope, f)?;
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("debug engine thread panicked"))
    })
}
