use anyhow::Result;

/// Waits for a termination request and returns the name of the signal that fired.
#[cfg(unix)]
pub async fn wait_for_shutdown() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    let name = tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
    };
    Ok(name)
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
