use anyhow::Result;
use cloudpos_client::monitor::MonitorEvent;

#[tokio::main]
async fn main() -> Result<()> {
    let pos = cloudpos_demos::init()?;
    let (mut monitor, mut events) = pos.monitor();
    monitor.start(true);
    println!(
        "Monitoreando {} cada {}s (Ctrl+C para salir)",
        pos.api_client().base_url(),
        monitor.interval().as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(MonitorEvent::OnlineChanged(true)) => println!("API en línea"),
                Some(MonitorEvent::OnlineChanged(false)) => println!("API sin conexión"),
                Some(MonitorEvent::Error(message)) => log::warn!("ping falló: {}", message),
                None => break,
            },
        }
    }

    monitor.stop();
    Ok(())
}
