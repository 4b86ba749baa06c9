use areakit::{
    init_logging_with, ComponentHandle, DispatchOutcome, ReceiverOptions, Session,
    SettingsManager, Signal, SignalCategory, Target, Value, BUILD_DATE, VERSION,
};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

fn main() -> anyhow::Result<()> {
    let settings = SettingsManager::load_or_default();
    init_logging_with(&settings.log_filter)?;
    tracing::info!("AreaKit {} built {}", VERSION, BUILD_DATE);

    let session = Session::start(&settings)?;
    let bus = session.bus().clone();

    let mut trace = bus.trace_receiver();
    let tracer = std::thread::Builder::new()
        .name("areakit-trace".to_string())
        .spawn(move || {
            loop {
                let record = match trace.blocking_recv() {
                    Ok(record) => record,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!("Trace listener lagged, {} record(s) missed", missed);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if record.outcome == DispatchOutcome::Delivered {
                    continue;
                }
                match record.to_json() {
                    Ok(json) => tracing::info!(target: "areakit::trace", "{}", json),
                    Err(e) => tracing::warn!("Unserializable trace record: {}", e),
                }
            }
        })?;

    let area_tree = ComponentHandle::new("area tree");
    let slot_table = ComponentHandle::new("slot table");

    bus.component_receiver(
        &*area_tree,
        SignalCategory::Area,
        ReceiverOptions::new().identifier("area-tree-refresh"),
        |m| tracing::info!("area tree: {} from {}", m.signal(), m.source()),
    )?;
    bus.component_receiver(
        &*slot_table,
        Signal::UpdateSlots,
        ReceiverOptions::new(),
        |m| tracing::info!("slot table: {} {:?}", m.signal(), m.related_info()),
    )?;
    bus.receivers(
        "status bar",
        [Signal::ShowStatusText, Signal::AreaChanged],
        |m| tracing::info!("status: {} {:?}", m.signal(), m.related_info()),
    )?;

    area_tree.attach();
    slot_table.attach();

    for _ in 0..3 {
        bus.transmit("editor", Signal::AreaChanged)?;
    }
    areakit_core::transmit!(bus, "editor", Signal::UpdateSlots, 4)?;
    areakit_core::transmit!(bus, "editor", Signal::ShowStatusText, "saved")?;
    bus.transmit_to(
        "editor",
        Target::group("preview"),
        Signal::SelectArea,
        vec![Value::from(2)],
    )?;

    bus.disable_signal(Signal::UpdateSlots);
    areakit_core::transmit!(bus, "editor", Signal::UpdateSlots, 5)?;
    bus.enable_signal(Signal::UpdateSlots)?;
    bus.invoke_later(|m| {
        tracing::info!("deferred call ran after queued traffic ({})", m.signal());
        Ok(())
    })?;

    std::thread::sleep(Duration::from_millis(200));
    slot_table.detach();
    areakit_core::transmit!(bus, "editor", Signal::UpdateSlots, 6)?;
    std::thread::sleep(Duration::from_millis(100));

    tracing::info!(
        "{} receiver(s) registered, {} survivor(s) live",
        bus.receiver_count(),
        bus.survivor_count()
    );

    session.shutdown();
    drop(bus);
    if tracer.join().is_err() {
        tracing::error!("Trace thread terminated abnormally");
    }
    Ok(())
}
