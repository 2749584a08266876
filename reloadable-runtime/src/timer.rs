//! Reload timer: reloads a unit on a fixed interval.

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use reloadable_core::{ReloadInterval, ReloadTrigger, UnitImplementation};

use crate::task::{stopped, trigger_reload, TaskControl};
use crate::unit::Reloadable;

pub(crate) fn spawn_reload_timer<T: UnitImplementation>(
    runtime: &Handle,
    unit: Weak<Reloadable<T>>,
    interval: ReloadInterval,
    reload_on_start: bool,
    control: Arc<TaskControl>,
) {
    tracing::info!(
        unit = %control.unit(),
        interval = %interval,
        reload_on_start,
        "periodic reloading started",
    );
    runtime.spawn(timer_loop(unit, interval, reload_on_start, control));
}

async fn timer_loop<T: UnitImplementation>(
    unit: Weak<Reloadable<T>>,
    interval: ReloadInterval,
    reload_on_start: bool,
    control: Arc<TaskControl>,
) {
    let period = interval.as_duration();
    let first = if reload_on_start {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = interval_at(first, period);
    // A reload that overruns the interval pushes the schedule back instead of
    // queueing catch-up ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut stop_rx = control.subscribe();
    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut stop_rx) => break,
            _ = ticker.tick() => {
                if !trigger_reload(&unit, ReloadTrigger::Timer, &control).await {
                    break;
                }
            }
        }
    }
    tracing::debug!(unit = %control.unit(), "reload timer exited");
}
