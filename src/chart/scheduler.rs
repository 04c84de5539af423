use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use crate::chart::{Chart, SchedulerTuning};
use crate::error::{ChartError, ChartResult};
use crate::render::{FontMetrics, Renderer};

struct SchedulerShared {
    stopped: Mutex<bool>,
    wake: Condvar,
    sleep_ms: AtomicU64,
    passes: AtomicU64,
}

/// Background thread running render passes with an adaptive sleep.
///
/// The sleep grows while the pending queue stays empty and shrinks in
/// proportion to its depth otherwise, within the chart's
/// [`SchedulerTuning`] bounds. Dropping the scheduler stops it.
pub struct RenderScheduler {
    shared: Arc<SchedulerShared>,
    worker: Option<JoinHandle<()>>,
}

impl RenderScheduler {
    pub fn spawn<R, M>(chart: Chart, renderer: R, metrics: M) -> ChartResult<Self>
    where
        R: Renderer + 'static,
        M: FontMetrics + Send + 'static,
    {
        let tuning = chart.scheduler_tuning();
        let shared = Arc::new(SchedulerShared {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
            sleep_ms: AtomicU64::new(tuning.min_sleep_ms),
            passes: AtomicU64::new(0),
        });
        let worker_shared = Arc::clone(&shared);
        let chart_id = chart.id();
        let worker = thread::Builder::new()
            .name(format!("livechart-render-{}", chart_id.0))
            .spawn(move || run(&chart, renderer, &metrics, tuning, &worker_shared))
            .map_err(|err| ChartError::Scheduler(format!("failed to spawn render thread: {err}")))?;
        debug!(chart = ?chart_id, ?tuning, "render scheduler started");
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Sleep the worker chose before its latest pass.
    #[must_use]
    pub fn current_sleep(&self) -> Duration {
        Duration::from_millis(self.shared.sleep_ms.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn passes(&self) -> u64 {
        self.shared.passes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Interrupts the current sleep and joins the worker.
    pub fn stop(mut self) -> ChartResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> ChartResult<()> {
        *self.shared.stopped.lock() = true;
        self.shared.wake.notify_all();
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker
            .join()
            .map_err(|_| ChartError::Scheduler("render thread panicked".to_owned()))
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!(error = %err, "render scheduler did not shut down cleanly");
        }
    }
}

fn run<R: Renderer, M: FontMetrics>(
    chart: &Chart,
    mut renderer: R,
    metrics: &M,
    tuning: SchedulerTuning,
    shared: &SchedulerShared,
) {
    let mut sleep = tuning.min_sleep();
    loop {
        sleep = tuning.next_sleep(sleep, chart.pending_len());
        let sleep_ms = u64::try_from(sleep.as_millis()).unwrap_or(u64::MAX);
        shared.sleep_ms.store(sleep_ms, Ordering::Relaxed);
        {
            let mut stopped = shared.stopped.lock();
            if !*stopped {
                shared.wake.wait_for(&mut stopped, sleep);
            }
            if *stopped {
                break;
            }
        }

        let frame = chart.render_pass(metrics);
        if let Err(err) = renderer.render(&frame) {
            warn!(chart = ?chart.id(), pass = frame.pass, error = %err, "renderer rejected frame");
        }
        shared.passes.fetch_add(1, Ordering::Relaxed);
    }
    debug!(chart = ?chart.id(), "render scheduler stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use super::RenderScheduler;
    use crate::chart::{ChartConfig, ChartContext};
    use crate::core::{DataPoint, StorageKind};
    use crate::error::ChartResult;
    use crate::render::{FixedFontMetrics, RenderFrame, Renderer};

    struct ChannelRenderer(mpsc::Sender<RenderFrame>);

    impl Renderer for ChannelRenderer {
        fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
            let _ = self.0.send(frame.clone());
            Ok(())
        }
    }

    #[test]
    fn scheduler_drains_queue_and_stops_promptly() {
        let context = ChartContext::new();
        let chart = context.create_chart(&ChartConfig::default()).expect("chart");
        let series = context
            .create_series("cpu", StorageKind::InsertionOrder)
            .expect("series");
        chart.attach(&series).expect("attach");

        let (sender, frames) = mpsc::channel();
        let scheduler = RenderScheduler::spawn(
            chart.clone(),
            ChannelRenderer(sender),
            FixedFontMetrics::default(),
        )
        .expect("spawn");
        series.add_point(DataPoint::new(1.0, 1.0)).expect("add");
        series.add_point(DataPoint::new(2.0, 3.0)).expect("add");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut drained = false;
        while Instant::now() < deadline {
            match frames.recv_timeout(Duration::from_millis(100)) {
                Ok(frame) if frame.point_count() == 2 => {
                    drained = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(drained, "scheduler never rendered both points");
        assert!(scheduler.passes() >= 1);
        assert!(scheduler.is_running());

        let sleep = scheduler.current_sleep();
        assert!(sleep >= Duration::from_millis(10) && sleep <= Duration::from_millis(1_000));

        let stopping = Instant::now();
        scheduler.stop().expect("stop");
        assert!(stopping.elapsed() < Duration::from_millis(500));
    }
}
