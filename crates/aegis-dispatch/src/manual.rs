use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use aegis_types::dispatch::ControlAxes;

use crate::CommandDispatcher;

/// Manual/joystick mode driver.
///
/// While engaged, posts the current 4-axis control vector at a fixed cadence;
/// disengaging stops the stream immediately. Axes always pass through
/// clamping, so a wild input device cannot push values outside [-1, 1].
pub struct ManualControl {
    dispatcher: Arc<dyn CommandDispatcher>,
    axes: Arc<Mutex<ControlAxes>>,
    cadence: Duration,
    on_error: Arc<dyn Fn(&str) + Send + Sync>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ManualControl {
    pub fn new(
        dispatcher: Arc<dyn CommandDispatcher>,
        cadence_hz: f64,
        on_error: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        let cadence_hz = cadence_hz.clamp(0.5, 60.0);
        Self {
            dispatcher,
            axes: Arc::new(Mutex::new(ControlAxes::NEUTRAL)),
            cadence: Duration::from_secs_f64(1.0 / cadence_hz),
            on_error: Arc::new(on_error),
            task: Mutex::new(None),
        }
    }

    /// Starts the cadence loop. A second call while engaged is a no-op.
    pub fn engage(&self) {
        let mut task = match self.task.lock() {
            Ok(task) => task,
            Err(_) => return,
        };
        if task.is_some() {
            return;
        }
        info!("manual control engaged ({:?} cadence)", self.cadence);

        let dispatcher = self.dispatcher.clone();
        let axes = self.axes.clone();
        let on_error = self.on_error.clone();
        let cadence = self.cadence;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            loop {
                ticker.tick().await;
                let current = axes.lock().map(|a| *a).unwrap_or(ControlAxes::NEUTRAL);
                if let Err(err) = dispatcher.send_axes(current).await {
                    warn!("manual control send failed: {err}");
                    on_error(&format!("Control vector not transmitted: {err}"));
                }
            }
        }));
    }

    /// Stops the cadence loop immediately.
    pub fn disengage(&self) {
        let handle = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            handle.abort();
            info!("manual control disengaged");
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.task.lock().map(|task| task.is_some()).unwrap_or(false)
    }

    pub fn set_axes(&self, axes: ControlAxes) {
        if let Ok(mut current) = self.axes.lock() {
            *current = axes.clamped();
        }
    }

    pub fn axes(&self) -> ControlAxes {
        self.axes.lock().map(|a| *a).unwrap_or(ControlAxes::NEUTRAL)
    }
}

impl Drop for ManualControl {
    fn drop(&mut self) {
        self.disengage();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::MockDispatcher;

    #[test]
    fn axes_are_clamped_on_set() {
        let manual = ManualControl::new(Arc::new(MockDispatcher::new()), 10.0, |_| {});
        manual.set_axes(ControlAxes {
            left_vertical: 5.0,
            left_horizontal: -5.0,
            right_vertical: 0.5,
            right_horizontal: 0.0,
        });
        let axes = manual.axes();
        assert_eq!(axes.left_vertical, 1.0);
        assert_eq!(axes.left_horizontal, -1.0);
        assert_eq!(axes.right_vertical, 0.5);
    }

    #[tokio::test]
    async fn engage_streams_axes_at_cadence() {
        let mock = Arc::new(MockDispatcher::new());
        let manual = ManualControl::new(mock.clone(), 50.0, |_| {});

        manual.engage();
        assert!(manual.is_engaged());
        tokio::time::sleep(Duration::from_millis(150)).await;
        manual.disengage();
        assert!(!manual.is_engaged());

        let sent = mock.recorded_calls().len();
        assert!(sent >= 3, "expected several control posts, saw {sent}");

        // No further posts after disengage.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(mock.recorded_calls().len(), sent);
    }

    #[tokio::test]
    async fn engage_twice_is_a_noop() {
        let mock = Arc::new(MockDispatcher::new());
        let manual = ManualControl::new(mock.clone(), 50.0, |_| {});
        manual.engage();
        manual.engage();
        tokio::time::sleep(Duration::from_millis(60)).await;
        manual.disengage();
        assert!(!manual.is_engaged());
    }

    #[tokio::test]
    async fn send_failures_are_reported_not_thrown() {
        let mock = Arc::new(MockDispatcher::new());
        mock.set_failing(true);
        let reported = Arc::new(AtomicUsize::new(0));
        let counter = reported.clone();
        let manual = ManualControl::new(mock, 50.0, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manual.engage();
        tokio::time::sleep(Duration::from_millis(100)).await;
        manual.disengage();
        assert!(reported.load(Ordering::SeqCst) >= 1);
    }
}
