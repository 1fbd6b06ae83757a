use std::time::Duration;

use tracing::*;

use super::{LifecycleContext, LifecycleState, PowerState, ShutdownSignal};
use crate::{
    compose::compose,
    display::{DifferentialRenderer, DisplayDevice, DisplayError, RenderReport},
    sensor::SensorPipeline,
};

/// Drives sample -> compose -> render at a fixed interval.
///
/// The display is powered on by [`Controller::start`] and powered off exactly
/// once: by [`Controller::stop`], at the end of [`Controller::run`], or when
/// the controller is dropped while the display is still on.
pub struct Controller<D: DisplayDevice> {
    display: D,
    pipeline: SensorPipeline,
    renderer: DifferentialRenderer,
    context: LifecycleContext,
    interval: Duration,
    state: LifecycleState,
}

impl<D: DisplayDevice> Controller<D> {
    /// `display` must already be initialized.
    pub fn new(
        display: D,
        pipeline: SensorPipeline,
        interval: Duration,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            display,
            pipeline,
            renderer: DifferentialRenderer::new(),
            context: LifecycleContext::new(shutdown),
            interval,
            state: LifecycleState::Initializing,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn power(&self) -> PowerState {
        self.context.power
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Power the display on and enter `Running`.
    #[instrument(level = "debug", skip(self))]
    pub fn start(&mut self) -> Result<(), DisplayError> {
        if self.state != LifecycleState::Initializing {
            return Ok(());
        }

        self.display.set_power(true)?;
        self.context.power = PowerState::On;
        self.state = LifecycleState::Running;
        let (rows, columns) = self.display.geometry();
        info!(
            "Display on ({columns}x{rows}), sampling every {:?}",
            self.interval
        );
        Ok(())
    }

    /// Run one full cycle. Write failures are logged and retried on the next
    /// cycle, they never stop the loop.
    pub async fn run_cycle(&mut self) -> RenderReport {
        let snapshot = self.pipeline.sample().await;
        let (usage, temperature) = compose(&snapshot);

        let mut report = RenderReport::default();
        for (row, line) in [usage, temperature].iter().enumerate() {
            match self.renderer.render(&mut self.display, row, line) {
                Ok(row_report) => report += row_report,
                Err(error) => warn!("Failed to render row {row}: {error}"),
            }
        }

        if report.failures > 0 {
            warn!("{} cell writes failed, retrying next cycle", report.failures);
        }
        debug!("Cycle done: {report:?}");
        report
    }

    /// Loop until a shutdown is requested, then power the display off.
    ///
    /// A shutdown is only observed between cycles, a cycle that has started
    /// always completes. The wait between cycles ends early on a request.
    #[instrument(level = "debug", skip(self))]
    pub async fn run(&mut self) -> Result<(), DisplayError> {
        self.start()?;

        while self.state == LifecycleState::Running && !self.context.shutdown.is_requested() {
            self.run_cycle().await;

            if self.context.shutdown.is_requested() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.context.shutdown.wait() => {}
            }
        }

        self.stop();
        Ok(())
    }

    /// Power the display off if it is on. Returns whether a power-off write
    /// was issued; later calls are no-ops.
    #[instrument(level = "debug", skip(self))]
    pub fn stop(&mut self) -> bool {
        if self.context.power == PowerState::Off {
            self.state = LifecycleState::Stopped;
            return false;
        }

        self.state = LifecycleState::Stopping;
        if let Err(error) = self.display.set_power(false) {
            error!("Failed to power the display off: {error}");
        }
        // Not retried: the display is considered off either way
        self.context.power = PowerState::Off;
        self.state = LifecycleState::Stopped;
        info!("Display off");
        true
    }
}

impl<D: DisplayDevice> Drop for Controller<D> {
    fn drop(&mut self) {
        if self.context.power == PowerState::On {
            debug!("Controller dropped with the display on");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::sensor::{
        CpuTemperatureSource, DeviceTemperatureSource, FilesystemUsage, FilesystemUsageSource,
        SensorError,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Power(bool),
        Cell(usize, usize, char),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
        fail_power: bool,
    }

    impl Recorder {
        fn power_events(&self) -> Vec<bool> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    Event::Power(on) => Some(*on),
                    Event::Cell(..) => None,
                })
                .collect()
        }
    }

    impl DisplayDevice for Recorder {
        fn set_power(&mut self, on: bool) -> Result<(), DisplayError> {
            if self.fail_power {
                return Err(DisplayError::Bus("nack".into()));
            }
            self.events.lock().unwrap().push(Event::Power(on));
            Ok(())
        }

        fn write_cell(
            &mut self,
            row: usize,
            column: usize,
            character: char,
        ) -> Result<(), DisplayError> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Cell(row, column, character));
            Ok(())
        }
    }

    struct Fixed;

    #[async_trait]
    impl CpuTemperatureSource for Fixed {
        async fn read(&self) -> Result<i32, SensorError> {
            Ok(35)
        }
    }

    #[async_trait]
    impl DeviceTemperatureSource for Fixed {
        async fn read(&self, _device: &Path) -> Result<i32, SensorError> {
            Ok(33)
        }
    }

    #[async_trait]
    impl FilesystemUsageSource for Fixed {
        async fn read(&self, _mount: &Path) -> Result<FilesystemUsage, SensorError> {
            Ok(FilesystemUsage {
                total_bytes: 1 << 40,
                used_bytes: 512 << 20,
            })
        }
    }

    fn controller(display: Recorder, shutdown: ShutdownSignal) -> Controller<Recorder> {
        let pipeline = SensorPipeline::new(
            "/",
            [PathBuf::from("/dev/sda"), PathBuf::from("/dev/sdb")],
            Box::new(Fixed),
            Box::new(Fixed),
            Box::new(Fixed),
        );
        Controller::new(display, pipeline, Duration::from_secs(5), shutdown)
    }

    #[tokio::test]
    async fn start_powers_on_once() {
        let display = Recorder::default();
        let mut controller = controller(display.clone(), ShutdownSignal::new());

        controller.start().unwrap();
        controller.start().unwrap();

        assert_eq!(controller.state(), LifecycleState::Running);
        assert_eq!(controller.power(), PowerState::On);
        assert_eq!(display.power_events(), vec![true]);
    }

    #[tokio::test]
    async fn failed_power_on_writes_nothing_else() {
        let display = Recorder {
            fail_power: true,
            ..Default::default()
        };
        let mut controller = controller(display.clone(), ShutdownSignal::new());

        assert!(controller.start().is_err());
        assert_eq!(controller.power(), PowerState::Off);
        drop(controller);

        assert!(display.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_cycle_without_changes_writes_nothing() {
        let display = Recorder::default();
        let mut controller = controller(display.clone(), ShutdownSignal::new());
        controller.start().unwrap();

        let first = controller.run_cycle().await;
        let second = controller.run_cycle().await;

        assert_eq!(first.writes, 15 + 14);
        assert_eq!(second, RenderReport::default());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let display = Recorder::default();
        let mut controller = controller(display.clone(), ShutdownSignal::new());
        controller.start().unwrap();

        assert!(controller.stop());
        assert!(!controller.stop());
        drop(controller);

        assert_eq!(display.power_events(), vec![true, false]);
    }

    #[tokio::test]
    async fn drop_powers_off() {
        let display = Recorder::default();
        let mut controller = controller(display.clone(), ShutdownSignal::new());
        controller.start().unwrap();
        drop(controller);

        assert_eq!(display.power_events(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_after_current_cycle() {
        let display = Recorder::default();
        let shutdown = ShutdownSignal::new();
        let mut controller = controller(display.clone(), shutdown.clone());

        let requester = async {
            tokio::time::sleep(Duration::from_secs(12)).await;
            shutdown.request();
            shutdown.request();
        };
        let (result, ()) = tokio::join!(controller.run(), requester);
        result.unwrap();

        assert_eq!(controller.state(), LifecycleState::Stopped);
        drop(controller);

        let events = display.events.lock().unwrap().clone();
        assert_eq!(events.first(), Some(&Event::Power(true)));
        assert_eq!(events.last(), Some(&Event::Power(false)));
        assert_eq!(display.power_events(), vec![true, false]);
    }

    #[tokio::test]
    async fn run_with_shutdown_already_requested_only_toggles_power() {
        let display = Recorder::default();
        let shutdown = ShutdownSignal::new();
        shutdown.request();

        let mut controller = controller(display.clone(), shutdown);
        controller.run().await.unwrap();

        assert_eq!(
            *display.events.lock().unwrap(),
            vec![Event::Power(true), Event::Power(false)]
        );
    }
}
