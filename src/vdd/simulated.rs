//! In-memory virtual display driver
//!
//! Behaves like the Parsec adapter from the caller's point of view: requests are
//! acknowledged immediately and the resulting display set is published to every
//! subscriber. Used on non-Windows platforms and throughout the test suite.

use crate::error::{Result, StringError, VdisplayError};
use crate::vdd::{
    ChangeNotifier, Display, DisplayChange, DisplayDriver, DriverStatus, MAX_DISPLAYS,
    Subscription,
};
use parking_lot::Mutex;
use std::sync::mpsc::Receiver;
use tracing::{debug, info};

/// Number of requests of each kind the driver has accepted or rejected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverCalls {
    /// `add_display` calls
    pub add: usize,
    /// `remove_last_display` calls
    pub remove: usize,
    /// `invalidate` calls
    pub invalidate: usize,
}

#[derive(Debug)]
struct SimState {
    displays: Vec<Display>,
    physical_monitors: usize,
    status: DriverStatus,
    version: String,
    fail_requests: bool,
    calls: DriverCalls,
}

/// In-memory [`DisplayDriver`]
#[derive(Debug)]
pub struct SimulatedDriver {
    state: Mutex<SimState>,
    notifier: ChangeNotifier,
    max_displays: usize,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    /// Driver with no virtual displays and one physical monitor
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                displays: Vec::new(),
                physical_monitors: 1,
                status: DriverStatus::Ok,
                version: "0.45".to_string(),
                fail_requests: false,
                calls: DriverCalls::default(),
            }),
            notifier: ChangeNotifier::new(),
            max_displays: MAX_DISPLAYS,
        }
    }

    /// Override the display limit
    #[must_use]
    pub fn with_max_displays(mut self, max: usize) -> Self {
        self.max_displays = max;
        self
    }

    /// Set how many physical monitors the simulated system has
    #[must_use]
    pub fn with_physical_monitors(self, count: usize) -> Self {
        self.state.lock().physical_monitors = count;
        self
    }

    /// Start with `count` virtual displays already present
    #[must_use]
    pub fn with_displays(self, count: usize) -> Self {
        {
            let mut state = self.state.lock();
            for _ in 0..count {
                let display = Self::make_display(state.displays.len());
                state.displays.push(display);
            }
        }
        self
    }

    /// Report `status` from `query_status`
    #[must_use]
    pub fn with_status(self, status: DriverStatus) -> Self {
        self.state.lock().status = status;
        self
    }

    /// Make every subsequent request fail with a driver error
    pub fn set_fail_requests(&self, fail: bool) {
        self.state.lock().fail_requests = fail;
    }

    /// Requests received so far
    pub fn calls(&self) -> DriverCalls {
        self.state.lock().calls
    }

    /// Snapshot of the current display set
    pub fn displays(&self) -> Vec<Display> {
        self.state.lock().displays.clone()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    fn make_display(position: usize) -> Display {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "position is bounded by the display limit"
        )]
        let index = position as u32;
        Display {
            index,
            device_name: format!(r"\\.\DISPLAY{}", index + 10),
            width: 1920,
            height: 1080,
            refresh_rate: 60,
        }
    }

    fn snapshot(state: &SimState) -> DisplayChange {
        DisplayChange {
            displays: state.displays.clone(),
            no_monitors: state.displays.is_empty() && state.physical_monitors == 0,
        }
    }

    fn check_failure(state: &SimState, request: &str) -> Result<()> {
        if state.fail_requests {
            return Err(VdisplayError::DriverError(StringError::new(format!(
                "{request} rejected by simulated driver"
            ))));
        }
        Ok(())
    }

    fn publish(&self, change: &DisplayChange) {
        let delivered = self.notifier.publish(change);
        debug!(
            "Simulated driver published {} display(s) to {} subscriber(s)",
            change.displays.len(),
            delivered
        );
    }
}

impl DisplayDriver for SimulatedDriver {
    fn add_display(&self) -> Result<()> {
        let change = {
            let mut state = self.state.lock();
            state.calls.add += 1;
            Self::check_failure(&state, "add")?;
            if state.displays.len() >= self.max_displays {
                return Err(VdisplayError::DisplayLimitReached {
                    max: self.max_displays,
                });
            }
            let added = Self::make_display(state.displays.len());
            info!("Simulated display added: {}", added.device_name);
            state.displays.push(added);
            Self::snapshot(&state)
        };
        self.publish(&change);
        Ok(())
    }

    fn remove_last_display(&self) -> Result<()> {
        let change = {
            let mut state = self.state.lock();
            state.calls.remove += 1;
            Self::check_failure(&state, "remove")?;
            if let Some(removed) = state.displays.pop() {
                info!("Simulated display removed: {}", removed.device_name);
            }
            Self::snapshot(&state)
        };
        self.publish(&change);
        Ok(())
    }

    fn invalidate(&self) -> Result<()> {
        let change = {
            let mut state = self.state.lock();
            state.calls.invalidate += 1;
            Self::check_failure(&state, "invalidate")?;
            Self::snapshot(&state)
        };
        self.publish(&change);
        Ok(())
    }

    fn query_status(&self) -> DriverStatus {
        self.state.lock().status
    }

    fn query_version(&self) -> Result<String> {
        Ok(self.state.lock().version.clone())
    }

    fn display_count(&self) -> usize {
        self.state.lock().displays.len()
    }

    fn max_displays(&self) -> usize {
        self.max_displays
    }

    fn subscribe(&self) -> (Subscription, Receiver<DisplayChange>) {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_publishes_new_display_set() {
        let driver = SimulatedDriver::new();
        let (_sub, rx) = driver.subscribe();

        driver.add_display().unwrap();
        let change = rx.try_recv().unwrap();
        assert_eq!(change.displays.len(), 1);
        assert!(!change.no_monitors);
        assert_eq!(driver.display_count(), 1);
        assert_eq!(driver.calls().add, 1);
    }

    #[test]
    fn test_remove_last_on_empty_still_publishes() {
        let driver = SimulatedDriver::new();
        let (_sub, rx) = driver.subscribe();

        driver.remove_last_display().unwrap();
        assert!(rx.try_recv().unwrap().displays.is_empty());
    }

    #[test]
    fn test_remove_last_pops_most_recent() {
        let driver = SimulatedDriver::new().with_displays(3);
        driver.remove_last_display().unwrap();
        let indices: Vec<u32> = driver.displays().iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_no_monitors_flag() {
        let driver = SimulatedDriver::new().with_physical_monitors(0);
        let (_sub, rx) = driver.subscribe();

        driver.invalidate().unwrap();
        assert!(rx.try_recv().unwrap().no_monitors);

        driver.add_display().unwrap();
        assert!(!rx.try_recv().unwrap().no_monitors);
    }

    #[test]
    fn test_add_beyond_limit_is_rejected() {
        let driver = SimulatedDriver::new().with_max_displays(1).with_displays(1);
        let result = driver.add_display();
        assert!(matches!(
            result,
            Err(VdisplayError::DisplayLimitReached { max: 1 })
        ));
    }

    #[test]
    fn test_failing_requests_publish_nothing() {
        let driver = SimulatedDriver::new();
        let (_sub, rx) = driver.subscribe();
        driver.set_fail_requests(true);

        assert!(driver.add_display().is_err());
        assert!(driver.invalidate().is_err());
        assert!(rx.try_recv().is_err());
        assert_eq!(driver.calls().add, 1);
    }
}
