use rand::Rng;
use rand::rngs::StdRng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::IntakeConfig;

/// Timing and step bounds for simulated upload progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    pub interval: Duration,
    pub step_min: u8,
    pub step_max: u8,
}

impl ProgressSettings {
    pub fn from_config(config: &IntakeConfig) -> Self {
        Self {
            interval: config.progress_interval,
            step_min: config.progress_step_min.max(1),
            step_max: config.progress_step_max.max(config.progress_step_min).max(1),
        }
    }

    /// Upper bound on ticks needed to reach 100
    pub fn max_ticks(&self) -> u32 {
        100u32.div_ceil(u32::from(self.step_min))
    }
}

/// Bounded stochastic counter: 0 to 100 in random steps
#[derive(Debug)]
pub struct ProgressSimulator<R: Rng> {
    progress: u8,
    rng: R,
    settings: ProgressSettings,
}

impl<R: Rng> ProgressSimulator<R> {
    pub fn new(settings: ProgressSettings, rng: R) -> Self {
        Self {
            progress: 0,
            rng,
            settings,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }

    /// Advances one step. Returns `None` once 100 has been reported.
    pub fn tick(&mut self) -> Option<u8> {
        if self.is_complete() {
            return None;
        }

        let step = self
            .rng
            .gen_range(self.settings.step_min..=self.settings.step_max);
        self.progress = self.progress.saturating_add(step).min(100);
        Some(self.progress)
    }
}

/// Cancellable handle to a running progress timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct ProgressTimer {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ProgressTimer {
    /// Starts ticking every `settings.interval`, first tick one interval from now.
    ///
    /// `on_tick` receives each new value; returning `false` stops the timer.
    /// The timer stops on its own after reporting 100.
    pub fn start<F>(settings: ProgressSettings, rng: StdRng, mut on_tick: F) -> Self
    where
        F: FnMut(u8) -> bool + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            let mut simulator = ProgressSimulator::new(settings, rng);
            let mut interval =
                tokio::time::interval_at(Instant::now() + settings.interval, settings.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(progress) = simulator.tick() else { break };
                        if !on_tick(progress) || progress >= 100 {
                            break;
                        }
                    }
                }
            }
        });

        Self { token, task }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ProgressTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
