use std::sync::Arc;
use std::time::Duration;

use super::Orchestrator;
use crate::host::{InstantClock, NoPowerHint, PowerHint, WorldClock};
use crate::lock::profile::ProfilerConfig;
use crate::lock::DEFAULT_SPIN_LIMIT;
use crate::pool::{Inline, RayonPool, WorkerPool};

/// Immutable settings of an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct Config {
    /// The number of worker threads of the default worker pool.
    ///
    /// The thread calling [`Orchestrator::tick`] is not a worker thread,
    /// so it is valid to set a concurrency of 0 to run every system inline.
    pub concurrency:             usize,
    /// The period between two ticks started by [`Orchestrator::start`].
    pub tick_period:             Duration,
    /// Ready systems are only dispatched to the worker pool
    /// if there are more of them than this number.
    pub system_inline_threshold: usize,
    /// Whether pausing and resuming all systems toggles the power hint.
    pub turbo_on_pause:          bool,
    /// Contention profiling installed into every table lock.
    pub profiler:                Option<ProfilerConfig>,
    /// The number of spins before a table lock parks the thread.
    pub spin_limit:              u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency:             match std::thread::available_parallelism() {
                Ok(c) => c.get(),
                Err(err) => {
                    log::error!("Cannot detect number of CPUs ({err}), parallelism disabled");
                    0
                }
            },
            tick_period:             Duration::from_millis(16),
            system_inline_threshold: 1,
            turbo_on_pause:          false,
            profiler:                None,
            spin_limit:              DEFAULT_SPIN_LIMIT,
        }
    }
}

/// Builds an [`Orchestrator`].
#[derive(Default)]
pub struct Builder {
    pub(crate) config: Config,
    pub(crate) clock:  Option<Arc<dyn WorldClock>>,
    pub(crate) power:  Option<Arc<dyn PowerHint>>,
    pub(crate) pool:   Option<Arc<dyn WorkerPool>>,
}

impl Builder {
    /// Sets the number of worker threads of the default worker pool.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Sets the period of [`Orchestrator::start`].
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.config.tick_period = period;
        self
    }

    /// Sets the number of ready systems up to which a tick runs systems inline.
    pub fn system_inline_threshold(mut self, threshold: usize) -> Self {
        self.config.system_inline_threshold = threshold;
        self
    }

    /// Toggles the power hint when all systems are paused or resumed.
    pub fn turbo_on_pause(mut self, enabled: bool) -> Self {
        self.config.turbo_on_pause = enabled;
        self
    }

    /// Profiles contention of every table lock.
    pub fn profiler(mut self, config: ProfilerConfig) -> Self {
        self.config.profiler = Some(config);
        self
    }

    /// Sets the number of spins before a table lock parks the thread.
    pub fn spin_limit(mut self, spin_limit: u32) -> Self {
        self.config.spin_limit = spin_limit;
        self
    }

    /// Replaces the clock stamping new entities.
    pub fn clock(mut self, clock: Arc<dyn WorldClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replaces the receiver of power mode hints.
    pub fn power_hint(mut self, power: Arc<dyn PowerHint>) -> Self {
        self.power = Some(power);
        self
    }

    /// Replaces the worker pool running systems.
    ///
    /// [`Config::concurrency`] is ignored if a pool is provided.
    pub fn pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Orchestrator {
        let Builder { config, clock, power, pool } = self;

        let clock = clock.unwrap_or_else(|| Arc::new(InstantClock::default()));
        let power = power.unwrap_or_else(|| Arc::new(NoPowerHint));
        let pool = pool.unwrap_or_else(|| {
            if config.concurrency > 0 {
                Arc::new(RayonPool::new(config.concurrency))
            } else {
                Arc::new(Inline)
            }
        });

        Orchestrator::from_parts(config, clock, power, pool)
    }
}
