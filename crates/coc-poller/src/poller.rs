//! Public surface of the engine
//!
//! `Poller` owns the three watch sets, the shared dispatcher, the four loops
//! and the scheduler that runs them. Watch-set mutations are synchronous and
//! take effect on the next pass of the affected category; `clear` is the one
//! exception, cooperatively cutting the running pass short.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use coc_api::{Fetcher, normalize_tag};
use tracing::{debug, info};

use crate::config::PollerConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::events::{Emitter, EventReceiver};
use crate::handlers::{Handlers, UpdateHandler};
use crate::maintenance::MaintenanceProbe;
use crate::scheduler::Scheduler;
use crate::sweep::{Category, SweepLoop};
use crate::telemetry;
use crate::watch_set::WatchSet;

pub struct Poller {
    clans: Arc<WatchSet>,
    players: Arc<WatchSet>,
    wars: Arc<WatchSet>,
    sweeps: [Arc<SweepLoop>; 3],
    maintenance: Arc<MaintenanceProbe>,
    dispatcher: Arc<Dispatcher>,
    scheduler: Scheduler,
    initialized: AtomicBool,
}

impl Poller {
    /// Build a poller with the default diffing handlers.
    ///
    /// Returns the poller and the receiving end of its event channel. Fails
    /// with `Error::Config` on an empty token pool or zero rate limit.
    pub fn new(config: PollerConfig, fetcher: Arc<dyn Fetcher>) -> Result<(Self, EventReceiver)> {
        Self::with_handlers(config, fetcher, Handlers::default())
    }

    pub fn with_handlers(
        config: PollerConfig,
        fetcher: Arc<dyn Fetcher>,
        handlers: Handlers,
    ) -> Result<(Self, EventReceiver)> {
        let dispatcher = Arc::new(Dispatcher::new(&config, fetcher)?);
        let (emitter, events) = Emitter::channel();

        let clans = Arc::new(WatchSet::new());
        let players = Arc::new(WatchSet::new());
        let wars = Arc::new(WatchSet::new());

        let sweep = |category: Category,
                     watch_set: &Arc<WatchSet>,
                     handler: Arc<dyn UpdateHandler>| {
            Arc::new(SweepLoop::new(
                category,
                watch_set.clone(),
                dispatcher.clone(),
                handler,
                emitter.clone(),
                config.refresh_rate,
            ))
        };
        let sweeps = [
            sweep(Category::Clan, &clans, handlers.clan),
            sweep(Category::Player, &players, handlers.player),
            sweep(Category::War, &wars, handlers.war),
        ];

        let maintenance = Arc::new(MaintenanceProbe::new(
            dispatcher.clone(),
            emitter,
            config.maintenance_interval,
        ));

        info!(
            tokens = config.tokens.len(),
            rate_limit = config.rate_limit,
            refresh_rate_ms = config.refresh_rate.as_millis() as u64,
            "poller created"
        );

        Ok((
            Self {
                clans,
                players,
                wars,
                sweeps,
                maintenance,
                dispatcher,
                scheduler: Scheduler::new(),
                initialized: AtomicBool::new(false),
            },
            events,
        ))
    }

    fn watch_set(&self, category: Category) -> &WatchSet {
        match category {
            Category::Clan => &self.clans,
            Category::Player => &self.players,
            Category::War => &self.wars,
        }
    }

    /// Watch `tags` in `category`. Malformed tags are skipped.
    ///
    /// Returns how many tags were newly added.
    pub fn add<I, S>(&self, category: Category, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.watch_set(category);
        let mut added = 0;
        for raw in tags {
            match normalize_tag(raw.as_ref()) {
                Some(tag) => added += usize::from(set.add(&tag)),
                None => debug!(
                    category = category.label(),
                    tag = raw.as_ref(),
                    "ignoring malformed tag"
                ),
            }
        }
        telemetry::set_watched(category.label(), set.len());
        added
    }

    /// Stop watching `tags`. Returns how many were removed.
    pub fn remove<I, S>(&self, category: Category, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.watch_set(category);
        let removed = tags
            .into_iter()
            .filter_map(|raw| normalize_tag(raw.as_ref()))
            .filter(|tag| set.remove(tag))
            .count();
        telemetry::set_watched(category.label(), set.len());
        removed
    }

    /// Stop watching everything in `category`, cutting a running pass short.
    pub fn clear(&self, category: Category) {
        self.watch_set(category).clear();
        telemetry::set_watched(category.label(), 0);
        info!(category = category.label(), "watch set cleared");
    }

    pub fn has(&self, category: Category, tag: &str) -> bool {
        normalize_tag(tag).is_some_and(|tag| self.watch_set(category).has(&tag))
    }

    pub fn count(&self, category: Category) -> usize {
        self.watch_set(category).len()
    }

    /// Watched tags in sweep order.
    pub fn tags(&self, category: Category) -> Vec<String> {
        self.watch_set(category).keys().collect()
    }

    pub fn add_clans<I: IntoIterator<Item = S>, S: AsRef<str>>(&self, tags: I) -> usize {
        self.add(Category::Clan, tags)
    }

    pub fn add_players<I: IntoIterator<Item = S>, S: AsRef<str>>(&self, tags: I) -> usize {
        self.add(Category::Player, tags)
    }

    /// Watch the current war of each clan in `tags`.
    pub fn add_wars<I: IntoIterator<Item = S>, S: AsRef<str>>(&self, tags: I) -> usize {
        self.add(Category::War, tags)
    }

    pub fn remove_clans<I: IntoIterator<Item = S>, S: AsRef<str>>(&self, tags: I) -> usize {
        self.remove(Category::Clan, tags)
    }

    pub fn remove_players<I: IntoIterator<Item = S>, S: AsRef<str>>(&self, tags: I) -> usize {
        self.remove(Category::Player, tags)
    }

    pub fn remove_wars<I: IntoIterator<Item = S>, S: AsRef<str>>(&self, tags: I) -> usize {
        self.remove(Category::War, tags)
    }

    pub fn clear_clans(&self) {
        self.clear(Category::Clan);
    }

    pub fn clear_players(&self) {
        self.clear(Category::Player);
    }

    pub fn clear_wars(&self) {
        self.clear(Category::War);
    }

    pub fn in_maintenance(&self) -> bool {
        self.maintenance.in_maintenance()
    }

    pub fn is_running(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && !self.scheduler.is_cancelled()
    }

    /// Start the maintenance probe and the three sweeps.
    ///
    /// Idempotent. The first call resolves once every loop has completed its
    /// first step and scheduled the next; the loops then run until
    /// `shutdown`.
    pub async fn init(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("poller already initialized");
            return;
        }
        info!(
            clans = self.clans.len(),
            players = self.players.len(),
            wars = self.wars.len(),
            "starting poll loops"
        );

        let probe = self.maintenance.clone();
        let mut ready = vec![self.scheduler.spawn_loop("maintenance", move || {
            let probe = probe.clone();
            async move { probe.step().await }
        })];
        for sweep in &self.sweeps {
            let sweep = sweep.clone();
            let name = sweep.category().label();
            ready.push(self.scheduler.spawn_loop(name, move || {
                let sweep = sweep.clone();
                async move { sweep.step().await }
            }));
        }

        for signal in ready {
            // A loop that stopped before its first step (shutdown) never
            // signals; there is nothing left to wait for.
            let _ = signal.await;
        }
        info!("poll loops running");
    }

    /// Cancel every loop and pending reschedule, then wait for them to exit.
    ///
    /// In-flight and queued requests are abandoned. Idempotent.
    pub async fn shutdown(&self) {
        if self.scheduler.is_cancelled() {
            return;
        }
        self.dispatcher.close();
        self.scheduler.shutdown().await;
        info!("poller stopped");
    }

    #[cfg(test)]
    fn sweep(&self, category: Category) -> &SweepLoop {
        match category {
            Category::Clan => &self.sweeps[0],
            Category::Player => &self.sweeps[1],
            Category::War => &self.sweeps[2],
        }
    }
}
