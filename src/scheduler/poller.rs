use crate::bot::messages;
use crate::bot::notifier::{MessageGateway, Notifier};
use crate::db::entities::units;
use crate::db::repo::Repo;
use anyhow::Result;
use rand::RngExt;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};
use ur_client::{Availability, DanchiCode, RoomListing, UrClient};

/// Where vacancy information comes from
pub trait VacancySource: Send + Sync {
    fn query_vacancy(
        &self,
        code: &DanchiCode,
    ) -> impl Future<Output = ur_client::Result<Availability>> + Send;
}

impl VacancySource for UrClient {
    async fn query_vacancy(&self, code: &DanchiCode) -> ur_client::Result<Availability> {
        UrClient::query_vacancy(self, code).await
    }
}

/// Outcome of one poll run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub units_checked: usize,
    pub units_available: usize,
    pub notified: usize,
    pub failed: usize,
}

impl fmt::Display for PollSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checked {} unit(s), {} with vacancies, notified {} subscriber(s), {} failure(s)",
            self.units_checked, self.units_available, self.notified, self.failed
        )
    }
}

pub struct VacancyPoller<G, V> {
    repo: Arc<Repo>,
    notifier: Notifier<G>,
    source: V,
    unit_delay: Duration,
    jitter_ms: u64,
    running: Mutex<()>,
}

impl<G: MessageGateway, V: VacancySource> VacancyPoller<G, V> {
    pub fn new(
        repo: Arc<Repo>,
        notifier: Notifier<G>,
        source: V,
        unit_delay: Duration,
        jitter_ms: u64,
    ) -> Self {
        Self {
            repo,
            notifier,
            source,
            unit_delay,
            jitter_ms,
            running: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &Notifier<G> {
        &self.notifier
    }

    /// In-process loop, one run per `interval` plus random jitter
    pub async fn run(&self, interval: Duration) {
        info!("🚀 Vacancy poller started (interval {:?})", interval);

        loop {
            let jitter = rand::rng().random_range(0..=self.jitter_ms);
            sleep(interval + Duration::from_millis(jitter)).await;

            match self.run_once().await {
                Ok(summary) => info!("Poll run finished: {}", summary),
                Err(e) => error!("Poll run failed: {:#}", e),
            }
        }
    }

    /// Check every subscribed unit once and notify matching subscribers.
    ///
    /// Only a failure to list units aborts the run; anything that goes wrong
    /// for a single unit or subscriber is counted in `failed` and skipped.
    pub async fn run_once(&self) -> Result<PollSummary> {
        let _guard = self.running.lock().await;
        let mut summary = PollSummary::default();

        let units = self.repo.list_subscribed_units().await?;
        info!("Polling {} subscribed unit(s)", units.len());

        for (i, unit) in units.iter().enumerate() {
            if i > 0 && !self.unit_delay.is_zero() {
                sleep(self.unit_delay).await;
            }

            summary.units_checked += 1;
            self.check_unit(unit, &mut summary).await;

            if let Err(e) = self.repo.refresh_unit_flag(unit.id).await {
                error!("Failed to refresh flag of unit {}: {:#}", unit.unit_name, e);
                summary.failed += 1;
            }
        }

        Ok(summary)
    }

    async fn check_unit(&self, unit: &units::Model, summary: &mut PollSummary) {
        let code: DanchiCode = match unit.unit_code.parse() {
            Ok(code) => code,
            Err(e) => {
                error!("Unit {} has an invalid code: {}", unit.unit_name, e);
                summary.failed += 1;
                return;
            }
        };

        let availability = match self.source.query_vacancy(&code).await {
            Ok(availability) => availability,
            Err(e) => {
                error!("Vacancy query for unit {} ({}) failed: {}", unit.unit_name, code, e);
                summary.failed += 1;
                return;
            }
        };

        if !availability.is_available() {
            debug!("No vacancies for unit {}", unit.unit_name);
            return;
        }

        info!(
            "Unit {} has {} vacancies: {:?}",
            unit.unit_name, availability.count, availability.room_types
        );
        summary.units_available += 1;
        self.notify_subscribers(unit, &availability, summary).await;
    }

    async fn notify_subscribers(
        &self,
        unit: &units::Model,
        availability: &Availability,
        summary: &mut PollSummary,
    ) {
        let subscribers = match self.repo.list_unit_subscribers(unit.id).await {
            Ok(subs) => subs,
            Err(e) => {
                error!("Failed to list subscribers of unit {}: {:#}", unit.unit_name, e);
                summary.failed += 1;
                return;
            }
        };

        for sub in subscribers {
            if !sub.room_types.wants(&availability.room_types) {
                debug!(
                    "Skipping user {}: wants {}, available {:?}",
                    sub.line_user_id, sub.room_types, availability.room_types
                );
                continue;
            }

            let room_types = sub.room_types.matching(&availability.room_types);
            let rooms: Vec<&RoomListing> = availability
                .rooms
                .iter()
                .filter(|room| sub.room_types.accepts(&room.room_type))
                .collect();
            let text = messages::vacancy_notification(
                &unit.unit_name,
                availability.count,
                &room_types,
                &rooms,
                unit.url.as_deref(),
            );

            if let Err(e) = self.notifier.push(&sub.line_user_id, &text).await {
                error!(
                    "Failed to notify user {} about unit {}: {}",
                    sub.line_user_id, unit.unit_name, e
                );
                summary.failed += 1;
                continue;
            }
            summary.notified += 1;

            // Notifications are one-shot
            match self.repo.retire_subscription(sub.id).await {
                Ok(true) => {}
                Ok(false) => warn!("Subscription {} was already retired", sub.id),
                Err(e) => {
                    error!("Failed to retire subscription {}: {:#}", sub.id, e);
                    summary.failed += 1;
                }
            }
        }
    }
}
