use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{ClerkError, Result};
use crate::fmt::fixed2;
use crate::models::{
    Client, ClientFilter, ClientUpdate, FetchError, PaymentStatus, StripeEnvironment,
    SubscriptionStatus, SyncErrors,
};
use crate::normalize::{epoch_to_datetime, map_subscription_status, monthly_equivalent, normalize_amount};
use crate::store::Store;
use crate::stripe::{ApiResult, Customer, Interval, PaymentGateway, PaymentRecord, Subscription};

const DAY_SECS: i64 = 86_400;
const MONTH_SECS: i64 = 30 * DAY_SECS;

/// The Stripe ids a sync should fetch. Usually taken from the stored client,
/// but callers may pass an edited set that has not been saved yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReferences {
    pub customer_id: Option<String>,
    pub payment_intent_ids: Vec<String>,
    pub subscription_ids: Vec<String>,
}

impl SyncReferences {
    pub fn from_client(client: &Client) -> Self {
        Self {
            customer_id: client.stripe_customer_id.clone(),
            payment_intent_ids: client.stripe_payment_intent_ids.clone(),
            subscription_ids: client.stripe_subscription_ids.clone(),
        }
    }
}

/// Everything fetched for one sync, including what could not be fetched.
#[derive(Debug, Clone)]
pub struct StripeData {
    pub customer: Option<Customer>,
    pub payment_records: Vec<PaymentRecord>,
    pub subscriptions: Vec<Subscription>,
    pub errors: SyncErrors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionDetail {
    pub id: String,
    pub amount: f64,
    pub interval: Interval,
    pub interval_count: u32,
    pub monthly_equivalent: f64,
    pub total_paid: f64,
    pub status: String,
    pub start_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub total_paid: String,
    pub one_time_total: f64,
    pub subscription_total: f64,
    pub subscription_monthly_value: String,
    pub succeeded_payments: usize,
    pub subscription_count: usize,
    pub payment_status: PaymentStatus,
    pub subscription_status: SubscriptionStatus,
    pub environment: StripeEnvironment,
    pub subscriptions: Vec<SubscriptionDetail>,
    pub errors: SyncErrors,
    pub has_errors: bool,
}

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub client: Client,
    pub stripe_data: StripeData,
    pub summary: SyncSummary,
}

/// Totals and statuses derived from one client's Stripe data.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub one_time_total: f64,
    pub subscription_total: f64,
    pub subscription_monthly_value: f64,
    pub succeeded_payments: usize,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    pub subscription_status: SubscriptionStatus,
    pub subscriptions: Vec<SubscriptionDetail>,
}

impl Reconciliation {
    pub fn total_paid(&self) -> f64 {
        self.one_time_total + self.subscription_total
    }
}

/// Whole months a subscription has been running, counting 30-day months and
/// never less than one.
pub fn months_active(created: i64, now: DateTime<Utc>) -> i64 {
    ((now.timestamp() - created) / MONTH_SECS).max(1)
}

/// Estimated amount collected over the life of a subscription.
pub fn subscription_detail(sub: &Subscription, now: DateTime<Utc>) -> Option<SubscriptionDetail> {
    let price = sub.first_price()?;
    let amount = normalize_amount(price.unit_amount);
    let count = price.interval_count as i64;
    let monthly = monthly_equivalent(amount, price.interval, price.interval_count);
    let months = months_active(sub.created, now);

    let total_paid = match price.interval {
        Interval::Month => amount * (months / count) as f64,
        Interval::Year => amount * (months / (12 * count)) as f64,
        Interval::Week | Interval::Day => monthly * months as f64,
    };

    Some(SubscriptionDetail {
        id: sub.id.clone(),
        amount,
        interval: price.interval,
        interval_count: price.interval_count,
        monthly_equivalent: monthly,
        total_paid,
        status: sub.status.clone(),
        start_date: epoch_to_datetime(sub.created),
    })
}

/// Derive totals and statuses from fetched data. Pure.
pub fn reconcile(data: &StripeData, now: DateTime<Utc>) -> Reconciliation {
    let succeeded: Vec<&PaymentRecord> = data
        .payment_records
        .iter()
        .filter(|p| p.is_succeeded())
        .collect();
    let one_time_total: f64 = succeeded.iter().map(|p| normalize_amount(p.amount)).sum();
    let latest_created = succeeded.iter().map(|p| p.created).max();

    let subscriptions: Vec<SubscriptionDetail> = data
        .subscriptions
        .iter()
        .filter_map(|s| subscription_detail(s, now))
        .collect();
    let subscription_total: f64 = subscriptions.iter().map(|d| d.total_paid).sum();
    let subscription_monthly_value: f64 = subscriptions.iter().map(|d| d.monthly_equivalent).sum();

    let errors = &data.errors;
    let payment_status = if errors.customer.is_some() || !errors.payment_intents.is_empty() {
        PaymentStatus::Overdue
    } else if let Some(latest) = latest_created {
        let cutoff = (now - Duration::days(30)).timestamp();
        if latest >= cutoff {
            PaymentStatus::Current
        } else {
            PaymentStatus::PastDue
        }
    } else {
        PaymentStatus::Overdue
    };

    // List order, not creation order: the last id the client lists wins.
    let subscription_status = if !errors.subscriptions.is_empty() {
        SubscriptionStatus::Unpaid
    } else if let Some(last) = data.subscriptions.last() {
        map_subscription_status(&last.status)
    } else {
        SubscriptionStatus::Canceled
    };

    Reconciliation {
        one_time_total,
        subscription_total,
        subscription_monthly_value,
        succeeded_payments: succeeded.len(),
        last_payment_date: latest_created.map(epoch_to_datetime),
        payment_status,
        subscription_status,
        subscriptions,
    }
}

fn split_results<T>(kind: &str, results: Vec<(&String, ApiResult<T>)>) -> (Vec<T>, Vec<FetchError>) {
    let mut ok = Vec::new();
    let mut failed = Vec::new();
    for (id, result) in results {
        match result {
            Ok(item) => ok.push(item),
            Err(e) => {
                tracing::warn!(%id, kind, error = %e, "stripe fetch failed");
                failed.push(e.into_fetch_error(id));
            }
        }
    }
    (ok, failed)
}

/// Outcome of syncing every client in one environment.
#[derive(Debug, Default)]
pub struct SyncAllReport {
    pub results: Vec<SyncResult>,
    pub failures: Vec<(i64, ClerkError)>,
    pub skipped: usize,
}

/// Sync engine bound to one Stripe environment and one store.
pub struct Reconciler<'a, G: PaymentGateway, S: Store> {
    gateway: &'a G,
    store: &'a S,
}

impl<'a, G: PaymentGateway, S: Store> Reconciler<'a, G, S> {
    pub fn new(gateway: &'a G, store: &'a S) -> Self {
        Self { gateway, store }
    }

    /// Fetch the customer, then each payment, then each subscription, one
    /// request at a time. A failed id is recorded and the rest still run.
    pub fn fetch(&self, refs: &SyncReferences) -> StripeData {
        let mut errors = SyncErrors::default();

        let customer = match &refs.customer_id {
            Some(id) => match self.gateway.get_customer(id) {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(%id, error = %e, "stripe customer fetch failed");
                    errors.customer = Some(e.into_fetch_error(id));
                    None
                }
            },
            None => None,
        };

        let payments = refs
            .payment_intent_ids
            .iter()
            .map(|id| (id, self.gateway.get_payment_record(id)))
            .collect();
        let (payment_records, payment_errors) = split_results("payment", payments);
        errors.payment_intents = payment_errors;

        let subs = refs
            .subscription_ids
            .iter()
            .map(|id| (id, self.gateway.get_subscription(id)))
            .collect();
        let (subscriptions, subscription_errors) = split_results("subscription", subs);
        errors.subscriptions = subscription_errors;

        StripeData {
            customer,
            payment_records,
            subscriptions,
            errors,
        }
    }

    pub fn sync_client(&self, client_id: i64, refs: &SyncReferences) -> Result<SyncResult> {
        self.sync_client_at(client_id, refs, Utc::now())
    }

    pub fn sync_client_at(
        &self,
        client_id: i64,
        refs: &SyncReferences,
        now: DateTime<Utc>,
    ) -> Result<SyncResult> {
        let client = self.store.get_client(client_id)?;
        let environment = self.gateway.environment();
        if client.stripe_environment != environment {
            return Err(ClerkError::EnvironmentMismatch {
                client_id,
                client: client.stripe_environment,
                gateway: environment,
            });
        }

        tracing::info!(
            client_id,
            env = %environment,
            payments = refs.payment_intent_ids.len(),
            subscriptions = refs.subscription_ids.len(),
            "syncing client"
        );

        let data = self.fetch(refs);
        let rec = reconcile(&data, now);
        let has_errors = data.errors.has_errors();

        let update = ClientUpdate {
            total_paid: Some(rec.total_paid()),
            subscription_monthly_value: Some(rec.subscription_monthly_value),
            payment_status: Some(rec.payment_status),
            subscription_status: Some(Some(rec.subscription_status)),
            last_payment_date: rec.last_payment_date.map(Some),
            sync_errors: Some(has_errors.then(|| data.errors.clone())),
            last_synced_at: Some(Some(now)),
            ..ClientUpdate::default()
        };
        let client = self.store.update_client(client_id, &update)?;

        tracing::info!(
            client_id,
            total_paid = %fixed2(rec.total_paid()),
            payment_status = %rec.payment_status,
            subscription_status = %rec.subscription_status,
            has_errors,
            "client synced"
        );

        let summary = SyncSummary {
            total_paid: fixed2(rec.total_paid()),
            one_time_total: rec.one_time_total,
            subscription_total: rec.subscription_total,
            subscription_monthly_value: fixed2(rec.subscription_monthly_value),
            succeeded_payments: rec.succeeded_payments,
            subscription_count: data.subscriptions.len(),
            payment_status: rec.payment_status,
            subscription_status: rec.subscription_status,
            environment,
            subscriptions: rec.subscriptions,
            errors: data.errors.clone(),
            has_errors,
        };

        Ok(SyncResult {
            client,
            stripe_data: data,
            summary,
        })
    }

    /// Sync every client of this environment that has at least one Stripe
    /// reference. One client's fatal error does not stop the others.
    pub fn sync_all(&self) -> Result<SyncAllReport> {
        let clients = self.store.list_clients(&ClientFilter {
            environment: Some(self.gateway.environment()),
            ..ClientFilter::default()
        })?;

        let mut report = SyncAllReport::default();
        for client in clients {
            if !client.has_stripe_references() {
                report.skipped += 1;
                continue;
            }
            match self.sync_client(client.id, &SyncReferences::from_client(&client)) {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    tracing::warn!(client_id = client.id, error = %e, "client sync failed");
                    report.failures.push((client.id, e));
                }
            }
        }
        Ok(report)
    }
}

/// Runs a client's sync at most once per session. Later calls for the same
/// client return `Ok(None)` without touching Stripe. A sync that fails with
/// a fatal error does not count.
#[derive(Debug, Default)]
pub struct AutoSync {
    synced: HashSet<i64>,
}

impl AutoSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync_once<G: PaymentGateway, S: Store>(
        &mut self,
        engine: &Reconciler<'_, G, S>,
        client_id: i64,
        refs: &SyncReferences,
    ) -> Result<Option<SyncResult>> {
        if !self.synced.insert(client_id) {
            return Ok(None);
        }
        match engine.sync_client(client_id, refs) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                self.synced.remove(&client_id);
                Err(e)
            }
        }
    }
}
