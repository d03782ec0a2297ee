//! Feature store and workflow engine.
//!
//! Every operation runs under one store-wide async mutex, so the
//! read-validate-mutate-persist sequence of an operation is atomic with
//! respect to every other operation on the same store. Waiters are served
//! in acquisition order.
//!
//! Mutations are staged: the new record goes into a copy of the table, the
//! copy is persisted, and only then does it replace the live table.

use chrono::Utc;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Instrument};

use super::authorization::{Action, Role};
use super::errors::RegistryError;
use super::similarity::{average_ratio, DEFAULT_FUZZY_THRESHOLD};
use super::types::*;
use super::validation::{require_non_empty, validate_create, validate_update};
use crate::persistence::{
    encode_table, load_table, ByteStore, FeatureTable, FileByteStore, MemoryByteStore,
    PersistenceError,
};
use crate::telemetry::{create_operation_span, generate_correlation_id};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub fail_open_on_load: bool,
    pub pretty_json: bool,
    pub fuzzy_threshold: f64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            fail_open_on_load: true,
            pretty_json: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

pub struct FeatureStore {
    table: Mutex<FeatureTable>,
    backend: Arc<dyn ByteStore>,
    options: StoreOptions,
}

impl std::fmt::Debug for FeatureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureStore")
            .field("location", &self.backend.location())
            .field("options", &self.options)
            .finish()
    }
}

impl FeatureStore {
    /// Load the table from `backend` and take ownership of it.
    pub async fn open(
        backend: Arc<dyn ByteStore>,
        options: StoreOptions,
    ) -> Result<Self, PersistenceError> {
        let table = load_table(backend.as_ref(), options.fail_open_on_load).await?;
        Ok(Self {
            table: Mutex::new(table),
            backend,
            options,
        })
    }

    pub async fn open_file(
        path: impl AsRef<Path>,
        options: StoreOptions,
    ) -> Result<Self, PersistenceError> {
        Self::open(Arc::new(FileByteStore::new(path.as_ref())), options).await
    }

    pub async fn in_memory() -> Self {
        Self {
            table: Mutex::new(FeatureTable::new()),
            backend: Arc::new(MemoryByteStore::new()),
            options: StoreOptions::default(),
        }
    }

    /// Copy of every record.
    pub async fn snapshot(&self) -> FeatureTable {
        self.table.lock().await.clone()
    }

    pub async fn create(
        &self,
        payload: CreateFeature,
        role: &str,
    ) -> Result<FeatureRecord, RegistryError> {
        traced("create", Some(&payload.feature_name), role, async {
            authorize(role, Action::Create)?;
            let validated = validate_create(&payload)?;

            let mut table = self.table.lock().await;
            if table.contains_key(&payload.feature_name) {
                return Err(RegistryError::AlreadyExists {
                    feature_name: payload.feature_name.clone(),
                });
            }

            let now = now_millis();
            let record = FeatureRecord {
                feature_name: payload.feature_name.clone(),
                feature_type: validated.feature_type,
                feature_data_type: validated.feature_data_type,
                query: payload.query.clone(),
                description: payload.description.clone(),
                status: FeatureStatus::Draft,
                created_time: now,
                updated_time: now,
                created_by: payload.created_by.clone(),
                last_updated_by: None,
                submitted_by: None,
                tested_by: None,
                tested_time: None,
                test_result: None,
                test_notes: None,
                approved_by: None,
                approved_time: None,
                approval_notes: None,
                rejected_by: None,
                rejection_reason: None,
                deployed_by: None,
                deployed_time: None,
                deleted_by: None,
                deleted_time: None,
                deletion_reason: None,
            };

            self.commit(&mut table, record.clone()).await?;
            info!(
                feature_name = %record.feature_name,
                created_by = %record.created_by,
                "Feature created"
            );
            Ok(record)
        })
        .await
    }

    /// Fetch one record. A supplied role must be a known role.
    pub async fn get(
        &self,
        feature_name: &str,
        role: Option<&str>,
    ) -> Result<FeatureRecord, RegistryError> {
        if let Some(role) = role {
            parse_role(role)?;
        }
        let table = self.table.lock().await;
        table
            .get(feature_name)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(feature_name))
    }

    /// List records matching `filters`.
    ///
    /// Filters are first applied as exact matches. When that yields nothing,
    /// each record is scored by the average similarity of its filtered
    /// fields and kept if the score reaches the fuzzy threshold.
    pub async fn list(
        &self,
        role: &str,
        filters: &FeatureFilters,
    ) -> Result<BTreeMap<String, FeatureRecord>, RegistryError> {
        traced("list", None, role, async {
            parse_role(role)?;
            let table = self.table.lock().await;
            let active = filters.active();
            if active.is_empty() {
                return Ok(table.clone());
            }

            let exact: BTreeMap<_, _> = table
                .iter()
                .filter(|(_, record)| {
                    active
                        .iter()
                        .all(|(field, wanted)| record.filter_value(field).as_deref() == Some(*wanted))
                })
                .map(|(name, record)| (name.clone(), record.clone()))
                .collect();
            if !exact.is_empty() {
                return Ok(exact);
            }

            let fuzzy: BTreeMap<_, _> = table
                .iter()
                .filter(|(_, record)| {
                    let values: Vec<(Option<String>, &str)> = active
                        .iter()
                        .map(|(field, wanted)| (record.filter_value(field), *wanted))
                        .collect();
                    let score = average_ratio(
                        values
                            .iter()
                            .map(|(stored, wanted)| (stored.as_deref(), *wanted)),
                    );
                    score >= self.options.fuzzy_threshold
                })
                .map(|(name, record)| (name.clone(), record.clone()))
                .collect();
            debug!(
                filters = active.len(),
                matches = fuzzy.len(),
                "No exact matches, used fuzzy matching"
            );
            Ok::<_, RegistryError>(fuzzy)
        })
        .await
    }

    /// Overwrite every supplied field and send the feature back to DRAFT.
    pub async fn update(
        &self,
        payload: UpdateFeature,
        role: &str,
    ) -> Result<FeatureRecord, RegistryError> {
        traced("update", Some(&payload.feature_name), role, async {
            let role = authorize(role, Action::Update)?;
            let validated = validate_update(&payload)?;

            self.transition(&payload.feature_name, |record, now| {
                if record.status.is_terminal() {
                    return Err(RegistryError::InvalidStateTransition {
                        reason: format!("Cannot update {} feature", record.status),
                    });
                }
                ensure_transition(role, record.status, FeatureStatus::Draft)?;

                let critical_change = validated
                    .feature_type
                    .is_some_and(|t| t != record.feature_type)
                    || validated
                        .feature_data_type
                        .is_some_and(|t| t != record.feature_data_type)
                    || payload.query.as_ref().is_some_and(|q| *q != record.query);

                if let Some(feature_type) = validated.feature_type {
                    record.feature_type = feature_type;
                }
                if let Some(feature_data_type) = validated.feature_data_type {
                    record.feature_data_type = feature_data_type;
                }
                if let Some(query) = &payload.query {
                    record.query = query.clone();
                }
                if let Some(description) = &payload.description {
                    record.description = description.clone();
                }
                record.last_updated_by = Some(payload.last_updated_by.clone());
                record.status = FeatureStatus::Draft;
                record.updated_time = now;

                info!(
                    feature_name = %record.feature_name,
                    critical_change,
                    "Feature updated, status reset to DRAFT"
                );
                Ok(())
            })
            .await
        })
        .await
    }

    /// Soft delete: the record stays in the table with status DELETED.
    pub async fn delete(
        &self,
        payload: DeleteFeature,
        role: &str,
    ) -> Result<FeatureRecord, RegistryError> {
        traced("delete", Some(&payload.feature_name), role, async {
            let role = authorize(role, Action::Delete)?;
            require_non_empty("deleted_by", &payload.deleted_by)?;
            require_non_empty("deletion_reason", &payload.deletion_reason)?;

            self.transition(&payload.feature_name, |record, now| {
                match record.status {
                    FeatureStatus::Deployed => {
                        return Err(RegistryError::InvalidStateTransition {
                            reason: "Cannot delete DEPLOYED feature".to_string(),
                        })
                    }
                    FeatureStatus::Deleted => {
                        return Err(RegistryError::InvalidStateTransition {
                            reason: "Feature is already DELETED".to_string(),
                        })
                    }
                    _ => {}
                }
                ensure_transition(role, record.status, FeatureStatus::Deleted)?;

                record.status = FeatureStatus::Deleted;
                record.deleted_by = Some(payload.deleted_by.clone());
                record.deleted_time = Some(now);
                record.deletion_reason = Some(payload.deletion_reason.clone());
                record.updated_time = now;
                Ok(())
            })
            .await
        })
        .await
    }

    pub async fn submit_for_testing(
        &self,
        payload: SubmitForTesting,
        role: &str,
    ) -> Result<FeatureRecord, RegistryError> {
        traced("submit_for_testing", Some(&payload.feature_name), role, async {
            let role = authorize(role, Action::SubmitTest)?;
            require_non_empty("submitted_by", &payload.submitted_by)?;

            self.transition(&payload.feature_name, |record, now| {
                require_status(record, &[FeatureStatus::Draft])?;
                ensure_transition(role, record.status, FeatureStatus::ReadyForTesting)?;

                record.status = FeatureStatus::ReadyForTesting;
                record.submitted_by = Some(payload.submitted_by.clone());
                record.updated_time = now;
                Ok(())
            })
            .await
        })
        .await
    }

    pub async fn record_test(
        &self,
        payload: RecordTest,
        role: &str,
    ) -> Result<FeatureRecord, RegistryError> {
        traced("record_test", Some(&payload.feature_name), role, async {
            let role = authorize(role, Action::Test)?;
            require_non_empty("tested_by", &payload.tested_by)?;

            self.transition(&payload.feature_name, |record, now| {
                require_status(record, &[FeatureStatus::ReadyForTesting])?;
                let result: TestResult = payload
                    .test_result
                    .parse()
                    .map_err(|reason: String| RegistryError::validation("test_result", reason))?;
                ensure_transition(role, record.status, result.status())?;

                record.status = result.status();
                record.test_result = Some(result);
                record.tested_by = Some(payload.tested_by.clone());
                record.tested_time = Some(now);
                record.test_notes = payload.test_notes.clone();
                record.updated_time = now;
                Ok(())
            })
            .await
        })
        .await
    }

    /// Approve and deploy in one step; APPROVED is never observable here.
    pub async fn approve(
        &self,
        payload: ApproveFeature,
        role: &str,
    ) -> Result<FeatureRecord, RegistryError> {
        traced("approve", Some(&payload.feature_name), role, async {
            let role = authorize(role, Action::Approve)?;
            require_non_empty("approved_by", &payload.approved_by)?;

            self.transition(&payload.feature_name, |record, now| {
                require_status(record, &[FeatureStatus::TestSucceeded])?;
                ensure_transition(role, record.status, FeatureStatus::Approved)?;
                ensure_transition(role, FeatureStatus::Approved, FeatureStatus::Deployed)?;

                record.status = FeatureStatus::Deployed;
                record.approved_by = Some(payload.approved_by.clone());
                record.approved_time = Some(now);
                record.approval_notes = payload.approval_notes.clone();
                record.deployed_by = Some(payload.approved_by.clone());
                record.deployed_time = Some(now);
                record.updated_time = now;
                Ok(())
            })
            .await
        })
        .await
    }

    pub async fn reject(
        &self,
        payload: RejectFeature,
        role: &str,
    ) -> Result<FeatureRecord, RegistryError> {
        traced("reject", Some(&payload.feature_name), role, async {
            let role = authorize(role, Action::Reject)?;
            require_non_empty("rejected_by", &payload.rejected_by)?;
            require_non_empty("rejection_reason", &payload.rejection_reason)?;

            self.transition(&payload.feature_name, |record, now| {
                require_status(record, &[FeatureStatus::TestSucceeded])?;
                ensure_transition(role, record.status, FeatureStatus::Rejected)?;

                record.status = FeatureStatus::Rejected;
                record.rejected_by = Some(payload.rejected_by.clone());
                record.rejection_reason = Some(payload.rejection_reason.clone());
                record.updated_time = now;
                Ok(())
            })
            .await
        })
        .await
    }

    /// Developer fix-and-retry: back to DRAFT from a testing or rejected state.
    pub async fn fix(&self, payload: FixFeature, role: &str) -> Result<FeatureRecord, RegistryError> {
        traced("fix", Some(&payload.feature_name), role, async {
            let role = authorize(role, Action::Fix)?;
            require_non_empty("last_updated_by", &payload.last_updated_by)?;

            self.transition(&payload.feature_name, |record, now| {
                require_status(
                    record,
                    &[
                        FeatureStatus::ReadyForTesting,
                        FeatureStatus::TestFailed,
                        FeatureStatus::Rejected,
                    ],
                )?;
                ensure_transition(role, record.status, FeatureStatus::Draft)?;

                record.status = FeatureStatus::Draft;
                record.last_updated_by = Some(payload.last_updated_by.clone());
                record.updated_time = now;
                Ok(())
            })
            .await
        })
        .await
    }

    /// Deploy a record that was approved outside this engine.
    pub async fn deploy(
        &self,
        payload: DeployFeature,
        role: &str,
    ) -> Result<FeatureRecord, RegistryError> {
        traced("deploy", Some(&payload.feature_name), role, async {
            let role = authorize(role, Action::Deploy)?;
            require_non_empty("deployed_by", &payload.deployed_by)?;

            self.transition(&payload.feature_name, |record, now| {
                require_status(record, &[FeatureStatus::Approved])?;
                ensure_transition(role, record.status, FeatureStatus::Deployed)?;

                record.status = FeatureStatus::Deployed;
                record.deployed_by = Some(payload.deployed_by.clone());
                record.deployed_time = Some(now);
                record.updated_time = now;
                Ok(())
            })
            .await
        })
        .await
    }

    /// Lock, apply `mutate` to a copy of the named record, then commit it.
    async fn transition<F>(&self, feature_name: &str, mutate: F) -> Result<FeatureRecord, RegistryError>
    where
        F: FnOnce(&mut FeatureRecord, i64) -> Result<(), RegistryError>,
    {
        let mut table = self.table.lock().await;
        let current = table
            .get(feature_name)
            .ok_or_else(|| RegistryError::not_found(feature_name))?;

        let previous_status = current.status;
        let now = now_millis().max(current.updated_time);
        let mut staged = current.clone();
        mutate(&mut staged, now)?;

        self.commit(&mut table, staged.clone()).await?;
        info!(
            feature_name = %staged.feature_name,
            from = %previous_status,
            to = %staged.status,
            "Feature status transition"
        );
        Ok(staged)
    }

    /// Persist a copy of the table holding `record`, then install it. The
    /// live table is only touched after the write succeeds, so a failed or
    /// abandoned write leaves it unchanged.
    async fn commit(
        &self,
        table: &mut FeatureTable,
        record: FeatureRecord,
    ) -> Result<(), RegistryError> {
        let feature_name = record.feature_name.clone();
        let mut staged = table.clone();
        staged.insert(feature_name.clone(), record);

        let written = match encode_table(&staged, self.options.pretty_json) {
            Ok(bytes) => self.backend.write(&bytes).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            error!(
                feature_name = %feature_name,
                location = %self.backend.location(),
                error = %e,
                "Failed to persist feature table, change discarded"
            );
            return Err(e.into());
        }

        *table = staged;
        info!(
            location = %self.backend.location(),
            features = table.len(),
            "Feature table persisted"
        );
        Ok(())
    }
}

/// Run one operation inside its span and log failures.
async fn traced<T, Fut>(
    operation: &'static str,
    feature_name: Option<&str>,
    role: &str,
    operation_future: Fut,
) -> Result<T, RegistryError>
where
    Fut: Future<Output = Result<T, RegistryError>>,
{
    let span = create_operation_span(operation, feature_name, role, &generate_correlation_id());
    let result = operation_future.instrument(span.clone()).await;
    if let Err(e) = &result {
        span.in_scope(|| {
            warn!(kind = e.kind(), error = %e, "Feature operation failed");
        });
    }
    result
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn parse_role(role: &str) -> Result<Role, RegistryError> {
    role.parse::<Role>()
        .map_err(|_| RegistryError::Unauthorized {
            reason: format!("Invalid role '{role}'"),
        })
}

fn authorize(role: &str, action: Action) -> Result<Role, RegistryError> {
    let parsed = parse_role(role)?;
    if !parsed.can(action) {
        return Err(RegistryError::Unauthorized {
            reason: format!("Role '{role}' is not allowed to {action}"),
        });
    }
    Ok(parsed)
}

fn require_status(record: &FeatureRecord, expected: &[FeatureStatus]) -> Result<(), RegistryError> {
    if expected.contains(&record.status) {
        return Ok(());
    }
    let wanted = expected
        .iter()
        .map(FeatureStatus::as_str)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(RegistryError::InvalidStateTransition {
        reason: format!(
            "Feature {} must be in {wanted} status, current status is {}",
            record.feature_name, record.status
        ),
    })
}

fn ensure_transition(role: Role, from: FeatureStatus, to: FeatureStatus) -> Result<(), RegistryError> {
    if role.transitions_from(from).contains(&to) {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized {
            reason: format!("Role '{role}' may not move a feature from {from} to {to}"),
        })
    }
}
