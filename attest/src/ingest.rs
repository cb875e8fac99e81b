//! The ingest service — validate, derive, dedup, apply.

use crate::delta::{AppliedDelta, RowDelta};
use crate::locks::KeyedLocks;
use crate::schema::{derive_field, DerivedField, SchemaKind};
use crate::IngestError;

use serde_json::Value;
use std::sync::Arc;
use tally_store::{AggregateKey, AggregateRow, AggregateStore, Person, PersonStore};
use tally_types::{Address, Nullifier, Timestamp};
use tracing::debug;

/// Result of a submission.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// The submission carried nothing new; no write happened.
    Deduplicated,
    /// The delta that was persisted and should be broadcast.
    Applied(AppliedDelta),
}

/// Aggregate state for one survey, served to dashboards.
#[derive(Clone, Debug, serde::Serialize)]
pub struct AggregateSnapshot {
    pub survey: Address,
    pub rows: Vec<AggregateRow>,
    /// Sum of row counts for this survey.
    pub total: u64,
    /// Distinct nullifiers ever seen by the service (all surveys).
    pub persons: u64,
}

/// The attestation ingest service.
pub struct IngestService<S> {
    store: Arc<S>,
    locks: KeyedLocks,
}

impl<S: PersonStore + AggregateStore> IngestService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Handle one submission at the current wall-clock time.
    pub async fn submit(
        &self,
        survey: &str,
        schema_kind: &str,
        fields: &Value,
    ) -> Result<SubmitOutcome, IngestError> {
        self.submit_at(survey, schema_kind, fields, Timestamp::now())
            .await
    }

    /// Handle one submission, with an explicit `now` for age derivation.
    pub async fn submit_at(
        &self,
        survey: &str,
        schema_kind: &str,
        fields: &Value,
        now: Timestamp,
    ) -> Result<SubmitOutcome, IngestError> {
        let survey =
            Address::parse(survey).map_err(|e| IngestError::InvalidSurvey(e.to_string()))?;
        let nullifier_raw = fields
            .get("nullifier")
            .and_then(Value::as_str)
            .ok_or(IngestError::InvalidField("nullifier"))?;
        let nullifier = Nullifier::parse(nullifier_raw)
            .map_err(|e| IngestError::InvalidNullifier(e.to_string()))?;
        let kind = SchemaKind::parse(schema_kind)?;
        let derived = derive_field(kind, fields, now)?;

        // Serialize all read-modify-write for this nullifier.
        let guard = self.locks.lock_for(&nullifier);
        let _held = guard.lock().await;

        let existing = self.store.get_person(&nullifier)?;
        let new_person = existing.is_none();
        let mut person =
            existing.unwrap_or_else(|| Person::new(nullifier.clone(), survey.clone()));
        // A nullifier's aggregation scope is fixed at creation.
        let scope = person.survey.clone();

        let old_cell = (person.region, person.country.clone());
        let old_bucket = person.age_bucket;
        let old_verified = person.verified;

        match derived {
            DerivedField::Age(bucket) => {
                if person.age_bucket != Some(bucket) {
                    person.age_bucket = Some(bucket);
                }
            }
            DerivedField::Country { region, country } => {
                if (person.region, person.country.as_deref())
                    != (Some(region), Some(country.as_str()))
                {
                    person.region = Some(region);
                    person.country = Some(country);
                }
            }
            DerivedField::Verified => person.verified = true,
        }

        let cell_changed = (person.region, person.country.clone()) != old_cell;
        let bucket_changed = person.age_bucket != old_bucket;
        let verified_changed = person.verified != old_verified;

        if !new_person && !cell_changed && !bucket_changed && !verified_changed {
            debug!(nullifier = %nullifier, kind = kind.as_str(), "submission deduplicated");
            return Ok(SubmitOutcome::Deduplicated);
        }

        self.store.put_person(&person)?;

        let new_key = AggregateKey {
            survey: scope.clone(),
            region: person.region,
            country: person.country.clone(),
        };
        let mut rows: Vec<RowDelta> = Vec::new();

        if new_person {
            let mut row = self.row(&new_key)?;
            let mut delta = RowDelta::new(new_key.region, new_key.country.clone());
            row.count += 1;
            delta.count = 1;
            if person.verified {
                row.verified_count += 1;
                delta.verified = 1;
            }
            if let Some(bucket) = person.age_bucket {
                *row.age_buckets.entry(bucket).or_insert(0) += 1;
                delta.buckets.insert(bucket, 1);
            }
            self.store.put_row(&row)?;
            rows.push(delta);
        } else if cell_changed {
            // The person's whole contribution moves between cells. Only a
            // country submission changes the cell, so bucket/verified are
            // carried as-is.
            let old_key = AggregateKey {
                survey: scope.clone(),
                region: old_cell.0,
                country: old_cell.1.clone(),
            };
            let mut old_row = self.row(&old_key)?;
            let mut old_delta = RowDelta::new(old_key.region, old_key.country.clone());
            old_row.count = old_row.count.saturating_sub(1);
            old_delta.count = -1;
            if person.verified {
                old_row.verified_count = old_row.verified_count.saturating_sub(1);
                old_delta.verified = -1;
            }
            if let Some(bucket) = person.age_bucket {
                let cell = old_row.age_buckets.entry(bucket).or_insert(0);
                *cell = cell.saturating_sub(1);
                old_delta.buckets.insert(bucket, -1);
            }
            self.store.put_row(&old_row)?;
            rows.push(old_delta);

            let mut new_row = self.row(&new_key)?;
            let mut new_delta = RowDelta::new(new_key.region, new_key.country.clone());
            new_row.count += 1;
            new_delta.count = 1;
            if person.verified {
                new_row.verified_count += 1;
                new_delta.verified = 1;
            }
            if let Some(bucket) = person.age_bucket {
                *new_row.age_buckets.entry(bucket).or_insert(0) += 1;
                new_delta.buckets.insert(bucket, 1);
            }
            self.store.put_row(&new_row)?;
            rows.push(new_delta);
        } else {
            let mut row = self.row(&new_key)?;
            let mut delta = RowDelta::new(new_key.region, new_key.country.clone());
            if verified_changed {
                row.verified_count += 1;
                delta.verified = 1;
            }
            if bucket_changed {
                if let Some(old) = old_bucket {
                    let cell = row.age_buckets.entry(old).or_insert(0);
                    *cell = cell.saturating_sub(1);
                    delta.buckets.insert(old, -1);
                }
                if let Some(new) = person.age_bucket {
                    *row.age_buckets.entry(new).or_insert(0) += 1;
                    delta.buckets.insert(new, 1);
                }
            }
            self.store.put_row(&row)?;
            rows.push(delta);
        }

        debug!(
            nullifier = %nullifier,
            kind = kind.as_str(),
            new_person,
            "submission applied"
        );
        Ok(SubmitOutcome::Applied(AppliedDelta {
            survey: scope,
            new_person,
            rows,
        }))
    }

    /// Aggregate snapshot for one survey.
    pub fn aggregate(&self, survey: &str) -> Result<AggregateSnapshot, IngestError> {
        let survey =
            Address::parse(survey).map_err(|e| IngestError::InvalidSurvey(e.to_string()))?;
        let rows = self.store.rows_for_survey(&survey)?;
        let total = rows.iter().map(|r| r.count).sum();
        Ok(AggregateSnapshot {
            survey,
            rows,
            total,
            persons: self.store.person_count()?,
        })
    }

    /// Global invariant inputs: (distinct persons, sum of all row counts).
    pub fn totals(&self) -> Result<(u64, u64), IngestError> {
        Ok((self.store.person_count()?, self.store.total_count()?))
    }

    fn row(&self, key: &AggregateKey) -> Result<AggregateRow, IngestError> {
        Ok(self
            .store
            .get_row(key)?
            .unwrap_or_else(|| AggregateRow::new(key)))
    }
}
