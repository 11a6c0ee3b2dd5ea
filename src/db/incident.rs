//! Incident store: correlation of classified events into incidents.
//!
//! Each event is applied under a row lock on its incident so that
//! concurrent correlators cannot interleave lifecycle transitions for the
//! same identity.

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use sqlx::{Postgres, Transaction};

use crate::error::{Error, Result};
use crate::model::{ClassifiedEvent, Incident, IncidentId, IncidentState, IncidentTransition};
use crate::telemetry::metrics;

/// Outcome of correlating one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub incident_id: IncidentId,
    pub transition: IncidentTransition,
}

#[derive(sqlx::FromRow)]
struct IncidentRow {
    id: String,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IncidentRow {
    fn into_incident(self, events: Vec<ClassifiedEvent>) -> Result<Incident> {
        Ok(Incident {
            id: self.id.parse()?,
            state: self.state.parse()?,
            events,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl super::Db {
    /// Fold an event into the incident for its release identity.
    pub async fn correlate_event(&self, event: ClassifiedEvent) -> Result<Correlation> {
        let incident_id = IncidentId::for_event(&event)?;
        let mut tx = self.pool.begin().await?;

        let transition = match lock_incident(&mut tx, &incident_id).await? {
            Some(row) => {
                let mut incident = row.into_incident(Vec::new())?;
                let transition = incident.record(event.clone());
                if transition != IncidentTransition::Ignored {
                    sqlx::query("UPDATE incidents SET state = $1, updated_at = $2 WHERE id = $3")
                        .bind(incident.state.label())
                        .bind(incident.updated_at)
                        .bind(incident_id.to_string())
                        .execute(&mut *tx)
                        .await?;
                    insert_event(&mut tx, &incident_id, &event).await?;
                }
                transition
            }
            None => match Incident::open(event.clone())? {
                Some(incident) => {
                    let inserted = sqlx::query(
                        "INSERT INTO incidents (id, release_name, namespace, state, created_at, updated_at)
                         VALUES ($1, $2, $3, $4, $5, $6)
                         ON CONFLICT (id) DO NOTHING",
                    )
                    .bind(incident.id.to_string())
                    .bind(incident.id.release_name())
                    .bind(incident.id.namespace())
                    .bind(incident.state.label())
                    .bind(incident.created_at)
                    .bind(incident.updated_at)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();

                    if inserted == 0 {
                        // Another correlator opened it first; retry against its row.
                        tx.rollback().await?;
                        return Box::pin(self.correlate_event(event)).await;
                    }
                    insert_event(&mut tx, &incident_id, &event).await?;
                    IncidentTransition::Opened
                }
                None => IncidentTransition::Ignored,
            },
        };

        tx.commit().await?;

        metrics::incident_transitions().add(
            1,
            &[KeyValue::new("transition", transition.as_str())],
        );

        Ok(Correlation {
            incident_id,
            transition,
        })
    }

    /// Load an incident with its full event history.
    pub async fn get_incident(&self, id: &IncidentId) -> Result<Incident> {
        let row: Option<IncidentRow> = sqlx::query_as(
            "SELECT id, state, created_at, updated_at FROM incidents WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| Error::NotFound(format!("incident {id}")))?;
        let events = self.incident_events(id).await?;
        row.into_incident(events)
    }

    /// Events of an incident, oldest first.
    pub async fn incident_events(&self, id: &IncidentId) -> Result<Vec<ClassifiedEvent>> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            "SELECT event FROM incident_events WHERE incident_id = $1 ORDER BY seq",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(event,)| serde_json::from_value(event).map_err(Error::from))
            .collect()
    }

    /// Incidents, most recently updated first, optionally narrowed to one
    /// release in one namespace and/or one state.
    pub async fn list_incidents(
        &self,
        release: Option<(&str, &str)>,
        state: Option<IncidentState>,
        limit: i64,
    ) -> Result<Vec<Incident>> {
        let (release_name, namespace) = release.unzip();
        let rows: Vec<IncidentRow> = sqlx::query_as(
            "SELECT id, state, created_at, updated_at FROM incidents
             WHERE ($1::text IS NULL OR release_name = $1)
             AND ($2::text IS NULL OR namespace = $2)
             AND ($3::text IS NULL OR state = $3)
             ORDER BY updated_at DESC
             LIMIT $4",
        )
        .bind(release_name)
        .bind(namespace)
        .bind(state.map(IncidentState::label))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut incidents = Vec::with_capacity(rows.len());
        for row in rows {
            let id: IncidentId = row.id.parse()?;
            let events = self.incident_events(&id).await?;
            incidents.push(row.into_incident(events)?);
        }
        Ok(incidents)
    }
}

async fn lock_incident(
    tx: &mut Transaction<'_, Postgres>,
    id: &IncidentId,
) -> Result<Option<IncidentRow>> {
    let row = sqlx::query_as(
        "SELECT id, state, created_at, updated_at FROM incidents WHERE id = $1 FOR UPDATE",
    )
    .bind(id.to_string())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    id: &IncidentId,
    event: &ClassifiedEvent,
) -> Result<()> {
    sqlx::query("INSERT INTO incident_events (incident_id, event) VALUES ($1, $2)")
        .bind(id.to_string())
        .bind(serde_json::to_value(event)?)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
