//! Diesel-backed [`AccessStore`] over the legacy Postgres schema.
//!
//! Point reads and writes go through the DSL; the resident resolution join
//! and the constraint probe are raw SQL, since both lean on Postgres
//! specifics (`NULLS FIRST` tenancy ordering, `pg_constraint`).

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Integer;

use crate::access::{AccessStore, StoreError};
use crate::models::{AccessRequest, NewAccessRequest, PendingSupportRow, Resident};
use crate::schema::access_request;

/// True when the outcome check constraint admits `pending`; older schema
/// deployments only know `authorized` / `rejected` / `not_authorized`.
const PENDING_SUPPORT_SQL: &str = "\
SELECT EXISTS (
    SELECT 1
    FROM pg_constraint c
    JOIN pg_class t ON t.oid = c.conrelid
    WHERE t.relname = 'access_request'
      AND c.contype = 'c'
      AND pg_get_constraintdef(c.oid) ILIKE '%pending%'
) AS supported";

/// Latest resident for a housing unit: active tenancies first, then the
/// most recent one.
const RESIDENT_SQL: &str = "\
SELECT
    hu.id AS housing_unit_id,
    p.id AS person_id,
    p.first_names,
    p.last_names,
    p.mobile_phone
FROM housing_unit hu
INNER JOIN resident_housing_unit rhu
    ON rhu.housing_unit_fk = hu.id
INNER JOIN person p
    ON p.id = rhu.person_fk
WHERE hu.deleted = FALSE
  AND rhu.deleted = FALSE
  AND p.deleted = FALSE
  AND hu.id = $1
ORDER BY
    CASE
        WHEN LOWER(COALESCE(rhu.status, '')) IN ('active', 'current') THEN 0
        ELSE 1
    END,
    rhu.until NULLS FIRST,
    rhu.since DESC NULLS LAST,
    rhu.updated_at DESC NULLS LAST,
    rhu.id DESC
LIMIT 1";

pub struct PgAccessStore {
    conn: PgConnection,
}

impl PgAccessStore {
    pub fn new(conn: PgConnection) -> Self {
        PgAccessStore { conn }
    }
}

impl AccessStore for PgAccessStore {
    fn supports_pending_outcome(&mut self) -> Result<bool, StoreError> {
        let row: PendingSupportRow = sql_query(PENDING_SUPPORT_SQL).get_result(&mut self.conn)?;
        Ok(row.supported)
    }

    fn resident_for_housing_unit(
        &mut self,
        housing_unit_id: i32,
    ) -> Result<Option<Resident>, StoreError> {
        let resident = sql_query(RESIDENT_SQL)
            .bind::<Integer, _>(housing_unit_id)
            .get_result::<Resident>(&mut self.conn)
            .optional()?;
        Ok(resident)
    }

    fn create_access_request(
        &mut self,
        new_request: NewAccessRequest,
    ) -> Result<AccessRequest, StoreError> {
        let row = diesel::insert_into(access_request::table)
            .values(new_request)
            .get_result(&mut self.conn)?;
        Ok(row)
    }

    fn access_request_by_id(&mut self, id: i32) -> Result<Option<AccessRequest>, StoreError> {
        let row = access_request::table
            .find(id)
            .select(AccessRequest::as_select())
            .get_result(&mut self.conn)
            .optional()?;
        Ok(row)
    }

    fn update_outcome(
        &mut self,
        id: i32,
        outcome: &str,
        note: &str,
        actor: &str,
    ) -> Result<Option<AccessRequest>, StoreError> {
        let row = diesel::update(
            access_request::table
                .find(id)
                .filter(access_request::deleted.eq(false)),
        )
        .set((
            access_request::outcome.eq(outcome),
            access_request::note.eq(note),
            access_request::updated_by.eq(actor),
            access_request::updated_at.eq(Some(Utc::now().naive_utc())),
        ))
        .get_result(&mut self.conn)
        .optional()?;
        Ok(row)
    }
}
