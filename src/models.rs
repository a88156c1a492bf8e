use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text};
use serde::Deserialize;
use serde::Serialize;

use crate::schema::access_request;

/// One persisted access request, as stored by the legacy schema.
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = access_request)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub id: i32,
    pub kind: String,
    pub housing_unit_fk: i32,
    pub outcome: String,
    pub reason: Option<String>,
    pub guard_person_fk: Option<i32>,
    pub authorizing_resident_fk: Option<i32>,
    /// Free-text column doubling as the telephony metadata side-channel,
    /// see [`crate::note`].
    pub note: Option<String>,
    pub deleted: bool,
    pub created_at: NaiveDateTime,
    pub created_by: String,
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = access_request)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAccessRequest {
    pub kind: String,
    pub housing_unit_fk: i32,
    pub outcome: String,
    pub reason: Option<String>,
    pub guard_person_fk: Option<i32>,
    pub authorizing_resident_fk: Option<i32>,
    pub note: Option<String>,
    pub deleted: bool,
    pub created_by: String,
}

/// Resident resolved for a housing unit (raw-SQL projection over
/// `housing_unit` / `resident_housing_unit` / `person`).
#[derive(QueryableByName, Debug, Clone, PartialEq)]
pub struct Resident {
    #[diesel(sql_type = Integer)]
    pub housing_unit_id: i32,
    #[diesel(sql_type = Integer)]
    pub person_id: i32,
    #[diesel(sql_type = Text)]
    pub first_names: String,
    #[diesel(sql_type = Text)]
    pub last_names: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub mobile_phone: Option<String>,
}

impl Resident {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names.trim(), self.last_names.trim())
            .trim()
            .to_string()
    }
}

/// Row shape of the pending-outcome capability probe.
#[derive(QueryableByName, Debug)]
pub struct PendingSupportRow {
    #[diesel(sql_type = diesel::sql_types::Bool)]
    pub supported: bool,
}
