//! Source passenger row

use feature_core::RawRecord;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct PassengerRow {
    pub passenger_id: i64,
    pub survived: Option<i64>,
    pub pclass: i64,
    pub name: Option<String>,
    pub sex: Option<String>,
    pub age: Option<f64>,
    pub sib_sp: i64,
    pub parch: i64,
    pub ticket: Option<String>,
    pub fare: Option<f64>,
    pub cabin: Option<String>,
    pub embarked: Option<String>,
}

impl From<PassengerRow> for RawRecord {
    fn from(row: PassengerRow) -> Self {
        RawRecord {
            passenger_id: row.passenger_id,
            survived: row.survived,
            pclass: row.pclass,
            name: row.name,
            sex: row.sex,
            age: row.age.filter(|v| v.is_finite()),
            sib_sp: row.sib_sp,
            parch: row.parch,
            ticket: row.ticket,
            fare: row.fare.filter(|v| v.is_finite()),
            cabin: row.cabin.filter(|c| !c.trim().is_empty()),
            embarked: row.embarked.filter(|e| !e.trim().is_empty()),
        }
    }
}
