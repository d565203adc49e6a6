use serde::{Deserialize, Serialize};

/// One row of the source passenger table
///
/// Field names serialize with the source column names (`PassengerId`,
/// `SibSp`, ...). Nullable source columns are `Option`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawRecord {
    pub passenger_id: i64,
    #[serde(default)]
    pub survived: Option<i64>,
    pub pclass: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age: Option<f64>,
    pub sib_sp: i64,
    pub parch: i64,
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub fare: Option<f64>,
    #[serde(default)]
    pub cabin: Option<String>,
    #[serde(default)]
    pub embarked: Option<String>,
}

impl RawRecord {
    /// Feature store entity id
    pub fn entity_id(&self) -> String {
        self.passenger_id.to_string()
    }
}
