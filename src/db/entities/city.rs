use serde::{Deserialize, Serialize};

/// A geographic point identified by the (name, country, state) natural key.
/// `state` is `None` for cities without a state/province; the store keeps a
/// single canonical representation for that case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub state: Option<String>,
}
