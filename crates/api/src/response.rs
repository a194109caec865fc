//! `{ "data": ... }` response envelope shared by all API handlers.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
