use shared::object_id::ObjectId;

use crate::error::ApiError;

pub fn parse_object_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse(id).map_err(ApiError::from)
}
