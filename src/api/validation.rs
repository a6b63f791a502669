use super::ApiError;

pub fn validate_patient_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid patient ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}
