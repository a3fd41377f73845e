//! Acknowledgement classification.

use log::error;

use crate::error::TaskError;

use super::task::TaskFunc;
use super::transport::PatchResponse;

/// Accept a successful acknowledgement, turn anything else into
/// [`TaskError::Rejected`].
pub fn check_response(func: TaskFunc, response: &PatchResponse) -> Result<(), TaskError> {
    if response.is_success() {
        return Ok(());
    }
    error!(target: "pumpcomm", "{func} response error: {response}");
    Err(TaskError::Rejected {
        func,
        code: response.code,
    })
}
