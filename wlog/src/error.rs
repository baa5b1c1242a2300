use anyhow::Error;
use winelog::prelude::WinelogError;

/// Process exit code: 2 for bad input (validation, import, unknown id), 1 otherwise
pub fn exit_code(err: &Error) -> i32 {
    if err
        .downcast_ref::<WinelogError>()
        .is_some_and(WinelogError::is_user_error)
    {
        return 2;
    }
    1
}
