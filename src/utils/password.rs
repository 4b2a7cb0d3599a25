use crate::error::{AppError, AppResult};
use bcrypt::{DEFAULT_COST, hash, verify};

const MIN_PASSWORD_LEN: usize = 8;
// bcrypt 只使用前 72 字节
const MAX_PASSWORD_BYTES: usize = 72;

/// 密码规则：8 个字符以上，不超过 72 字节，至少包含一个字母和一个数字
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::ValidationError(format!(
            "Password must not exceed {MAX_PASSWORD_BYTES} bytes"
        )));
    }

    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(AppError::ValidationError(
            "Password must contain a letter and a digit".to_string(),
        ));
    }

    Ok(())
}

/// 修改密码时新密码不能与旧密码相同
pub fn validate_password_change(current: &str, new: &str) -> AppResult<()> {
    if current == new {
        return Err(AppError::ValidationError(
            "New password must differ from the current password".to_string(),
        ));
    }
    validate_password(new)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    verify(password, hash)
        .map_err(|e| AppError::InternalError(format!("Failed to verify password: {e}")))
}
