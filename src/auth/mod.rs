// Accounts, passwords and bearer-token sessions

pub mod password;
pub mod registration;
pub mod sessions;

use serde::Deserialize;

pub use registration::{register, RegisterRequest};
pub use sessions::{Session, SessionRegistry};

use crate::error::{AppError, AppResult};
use crate::file_storage::UserStore;
use crate::models::{Identity, PublicUser};
use password::verify_password;
use registration::normalize_email;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Check credentials and open a session.
///
/// Unknown emails and wrong passwords fail the same way.
pub fn sign_in(
    users: &UserStore,
    sessions: &SessionRegistry,
    request: &SignInRequest,
) -> AppResult<(Session, PublicUser)> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::unauthenticated("Email and password are required"));
    }

    let email = normalize_email(&request.email);
    let user = match users.find_by_email(&email) {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            log::warn!("Failed sign-in attempt for {}", email);
            return Err(AppError::invalid_credentials());
        }
    };

    let session = sessions.create(Identity::from(&user));
    log::info!("User {} signed in", user.id);
    Ok((session, PublicUser::from(&user)))
}
