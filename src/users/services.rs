use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{check_password_strength, hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::users::dto::{ChangePasswordRequest, CreateUserRequest, Pagination, UpdateUserRequest};
use crate::users::repo::UserStore;
use crate::users::repo_types::{self, User};

pub const WEAK_PASSWORD: &str = "New password must contain at least one uppercase letter, one lowercase letter, one symbol, one digit, and be at least 8 characters long";
pub const PASSWORD_MISMATCH: &str = "Password do not match";
pub const OLD_PASSWORD_MISMATCH: &str = "Old password or new passwords do not match";
pub const EMAIL_TAKEN: &str = "This email already taken";
pub const UNKNOWN_USER: &str = "Unknown user";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> ApiResult<String> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::UnprocessableEntity("Invalid email".into()));
    }
    Ok(email)
}

fn normalize_name(raw: &str) -> ApiResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::UnprocessableEntity("Name is required".into()));
    }
    Ok(name.to_string())
}

pub async fn list_users(store: &dyn UserStore, page: &Pagination) -> ApiResult<Vec<User>> {
    store.list(page.clamped_limit(), page.offset).await
}

pub async fn get_user(store: &dyn UserStore, id: Uuid) -> ApiResult<User> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(UNKNOWN_USER.into()))
}

pub async fn create_user(store: &dyn UserStore, req: CreateUserRequest) -> ApiResult<User> {
    if !check_password_strength(&req.password) {
        return Err(ApiError::InvalidPassword(WEAK_PASSWORD.into()));
    }
    if req.password != req.password_confirm {
        return Err(ApiError::InvalidPassword(PASSWORD_MISMATCH.into()));
    }

    let name = normalize_name(&req.name)?;
    let email = normalize_email(&req.email)?;

    if store.email_taken(&email, None).await? {
        warn!(email = %email, "email already registered");
        return Err(ApiError::EmailAlreadyTaken(EMAIL_TAKEN.into()));
    }

    let hash = hash_password(&req.password)?;
    let user = User::new(name, email, hash);
    store.create(&user).await?;

    info!(user_id = %user.id, "user created");
    Ok(user)
}

pub async fn update_user(store: &dyn UserStore, id: Uuid, req: UpdateUserRequest) -> ApiResult<()> {
    let name = normalize_name(&req.name)?;
    let email = normalize_email(&req.email)?;

    if store.email_taken(&email, Some(id)).await? {
        warn!(email = %email, user_id = %id, "email already registered");
        return Err(ApiError::EmailAlreadyTaken(EMAIL_TAKEN.into()));
    }

    if !store
        .update_profile(id, &name, &email, repo_types::now())
        .await?
    {
        return Err(ApiError::NotFound(UNKNOWN_USER.into()));
    }

    info!(user_id = %id, "user updated");
    Ok(())
}

pub async fn delete_user(store: &dyn UserStore, id: Uuid) -> ApiResult<()> {
    if !store.delete(id).await? {
        return Err(ApiError::NotFound(UNKNOWN_USER.into()));
    }
    info!(user_id = %id, "user deleted");
    Ok(())
}

pub async fn change_password(
    store: &dyn UserStore,
    id: Uuid,
    req: ChangePasswordRequest,
) -> ApiResult<()> {
    if !check_password_strength(&req.new_password) {
        return Err(ApiError::InvalidPassword(WEAK_PASSWORD.into()));
    }

    let user = get_user(store, id).await?;

    let old_ok = verify_password(&req.old_password, &user.password_hash)?;
    if !old_ok || req.new_password != req.confirm_new_password {
        warn!(user_id = %id, "password change rejected");
        return Err(ApiError::InvalidPassword(OLD_PASSWORD_MISMATCH.into()));
    }

    let hash = hash_password(&req.new_password)?;
    if !store
        .update_password(id, &hash, repo_types::now())
        .await?
    {
        return Err(ApiError::NotFound(UNKNOWN_USER.into()));
    }

    info!(user_id = %id, "password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_logs::capture_logs;
    use crate::users::repo::memory::InMemoryUserStore;

    const GOOD: &str = "Secur3P@ss";

    fn signup(name: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.into(),
            email: email.into(),
            password: GOOD.into(),
            password_confirm: GOOD.into(),
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.io"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("not an email"));
        assert_eq!(normalize_email("  Ann@Example.COM ").unwrap(), "ann@example.com");
    }

    #[tokio::test]
    async fn create_normalizes_and_hashes() {
        let store = InMemoryUserStore::default();
        let user = create_user(&store, signup(" Ann ", "ANN@example.com"))
            .await
            .unwrap();
        assert_eq!(user.name, "Ann");
        assert_eq!(user.email, "ann@example.com");
        assert_ne!(user.password_hash, GOOD);
        assert!(verify_password(GOOD, &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn create_checks_strength_before_confirmation() {
        let store = InMemoryUserStore::default();
        let req = CreateUserRequest {
            password: "weak".into(),
            password_confirm: "different".into(),
            ..signup("Ann", "ann@example.com")
        };
        let err = create_user(&store, req).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidPassword(ref m) if m == WEAK_PASSWORD));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn create_logs_user_id_without_email() {
        let (logs, _guard) = capture_logs();

        let store = InMemoryUserStore::default();
        let user = create_user(&store, signup("Ann", "ann@example.com"))
            .await
            .unwrap();

        let output = logs.contents();
        assert!(output.contains("user created"));
        assert!(output.contains(&user.id.to_string()));
        assert!(!output.contains("ann@example.com"));
    }

    #[tokio::test]
    async fn create_rejects_mismatched_confirmation() {
        let store = InMemoryUserStore::default();
        let req = CreateUserRequest {
            password_confirm: "Other1!pass".into(),
            ..signup("Ann", "ann@example.com")
        };
        let err = create_user(&store, req).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidPassword(ref m) if m == PASSWORD_MISMATCH));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn create_rejects_taken_email_case_insensitively() {
        let store = InMemoryUserStore::default();
        create_user(&store, signup("Ann", "ann@example.com")).await.unwrap();
        let err = create_user(&store, signup("Other", "ANN@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmailAlreadyTaken(_)));
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let store = InMemoryUserStore::default();
        let err = create_user(&store, signup("   ", "ann@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnprocessableEntity(_)));
    }

    #[tokio::test]
    async fn update_allows_own_email_but_not_others() {
        let store = InMemoryUserStore::default();
        let ann = create_user(&store, signup("Ann", "ann@example.com")).await.unwrap();
        create_user(&store, signup("Bob", "bob@example.com")).await.unwrap();

        update_user(
            &store,
            ann.id,
            UpdateUserRequest {
                name: "Annie".into(),
                email: "ann@example.com".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(get_user(&store, ann.id).await.unwrap().name, "Annie");

        let err = update_user(
            &store,
            ann.id,
            UpdateUserRequest {
                name: "Annie".into(),
                email: "bob@example.com".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::EmailAlreadyTaken(_)));
    }

    #[tokio::test]
    async fn update_and_delete_unknown_user_are_not_found() {
        let store = InMemoryUserStore::default();
        let id = Uuid::new_v4();
        let err = update_user(
            &store,
            id,
            UpdateUserRequest {
                name: "X".into(),
                email: "x@example.com".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(matches!(
            delete_user(&store, id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn change_password_flow() {
        let store = InMemoryUserStore::default();
        let ann = create_user(&store, signup("Ann", "ann@example.com")).await.unwrap();
        let next = "N3w!Passw0rd";

        let wrong_old = ChangePasswordRequest {
            old_password: "Wr0ng!pass".into(),
            new_password: next.into(),
            confirm_new_password: next.into(),
        };
        let err = change_password(&store, ann.id, wrong_old).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidPassword(ref m) if m == OLD_PASSWORD_MISMATCH));

        let mismatch = ChangePasswordRequest {
            old_password: GOOD.into(),
            new_password: next.into(),
            confirm_new_password: "N3w!Passw0rX".into(),
        };
        let err = change_password(&store, ann.id, mismatch).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidPassword(ref m) if m == OLD_PASSWORD_MISMATCH));

        let weak = ChangePasswordRequest {
            old_password: GOOD.into(),
            new_password: "short".into(),
            confirm_new_password: "short".into(),
        };
        let err = change_password(&store, ann.id, weak).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidPassword(ref m) if m == WEAK_PASSWORD));

        let ok = ChangePasswordRequest {
            old_password: GOOD.into(),
            new_password: next.into(),
            confirm_new_password: next.into(),
        };
        change_password(&store, ann.id, ok).await.unwrap();

        let stored = get_user(&store, ann.id).await.unwrap();
        assert!(verify_password(next, &stored.password_hash).unwrap());
        assert!(!verify_password(GOOD, &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn change_password_for_unknown_user_is_not_found() {
        let store = InMemoryUserStore::default();
        let req = ChangePasswordRequest {
            old_password: GOOD.into(),
            new_password: "N3w!Passw0rd".into(),
            confirm_new_password: "N3w!Passw0rd".into(),
        };
        let err = change_password(&store, Uuid::new_v4(), req).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
