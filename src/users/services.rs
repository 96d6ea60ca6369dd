use anyhow::Context;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{password::hash_password, services::is_valid_email},
    error::{ApiError, FieldErrors},
    state::AppState,
    storage::StorageClient,
    users::{
        dto::{Paginated, UploadedImage, UserForm},
        repo::UserStore,
        repo_types::{NewUser, User, UserChanges},
    },
};

pub const PER_PAGE: i64 = 15;
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
}

async fn validate(form: &UserForm, users: &dyn UserStore, mode: Mode) -> Result<(), ApiError> {
    let mut errors = FieldErrors::default();

    if mode == Mode::Create && form.name.is_none() {
        errors.add("name", "The name field is required.");
    }

    match &form.email {
        None if mode == Mode::Create => errors.add("email", "The email field is required."),
        None => {}
        Some(email) if !is_valid_email(email) => {
            errors.add("email", "The email must be a valid email address.")
        }
        Some(email) => {
            if users.find_by_email(email).await?.is_some() {
                errors.add("email", "The email has already been taken.");
            }
        }
    }

    match &form.password {
        None if mode == Mode::Create => errors.add("password", "The password field is required."),
        None => {}
        Some(password) => {
            if form.password_confirmation.as_ref() != Some(password) {
                errors.add("password", "The password confirmation does not match.");
            }
        }
    }

    if let Some(image) = &form.image {
        if !is_accepted_image(image) {
            errors.add(
                "image",
                format!("The image must be a file of type: {}.", IMAGE_EXTENSIONS.join(", ")),
            );
        }
    }

    if !errors.is_empty() {
        warn!(?errors, ?mode, "user input rejected");
    }
    errors.into_result()
}

fn is_accepted_image(image: &UploadedImage) -> bool {
    let ext_ok = image
        .extension()
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    let type_ok = image
        .content_type
        .as_deref()
        .map_or(true, |ct| ct.starts_with("image/"));
    ext_ok && type_ok
}

/// Writes the uploaded image under `<unix seconds>.<extension>` and returns its URL.
/// Two uploads within the same second share a name; the later one wins.
pub async fn save_photo(
    storage: &dyn StorageClient,
    image: Option<UploadedImage>,
) -> anyhow::Result<Option<String>> {
    let Some(image) = image else {
        return Ok(None);
    };
    let ext = image.extension().unwrap_or("bin");
    let key = format!("{}.{}", OffsetDateTime::now_utc().unix_timestamp(), ext);
    storage
        .put_object(&key, image.body.clone())
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(Some(storage.public_url(&key)))
}

pub async fn list_users(
    st: &AppState,
    page: i64,
    path: &str,
) -> anyhow::Result<Paginated<User>> {
    let offset = (page.max(1) - 1).saturating_mul(PER_PAGE);
    let (users, total) = st.users.page(PER_PAGE, offset).await?;
    Ok(Paginated::new(users, total, page, PER_PAGE, path))
}

/// Ids that are not UUIDs cannot name a row and are treated as unknown.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

pub async fn find_user(st: &AppState, id: &str) -> anyhow::Result<Option<User>> {
    match parse_id(id) {
        Some(id) => st.users.find(id).await,
        None => Ok(None),
    }
}

pub async fn create_user(st: &AppState, form: UserForm) -> Result<User, ApiError> {
    validate(&form, st.users.as_ref(), Mode::Create).await?;

    let photo = save_photo(st.storage.as_ref(), form.image).await?;
    let (Some(name), Some(email), Some(password)) = (form.name, form.email, form.password) else {
        return Err(anyhow::anyhow!("validated form is missing required fields").into());
    };
    let cmd = NewUser {
        name,
        email,
        password_hash: hash_password(&password)?,
        photo,
    };

    let mut tx = st.users.begin().await?;
    match tx.insert(&cmd).await {
        Ok(user) => {
            tx.commit()
                .await
                .map_err(|e| ApiError::Persistence(format!("{e:#}")))?;
            info!(user_id = %user.id, email = %user.email, "user created");
            Ok(user)
        }
        Err(e) => {
            error!(error = %e, email = %cmd.email, "create user failed; rolling back");
            if let Err(rb) = tx.rollback().await {
                error!(error = %rb, "rollback failed");
            }
            Err(ApiError::Persistence(format!("{e:#}")))
        }
    }
}

pub async fn update_user(st: &AppState, id: &str, form: UserForm) -> Result<User, ApiError> {
    validate(&form, st.users.as_ref(), Mode::Update).await?;

    let photo = save_photo(st.storage.as_ref(), form.image).await?;
    let changes = UserChanges {
        name: form.name,
        email: form.email,
        password_hash: form.password.as_deref().map(hash_password).transpose()?,
        photo,
    };

    let mut tx = st.users.begin().await?;
    let updated = match parse_id(id) {
        Some(uuid) => tx.update(uuid, &changes).await,
        None => Ok(None),
    };
    let outcome = match updated {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(format!("No query results for user {id}")),
        Err(e) => Err(format!("{e:#}")),
    };
    match outcome {
        Ok(user) => {
            tx.commit()
                .await
                .map_err(|e| ApiError::Persistence(format!("{e:#}")))?;
            info!(user_id = %user.id, "user updated");
            Ok(user)
        }
        Err(message) => {
            error!(%id, error = %message, "update user failed; rolling back");
            if let Err(rb) = tx.rollback().await {
                error!(error = %rb, "rollback failed");
            }
            Err(ApiError::Persistence(message))
        }
    }
}

/// Deletes the user if present; unknown ids succeed without effect.
pub async fn delete_user(st: &AppState, id: &str) -> anyhow::Result<()> {
    let removed = match parse_id(id) {
        Some(uuid) => st.users.delete(uuid).await?,
        None => 0,
    };
    info!(%id, removed, "user delete");
    Ok(())
}
