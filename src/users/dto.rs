use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A file sent in the `image` multipart field.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UploadedImage {
    /// Extension of the client-side file name, as sent.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then_some(ext)
    }
}

/// JSON shape of a create/update body.
#[derive(Debug, Default, Deserialize)]
pub struct UserFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirmation: Option<String>,
    /// Accepted but never stored: the photo always comes from `image`.
    #[serde(default)]
    pub photo: Option<String>,
}

/// Create/update input, from either a JSON or a multipart body.
/// Strings are trimmed (passwords excepted) and blanks become `None`.
#[derive(Debug, Default, Clone)]
pub struct UserForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub image: Option<UploadedImage>,
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

impl From<UserFields> for UserForm {
    fn from(f: UserFields) -> Self {
        Self {
            name: trimmed(f.name),
            email: trimmed(f.email),
            password: non_empty(f.password),
            password_confirmation: non_empty(f.password_confirmation),
            image: None,
        }
    }
}

impl UserForm {
    async fn from_multipart(mut mp: Multipart) -> Result<Self, ApiError> {
        let mut fields = UserFields::default();
        let mut image = None;

        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                // Browsers send an empty part when no file was chosen.
                if body.is_empty() && file_name.as_deref().unwrap_or_default().is_empty() {
                    continue;
                }
                image = Some(UploadedImage {
                    file_name,
                    content_type,
                    body,
                });
                continue;
            }

            let slot = match name.as_str() {
                "name" => &mut fields.name,
                "email" => &mut fields.email,
                "password" => &mut fields.password,
                "password_confirmation" => &mut fields.password_confirmation,
                "photo" => &mut fields.photo,
                _ => continue,
            };
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            *slot = Some(text);
        }

        let mut form = UserForm::from(fields);
        form.image = image;
        Ok(form)
    }
}

#[async_trait]
impl<S> FromRequest<S> for UserForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let mp = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Self::from_multipart(mp).await
        } else {
            let Json(fields) = Json::<UserFields>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(fields.into())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl ListQuery {
    /// 1-based page number. Anything that is not an integer of at least 1
    /// reads as the first page.
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }
}

/// Length-aware page envelope.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub current_page: i64,
    pub data: Vec<T>,
    pub first_page_url: String,
    pub from: Option<i64>,
    pub last_page: i64,
    pub last_page_url: String,
    pub next_page_url: Option<String>,
    pub path: String,
    pub per_page: i64,
    pub prev_page_url: Option<String>,
    pub to: Option<i64>,
    pub total: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, per_page: i64, path: &str) -> Self {
        let last_page = ((total + per_page - 1) / per_page).max(1);
        let url = |p: i64| format!("{path}?page={p}");
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let from = (page - 1).saturating_mul(per_page).saturating_add(1);
            (Some(from), Some(from.saturating_add(data.len() as i64 - 1)))
        };
        Self {
            current_page: page,
            first_page_url: url(1),
            from,
            last_page,
            last_page_url: url(last_page),
            next_page_url: (page < last_page).then(|| url(page + 1)),
            path: path.to_string(),
            per_page,
            prev_page_url: (page > 1).then(|| url(page - 1)),
            to,
            total,
            data,
        }
    }
}
