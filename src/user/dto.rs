use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::User;
use crate::{
    error::ApiError,
    storage::{AssetRef, UploadFile},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for an authenticated password change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

/// Profile fields collected from the registration multipart body.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub about_me: String,
    pub password: String,
    pub portfolio_url: String,
    pub github_url: Option<String>,
    pub instagram_url: Option<String>,
    pub facebook_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub avatar: Option<UploadFile>,
    pub resume: Option<UploadFile>,
}

impl RegisterForm {
    pub fn apply_text(&mut self, name: &str, value: String) {
        if value.is_empty() {
            return;
        }
        match name {
            "fullName" => self.full_name = value,
            "email" => self.email = value,
            "phone" => self.phone = value,
            "aboutMe" => self.about_me = value,
            "password" => self.password = value,
            "portfolioURL" => self.portfolio_url = value,
            "githubURL" => self.github_url = Some(value),
            "instagramURL" => self.instagram_url = Some(value),
            "facebookURL" => self.facebook_url = Some(value),
            "linkedInURL" => self.linkedin_url = Some(value),
            "twitterURL" => self.twitter_url = Some(value),
            _ => {}
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.full_name.is_empty() {
            return Err(ApiError::Validation("Please enter your full name".into()));
        }
        if self.email.is_empty() {
            return Err(ApiError::Validation("Please enter your email".into()));
        }
        if !is_valid_email(&self.email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        if self.phone.is_empty() {
            return Err(ApiError::Validation("Please enter your phone number".into()));
        }
        if self.about_me.is_empty() {
            return Err(ApiError::Validation("Please enter about you".into()));
        }
        validate_password(&self.password)?;
        if self.portfolio_url.is_empty() {
            return Err(ApiError::Validation(
                "Please enter your portfolio URL".into(),
            ));
        }
        Ok(())
    }
}

/// Partial profile fields collected from the update multipart body.
/// `None` means "leave unchanged"; for the optional link fields an
/// explicitly supplied empty string means "clear".
#[derive(Debug, Default)]
pub struct UpdateProfileForm {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub about_me: Option<String>,
    pub portfolio_url: Option<String>,
    pub github_url: Option<String>,
    pub instagram_url: Option<String>,
    pub facebook_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub avatar: Option<UploadFile>,
    pub resume: Option<UploadFile>,
}

impl UpdateProfileForm {
    pub fn apply_text(&mut self, name: &str, value: String) {
        match name {
            // Required fields: an empty value means "leave unchanged".
            "fullName" if !value.is_empty() => self.full_name = Some(value),
            "email" if !value.is_empty() => self.email = Some(value),
            "phone" if !value.is_empty() => self.phone = Some(value),
            "aboutMe" if !value.is_empty() => self.about_me = Some(value),
            "portfolioURL" if !value.is_empty() => self.portfolio_url = Some(value),
            // Optional links: an explicit empty value clears the field.
            "githubURL" => self.github_url = Some(value),
            "instagramURL" => self.instagram_url = Some(value),
            "facebookURL" => self.facebook_url = Some(value),
            "linkedInURL" => self.linkedin_url = Some(value),
            "twitterURL" => self.twitter_url = Some(value),
            _ => {}
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err(ApiError::Validation("Invalid email".into()));
            }
        }
        Ok(())
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::Validation("Please enter your password".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password should be at least 8 characters".into(),
        ));
    }
    Ok(())
}

/// Public projection of a user record. Built from `repo::User`, so the
/// password hash and reset fields are unrepresentable here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub about_me: String,
    #[serde(rename = "portfolioURL")]
    pub portfolio_url: String,
    #[serde(rename = "githubURL", skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(rename = "instagramURL", skip_serializing_if = "Option::is_none")]
    pub instagram_url: Option<String>,
    #[serde(rename = "facebookURL", skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<String>,
    #[serde(rename = "linkedInURL", skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(rename = "twitterURL", skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,
    pub avatar: AssetRef,
    pub resume: AssetRef,
    pub created_at: OffsetDateTime,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            about_me: user.about_me,
            portfolio_url: user.portfolio_url,
            github_url: user.github_url,
            instagram_url: user.instagram_url,
            facebook_url: user.facebook_url,
            linkedin_url: user.linkedin_url,
            twitter_url: user.twitter_url,
            avatar: AssetRef {
                id: user.avatar_id,
                url: user.avatar_url,
            },
            resume: AssetRef {
                id: user.resume_id,
                url: user.resume_url,
            },
            created_at: user.created_at,
        }
    }
}

/// Response for login, registration and password reset: the token is
/// echoed in the body alongside the session cookie.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserBody,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserBody,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            full_name: "Ada Lovelace".into(),
            email: "a@x.com".into(),
            phone: "+1234567890".into(),
            about_me: "First programmer".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            portfolio_url: "https://ada.dev".into(),
            github_url: Some("https://github.com/ada".into()),
            instagram_url: None,
            facebook_url: None,
            linkedin_url: None,
            twitter_url: None,
            avatar_id: "avatars/1.jpg".into(),
            avatar_url: "https://assets.local/folio/avatars/1.jpg".into(),
            resume_id: "resumes/1.pdf".into(),
            resume_url: "https://assets.local/folio/resumes/1.pdf".into(),
            reset_token_hash: Some("deadbeef".into()),
            reset_token_expires_at: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn user_body_never_carries_secrets() {
        let body = UserBody::from(sample_user());
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
        assert!(!json.contains("deadbeef"));
        assert!(!json.contains("resetToken"));
        assert!(json.contains("\"fullName\":\"Ada Lovelace\""));
        assert!(json.contains("\"portfolioURL\""));
        assert!(json.contains("avatars/1.jpg"));
    }

    #[test]
    fn register_form_validates_required_fields() {
        let mut form = RegisterForm::default();
        assert!(form.validate().is_err());

        form.apply_text("fullName", "Ada Lovelace".into());
        form.apply_text("email", "a@x.com".into());
        form.apply_text("phone", "+1234567890".into());
        form.apply_text("aboutMe", "First programmer".into());
        form.apply_text("password", "longenough1".into());
        form.apply_text("portfolioURL", "https://ada.dev".into());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn register_form_rejects_short_password() {
        let mut form = RegisterForm::default();
        form.apply_text("fullName", "Ada".into());
        form.apply_text("email", "a@x.com".into());
        form.apply_text("phone", "+1".into());
        form.apply_text("aboutMe", "hi".into());
        form.apply_text("password", "short".into());
        form.apply_text("portfolioURL", "https://ada.dev".into());
        let err = form.validate().unwrap_err();
        assert!(err.to_string().contains("at least 8"));
    }

    #[test]
    fn register_form_rejects_bad_email() {
        let mut form = RegisterForm::default();
        form.apply_text("fullName", "Ada".into());
        form.apply_text("email", "nope".into());
        form.apply_text("phone", "+1".into());
        form.apply_text("aboutMe", "hi".into());
        form.apply_text("password", "longenough1".into());
        form.apply_text("portfolioURL", "https://ada.dev".into());
        assert!(form.validate().is_err());
    }

    #[test]
    fn update_form_drops_empty_required_fields() {
        let mut form = UpdateProfileForm::default();
        form.apply_text("fullName", "".into());
        form.apply_text("githubURL", "https://github.com/ada".into());
        assert!(form.full_name.is_none());
        assert_eq!(form.github_url.as_deref(), Some("https://github.com/ada"));
        assert!(form.validate().is_ok());
    }

    #[test]
    fn update_form_empty_optional_url_clears_it() {
        let mut form = UpdateProfileForm::default();
        form.apply_text("githubURL", "".into());
        form.apply_text("twitterURL", "".into());
        // An explicit empty string is forwarded so the column goes NULL.
        assert_eq!(form.github_url.as_deref(), Some(""));
        assert_eq!(form.twitter_url.as_deref(), Some(""));
        assert!(form.instagram_url.is_none());
    }

    #[test]
    fn email_case_is_preserved_as_submitted() {
        let mut form = RegisterForm::default();
        form.apply_text("email", "Ada@X.com".into());
        assert_eq!(form.email, "Ada@X.com");
        assert!(is_valid_email(&form.email));

        let mut update = UpdateProfileForm::default();
        update.apply_text("email", "Ada@X.com".into());
        assert_eq!(update.email.as_deref(), Some("Ada@X.com"));
        assert!(update.validate().is_ok());
    }

    #[test]
    fn update_password_request_uses_camel_case() {
        let req: UpdatePasswordRequest = serde_json::from_str(
            r#"{"currentPassword":"old","newPassword":"new","confirmNewPassword":"new"}"#,
        )
        .unwrap();
        assert_eq!(req.current_password, "old");
        assert_eq!(req.new_password, "new");
        assert_eq!(req.confirm_new_password, "new");
    }

    #[test]
    fn reset_password_request_uses_camel_case() {
        let req: ResetPasswordRequest =
            serde_json::from_str(r#"{"password":"a","confirmPassword":"b"}"#).unwrap();
        assert_eq!(req.password, "a");
        assert_eq!(req.confirm_password, "b");
    }
}
