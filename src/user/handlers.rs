use axum::{
    extract::{
        multipart::{Field, Multipart},
        FromRef, Path, State,
    },
    http::StatusCode,
    Json,
};
use axum_extra::extract::CookieJar;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        extractors::AuthUser,
        jwt::SessionKeys,
        password::{hash_password, verify_password},
        reset,
    },
    error::ApiError,
    state::AppState,
    storage::UploadFile,
};

use super::{
    dto::{
        validate_password, AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterForm,
        ResetPasswordRequest, StatusResponse, UpdatePasswordRequest, UpdateProfileForm,
        UserResponse,
    },
    repo::{NewUser, ProfileChanges, User},
};

const AVATAR_FOLDER: &str = "avatars";
const RESUME_FOLDER: &str = "resumes";

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    mp: Multipart,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let mut form = collect_register_form(mp).await?;
    form.validate()?;

    let avatar_file = form
        .avatar
        .take()
        .ok_or_else(|| ApiError::Validation("Please upload your avatar".into()))?;
    let resume_file = form
        .resume
        .take()
        .ok_or_else(|| ApiError::Validation("Please upload your resume".into()))?;

    if User::find_by_email(&state.db, &form.email).await?.is_some() {
        warn!(email = %form.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let avatar = state.assets.upload(AVATAR_FOLDER, avatar_file).await?;
    let resume = state.assets.upload(RESUME_FOLDER, resume_file).await?;

    let password_hash = hash_password(&form.password)?;
    let user = User::create(
        &state.db,
        &NewUser {
            full_name: &form.full_name,
            email: &form.email,
            phone: &form.phone,
            about_me: &form.about_me,
            password_hash: &password_hash,
            portfolio_url: &form.portfolio_url,
            github_url: form.github_url.as_deref(),
            instagram_url: form.instagram_url.as_deref(),
            facebook_url: form.facebook_url.as_deref(),
            linkedin_url: form.linkedin_url.as_deref(),
            twitter_url: form.twitter_url.as_deref(),
            avatar: &avatar,
            resume: &resume,
        },
    )
    .await?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id)?;
    let jar = jar.add(keys.session_cookie(token.clone()));

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully".into(),
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    // Emails are stored and matched exactly as submitted.
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Please enter your email and password".into(),
        ));
    }

    // Unknown email and wrong password take the same exit so the
    // response never discloses which check failed.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id)?;
    let jar = jar.add(keys.session_cookie(token.clone()));

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: "User logged in successfully".into(),
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip_all)]
pub async fn logout(
    AuthUser(user_id): AuthUser,
    jar: CookieJar,
) -> (CookieJar, Json<StatusResponse>) {
    info!(user_id = %user_id, "user logged out");
    (
        jar.add(SessionKeys::expired_cookie()),
        Json(StatusResponse {
            success: true,
            message: "Logged out successfully".into(),
        }),
    )
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id).await?;
    Ok(Json(UserResponse {
        success: true,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn portfolio_user(
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_email(&state.db, &state.config.portfolio_user_email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Portfolio user not found".into()))?;
    Ok(Json(UserResponse {
        success: true,
        user: user.into(),
    }))
}

#[instrument(skip(state, mp))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> Result<Json<UserResponse>, ApiError> {
    let mut form = collect_update_form(mp).await?;
    form.validate()?;

    let current = User::find_by_id(&state.db, user_id).await?;

    // Asset swap: upload the new file first, then drop the old one, then
    // persist the new reference. A crash mid-swap leaves the record
    // pointing at a still-existing asset; a leaked upload is the worst case.
    let new_avatar = match form.avatar.take() {
        Some(file) => {
            let uploaded = state.assets.upload(AVATAR_FOLDER, file).await?;
            if let Err(e) = state.assets.destroy(&current.avatar_id).await {
                warn!(error = ?e, asset_id = %current.avatar_id, "failed to destroy old avatar");
            }
            Some(uploaded)
        }
        None => None,
    };
    let new_resume = match form.resume.take() {
        Some(file) => {
            let uploaded = state.assets.upload(RESUME_FOLDER, file).await?;
            if let Err(e) = state.assets.destroy(&current.resume_id).await {
                warn!(error = ?e, asset_id = %current.resume_id, "failed to destroy old resume");
            }
            Some(uploaded)
        }
        None => None,
    };

    let user = User::update_profile(
        &state.db,
        user_id,
        &ProfileChanges {
            full_name: form.full_name.as_deref(),
            email: form.email.as_deref(),
            phone: form.phone.as_deref(),
            about_me: form.about_me.as_deref(),
            portfolio_url: form.portfolio_url.as_deref(),
            github_url: form.github_url.as_deref(),
            instagram_url: form.instagram_url.as_deref(),
            facebook_url: form.facebook_url.as_deref(),
            linkedin_url: form.linkedin_url.as_deref(),
            twitter_url: form.twitter_url.as_deref(),
            avatar: new_avatar.as_ref(),
            resume: new_resume.as_ref(),
        },
    )
    .await?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(UserResponse {
        success: true,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if payload.current_password.is_empty()
        || payload.new_password.is_empty()
        || payload.confirm_new_password.is_empty()
    {
        return Err(ApiError::Validation("Please enter all fields".into()));
    }

    let user = User::find_by_id(&state.db, user_id).await?;
    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "password change with incorrect current password");
        return Err(ApiError::IncorrectCurrentPassword);
    }
    if payload.new_password != payload.confirm_new_password {
        return Err(ApiError::PasswordMismatch);
    }
    validate_password(&payload.new_password)?;

    let password_hash = hash_password(&payload.new_password)?;
    User::set_password(&state.db, user.id, &password_hash).await?;

    info!(user_id = %user.id, "password updated");
    Ok(Json(StatusResponse {
        success: true,
        message: "Password updated".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::Validation("Please enter your email".into()));
    }
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let token = reset::generate();
    User::set_reset_token(&state.db, user.id, &token.secret_hash, token.expires_at).await?;

    let reset_url = format!(
        "{}/password/reset/{}",
        state.config.dashboard_url.trim_end_matches('/'),
        token.secret
    );
    let body = format!(
        "Your password reset link is:\n\n{}\n\nIf you did not request this, please ignore this email.",
        reset_url
    );

    if let Err(e) = state
        .mailer
        .send(&user.email, "Portfolio password recovery", &body)
        .await
    {
        error!(error = ?e, user_id = %user.id, "reset email delivery failed");
        // Never leave a live reset token the user did not receive.
        if let Err(e) = User::clear_reset_token(&state.db, user.id).await {
            error!(error = ?e, user_id = %user.id, "failed to clear reset token");
        }
        return Err(ApiError::Internal(e));
    }

    info!(user_id = %user.id, "reset email sent");
    Ok(Json(StatusResponse {
        success: true,
        message: format!("Email sent to {} successfully", user.email),
    }))
}

#[instrument(skip(state, payload, token))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    jar: CookieJar,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let token_hash = reset::hash_secret(&token);
    let user = User::find_by_reset_token(&state.db, &token_hash)
        .await?
        .ok_or(ApiError::InvalidOrExpiredResetToken)?;

    if payload.password != payload.confirm_password {
        return Err(ApiError::PasswordMismatch);
    }
    validate_password(&payload.password)?;

    let password_hash = hash_password(&payload.password)?;
    User::reset_password(&state.db, user.id, &password_hash).await?;

    // Auto-login after a successful reset.
    let keys = SessionKeys::from_ref(&state);
    let session_token = keys.sign(user.id)?;
    let jar = jar.add(keys.session_cookie(session_token.clone()));

    info!(user_id = %user.id, "password reset completed");
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: "Password updated successfully".into(),
            token: session_token,
            user: user.into(),
        }),
    ))
}

// --- multipart collection ---

async fn read_file(field: Field<'_>) -> Result<UploadFile, ApiError> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".into());
    let bytes = field.bytes().await.map_err(malformed_multipart)?;
    Ok(UploadFile {
        bytes,
        content_type,
    })
}

async fn collect_register_form(mut mp: Multipart) -> Result<RegisterForm, ApiError> {
    let mut form = RegisterForm::default();
    while let Some(field) = mp.next_field().await.map_err(malformed_multipart)? {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "avatar" => form.avatar = Some(read_file(field).await?),
            "resume" => form.resume = Some(read_file(field).await?),
            _ => {
                let value = field.text().await.map_err(malformed_multipart)?;
                form.apply_text(&name, value);
            }
        }
    }
    Ok(form)
}

async fn collect_update_form(mut mp: Multipart) -> Result<UpdateProfileForm, ApiError> {
    let mut form = UpdateProfileForm::default();
    while let Some(field) = mp.next_field().await.map_err(malformed_multipart)? {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "avatar" => form.avatar = Some(read_file(field).await?),
            "resume" => form.resume = Some(read_file(field).await?),
            _ => {
                let value = field.text().await.map_err(malformed_multipart)?;
                form.apply_text(&name, value);
            }
        }
    }
    Ok(form)
}

fn malformed_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    warn!(error = %e, "malformed multipart body");
    ApiError::Validation("Malformed multipart body".into())
}
