//! Profile, KYC and admin user-management endpoints.

use api_types::user::{
    AccountStatus, KycReview, KycStatus, Role, UserSummary, UserUpdate, UserView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::Session;

use crate::{ServerError, balances::map_balance, server::ServerState};

fn map_role(role: engine::Role) -> Role {
    match role {
        engine::Role::User => Role::User,
        engine::Role::Admin => Role::Admin,
    }
}

fn map_status(status: engine::AccountStatus) -> AccountStatus {
    match status {
        engine::AccountStatus::Active => AccountStatus::Active,
        engine::AccountStatus::Suspended => AccountStatus::Suspended,
    }
}

fn map_kyc(status: engine::KycStatus) -> KycStatus {
    match status {
        engine::KycStatus::NotStarted => KycStatus::NotStarted,
        engine::KycStatus::Pending => KycStatus::Pending,
        engine::KycStatus::Approved => KycStatus::Approved,
        engine::KycStatus::Rejected => KycStatus::Rejected,
    }
}

pub(crate) fn map_user(user: engine::User) -> UserView {
    UserView {
        username: user.username,
        email: user.email,
        display_name: user.display_name,
        role: map_role(user.role),
        status: map_status(user.status),
        kyc_status: map_kyc(user.kyc_status),
        created_at: user.created_at,
    }
}

pub async fn me(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&session, &session.user_id).await?;
    Ok(Json(map_user(user)))
}

pub async fn submit_kyc(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.submit_kyc(&session).await?;
    Ok(Json(map_user(user)))
}

pub async fn list(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<UserSummary>>, ServerError> {
    let users = state
        .engine
        .list_users(&session)
        .await?
        .into_iter()
        .map(|summary| UserSummary {
            user: map_user(summary.user),
            balances: summary.balances.into_iter().map(map_balance).collect(),
        })
        .collect();
    Ok(Json(users))
}

/// Changes role and/or account status of a user.
pub async fn update(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let mut user = None;
    if let Some(role) = payload.role {
        let role = match role {
            Role::User => engine::Role::User,
            Role::Admin => engine::Role::Admin,
        };
        user = Some(state.engine.set_user_role(&session, &username, role).await?);
    }
    if let Some(status) = payload.status {
        let status = match status {
            AccountStatus::Active => engine::AccountStatus::Active,
            AccountStatus::Suspended => engine::AccountStatus::Suspended,
        };
        user = Some(
            state
                .engine
                .set_user_status(&session, &username, status)
                .await?,
        );
    }

    let user = user.ok_or_else(|| ServerError::Generic("nothing to update".to_string()))?;
    Ok(Json(map_user(user)))
}

pub async fn review_kyc(
    Extension(session): Extension<Session>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
    Json(payload): Json<KycReview>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .review_kyc(&session, &username, payload.approve)
        .await?;
    Ok(Json(map_user(user)))
}
