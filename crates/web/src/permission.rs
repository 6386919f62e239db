//! # 権限チェック
//!
//! ## ユーザーデータの読み込み
//!
//! [`load_user_data`] は `Authorization: Bearer <token>` を持つリクエストについて、
//! [`UserDataLoader`] でユーザーデータを解決し、リクエスト extensions に格納する。
//! 解決できなかった場合はデバッグログを出し、未認証のままリクエストを続行する。
//!
//! ## 権限チェック
//!
//! [`require_permission`] は extensions のユーザーデータが、ルートに宣言された
//! 権限のいずれかを持つか検証する。ユーザーデータがない場合と、
//! どの権限も持たない場合は 401 Unauthorized を返す。
//!
//! ```rust,ignore
//! use axum::middleware::from_fn_with_state;
//!
//! let permission_state = PermissionState::new(localizer.clone(), ["AddItem"]);
//!
//! Router::new()
//!     .route("/api/items", post(create_item))
//!     .layer(from_fn_with_state(permission_state, require_permission))
//!     .layer(from_fn_with_state(user_data_state, load_user_data))
//! ```

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use strata_services::ServiceError;
use strata_shared::{Localizer, resources::keys};

use crate::{
    exception::error_response,
    http_logger::{self, HttpLogRecord, RequestInfo},
};

/// 認証済みユーザーのデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub user_id:     String,
    pub permissions: Vec<String>,
}

impl UserData {
    /// 要求された権限のいずれかを持つか
    pub fn has_any_permission(&self, required: &[String]) -> bool {
        required.iter().any(|p| self.permissions.contains(p))
    }
}

/// トークンからユーザーデータを解決する
#[async_trait]
pub trait UserDataLoader: Send + Sync {
    /// 該当ユーザーがいなければ `Ok(None)` を返す
    async fn load(&self, token: &str) -> Result<Option<UserData>, ServiceError>;
}

/// ユーザーデータ読み込みミドルウェアの状態
#[derive(Clone)]
pub struct UserDataState {
    pub loader: Arc<dyn UserDataLoader>,
}

/// `Authorization: Bearer <token>` からトークンを取り出す
fn bearer_token<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// ユーザーデータ読み込みミドルウェア
pub async fn load_user_data(
    State(state): State<UserDataState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request).map(str::to_string) else {
        return next.run(request).await;
    };

    let info = RequestInfo::from_request(&request);
    http_logger::log_debug(
        Some(&info),
        &HttpLogRecord::new("Processing an authenticated request"),
    );

    match state.loader.load(&token).await {
        Ok(Some(user)) => {
            http_logger::log_debug(
                Some(&info),
                &HttpLogRecord::new(format!("Added the user data of '{}'", user.user_id)),
            );
            request.extensions_mut().insert(user);
        }
        Ok(None) => {
            http_logger::log_debug(
                Some(&info),
                &HttpLogRecord::new("There is no user matching the token"),
            );
        }
        Err(e) => {
            http_logger::log_debug(
                Some(&info),
                &HttpLogRecord::new("Failed to load the user data").with_details(e.to_string()),
            );
        }
    }

    next.run(request).await
}

/// 権限チェックミドルウェアの状態
#[derive(Clone)]
pub struct PermissionState {
    pub localizer:            Arc<dyn Localizer>,
    pub required_permissions: Vec<String>,
}

impl PermissionState {
    pub fn new<I, P>(localizer: Arc<dyn Localizer>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            localizer,
            required_permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for PermissionState {
    /// 要求権限をカンマ区切りで出力する
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.required_permissions.join(","))
    }
}

/// 権限チェックミドルウェア
///
/// 拒否した場合は必要な権限を添えて警告ログを出力する。
pub async fn require_permission(
    State(state): State<PermissionState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let denial = match request.extensions().get::<UserData>() {
        None => Some("The user data is missing".to_string()),
        Some(user) if !user.has_any_permission(&state.required_permissions) => {
            Some(format!("UserId: '{}'", user.user_id))
        }
        Some(_) => None,
    };

    let Some(reason) = denial else {
        return next.run(request).await;
    };

    let info = RequestInfo::from_request(&request);
    http_logger::log_warn(
        Some(&info),
        &HttpLogRecord::new(format!(
            "Unauthorized call of '{} {}'. Required permission(s): '{}'. {}",
            info.method, info.path, state, reason
        ))
        .with_correlation_id(),
    );

    error_response(
        StatusCode::UNAUTHORIZED,
        state.localizer.get(keys::PERMISSION_UNAUTHORIZED),
    )
}
