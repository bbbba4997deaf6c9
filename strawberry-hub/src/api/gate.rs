//! Authorization gate
//!
//! Two independent checks run at the start of a handler:
//! the launch-parameter signature (proves the request came from the platform
//! and names the calling user) and the bearer token (proves a prior verify).

use sqlx::SqlitePool;
use strawberry_common::api::auth::verify_sign;
use strawberry_common::api::LaunchParams;

use crate::db::credentials;
use crate::error::{Error, Result};

/// Launch parameter naming the calling user
pub const USER_ID_PARAM: &str = "vk_user_id";

/// Check the launch-parameter signature
pub fn verify_signature(params: &LaunchParams, secret: &str) -> Result<()> {
    verify_sign(params, secret).map_err(|e| Error::SignatureInvalid(e.to_string()))
}

/// Check the signature and return the signed user id
pub fn signed_user(params: &LaunchParams, secret: &str) -> Result<i64> {
    verify_signature(params, secret)?;

    params
        .get(USER_ID_PARAM)
        .and_then(|v| v.as_text())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::SignatureInvalid(format!("missing or malformed {}", USER_ID_PARAM)))
}

/// Check that `token` is stored and not expired
///
/// An unknown token is `TokenInvalid`; a store failure stays a store error.
pub async fn check_token(db: &SqlitePool, token: &str) -> Result<()> {
    if credentials::is_valid(db, token).await? {
        Ok(())
    } else {
        Err(Error::TokenInvalid)
    }
}

/// Full gate: signature first, then token
///
/// Returns the owner id carried by the signed parameters.
pub async fn authorize(
    db: &SqlitePool,
    secret: &str,
    params: &LaunchParams,
    token: &str,
) -> Result<i64> {
    let owner_id = signed_user(params, secret)?;
    check_token(db, token).await?;
    Ok(owner_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use strawberry_common::api::{calculate_sign, ParamValue};

    const SECRET: &str = "s3cr3t";

    fn signed(user_id: Option<&str>) -> LaunchParams {
        let mut params = LaunchParams::new();
        params.insert("vk_app_id".to_string(), "6736218".into());
        if let Some(id) = user_id {
            params.insert(USER_ID_PARAM.to_string(), id.into());
        }
        let sign = calculate_sign(&params, SECRET).unwrap();
        params.insert("sign".to_string(), ParamValue::Text(sign));
        params
    }

    #[test]
    fn test_signed_user() {
        assert_eq!(signed_user(&signed(Some("494075")), SECRET).unwrap(), 494075);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let result = signed_user(&signed(Some("494075")), "other");
        assert!(matches!(result, Err(Error::SignatureInvalid(_))));
    }

    #[test]
    fn test_missing_or_bad_user_id_rejected() {
        assert!(verify_signature(&signed(None), SECRET).is_ok());
        assert!(matches!(
            signed_user(&signed(None), SECRET),
            Err(Error::SignatureInvalid(_))
        ));
        assert!(matches!(
            signed_user(&signed(Some("not-a-number")), SECRET),
            Err(Error::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_tampered_params_rejected() {
        let mut params = signed(Some("494075"));
        params.insert(USER_ID_PARAM.to_string(), "1".into());
        assert!(matches!(
            signed_user(&params, SECRET),
            Err(Error::SignatureInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_authorize_checks_signature_before_token() {
        let db = test_pool().await;

        // Bad signature wins even when the token is also unknown
        let result = authorize(&db, "other", &signed(Some("1")), "missing").await;
        assert!(matches!(result, Err(Error::SignatureInvalid(_))));

        let result = authorize(&db, SECRET, &signed(Some("1")), "missing").await;
        assert!(matches!(result, Err(Error::TokenInvalid)));

        credentials::add_credential(&db, "good").await.unwrap();
        assert_eq!(authorize(&db, SECRET, &signed(Some("1")), "good").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_token_error() {
        let db = test_pool().await;
        db.close().await;

        let result = check_token(&db, "anything").await;
        assert!(matches!(result, Err(Error::Store(_))));
    }
}
