use common::AccountId;

/// The account a request acts for.
///
/// Authentication happens upstream; the gateway forwards the verified
/// account id in the [`Account::HEADER`] header and this extractor trusts it.
#[derive(Debug, Clone)]
pub struct Account(pub AccountId);

impl Account {
    pub const HEADER: &'static str = "x-account-id";

    pub fn id(&self) -> &AccountId {
        &self.0
    }
}

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for Account
where
    S: Send + Sync,
{
    type Rejection = (axum::http::StatusCode, &'static str);

    async fn from_request_parts(
        req: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let id = req
            .headers
            .get(Self::HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or((axum::http::StatusCode::UNAUTHORIZED, "Not logged in"))?;

        Ok(Self(AccountId::new(id)))
    }
}
