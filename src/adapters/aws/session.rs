use crate::adapters::aws::athena::AthenaClient;
use crate::adapters::aws::quicksight::QuickSightClient;
use crate::adapters::aws::signed_client::SignedClient;
use crate::config::{AthenaSettings, AwsSettings};
use crate::utils::error::{ExportError, Result};
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sts::config::Region;
use aws_sdk_sts::error::DisplayErrorContext;
use reqwest::Client;

/// Resolved AWS identity: region, account and credentials shared by the
/// QuickSight and Athena clients.
#[derive(Clone)]
pub struct AwsSession {
    region: String,
    account_id: String,
    credentials: SharedCredentialsProvider,
    http: Client,
}

impl std::fmt::Debug for AwsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSession")
            .field("region", &self.region)
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl AwsSession {
    pub fn new(
        region: impl Into<String>,
        account_id: impl Into<String>,
        credentials: SharedCredentialsProvider,
    ) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            credentials,
            http: Client::new(),
        }
    }

    /// Loads the default credential chain (optionally a named profile) and
    /// asks STS which account the credentials belong to.
    pub async fn load(settings: &AwsSettings) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .ok_or_else(|| ExportError::MissingConfigError {
                field: "region".to_string(),
            })?;
        let credentials =
            sdk_config
                .credentials_provider()
                .ok_or_else(|| ExportError::CredentialsError {
                    message: "no credentials provider configured".to_string(),
                })?;

        let sts = aws_sdk_sts::Client::new(&sdk_config);
        let identity = sts.get_caller_identity().send().await.map_err(|e| {
            ExportError::CredentialsError {
                message: DisplayErrorContext(&e).to_string(),
            }
        })?;
        let account_id = identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| ExportError::CredentialsError {
                message: "STS did not return an account id".to_string(),
            })?;

        tracing::info!("Using account {} in {}", account_id, region);
        Ok(Self::new(region, account_id, credentials))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn signed_client(&self, service: &'static str, endpoint: &str) -> Result<SignedClient> {
        SignedClient::new(
            self.http.clone(),
            self.credentials.clone(),
            self.region.clone(),
            service,
            endpoint,
        )
    }

    pub fn quicksight(&self, endpoint: Option<&str>) -> Result<QuickSightClient> {
        let default = format!("https://quicksight.{}.amazonaws.com", self.region);
        let client = self.signed_client("quicksight", endpoint.unwrap_or(&default))?;
        Ok(QuickSightClient::new(client, self.account_id.clone()))
    }

    pub fn athena(&self, settings: &AthenaSettings) -> Result<AthenaClient> {
        let default = format!("https://athena.{}.amazonaws.com", self.region);
        let endpoint = settings.endpoint.as_deref().unwrap_or(&default);
        let client = self.signed_client("athena", endpoint)?;
        Ok(AthenaClient::new(client, settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::QuickSightApi;
    use aws_credential_types::Credentials;

    fn session() -> AwsSession {
        AwsSession::new(
            "eu-west-1",
            "111122223333",
            SharedCredentialsProvider::new(Credentials::new("AKID", "secret", None, None, "test")),
        )
    }

    #[test]
    fn test_quicksight_default_endpoint() {
        let qs = session().quicksight(None).unwrap();
        assert_eq!(qs.account_id(), "111122223333");
        assert_eq!(qs.region(), "eu-west-1");
        let debug = format!("{:?}", qs);
        assert!(debug.contains("https://quicksight.eu-west-1.amazonaws.com/"));
    }

    #[test]
    fn test_athena_endpoint_override() {
        let settings = AthenaSettings {
            endpoint: Some("http://127.0.0.1:9999".to_string()),
            ..AthenaSettings::default()
        };
        let athena = session().athena(&settings).unwrap();
        assert!(format!("{:?}", athena).contains("http://127.0.0.1:9999/"));
    }

    #[test]
    fn test_bad_endpoint_is_config_error() {
        let err = session().quicksight(Some("::nope")).unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfigValueError { .. }));
    }
}
