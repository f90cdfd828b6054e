use std::time::Duration;

use log::{debug, warn};
use reqwest::Method;
use rsa::RsaPublicKey;
use serde_json::{json, Value};

use crate::auth;
use crate::config::{Config, Environment};
use crate::error::{ConfigError, GatewayError};

pub const C2B_PORT: u16 = 18352;
pub const C2B_PATH: &str = "/ipg/v1x/c2bPayment/singleStage/";
pub const B2C_PORT: u16 = 18345;
pub const B2C_PATH: &str = "/ipg/v1x/b2cPayment/";
pub const REVERSAL_PORT: u16 = 18354;
pub const REVERSAL_PATH: &str = "/ipg/v1x/reversal/";
pub const STATUS_PORT: u16 = 18353;
pub const STATUS_PATH: &str = "/ipg/v1x/queryTransactionStatus/";

const ORIGIN: &str = "developer.mpesa.vm.co.mz";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// A 2xx answer from the gateway: the response body (JSON when the gateway
/// sent JSON, a plain string otherwise) and the HTTP status.
#[derive(serde::Serialize, Debug, Clone)]
pub struct GatewayResponse {
    pub response: Value,
    pub status: u16,
}

/// Client for the M-Pesa Mozambique gateway. Immutable once built; operations
/// are independent and safe to call concurrently. Each call derives a fresh
/// bearer token, the gateway does not accept reused ones.
pub struct MpesaClient {
    http: reqwest::Client,
    public_key: RsaPublicKey,
    api_key: String,
    service_provider_code: String,
    environment: Environment,
    base_override: Option<String>,
}

impl MpesaClient {
    /// Build a client from a fully-resolved [`Config`]. The public key is
    /// parsed here so a bad key fails construction, not the first payment.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let public_key = auth::parse_public_key(&config.public_key)?;
        Ok(MpesaClient {
            http: reqwest::Client::new(),
            public_key,
            api_key: config.api_key,
            service_provider_code: config.service_provider_code,
            environment: config.environment,
            base_override: None,
        })
    }

    /// Point the client at an arbitrary base URI (scheme, host and port)
    /// instead of the gateway hosts. The per-operation gateway ports do not
    /// apply to an overridden base. Used against mock servers in tests.
    pub fn with_base_uri(config: Config, base_uri: impl Into<String>) -> Result<Self, ConfigError> {
        let mut client = MpesaClient::new(config)?;
        client.base_override = Some(base_uri.into().trim_end_matches('/').to_owned());
        Ok(client)
    }

    /// Customer-to-business payment: charge `amount` to the customer's
    /// wallet. Field values are passed through to the gateway verbatim.
    pub async fn c2b(
        &self,
        transaction_reference: &str,
        customer_msisdn: &str,
        amount: f64,
        third_party_reference: &str,
        service_provider_code: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError> {
        let code = self.resolve_code(service_provider_code)?;
        let fields = json!({
            "input_TransactionReference": transaction_reference,
            "input_CustomerMSISDN": customer_msisdn,
            "input_Amount": amount,
            "input_ThirdPartyReference": third_party_reference,
            "input_ServiceProviderCode": code,
        });
        self.dispatch(C2B_PATH, C2B_PORT, Method::POST, fields).await
    }

    /// Business-to-customer disbursement to the customer's wallet.
    pub async fn b2c(
        &self,
        transaction_reference: &str,
        customer_msisdn: &str,
        amount: f64,
        third_party_reference: &str,
        service_provider_code: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError> {
        let code = self.resolve_code(service_provider_code)?;
        let fields = json!({
            "input_TransactionReference": transaction_reference,
            "input_CustomerMSISDN": customer_msisdn,
            "input_Amount": amount,
            "input_ThirdPartyReference": third_party_reference,
            "input_ServiceProviderCode": code,
        });
        self.dispatch(B2C_PATH, B2C_PORT, Method::POST, fields).await
    }

    /// Reverse a settled transaction, fully or partially via `reversal_amount`.
    pub async fn reversal(
        &self,
        transaction_id: &str,
        security_credential: &str,
        initiator_identifier: &str,
        third_party_reference: &str,
        service_provider_code: Option<&str>,
        reversal_amount: f64,
    ) -> Result<GatewayResponse, GatewayError> {
        let code = self.resolve_code(service_provider_code)?;
        let fields = json!({
            "input_TransactionID": transaction_id,
            "input_SecurityCredential": security_credential,
            "input_InitiatorIdentifier": initiator_identifier,
            "input_ThirdPartyReference": third_party_reference,
            "input_ServiceProviderCode": code,
            "input_ReversalAmount": reversal_amount,
        });
        self.dispatch(REVERSAL_PATH, REVERSAL_PORT, Method::POST, fields)
            .await
    }

    /// Query the state of a prior transaction by its third-party reference.
    pub async fn query_status(
        &self,
        third_party_reference: &str,
        query_reference: &str,
        service_provider_code: Option<&str>,
    ) -> Result<GatewayResponse, GatewayError> {
        let code = self.resolve_code(service_provider_code)?;
        let fields = json!({
            "input_ThirdPartyReference": third_party_reference,
            "input_QueryReference": query_reference,
            "input_ServiceProviderCode": code,
        });
        self.dispatch(STATUS_PATH, STATUS_PORT, Method::GET, fields)
            .await
    }

    // Per-call override gets the same presence check the configured default
    // already passed at construction.
    fn resolve_code<'a>(&'a self, override_code: Option<&'a str>) -> Result<&'a str, GatewayError> {
        let code = override_code.unwrap_or(&self.service_provider_code);
        if code.is_empty() {
            return Err(GatewayError::EmptyServiceProviderCode);
        }
        Ok(code)
    }

    fn url_for(&self, port: u16, path: &str) -> String {
        match &self.base_override {
            Some(base) => format!("{}{}", base, path),
            None => format!("{}:{}{}", self.environment.base_uri(), port, path),
        }
    }

    async fn dispatch(
        &self,
        path: &str,
        port: u16,
        method: Method,
        fields: Value,
    ) -> Result<GatewayResponse, GatewayError> {
        let token = auth::derive_token(&self.public_key, &self.api_key)?;
        let url = self.url_for(port, path);
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), url.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .header("origin", ORIGIN)
            .header("Connection", "keep-alive")
            .timeout(REQUEST_TIMEOUT);
        request = if method == Method::POST {
            request.json(&fields)
        } else {
            request.query(&query_pairs(&fields))
        };

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Unknown(e.to_string()))?;
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(v) => v,
            Err(_) => Value::String(text),
        };

        if (200..300).contains(&status) {
            Ok(GatewayResponse {
                response: body,
                status,
            })
        } else {
            warn!("gateway rejected {} with status {}", path, status);
            Err(GatewayError::RemoteRejected { status, body })
        }
    }
}

fn classify(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::NetworkUnreachable(e.to_string())
    } else {
        GatewayError::Unknown(e.to_string())
    }
}

// GET operations carry the fields as query parameters, numbers stringified.
fn query_pairs(fields: &Value) -> Vec<(String, String)> {
    match fields.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
        None => Vec::new(),
    }
}
