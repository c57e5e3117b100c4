//! Rendering fetched credentials.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::ValueEnum;
use idpool_core::Credentials;
use idpool_core::mask::mask_credential;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary with masked secrets
    Text,
    /// Shell `export` statements
    Env,
    /// JSON for external credential-process consumers
    CredentialProcess,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialProcessOutput<'a> {
    version: u8,
    access_key_id: &'a str,
    secret_access_key: &'a str,
    session_token: &'a str,
    expiration: String,
}

pub fn render(format: OutputFormat, credentials: &Credentials, identity_id: &str) -> Result<String> {
    let expiration = credentials
        .expiration()
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    match format {
        OutputFormat::Text => Ok(format!(
            "Identity:          {}\n\
             Access key id:     {}\n\
             Secret access key: {}\n\
             Session token:     {}\n\
             Expires:           {}",
            identity_id,
            mask_credential(credentials.access_key_id()),
            mask_credential(credentials.secret_access_key()),
            mask_credential(credentials.session_token()),
            expiration,
        )),
        OutputFormat::Env => Ok(format!(
            "export AWS_ACCESS_KEY_ID={}\n\
             export AWS_SECRET_ACCESS_KEY={}\n\
             export AWS_SESSION_TOKEN={}",
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token(),
        )),
        OutputFormat::CredentialProcess => {
            let output = CredentialProcessOutput {
                version: 1,
                access_key_id: credentials.access_key_id(),
                secret_access_key: credentials.secret_access_key(),
                session_token: credentials.session_token(),
                expiration,
            };
            serde_json::to_string(&output).context("Failed to encode credentials")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn credentials() -> Credentials {
        Credentials::new(
            "ASIAEXAMPLEKEY",
            "wJalrXUtnFEMI/K7MDENG",
            "FwoGZXIvYXdzEBYa",
            Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        )
    }

    #[test]
    fn test_credential_process_shape() {
        let out = render(OutputFormat::CredentialProcess, &credentials(), "id-1").unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["Version"], 1);
        assert_eq!(value["AccessKeyId"], "ASIAEXAMPLEKEY");
        assert_eq!(value["SecretAccessKey"], "wJalrXUtnFEMI/K7MDENG");
        assert_eq!(value["SessionToken"], "FwoGZXIvYXdzEBYa");
        assert_eq!(value["Expiration"], "2030-01-02T03:04:05Z");
    }

    #[test]
    fn test_text_masks_secrets() {
        let out = render(OutputFormat::Text, &credentials(), "id-1").unwrap();

        assert!(out.contains("id-1"));
        assert!(out.contains("AS*****EY"));
        assert!(!out.contains("ASIAEXAMPLEKEY"));
        assert!(out.contains("wJ*****NG"));
        assert!(!out.contains("wJalrXUtnFEMI/K7MDENG"));
        assert!(!out.contains("FwoGZXIvYXdzEBYa"));
    }

    #[test]
    fn test_env_exports() {
        let out = render(OutputFormat::Env, &credentials(), "id-1").unwrap();
        assert!(out.contains("export AWS_SESSION_TOKEN=FwoGZXIvYXdzEBYa"));
    }
}
