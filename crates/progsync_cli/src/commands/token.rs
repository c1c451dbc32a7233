//! Token command implementation.

use anyhow::bail;
use clap::Args;
use progsync_model::OwnerId;
use progsync_server::{AuthConfig, TokenValidator};
use std::time::Duration;

/// Arguments of `progsync token`.
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// Owner the token is issued to
    #[arg(long)]
    pub owner: String,

    /// Secret the server signs tokens with
    #[arg(long, env = "PROGSYNC_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: String,

    /// Token lifetime in hours
    #[arg(long, default_value = "24", env = "PROGSYNC_TOKEN_EXPIRY_HOURS")]
    pub token_expiry_hours: u64,
}

/// Issues a token for the given owner.
pub fn issue(args: &TokenArgs) -> anyhow::Result<String> {
    if args.owner.is_empty() {
        bail!("owner must not be empty");
    }
    if args.auth_secret.is_empty() {
        bail!("auth secret must not be empty");
    }

    let validator = TokenValidator::new(
        AuthConfig::new(args.auth_secret.as_bytes().to_vec())
            .with_expiry(Duration::from_secs(args.token_expiry_hours * 3600)),
    );
    Ok(validator.create_token(&OwnerId::new(args.owner.as_str()))?)
}

/// Prints a token for the given owner.
pub fn run(args: &TokenArgs) -> anyhow::Result<()> {
    println!("{}", issue(args)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(owner: &str, secret: &str) -> TokenArgs {
        TokenArgs {
            owner: owner.into(),
            auth_secret: secret.into(),
            token_expiry_hours: 1,
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let token = issue(&args("alice", "cli-secret")).unwrap();
        assert!(token.starts_with("alice."));

        let validator = TokenValidator::new(AuthConfig::new(b"cli-secret".to_vec()));
        assert_eq!(validator.validate_token(&token).unwrap().as_str(), "alice");

        let other = TokenValidator::new(AuthConfig::new(b"other-secret".to_vec()));
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(issue(&args("", "cli-secret")).is_err());
        assert!(issue(&args("alice", "")).is_err());
    }
}
