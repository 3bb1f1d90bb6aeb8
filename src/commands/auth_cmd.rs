//! Login and registration commands.

use clap::Args;
use std::path::PathBuf;

use super::CommandError;
use crate::client::ApiClient;
use crate::config::Config;

/// Request a login code for a registered phone number
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Phone number in E.164 format
    phone: String,
}

impl LoginCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let client = ApiClient::from_config(config);
        let response = client.request_login_otp(&self.phone).await?;

        println!("{}", response.message);
        if let Some(otp) = response.otp {
            println!("Dev-mode code: {}", otp);
        }
        println!();
        println!("Complete login with:");
        println!("  fintrack verify {} <code>", self.phone);

        Ok(())
    }
}

/// Request a registration code for a new phone number
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Phone number in E.164 format
    phone: String,
    /// Display name for the new account
    name: String,
}

impl RegisterCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let client = ApiClient::from_config(config);
        let response = client.request_registration_otp(&self.phone).await?;

        println!("{}", response.message);
        if let Some(otp) = response.otp {
            println!("Dev-mode code: {}", otp);
        }
        println!();
        println!("Complete registration with:");
        println!(
            "  fintrack verify {} <code> --register --name \"{}\"",
            self.phone, self.name
        );

        Ok(())
    }
}

/// Submit a verification code and store the access token
#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Phone number the code was sent to
    phone: String,
    /// The 6-digit verification code
    otp: String,
    /// Complete a registration instead of a login
    #[arg(long)]
    register: bool,
    /// Display name, required with --register
    #[arg(long)]
    name: Option<String>,
}

impl VerifyCommand {
    pub async fn run(
        &self,
        config: &mut Config,
        config_path: Option<PathBuf>,
    ) -> Result<(), CommandError> {
        let client = ApiClient::from_config(config);

        let auth = if self.register {
            let name = self.name.as_deref().ok_or_else(|| {
                CommandError::Usage("--name is required with --register".to_string())
            })?;
            client.register(&self.phone, name, &self.otp).await?
        } else {
            client.verify_login(&self.phone, &self.otp).await?
        };

        config.access_token = Some(auth.access_token);
        config.save(config_path)?;

        println!("Logged in as {} ({})", auth.user.name, auth.user.phone_number);
        Ok(())
    }
}
