//! Interactive storage configuration wizard.

use std::path::Path;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};

use crate::config::DEFAULT_MAX_FILE_SIZE;

const DEFAULT_DATABASE_URL: &str = "redb://./data";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/auth/google/callback";

/// Provider-specific answers
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSetup {
    Local {
        upload_dir: String,
    },
    AwsS3 {
        region: String,
        bucket: String,
        access_key_id: String,
        secret_access_key: String,
        endpoint: Option<String>,
    },
    GoogleDrive {
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        refresh_token: String,
        folder_id: Option<String>,
    },
    Uploadthing {
        token: String,
    },
}

/// Everything the wizard collects
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSetup {
    pub provider: ProviderSetup,
    pub max_file_size: u64,
    pub database_url: String,
}

/// Render the env file for a finished setup.
pub fn render_env(setup: &StorageSetup) -> String {
    let mut out = String::from("# Storage Configuration\n");
    let mut line = |key: &str, value: &str| {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    };

    match setup.provider {
        ProviderSetup::Local { ref upload_dir } => {
            line("STORAGE_PROVIDER", "LOCAL");
            line("UPLOAD_DIR", upload_dir);
        }
        ProviderSetup::AwsS3 {
            ref region,
            ref bucket,
            ref access_key_id,
            ref secret_access_key,
            ref endpoint,
        } => {
            line("STORAGE_PROVIDER", "AWS_S3");
            line("AWS_REGION", region);
            line("AWS_S3_BUCKET", bucket);
            line("AWS_ACCESS_KEY_ID", access_key_id);
            line("AWS_SECRET_ACCESS_KEY", secret_access_key);
            if let Some(endpoint) = endpoint {
                line("AWS_S3_ENDPOINT", endpoint);
            }
        }
        ProviderSetup::GoogleDrive {
            ref client_id,
            ref client_secret,
            ref redirect_uri,
            ref refresh_token,
            ref folder_id,
        } => {
            line("STORAGE_PROVIDER", "GOOGLE_DRIVE");
            line("GOOGLE_DRIVE_CLIENT_ID", client_id);
            line("GOOGLE_DRIVE_CLIENT_SECRET", client_secret);
            line("GOOGLE_DRIVE_REDIRECT_URI", redirect_uri);
            line("GOOGLE_DRIVE_REFRESH_TOKEN", refresh_token);
            match folder_id {
                Some(folder) => line("GOOGLE_DRIVE_FOLDER_ID", folder),
                None => line("# GOOGLE_DRIVE_FOLDER_ID", "your-folder-id"),
            }
        }
        ProviderSetup::Uploadthing { ref token } => {
            line("STORAGE_PROVIDER", "UPLOADTHING");
            line("UPLOADTHING_TOKEN", token);
        }
    }
    line("MAX_FILE_SIZE", &setup.max_file_size.to_string());

    out.push_str("\n# Database\n");
    out.push_str(&format!("DATABASE_URL={}\n", setup.database_url));
    out
}

/// Prompt for a setup and write it to `output`.
pub fn run(output: &Path) -> anyhow::Result<()> {
    println!("File catalog storage configuration\n");

    if output.exists() {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} already exists. Overwrite it?", output.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            anyhow::bail!("Aborted: existing configuration left untouched");
        }
    }

    let setup = prompt_setup()?;
    std::fs::write(output, render_env(&setup))?;

    println!("\nConfiguration saved to {}", output.display());
    println!("Restart the server with these variables to apply the changes");
    Ok(())
}

fn prompt_setup() -> anyhow::Result<StorageSetup> {
    let theme = ColorfulTheme::default();
    let providers = ["Local", "AWS S3", "Google Drive", "UploadThing"];
    let choice = Select::with_theme(&theme)
        .with_prompt("Choose storage provider")
        .default(0)
        .items(&providers)
        .interact()?;

    let provider = match choice {
        0 => ProviderSetup::Local {
            upload_dir: text(&theme, "Upload directory", Some("uploads"))?,
        },
        1 => ProviderSetup::AwsS3 {
            region: text(&theme, "AWS region", Some("us-east-1"))?,
            bucket: text(&theme, "S3 bucket name", None)?,
            access_key_id: text(&theme, "AWS access key id", None)?,
            secret_access_key: secret(&theme, "AWS secret access key")?,
            endpoint: optional(&theme, "Custom S3 endpoint (optional)")?,
        },
        2 => ProviderSetup::GoogleDrive {
            client_id: text(&theme, "Google Drive client id", None)?,
            client_secret: secret(&theme, "Google Drive client secret")?,
            redirect_uri: text(&theme, "Redirect URI", Some(DEFAULT_REDIRECT_URI))?,
            refresh_token: secret(&theme, "Refresh token")?,
            folder_id: optional(&theme, "Google Drive folder id (optional)")?,
        },
        _ => ProviderSetup::Uploadthing {
            token: secret(&theme, "UploadThing token")?,
        },
    };

    let max_file_size = Input::<u64>::with_theme(&theme)
        .with_prompt("Max file size in bytes")
        .default(DEFAULT_MAX_FILE_SIZE)
        .validate_with(|size: &u64| {
            if *size == 0 {
                Err("size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let database_url = text(&theme, "Database URL", Some(DEFAULT_DATABASE_URL))?;

    Ok(StorageSetup {
        provider,
        max_file_size,
        database_url,
    })
}

fn text(theme: &ColorfulTheme, prompt: &str, default: Option<&str>) -> anyhow::Result<String> {
    let mut input = Input::<String>::with_theme(theme).with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    Ok(input.interact_text()?.trim().to_string())
}

fn optional(theme: &ColorfulTheme, prompt: &str) -> anyhow::Result<Option<String>> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn secret(theme: &ColorfulTheme, prompt: &str) -> anyhow::Result<String> {
    Ok(Password::with_theme(theme).with_prompt(prompt).interact()?)
}
