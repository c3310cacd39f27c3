//! Matrix login, session restore and encryption setup.
//!
//! A first start logs the bot in with its password, bootstraps cross-signing,
//! enables recovery and stores the session. Later starts restore the stored
//! session and import the secrets with the recovery passphrase. Both paths
//! end with a check that the device is verified, so the bot can read and
//! write encrypted rooms.

use anyhow::{anyhow, bail};
use log::{debug, error, info};
use matrix_sdk::{
    Client,
    authentication::matrix::MatrixSession,
    encryption::{
        BackupDownloadStrategy, EncryptionSettings,
        recovery::{RecoveryError, RecoveryState},
    },
    ruma::{OwnedUserId, api::client::uiaa},
};

use crate::matrix::{UserCredentials, session::SessionStore};

/// Builds a logged in client, restoring the stored session when there is one.
pub async fn connect(
    credentials: &UserCredentials,
    session_store: &SessionStore,
) -> anyhow::Result<Client> {
    info!("setting up matrix client for user {}", credentials.user_id);

    match session_store.user_session() {
        Some(user_session) => restore(credentials, session_store, user_session.clone()).await,
        None => login(credentials, session_store).await,
    }
}

async fn login(credentials: &UserCredentials, session_store: &SessionStore) -> anyhow::Result<Client> {
    let encryption_settings = EncryptionSettings {
        auto_enable_cross_signing: true,
        backup_download_strategy: BackupDownloadStrategy::default(),
        auto_enable_backups: true,
    };

    let user_id: OwnedUserId = credentials.user_id.clone().try_into()?;
    let client = Client::builder()
        .sqlite_store(session_store.sqlite_path(), Some(&credentials.passphrase))
        .with_encryption_settings(encryption_settings)
        .server_name(user_id.server_name())
        .build()
        .await?;

    client
        .matrix_auth()
        .login_username(user_id, &credentials.password)
        .initial_device_display_name("rollcall bot")
        .send()
        .await?;
    debug!("logged in");

    bootstrap_cross_signing(&client, credentials).await?;
    enable_recovery(&client, credentials).await?;

    debug!("trying to recover secrets");
    client
        .encryption()
        .recovery()
        .recover(&credentials.passphrase)
        .await?;

    check_encryption(&client).await?;

    let user_session = client
        .matrix_auth()
        .session()
        .ok_or_else(|| anyhow!("no session after login"))?;
    session_store.save_user_session(&user_session).await?;

    info!("matrix client setup complete");
    Ok(client)
}

async fn restore(
    credentials: &UserCredentials,
    session_store: &SessionStore,
    user_session: MatrixSession,
) -> anyhow::Result<Client> {
    info!("restoring matrix session from disk");

    let user_id: OwnedUserId = credentials.user_id.clone().try_into()?;
    let client = Client::builder()
        .server_name(user_id.server_name())
        .sqlite_store(session_store.sqlite_path(), Some(&credentials.passphrase))
        .build()
        .await?;

    client.restore_session(user_session).await?;

    let secret_store = client
        .encryption()
        .secret_storage()
        .open_secret_store(&credentials.passphrase)
        .await?;
    secret_store.import_secrets().await?;

    check_encryption(&client).await?;

    info!("matrix session restored");
    Ok(client)
}

async fn bootstrap_cross_signing(
    client: &Client,
    credentials: &UserCredentials,
) -> anyhow::Result<()> {
    debug!("setting up cross signing");

    let Err(e) = client
        .encryption()
        .bootstrap_cross_signing_if_needed(None)
        .await
    else {
        debug!("cross signing already set up");
        return Ok(());
    };

    // The server asks for the password before uploading the keys
    let Some(response) = e.as_uiaa_response() else {
        return Err(e.into());
    };
    let mut password = uiaa::Password::new(
        uiaa::UserIdentifier::UserIdOrLocalpart(credentials.user_id.clone()),
        credentials.password.clone(),
    );
    password.session = response.session.clone();

    client
        .encryption()
        .bootstrap_cross_signing(Some(uiaa::AuthData::Password(password)))
        .await?;

    debug!("cross signing set up");
    Ok(())
}

async fn enable_recovery(client: &Client, credentials: &UserCredentials) -> anyhow::Result<()> {
    debug!("enabling recovery");

    match client
        .encryption()
        .recovery()
        .enable()
        .with_passphrase(&credentials.passphrase)
        .await
    {
        Ok(_) => debug!("recovery enabled"),
        Err(RecoveryError::BackupExistsOnServer) => debug!("recovery already enabled"),
        Err(e) => bail!("error enabling recovery: {:?}", e),
    }

    Ok(())
}

async fn check_encryption(client: &Client) -> anyhow::Result<()> {
    if client.encryption().recovery().state() != RecoveryState::Enabled {
        error!("recovery is not enabled");
        bail!("recovery is not enabled");
    }

    let verified = client
        .encryption()
        .get_own_device()
        .await?
        .is_some_and(|device| device.is_verified());
    if !verified {
        error!("device is not verified after setting up encryption");
        bail!("device is not verified after setting up encryption");
    }

    Ok(())
}
