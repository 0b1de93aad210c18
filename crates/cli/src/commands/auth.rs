//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! loom auth login -u millco -p secret
//! loom auth register -u millco -e sales@millco.example -p secret -t seller
//! loom auth whoami
//! loom auth logout
//! ```

use loomline_core::{RegisterRequest, UserType};
use loomline_client::ValidationErrors;

use super::CliError;

/// Log in and persist the session.
pub async fn login(username: &str, password: &str) -> Result<(), CliError> {
    let ctx = super::context().await?;
    let user = ctx.session.login(username, password).await?;
    tracing::info!("Logged in as {} ({})", user.username, user.user_type);
    Ok(())
}

/// Register a new account and start its session.
pub async fn register(
    username: &str,
    email: &str,
    password: &str,
    user_type: &str,
    company: Option<String>,
) -> Result<(), CliError> {
    let user_type: UserType = user_type
        .parse()
        .map_err(CliError::InvalidArgument)?;

    let ctx = super::context().await?;
    let request = RegisterRequest {
        username: username.to_owned(),
        email: email.to_owned(),
        password: password.to_owned(),
        password2: password.to_owned(),
        user_type,
        first_name: None,
        last_name: None,
        company_name: company,
    };

    match ctx.session.register(&request).await {
        Ok(user) => {
            tracing::info!("Account created: {} ({})", user.username, user.user_type);
            Ok(())
        }
        Err(loomline_client::SessionError::Api(loomline_client::ApiError::Validation(
            errors,
        ))) => {
            report_validation(&errors);
            Err(loomline_client::ApiError::Validation(errors).into())
        }
        Err(error) => Err(error.into()),
    }
}

/// End the session; local state clears even if the server is unreachable.
pub async fn logout() -> Result<(), CliError> {
    let ctx = super::context().await?;
    ctx.session.logout().await;
    tracing::info!("Logged out");
    Ok(())
}

/// Show the account behind the persisted session.
pub async fn whoami() -> Result<(), CliError> {
    let ctx = super::context().await?;
    match ctx.session.current_user() {
        Some(user) => {
            tracing::info!("{} <{}> ({})", user.username, user.email, user.user_type);
            if let Some(company) = &user.profile.company_name {
                tracing::info!("Company: {company}");
            }
        }
        None => tracing::info!("Not logged in"),
    }
    Ok(())
}

fn report_validation(errors: &ValidationErrors) {
    for (field, messages) in errors.iter() {
        for message in messages {
            tracing::warn!("{field}: {message}");
        }
    }
}
