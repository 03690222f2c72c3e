//! `mlstudio login` / `logout` / `register` / `whoami` — Session management.

use dialoguer::{Input, Password};
use mlstudio_client::LoginOutcome;
use mlstudio_core::resource::NewUser;

use super::{CmdResult, fail, open};

pub async fn login(api_url: Option<String>, username: Option<String>, password: Option<String>) -> CmdResult {
    let workbench = open(api_url).await?;

    let username = match username {
        Some(name) => name,
        None => Input::<String>::new().with_prompt("Username").interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };
    if username.is_empty() || password.is_empty() {
        return Err("Username and password are required".into());
    }

    match workbench.login(&username, &password).await.map_err(fail)? {
        LoginOutcome::Authenticated(user) => {
            println!("✅ Signed in as {} <{}>", user.display_name(), user.email);
        }
        LoginOutcome::AlreadyInProgress => {
            println!("⏳ A sign-in is already in progress");
        }
    }
    Ok(())
}

pub async fn logout(api_url: Option<String>) -> CmdResult {
    let workbench = open(api_url).await?;
    workbench.logout();
    println!("👋 Signed out");
    Ok(())
}

pub async fn register(
    api_url: Option<String>,
    username: String,
    email: String,
    full_name: Option<String>,
    password: Option<String>,
) -> CmdResult {
    let workbench = open(api_url).await?;

    let password = match password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };
    if password.is_empty() {
        return Err("A password is required".into());
    }

    let user = workbench
        .register(&NewUser {
            username,
            email,
            password,
            full_name,
        })
        .await
        .map_err(fail)?;

    println!("✅ Created account '{}' (id {})", user.username, user.id);
    println!("   Run `mlstudio login` to sign in.");
    Ok(())
}

pub async fn whoami(api_url: Option<String>) -> CmdResult {
    let workbench = open(api_url).await?;
    let session = workbench.session();

    match session.user {
        Some(user) if session.is_authenticated() => {
            println!("  User:      {}", user.username);
            println!("  Name:      {}", user.display_name());
            println!("  Email:     {}", user.email);
            println!("  Server:    {}", workbench.config().base_url());
        }
        _ => println!("  Not signed in"),
    }
    Ok(())
}
