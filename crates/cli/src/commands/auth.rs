//! Account commands.

use bakery_core::{Email, Phone};
use bakery_storefront::models::{ChangePasswordRequest, LoginRequest, RegisterRequest, User};
use bakery_storefront::{Result, Storefront};

/// Sign in and print the profile.
///
/// # Errors
///
/// Returns an error for bad credentials or if the tokens cannot be stored.
pub async fn login(storefront: &Storefront, email: Email, password: String) -> Result<()> {
    let user = storefront
        .auth()
        .login(&LoginRequest { email, password })
        .await?;
    print_user(&user);
    Ok(())
}

/// Create an account and print the profile.
///
/// # Errors
///
/// Returns an error if the email is taken or the request is incomplete.
pub async fn register(
    storefront: &Storefront,
    email: Email,
    password: String,
    full_name: String,
    phone: Option<Phone>,
) -> Result<()> {
    let request = RegisterRequest {
        email,
        password,
        full_name,
        phone,
    };
    let user = storefront.auth().register(&request).await?;
    print_user(&user);
    Ok(())
}

/// Print the signed-in customer.
///
/// # Errors
///
/// Returns an error when not signed in.
pub async fn me(storefront: &Storefront) -> Result<()> {
    print_user(&storefront.auth().me().await?);
    Ok(())
}

/// Forget the stored tokens.
///
/// # Errors
///
/// Returns an error if local storage cannot be written.
#[allow(clippy::print_stdout)]
pub fn logout(storefront: &Storefront) -> Result<()> {
    storefront.auth().logout()?;
    println!("Signed out");
    Ok(())
}

/// Change the password of the signed-in customer.
///
/// # Errors
///
/// Returns an error when the current password is wrong.
#[allow(clippy::print_stdout)]
pub async fn change_password(
    storefront: &Storefront,
    current_password: String,
    new_password: String,
) -> Result<()> {
    let request = ChangePasswordRequest {
        current_password,
        new_password,
    };
    println!("{}", storefront.auth().change_password(&request).await?);
    Ok(())
}

/// Request a password reset email.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[allow(clippy::print_stdout)]
pub async fn forgot_password(storefront: &Storefront, email: &Email) -> Result<()> {
    println!("{}", storefront.auth().forgot_password(email).await?);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_user(user: &User) {
    let admin = if user.is_admin { "  [admin]" } else { "" };
    println!("[{}] {} <{}>{admin}", user.id, user.full_name, user.email);
    if let Some(phone) = &user.phone {
        println!("  phone: {phone}");
    }
    let place = [user.address.as_deref(), user.city.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    if !place.is_empty() {
        println!("  address: {}", place.join(", "));
    }
}
