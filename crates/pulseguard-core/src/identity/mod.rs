//! Identity provider contract.
//!
//! The provider itself is remote and opaque. This module defines what the
//! dashboards consume from it, the role model used for routing, and how
//! raw provider failures are presented to users.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity errors, grouped by what the user can do about them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Network connection failed. Please check your internet connection.")]
    Network,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please verify your email before signing in")]
    EmailNotConfirmed,

    #[error("System Email Error: Unable to send confirmation email. Please contact support.")]
    EmailDelivery,

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("Profile not found. Please contact support.")]
    ProfileMissing(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("{0}")]
    Provider(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

impl IdentityError {
    /// Classify a raw provider message.
    pub fn from_provider_message(message: &str) -> Self {
        const NETWORK: [&str; 3] = [
            "fetch failed",
            "Network request failed",
            "AuthRetryableFetchError",
        ];

        if NETWORK.iter().any(|m| message.contains(m)) {
            IdentityError::Network
        } else if message.contains("Invalid login credentials") || message.contains("Invalid Grant") {
            IdentityError::InvalidCredentials
        } else if message.contains("Email not confirmed") {
            IdentityError::EmailNotConfirmed
        } else if message.contains("Error sending confirmation email") {
            IdentityError::EmailDelivery
        } else if message.contains("Rate limit") || message.contains("429") {
            IdentityError::RateLimited
        } else if message.trim().is_empty() || message.trim() == "{}" {
            IdentityError::Provider("Authentication failed. Please try again.".into())
        } else {
            IdentityError::Provider(message.to_string())
        }
    }
}

/// Dashboard role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Doctor,
    Nurse,
    Patient,
}

impl UserRole {
    /// Landing page for the role.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            UserRole::Doctor => "/doctor/dashboard",
            UserRole::Nurse => "/nurse/dashboard",
            UserRole::Patient => "/patient/dashboard",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Doctor => "doctor",
            UserRole::Nurse => "nurse",
            UserRole::Patient => "patient",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doctor" => Ok(UserRole::Doctor),
            "nurse" => Ok(UserRole::Nurse),
            "patient" => Ok(UserRole::Patient),
            other => Err(IdentityError::Provider(format!("Unknown role: {}", other))),
        }
    }
}

/// Profile row kept by the provider alongside the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub user_id: String,
    /// RFC 3339
    pub expires_at: Option<String>,
}

/// User and session returned by sign-up and sign-in. Sign-up leaves the
/// session empty until the email is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthOutcome {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: UserRole,
}

/// Remote identity service.
pub trait IdentityProvider {
    fn sign_up(&mut self, request: &SignUpRequest) -> IdentityResult<AuthOutcome>;
    fn sign_in(&mut self, email: &str, password: &str) -> IdentityResult<AuthOutcome>;
    fn sign_out(&mut self) -> IdentityResult<()>;
    fn current_user(&self) -> IdentityResult<Option<AuthUser>>;
    fn current_session(&self) -> IdentityResult<Option<AuthSession>>;
    fn profile(&self, user_id: &str) -> IdentityResult<Option<UserProfile>>;
    /// Confirm an email address with a one-time code.
    fn verify_otp(&mut self, email: &str, code: &str) -> IdentityResult<()>;
}

/// A signed-in user together with their profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
    pub profile: UserProfile,
}

/// Sign in and require that a profile exists for the account.
pub fn sign_in_with_profile<P: IdentityProvider + ?Sized>(
    provider: &mut P,
    email: &str,
    password: &str,
) -> IdentityResult<SignedIn> {
    let outcome = provider.sign_in(email, password)?;
    let user = outcome
        .user
        .ok_or_else(|| IdentityError::Provider("Authentication failed".into()))?;

    match provider.profile(&user.id)? {
        Some(profile) => Ok(SignedIn {
            user,
            session: outcome.session,
            profile,
        }),
        None => {
            warn!("Signed in user {} has no profile", user.id);
            Err(IdentityError::ProfileMissing(user.id))
        }
    }
}

/// Role of the signed-in user, if any.
pub fn current_role<P: IdentityProvider + ?Sized>(provider: &P) -> IdentityResult<Option<UserRole>> {
    let Some(user) = provider.current_user()? else {
        return Ok(None);
    };
    Ok(provider.profile(&user.id)?.map(|p| p.role))
}

/// Whether the signed-in user has `expected`. Any failure counts as no.
pub fn verify_role<P: IdentityProvider + ?Sized>(provider: &P, expected: UserRole) -> bool {
    matches!(current_role(provider), Ok(Some(role)) if role == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeProvider {
        accounts: HashMap<String, (String, AuthUser, bool)>,
        profiles: HashMap<String, UserProfile>,
        signed_in: Option<AuthUser>,
    }

    impl FakeProvider {
        fn with_account(email: &str, password: &str, role: Option<UserRole>) -> Self {
            let mut fake = Self::default();
            let user = AuthUser {
                id: format!("user-{}", email),
                email: email.into(),
            };
            if let Some(role) = role {
                fake.profiles.insert(
                    user.id.clone(),
                    UserProfile {
                        id: user.id.clone(),
                        email: email.into(),
                        full_name: Some("Sarah Chen".into()),
                        role,
                        created_at: "2024-01-15T10:00:00Z".into(),
                        updated_at: "2024-01-15T10:00:00Z".into(),
                    },
                );
            }
            fake.accounts
                .insert(email.into(), (password.into(), user, true));
            fake
        }
    }

    impl IdentityProvider for FakeProvider {
        fn sign_up(&mut self, request: &SignUpRequest) -> IdentityResult<AuthOutcome> {
            let user = AuthUser {
                id: format!("user-{}", request.email),
                email: request.email.clone(),
            };
            self.accounts.insert(
                request.email.clone(),
                (request.password.clone(), user.clone(), false),
            );
            Ok(AuthOutcome {
                user: Some(user),
                session: None,
            })
        }

        fn sign_in(&mut self, email: &str, password: &str) -> IdentityResult<AuthOutcome> {
            let (stored, user, confirmed) = self
                .accounts
                .get(email)
                .ok_or_else(|| IdentityError::from_provider_message("Invalid login credentials"))?;
            if stored != password {
                return Err(IdentityError::from_provider_message("Invalid login credentials"));
            }
            if !confirmed {
                return Err(IdentityError::from_provider_message("Email not confirmed"));
            }
            self.signed_in = Some(user.clone());
            Ok(AuthOutcome {
                user: Some(user.clone()),
                session: Some(AuthSession {
                    access_token: "token".into(),
                    user_id: user.id.clone(),
                    expires_at: None,
                }),
            })
        }

        fn sign_out(&mut self) -> IdentityResult<()> {
            self.signed_in = None;
            Ok(())
        }

        fn current_user(&self) -> IdentityResult<Option<AuthUser>> {
            Ok(self.signed_in.clone())
        }

        fn current_session(&self) -> IdentityResult<Option<AuthSession>> {
            Ok(self.signed_in.as_ref().map(|u| AuthSession {
                access_token: "token".into(),
                user_id: u.id.clone(),
                expires_at: None,
            }))
        }

        fn profile(&self, user_id: &str) -> IdentityResult<Option<UserProfile>> {
            Ok(self.profiles.get(user_id).cloned())
        }

        fn verify_otp(&mut self, email: &str, code: &str) -> IdentityResult<()> {
            if code != "123456" {
                return Err(IdentityError::Provider("Token has expired or is invalid".into()));
            }
            match self.accounts.get_mut(email) {
                Some(account) => {
                    account.2 = true;
                    Ok(())
                }
                None => Err(IdentityError::Provider("User not found".into())),
            }
        }
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            IdentityError::from_provider_message("TypeError: fetch failed"),
            IdentityError::Network
        );
        assert_eq!(
            IdentityError::from_provider_message("Invalid login credentials"),
            IdentityError::InvalidCredentials
        );
        assert_eq!(
            IdentityError::from_provider_message("Email not confirmed"),
            IdentityError::EmailNotConfirmed
        );
        assert_eq!(
            IdentityError::from_provider_message("Error sending confirmation email"),
            IdentityError::EmailDelivery
        );
        assert_eq!(
            IdentityError::from_provider_message("Request failed with status 429"),
            IdentityError::RateLimited
        );
        assert_eq!(
            IdentityError::from_provider_message("{}").to_string(),
            "Authentication failed. Please try again."
        );
        assert_eq!(
            IdentityError::from_provider_message("Password too short").to_string(),
            "Password too short"
        );
    }

    #[test]
    fn test_role_paths() {
        assert_eq!(UserRole::Nurse.dashboard_path(), "/nurse/dashboard");
        assert_eq!("Doctor".parse::<UserRole>(), Ok(UserRole::Doctor));
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_sign_in_with_profile() {
        let mut provider = FakeProvider::with_account("chen@ward.test", "pw", Some(UserRole::Doctor));

        let signed_in = sign_in_with_profile(&mut provider, "chen@ward.test", "pw").unwrap();
        assert_eq!(signed_in.profile.role, UserRole::Doctor);
        assert!(signed_in.session.is_some());

        assert_eq!(current_role(&provider), Ok(Some(UserRole::Doctor)));
        assert!(verify_role(&provider, UserRole::Doctor));
        assert!(!verify_role(&provider, UserRole::Nurse));

        provider.sign_out().unwrap();
        assert_eq!(current_role(&provider), Ok(None));
        assert!(!verify_role(&provider, UserRole::Doctor));
    }

    #[test]
    fn test_missing_profile() {
        let mut provider = FakeProvider::with_account("nurse@ward.test", "pw", None);
        assert!(matches!(
            sign_in_with_profile(&mut provider, "nurse@ward.test", "pw"),
            Err(IdentityError::ProfileMissing(_))
        ));
    }

    #[test]
    fn test_sign_up_requires_confirmation() {
        let mut provider = FakeProvider::default();
        let outcome = provider
            .sign_up(&SignUpRequest {
                email: "new@ward.test".into(),
                password: "pw".into(),
                full_name: "New Nurse".into(),
                role: UserRole::Nurse,
            })
            .unwrap();
        assert!(outcome.session.is_none());

        assert_eq!(
            provider.sign_in("new@ward.test", "pw"),
            Err(IdentityError::EmailNotConfirmed)
        );
        provider.verify_otp("new@ward.test", "123456").unwrap();
        assert!(provider.sign_in("new@ward.test", "pw").is_ok());
    }
}
