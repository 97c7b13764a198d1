//! Student and administrator sign-in.
//!
//! Students sign in with their university e-mail and their student id as the
//! password. Administrators receive a one-time code by e-mail. Backend
//! rejections surface as a single generic error so the portal never reveals
//! which half of a credential pair was wrong.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::api::{
    AcceptTerms, AdminLogin, AdminRequestOtp, ApiError, GetTerms, Login, PortalClient,
    SessionCheck, VerifySession,
};
use crate::config::AuthConfig;
use crate::domain::{AdminProfile, StudentProfile};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,6}$").expect("Invalid email regex")
});

/// Minimum wait between two one-time code requests.
pub const OTP_RESEND_COOLDOWN: Duration = Duration::from_secs(30);
pub const OTP_LENGTH: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("an e-mail address is required")]
    MissingEmail,
    #[error("the e-mail address is not valid")]
    InvalidEmail,
    #[error("use your @{domain} university e-mail")]
    WrongDomain { domain: String },
    #[error("a password is required")]
    MissingPassword,
    #[error("the password must contain digits only")]
    NonNumericPassword,
    #[error("invalid e-mail or password")]
    InvalidCredentials,
    #[error("the verification code must be 6 digits")]
    MalformedOtp,
    #[error("the verification code is invalid or has expired")]
    InvalidOtp,
    #[error("wait {remaining_secs}s before requesting another code")]
    OtpCooldown { remaining_secs: u64 },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Local checks run before a student login is sent.
pub fn validate_student_credentials(
    email: &str,
    password: &str,
    domain: &str,
) -> Result<(), AuthError> {
    let email = validate_email(email)?;
    if !domain.is_empty() && !email.to_ascii_lowercase().contains(domain) {
        return Err(AuthError::WrongDomain {
            domain: domain.to_string(),
        });
    }

    let password = password.trim();
    if password.is_empty() {
        return Err(AuthError::MissingPassword);
    }
    if !password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::NonNumericPassword);
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<&str, AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::MissingEmail);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(AuthError::InvalidEmail);
    }
    Ok(email)
}

/// Result of re-checking a cached student session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The backend confirmed the session and returned a fresh profile.
    Active(StudentProfile),
    /// The backend no longer recognizes the student.
    Expired { reason: Option<String> },
    /// The backend was unreachable; the cached profile stays in use.
    Unverified(StudentProfile),
}

impl SessionStatus {
    pub fn profile(&self) -> Option<&StudentProfile> {
        match self {
            SessionStatus::Active(profile) | SessionStatus::Unverified(profile) => Some(profile),
            SessionStatus::Expired { .. } => None,
        }
    }
}

/// An outstanding administrator one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    email: String,
    issued_at: Instant,
}

impl OtpChallenge {
    pub fn new(email: impl Into<String>, issued_at: Instant) -> Self {
        Self {
            email: email.into(),
            issued_at,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Time left before another code may be requested.
    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        OTP_RESEND_COOLDOWN.saturating_sub(now.saturating_duration_since(self.issued_at))
    }

    pub fn can_resend(&self, now: Instant) -> bool {
        self.cooldown_remaining(now).is_zero()
    }
}

pub struct AuthService {
    client: PortalClient,
    email_domain: String,
}

impl AuthService {
    pub fn new(client: PortalClient, config: &AuthConfig) -> Self {
        Self {
            client,
            email_domain: config.email_domain.to_ascii_lowercase(),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<StudentProfile, AuthError> {
        validate_student_credentials(email, password, &self.email_domain)?;

        let reply = self
            .client
            .send(Login {
                email: email.trim().to_string(),
                password: password.trim().to_string(),
            })
            .await
            .map_err(rejection_as(AuthError::InvalidCredentials))?;

        tracing::info!(student_id = %reply.student.id, "student signed in");
        Ok(reply.student)
    }

    /// Re-check a stored session. Connectivity problems keep the session.
    pub async fn verify_session(&self, cached: &StudentProfile) -> Result<SessionStatus, AuthError> {
        let check = self
            .client
            .send(VerifySession {
                student_id: cached.id.clone(),
            })
            .await;

        match check {
            Ok(SessionCheck::Valid(profile)) => Ok(SessionStatus::Active(profile)),
            Ok(SessionCheck::Invalid { reason }) => {
                tracing::info!(student_id = %cached.id, "student session expired");
                Ok(SessionStatus::Expired { reason })
            }
            Err(err) if err.is_transport() => {
                tracing::warn!(student_id = %cached.id, error = %err, "session check skipped");
                Ok(SessionStatus::Unverified(cached.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn request_otp(&self, email: &str) -> Result<OtpChallenge, AuthError> {
        self.request_otp_at(email, Instant::now()).await
    }

    async fn request_otp_at(&self, email: &str, now: Instant) -> Result<OtpChallenge, AuthError> {
        let email = validate_email(email)?;
        self.client
            .send(AdminRequestOtp {
                email: email.to_string(),
            })
            .await?;
        tracing::info!("admin verification code requested");
        Ok(OtpChallenge::new(email, now))
    }

    /// Request a fresh code for an existing challenge once the cooldown ran out.
    pub async fn resend_otp(&self, challenge: &mut OtpChallenge) -> Result<(), AuthError> {
        let now = Instant::now();
        let remaining = challenge.cooldown_remaining(now);
        if !remaining.is_zero() {
            return Err(AuthError::OtpCooldown {
                remaining_secs: remaining.as_secs().max(1),
            });
        }
        *challenge = self.request_otp_at(&challenge.email, now).await?;
        Ok(())
    }

    pub async fn admin_login(
        &self,
        challenge: &OtpChallenge,
        code: &str,
    ) -> Result<AdminProfile, AuthError> {
        let code = code.trim();
        if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::MalformedOtp);
        }

        let reply = self
            .client
            .send(AdminLogin {
                email: challenge.email.clone(),
                otp: code.to_string(),
            })
            .await
            .map_err(rejection_as(AuthError::InvalidOtp))?;

        tracing::info!(admin_id = %reply.admin.id, "administrator signed in");
        Ok(reply.admin)
    }

    pub async fn terms(&self) -> Result<String, AuthError> {
        Ok(self.client.send(GetTerms {}).await?.terms)
    }

    /// Record acceptance and mark the local profile accordingly.
    pub async fn accept_terms(&self, profile: &mut StudentProfile) -> Result<(), AuthError> {
        self.client
            .send(AcceptTerms {
                student_id: profile.id.clone(),
            })
            .await?;
        profile.terms_agreed = true;
        Ok(())
    }
}

/// Collapse backend rejections into `generic`; keep other failures as-is.
fn rejection_as(generic: AuthError) -> impl FnOnce(ApiError) -> AuthError {
    move |err| match err {
        ApiError::Application { .. } => generic,
        other => AuthError::Api(other),
    }
}
