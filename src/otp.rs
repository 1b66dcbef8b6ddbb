//! One-time password lifecycle.
//!
//! Codes are issued at signup, mailed to the user and consumed by a single
//! successful verification. Failed attempts leave the code untouched until it
//! expires; there is no attempt counter.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::OsRng;

use crate::config::Otp as OtpConfig;
use crate::user::User;

/// Number of digits of a code.
pub const DIGITS: usize = 6;
const UPPER_BOUND: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("User not found.")]
    NotFound,
    #[error("User is already verified.")]
    AlreadyVerified,
    #[error("Invalid OTP.")]
    Mismatch,
    #[error("OTP has expired.")]
    Expired,
}

/// Issues and checks one-time codes.
#[derive(Debug, Clone)]
pub struct OtpManager {
    validity: Duration,
}

impl Default for OtpManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl OtpManager {
    /// Create a new [`OtpManager`].
    pub fn new(config: Option<OtpConfig>) -> Self {
        let config = config.unwrap_or_default();
        let seconds = i64::try_from(config.validity).unwrap_or(i64::MAX);

        Self {
            validity: Duration::seconds(seconds),
        }
    }

    /// How long an issued code stays valid.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Generate a code, uniformly distributed over `000000..=999999`.
    pub fn generate() -> String {
        let value = OsRng.gen_range(0..UPPER_BOUND);
        format!("{value:0width$}", width = DIGITS)
    }

    /// Attach a fresh code to `user`, valid from `now`.
    ///
    /// Verification state is left untouched.
    pub fn issue(&self, user: &mut User, now: DateTime<Utc>) -> String {
        let code = Self::generate();
        user.otp = Some(code.clone());
        user.otp_expires = Some(now + self.validity);
        code
    }

    /// Check `supplied` against the code stored on `user`.
    ///
    /// On success the user is returned verified with its code cleared; the
    /// caller persists it.
    pub fn validate(
        &self,
        user: Option<User>,
        supplied: &str,
        now: DateTime<Utc>,
    ) -> Result<User, OtpError> {
        let mut user = user.ok_or(OtpError::NotFound)?;

        if user.is_verified {
            return Err(OtpError::AlreadyVerified);
        }

        if user.otp.as_deref() != Some(supplied) {
            return Err(OtpError::Mismatch);
        }

        match user.otp_expires {
            Some(expires) if now <= expires => (),
            _ => return Err(OtpError::Expired),
        }

        user.is_verified = true;
        user.otp = None;
        user.otp_expires = None;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued(now: DateTime<Utc>) -> (OtpManager, User, String) {
        let otp = OtpManager::default();
        let mut user = User::default();
        let code = otp.issue(&mut user, now);
        (otp, user, code)
    }

    #[test]
    fn test_generate_format() {
        for _ in 0..1_000 {
            let code = OtpManager::generate();
            assert_eq!(code.len(), DIGITS);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_keeps_leading_zeros() {
        // About 10% of codes start with a zero.
        let found = (0..10_000)
            .map(|_| OtpManager::generate())
            .any(|code| code.starts_with('0'));
        assert!(found);
    }

    #[test]
    fn test_issue_sets_expiry() {
        let now = Utc::now();
        let (_, user, code) = issued(now);

        assert_eq!(user.otp.as_deref(), Some(code.as_str()));
        assert_eq!(user.otp_expires, Some(now + Duration::minutes(10)));
        assert!(!user.is_verified);
    }

    #[test]
    fn test_validate_exactly_at_expiry() {
        let now = Utc::now();
        let (otp, user, code) = issued(now);

        let user = otp
            .validate(Some(user), &code, now + Duration::minutes(10))
            .unwrap();
        assert!(user.is_verified);
        assert_eq!(user.otp, None);
        assert_eq!(user.otp_expires, None);
    }

    #[test]
    fn test_validate_one_second_late() {
        let now = Utc::now();
        let (otp, user, code) = issued(now);

        let late = now + Duration::minutes(10) + Duration::seconds(1);
        assert_eq!(
            otp.validate(Some(user), &code, late),
            Err(OtpError::Expired)
        );
    }

    #[test]
    fn test_validate_twice() {
        let now = Utc::now();
        let (otp, user, code) = issued(now);

        let user = otp.validate(Some(user), &code, now).unwrap();
        assert_eq!(
            otp.validate(Some(user), &code, now),
            Err(OtpError::AlreadyVerified)
        );
    }

    #[test]
    fn test_validate_mismatch_keeps_code() {
        let now = Utc::now();
        let (otp, user, code) = issued(now);
        let wrong = if code == "000000" { "000001" } else { "000000" };

        assert_eq!(
            otp.validate(Some(user.clone()), wrong, now),
            Err(OtpError::Mismatch)
        );
        // Comparison is on strings, not numbers.
        let padded = format!("0{code}");
        assert_eq!(
            otp.validate(Some(user.clone()), &padded, now),
            Err(OtpError::Mismatch)
        );
        assert!(otp.validate(Some(user), &code, now).is_ok());
    }

    #[test]
    fn test_validate_unknown_user() {
        assert_eq!(
            OtpManager::default().validate(None, "123456", Utc::now()),
            Err(OtpError::NotFound)
        );
    }

    #[test]
    fn test_mismatch_checked_before_expiry() {
        let now = Utc::now();
        let (otp, user, _) = issued(now);

        let late = now + Duration::hours(1);
        assert_eq!(
            otp.validate(Some(user), "abcdef", late),
            Err(OtpError::Mismatch)
        );
    }

    #[test]
    fn test_custom_validity() {
        let otp = OtpManager::new(Some(OtpConfig { validity: 60 }));
        let now = Utc::now();
        let mut user = User::default();
        let code = otp.issue(&mut user, now);

        assert_eq!(
            otp.validate(Some(user), &code, now + Duration::seconds(61)),
            Err(OtpError::Expired)
        );
    }
}
