use std::time::Duration;

use aliri_clock::Clock;
use regex::Regex;

use super::{Audience, Claims, Header, Issuer, Subject};
use crate::{
    error::{ClaimViolation, SubjectError},
    jwa::Algorithm,
};

/// A check applied after the [`CoreValidator`] has passed
pub trait ClaimsValidator {
    /// Accepts or rejects a token's header and claims
    ///
    /// # Errors
    ///
    /// The reason the token is rejected, usually
    /// [`ClaimViolation::Custom`].
    fn validate(&self, header: &Header, claims: &Claims) -> Result<(), ClaimViolation>;
}

impl<T: ClaimsValidator + ?Sized> ClaimsValidator for &'_ T {
    #[inline]
    fn validate(&self, header: &Header, claims: &Claims) -> Result<(), ClaimViolation> {
        T::validate(self, header, claims)
    }
}

impl<T: ClaimsValidator + ?Sized> ClaimsValidator for Box<T> {
    #[inline]
    fn validate(&self, header: &Header, claims: &Claims) -> Result<(), ClaimViolation> {
        T::validate(self, header, claims)
    }
}

/// The registered-claim checks every token goes through
///
/// Checks run in this order and the first failure is reported:
///
/// 1. the header algorithm is approved, if any are
/// 2. `exp` is after `now - leeway`, unless expiration is ignored
/// 3. `iat` is not after `now + leeway`
/// 4. `nbf` is not after `now + leeway`
/// 5. `iss` is the required issuer
/// 6. `aud` shares an audience with the allowed set, if there is one
/// 7. `sub` is the required subject
///
/// Absent time claims pass. An absent `iss`, `aud` or `sub` fails with
/// [`ClaimViolation::Missing`] when that claim is required.
#[derive(Clone, Debug)]
#[must_use]
pub struct CoreValidator {
    approved_algorithms: Vec<Algorithm>,
    leeway: Duration,
    check_exp: bool,
    audiences: Vec<Audience>,
    issuer: Option<Issuer>,
    subject: Option<Regex>,
}

impl Default for CoreValidator {
    /// Any algorithm, no leeway, expiration checked
    fn default() -> Self {
        Self {
            approved_algorithms: Vec::new(),
            leeway: Duration::ZERO,
            check_exp: true,
            audiences: Vec::new(),
            issuer: None,
            subject: None,
        }
    }
}

impl CoreValidator {
    /// Grace period for `exp`, `iat` and `nbf`
    #[inline]
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Grace period for `exp`, `iat` and `nbf`, in seconds
    #[inline]
    pub fn with_leeway_secs(self, secs: u64) -> Self {
        self.with_leeway(Duration::from_secs(secs))
    }

    /// Rejects expired tokens (the default)
    #[inline]
    pub fn check_expiration(self) -> Self {
        Self {
            check_exp: true,
            ..self
        }
    }

    /// Accepts expired tokens
    #[inline]
    pub fn ignore_expiration(self) -> Self {
        Self {
            check_exp: false,
            ..self
        }
    }

    /// Accepts tokens for `audience`
    #[inline]
    pub fn add_allowed_audience(mut self, audience: Audience) -> Self {
        self.audiences.push(audience);
        self
    }

    /// Accepts tokens for any of `audiences`
    #[inline]
    pub fn extend_allowed_audiences(mut self, audiences: impl IntoIterator<Item = Audience>) -> Self {
        self.audiences.extend(audiences);
        self
    }

    /// Accepts tokens signed with `alg`
    #[inline]
    pub fn add_approved_algorithm(mut self, alg: Algorithm) -> Self {
        self.approved_algorithms.push(alg);
        self
    }

    /// Accepts tokens signed with any of `algs`
    #[inline]
    pub fn extend_approved_algorithms(mut self, algs: impl IntoIterator<Item = Algorithm>) -> Self {
        self.approved_algorithms.extend(algs);
        self
    }

    /// Requires `iss` to be `issuer`
    #[inline]
    pub fn require_issuer(self, issuer: Issuer) -> Self {
        Self {
            issuer: Some(issuer),
            ..self
        }
    }

    /// Requires `sub` to be exactly `subject`
    ///
    /// The subject is matched literally; characters such as `.` or `*`
    /// have no special meaning.
    ///
    /// # Errors
    ///
    /// The subject is too large to match against.
    pub fn require_subject(self, subject: Subject) -> Result<Self, SubjectError> {
        let pattern = Regex::new(&format!("^{}$", regex::escape(subject.as_str())))?;
        Ok(Self {
            subject: Some(pattern),
            ..self
        })
    }

    /// The approved algorithms; empty when any is accepted
    #[must_use]
    pub fn approved_algorithms(&self) -> &[Algorithm] {
        &self.approved_algorithms
    }

    /// Runs the checks against the time read from `clock`
    ///
    /// # Errors
    ///
    /// The first check to fail.
    pub fn validate(
        &self,
        header: &Header,
        claims: &Claims,
        clock: &impl Clock,
    ) -> Result<(), ClaimViolation> {
        let now = clock.now().0;
        let leeway = self.leeway.as_secs();
        let alg = header.alg();

        if !self.approved_algorithms.is_empty() && !self.approved_algorithms.contains(&alg) {
            return Err(ClaimViolation::Algorithm(alg));
        }

        match claims.exp() {
            Some(exp) if self.check_exp && exp.0.saturating_add(leeway) <= now => {
                return Err(ClaimViolation::Expired)
            }
            _ => {}
        }

        let horizon = now.saturating_add(leeway);
        if claims.iat().is_some_and(|iat| iat.0 > horizon) {
            return Err(ClaimViolation::IssuedInFuture);
        }
        if claims.nbf().is_some_and(|nbf| nbf.0 > horizon) {
            return Err(ClaimViolation::NotYetValid);
        }

        if let Some(required) = &self.issuer {
            match claims.iss() {
                None => return Err(ClaimViolation::Missing("iss")),
                Some(iss) if iss != required => return Err(ClaimViolation::Issuer),
                Some(_) => {}
            }
        }

        if !self.audiences.is_empty() {
            let aud = claims.aud();
            if aud.is_empty() {
                return Err(ClaimViolation::Missing("aud"));
            }
            if !self.audiences.iter().any(|allowed| aud.contains(allowed)) {
                return Err(ClaimViolation::Audience);
            }
        }

        if let Some(pattern) = &self.subject {
            match claims.sub() {
                None => return Err(ClaimViolation::Missing("sub")),
                Some(sub) if !pattern.is_match(sub.as_str()) => {
                    return Err(ClaimViolation::Subject)
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}
