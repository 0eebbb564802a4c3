use std::future::Future;

/// An authority that authenticates credentials asynchronously
///
/// The returned future completes exactly once, with either the
/// authenticated principal or the reason the credentials were rejected.
/// Cancellation and timeouts are left to the caller.
pub trait Authority<'a> {
    /// The credentials accepted by the authority
    type Credentials: ?Sized + 'a;

    /// The authenticated identity produced on success
    type Principal;

    /// The future type returned by the asynchronous verification function
    type VerifyFuture: Future<Output = Result<Self::Principal, Self::VerifyError>> + 'a;

    /// The type returned in the event of a verification failure
    type VerifyError;

    /// Asynchronously verifies the credentials
    fn verify(&'a self, credentials: &'a Self::Credentials) -> Self::VerifyFuture;
}
