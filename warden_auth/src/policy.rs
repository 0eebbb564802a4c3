use std::fmt;

/// Decides whether an authenticated principal may proceed
///
/// [`PermissionBasedAuthorization`][crate::PermissionBasedAuthorization]
/// is the policy this crate ships.
pub trait Policy {
    /// What the policy looks at
    type Request;

    /// Why access was refused
    type Denial: fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Allows the request or says why not
    ///
    /// # Errors
    ///
    /// The request is denied.
    fn evaluate(&self, request: &Self::Request) -> Result<(), Self::Denial>;
}

impl<P: Policy + ?Sized> Policy for &'_ P {
    type Request = P::Request;
    type Denial = P::Denial;

    fn evaluate(&self, request: &Self::Request) -> Result<(), Self::Denial> {
        P::evaluate(self, request)
    }
}
