/// Connection target handed to the query engine.
///
/// May embed a caller's access token, so `Debug` is redacted and there is
/// no `Display`. Read the raw value with [`ConnectionDescriptor::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor(String);

impl ConnectionDescriptor {
    const MOTHERDUCK_PREFIX: &'static str = "md:?motherduck_token=";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// MotherDuck descriptor with the token percent-encoded.
    pub fn motherduck(token: &str) -> Self {
        Self(format!(
            "{}{}",
            Self::MOTHERDUCK_PREFIX,
            urlencoding::encode(token)
        ))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConnectionDescriptor(<redacted>)")
    }
}
